use anyhow::Result;
use serde::Serialize;
use tinytemplate::{TinyTemplate, format_unescaped};

/// 渲染模板；输出是源码而非 HTML，因此不做转义
pub fn render<T: Serialize>(template: &str, ctx: &T) -> Result<String> {
    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&format_unescaped);
    tt.add_template("tpl", template)?;
    Ok(tt.render("tpl", ctx)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contexts::GniBlockContext;
    use crate::templates::GNI_BLOCK;

    #[test]
    fn renders_gni_block() {
        let sources = vec!["libavcodec/ac3.c".to_string(), "libavcodec/dca.c".to_string()];
        let ctx = GniBlockContext {
            marker: "# extra sources",
            sources: &sources,
        };
        assert_eq!(
            render(GNI_BLOCK, &ctx).unwrap(),
            "# extra sources\n\
             if (ffmpeg_branding == \"Chrome\" || ffmpeg_branding == \"ChromeOS\") {\n\
             \x20 ffmpeg_c_sources += [\n\
             \x20   \"libavcodec/ac3.c\",\n\
             \x20   \"libavcodec/dca.c\",\n\
             \x20 ]\n\
             }\n"
        );
    }
}
