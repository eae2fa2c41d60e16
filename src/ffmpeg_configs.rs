use crate::components::{enable_config_flags, insert_list_entries};
use crate::config::FfmpegConfig;
use crate::gni::patch_generated_gni;
use crate::patches::{WriteMode, patch_file};
use crate::report::Summary;
use anyhow::{Result, bail};
use std::path::Path;
use tracing::info;

/// Patch the pre-generated FFmpeg configs of every target platform, then
/// ffmpeg_generated.gni.
pub fn run(config: &FfmpegConfig, root: &Path, mode: WriteMode) -> Result<Summary> {
    let config_root = root.join(&config.config_root);
    if !config_root.is_dir() {
        bail!(
            "must be run from the Chromium src/ directory (missing {})",
            config_root.display()
        );
    }
    let gni_path = root.join(&config.generated_gni);
    if !gni_path.is_file() {
        bail!("missing required file: {}", gni_path.display());
    }

    let mut summary = Summary::new("ffmpeg-configs", mode.dry_run);
    let mut enabled_flags = 0;
    let mut list_entries = 0;

    for target in &config.targets {
        let platform = target.label();
        let dir = config.platform_dir(root, target);
        if !dir.is_dir() {
            summary.warn(format!("missing config directory for {platform}: {}", dir.display()));
            continue;
        }

        let components = dir.join("config_components.h");
        if components.is_file() {
            let (enabled, changed) = patch_file(&components, mode, |text| {
                enable_config_flags(text, &config.config_flags)
            })?;
            info!("Patching config_components.h for {platform}: enabled {enabled} flags");
            enabled_flags += enabled;
            summary.file_changed(changed);
            if enabled > 0 {
                summary
                    .changes
                    .push(format!("config_components.h for {platform}: enabled {enabled} flags"));
            }
        } else {
            summary.warn(format!("missing file for {platform}: {}", components.display()));
        }

        for (relative, entries) in config.list_files() {
            let list = dir.join(relative);
            if !list.is_file() {
                summary.warn(format!("missing file for {platform}: {}", list.display()));
                continue;
            }
            let (added, changed) =
                patch_file(&list, mode, |text| insert_list_entries(text, entries))?;
            info!("Patching {relative} for {platform}: added {added} entries");
            list_entries += added;
            summary.file_changed(changed);
            if added > 0 {
                summary
                    .changes
                    .push(format!("{relative} for {platform}: added {added} entries"));
            }
        }
    }

    let ffmpeg_root = root.join(&config.ffmpeg_root);
    let mut available = vec![];
    for source in &config.gni_sources {
        let source_path = ffmpeg_root.join(source);
        if source_path.is_file() {
            available.push(source.clone());
        } else {
            summary.warn(format!("missing ffmpeg source file: {}", source_path.display()));
        }
    }

    let (outcome, changed) = patch_file(&gni_path, mode, |text| {
        patch_generated_gni(text, &config.gni_marker, &available)
    })?;
    summary.file_changed(changed);
    for warning in outcome.warnings {
        summary.warn(warning);
    }
    if !outcome.added.is_empty() {
        summary.changes.push(format!(
            "ffmpeg_generated.gni: added {} source files for Chrome branding",
            outcome.added.len()
        ));
    }

    summary.headline = Some(format!(
        "Summary: enabled {enabled_flags} flags, added {list_entries} list entries, \
         added {} ffmpeg sources, updated {} files",
        outcome.added.len(),
        summary.files_changed
    ));
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::fs;

    const CONFIG: &str = r##"
        [branding]
        path = "build_ffmpeg.py"
        markers = ["if args.branding == 'Chrome':"]
        prefix = "--enable-"
        flags = []

        [ffmpeg]
        config_root = "third_party/ffmpeg/chromium/config/Chrome"
        ffmpeg_root = "third_party/ffmpeg"
        generated_gni = "third_party/ffmpeg/ffmpeg_generated.gni"
        gni_marker = "# Extra codec sources"
        targets = [{ os = "linux", arch = "x64" }, { os = "win", arch = "x64" }]
        config_flags = ["CONFIG_HEVC_DECODER"]
        codec_list = ["&ff_hevc_decoder"]
        parser_list = ["&ff_hevc_parser"]
        demuxer_list = ["&ff_hevc_demuxer"]
        gni_sources = ["libavcodec/hevc/hevcdec.c", "libavcodec/dca.c"]
    "##;

    const LIST: &str = "static const void * const list[] = {\n    &ff_aac_x,\n    NULL };\n";

    fn checkout() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let platform = dir.path().join("third_party/ffmpeg/chromium/config/Chrome/linux/x64");
        fs::create_dir_all(platform.join("libavcodec")).unwrap();
        fs::create_dir_all(platform.join("libavformat")).unwrap();
        fs::write(
            platform.join("config_components.h"),
            "#define CONFIG_HEVC_DECODER 0\n",
        )
        .unwrap();
        fs::write(platform.join("libavcodec/codec_list.c"), LIST).unwrap();
        fs::write(platform.join("libavcodec/parser_list.c"), LIST).unwrap();
        fs::write(platform.join("libavformat/demuxer_list.c"), LIST).unwrap();

        let ffmpeg = dir.path().join("third_party/ffmpeg");
        fs::create_dir_all(ffmpeg.join("libavcodec/hevc")).unwrap();
        fs::write(ffmpeg.join("libavcodec/hevc/hevcdec.c"), "").unwrap();
        fs::write(ffmpeg.join("ffmpeg_generated.gni"), "ffmpeg_c_sources = []\n").unwrap();
        dir
    }

    #[test]
    fn patches_every_present_file() {
        let config = Config::parse(CONFIG).unwrap();
        let dir = checkout();
        let mode = WriteMode {
            dry_run: false,
            backup: false,
        };

        let summary = run(&config.ffmpeg, dir.path(), mode).unwrap();
        assert_eq!(summary.files_changed, 5);
        // win/x64 directory and libavcodec/dca.c are missing
        assert_eq!(summary.warnings.len(), 2);

        let platform = dir.path().join("third_party/ffmpeg/chromium/config/Chrome/linux/x64");
        assert_eq!(
            fs::read_to_string(platform.join("config_components.h")).unwrap(),
            "#define CONFIG_HEVC_DECODER 1\n"
        );
        assert!(
            fs::read_to_string(platform.join("libavformat/demuxer_list.c"))
                .unwrap()
                .contains("    &ff_hevc_demuxer,\n    NULL };")
        );
        let gni_path = dir.path().join("third_party/ffmpeg/ffmpeg_generated.gni");
        let gni = fs::read_to_string(gni_path).unwrap();
        assert!(gni.contains("# Extra codec sources\n"));
        assert!(gni.contains("\"libavcodec/hevc/hevcdec.c\","));
        assert!(!gni.contains("dca.c"));

        let summary = run(&config.ffmpeg, dir.path(), mode).unwrap();
        assert_eq!(summary.files_changed, 0);
    }

    #[test]
    fn check_mode_writes_nothing() {
        let config = Config::parse(CONFIG).unwrap();
        let dir = checkout();
        let mode = WriteMode {
            dry_run: true,
            backup: false,
        };

        let summary = run(&config.ffmpeg, dir.path(), mode).unwrap();
        assert_eq!(summary.files_changed, 5);
        let platform = dir.path().join("third_party/ffmpeg/chromium/config/Chrome/linux/x64");
        assert_eq!(
            fs::read_to_string(platform.join("config_components.h")).unwrap(),
            "#define CONFIG_HEVC_DECODER 0\n"
        );
    }

    #[test]
    fn outside_chromium_checkout_fails() {
        let config = Config::parse(CONFIG).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mode = WriteMode {
            dry_run: true,
            backup: false,
        };
        let err = run(&config.ffmpeg, dir.path(), mode).unwrap_err();
        assert!(err.to_string().contains("Chromium src/"));
    }
}
