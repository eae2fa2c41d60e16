use crate::config::BrandingConfig;
use crate::patches::{WriteMode, patch_file};
use crate::report::Summary;
use anyhow::{Result, bail};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Merge the extra codecs into the Chrome branding flags of build_ffmpeg.py.
pub fn run(config: &BrandingConfig, path: &Path, mode: WriteMode) -> Result<Summary> {
    if !path.is_file() {
        bail!("missing file: {}", path.display());
    }

    let ((matches, added), changed) = patch_file(path, mode, |text| {
        let result = flag_list_patcher::patch(text, &config.markers, &config.spec)?;
        Ok((result.buffer, (result.matches, result.added)))
    })?;

    let mut summary = Summary::new("branding", mode.dry_run);
    summary.file_changed(changed);
    summary.changes = describe(&added);
    for (flag, count) in &matches {
        info!("--{flag}: matched {count} assignment(s)");
    }
    summary.headline = Some(format!(
        "Patched {}: {} flag(s) matched, {} token(s) added",
        path.display(),
        matches.values().sum::<usize>(),
        added.values().map(Vec::len).sum::<usize>()
    ));
    Ok(summary)
}

fn describe(added: &BTreeMap<String, Vec<String>>) -> Vec<String> {
    added
        .iter()
        .filter(|(_, tokens)| !tokens.is_empty())
        .map(|(flag, tokens)| format!("{flag}: +{}", tokens.join(",")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::fs;

    const BUILD_FFMPEG: &str = "\
def main():
  configure_flags['Common'].extend(['--enable-decoder=vorbis'])
  if args.branding == 'Chrome':
    configure_flags['Common'].extend([
        '--enable-decoder=aac,h264',
        '--enable-demuxer=aac',
        '--enable-parser=aac,h264',
    ])
";

    fn write_mode(dry_run: bool) -> WriteMode {
        WriteMode {
            dry_run,
            backup: true,
        }
    }

    #[test]
    fn patches_build_script_once() {
        let config = Config::load(None).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build_ffmpeg.py");
        fs::write(&path, BUILD_FFMPEG).unwrap();

        let summary = run(&config.branding, &path, write_mode(false)).unwrap();
        assert_eq!(summary.files_changed, 1);
        assert_eq!(summary.changes.len(), 3);
        let patched = fs::read_to_string(&path).unwrap();
        assert!(patched.contains(
            "'--enable-decoder=aac,h264,hevc,ac3,eac3,dca,mpeg4,mpegvideo,mp1,mp2,mp3,flac',"
        ));
        assert!(patched.contains("'--enable-decoder=vorbis'"));
        assert!(dir.path().join("build_ffmpeg.py.orig").exists());

        let summary = run(&config.branding, &path, write_mode(false)).unwrap();
        assert_eq!(summary.files_changed, 0);
        assert!(summary.changes.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), patched);
    }

    #[test]
    fn dry_run_reports_without_writing() {
        let config = Config::load(None).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build_ffmpeg.py");
        fs::write(&path, BUILD_FFMPEG).unwrap();

        let summary = run(&config.branding, &path, write_mode(true)).unwrap();
        assert_eq!(summary.files_changed, 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), BUILD_FFMPEG);
    }

    #[test]
    fn drifted_script_fails_with_flag_name() {
        let config = Config::load(None).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build_ffmpeg.py");
        let drifted = BUILD_FFMPEG.replace("        '--enable-parser=aac,h264',\n", "");
        fs::write(&path, &drifted).unwrap();

        let err = run(&config.branding, &path, write_mode(false)).unwrap_err();
        assert!(format!("{err:#}").contains("`parser`"));
        assert_eq!(fs::read_to_string(&path).unwrap(), drifted);
    }

    #[test]
    fn missing_file_is_reported() {
        let config = Config::load(None).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.py");
        let err = run(&config.branding, &missing, write_mode(false)).unwrap_err();
        assert!(err.to_string().starts_with("missing file"));
    }
}
