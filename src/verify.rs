use crate::config::Config;
use crate::report::Summary;
use anyhow::Result;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Literals from `needles` that do not occur in `text`.
pub fn missing_literals<'a>(text: &str, needles: &'a [String]) -> Vec<&'a str> {
    needles
        .iter()
        .map(String::as_str)
        .filter(|needle| !text.contains(needle))
        .collect()
}

fn check_file(summary: &mut Summary, path: &Path, needles: &[String]) -> usize {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            summary.failures.push(format!("{}: {err}", path.display()));
            return needles.len();
        }
    };
    let missing = missing_literals(&text, needles);
    for needle in &missing {
        summary
            .failures
            .push(format!("{}: missing `{needle}`", path.display()));
    }
    debug!(
        "{}: {} of {} present",
        path.display(),
        needles.len() - missing.len(),
        needles.len()
    );
    needles.len()
}

/// Confirm that the regenerated configs and patched sources contain what the
/// patch steps were meant to put there.
pub fn run(config: &Config, root: &Path) -> Result<Summary> {
    let mut summary = Summary::new("verify", false);
    let mut files = 0;
    let mut literals = 0;

    let ffmpeg = &config.ffmpeg;
    let defines: Vec<String> = ffmpeg
        .config_flags
        .iter()
        .map(|flag| format!("#define {flag} 1"))
        .collect();

    for target in &ffmpeg.targets {
        let dir = ffmpeg.platform_dir(root, target);
        if !dir.is_dir() {
            summary.warn(format!(
                "missing config directory for {}: {}",
                target.label(),
                dir.display()
            ));
            continue;
        }
        let components = dir.join("config_components.h");
        if !components.is_file() {
            summary.warn(format!(
                "skipping {}: no config_components.h in {}",
                target.label(),
                dir.display()
            ));
            continue;
        }

        literals += check_file(&mut summary, &components, &defines);
        files += 1;
        for (relative, entries) in ffmpeg.list_files() {
            let entries: Vec<String> = entries.iter().map(|e| format!("{e},")).collect();
            literals += check_file(&mut summary, &dir.join(relative), &entries);
            files += 1;
        }
    }

    for check in &config.verify.checks {
        literals += check_file(&mut summary, &root.join(&check.file), &check.contains);
        files += 1;
    }

    summary.headline = Some(if summary.failures.is_empty() {
        format!("Verified {literals} strings in {files} files")
    } else {
        format!("{} of {literals} checks failed", summary.failures.len())
    });
    Ok(summary)
}
