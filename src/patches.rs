use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
pub struct WriteMode {
    /// Report what would change without writing.
    pub dry_run: bool,
    /// Keep a one-time `<file>.orig` copy before the first write.
    pub backup: bool,
}

/// A patched buffer waiting to be written back.
#[derive(Debug)]
pub struct PendingEdit {
    pub path: PathBuf,
    pub original: String,
    pub patched: String,
    pub notes: Vec<String>,
}

impl PendingEdit {
    pub fn changed(&self) -> bool {
        self.original != self.patched
    }

    pub fn commit(&self, mode: WriteMode) -> Result<bool> {
        if !self.changed() {
            return Ok(false);
        }
        write_back(&self.path, &self.patched, mode)?;
        Ok(true)
    }
}

pub fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Read `path`, run `patch` over it and write the result back if it differs.
///
/// Returns the patcher's report and whether the content changed. In dry-run
/// mode the change is detected and reported but nothing is written.
pub fn patch_file<T, F>(path: &Path, mode: WriteMode, patch: F) -> Result<(T, bool)>
where
    F: FnOnce(&str) -> Result<(String, T)>,
{
    let original = read_file(path)?;
    let (patched, report) =
        patch(&original).with_context(|| format!("failed to patch {}", path.display()))?;
    let changed = patched != original;
    if changed {
        write_back(path, &patched, mode)?;
    } else {
        debug!("{} already up to date", path.display());
    }
    Ok((report, changed))
}

fn write_back(path: &Path, content: &str, mode: WriteMode) -> Result<()> {
    if mode.dry_run {
        info!("Would patch {}", path.display());
        return Ok(());
    }
    if mode.backup {
        backup_once(path)?;
    }
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    info!("Patched {}", path.display());
    Ok(())
}

pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".orig");
    PathBuf::from(name)
}

/// Copy `path` to its backup before the first write; an existing backup is kept.
pub fn backup_once(path: &Path) -> Result<bool> {
    let backup = backup_path(path);
    if backup.exists() {
        return Ok(false);
    }
    fs::copy(path, &backup)
        .with_context(|| format!("failed to back up {} to {}", path.display(), backup.display()))?;
    debug!("Backed up {} to {}", path.display(), backup.display());
    Ok(true)
}

/// Newline style of `text`: CRLF if it appears anywhere, LF otherwise.
pub fn newline_of(text: &str) -> &'static str {
    if text.contains("\r\n") { "\r\n" } else { "\n" }
}

/// Leading spaces and tabs of `line`.
pub fn indent_of(line: &str) -> &str {
    let end = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..end]
}
