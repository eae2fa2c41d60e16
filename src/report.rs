use anyhow::Result;
use chrono::Local;
use serde::Serialize;
use tracing::warn;

/// What one command did, printed as plain lines or JSON.
#[derive(Debug, Serialize)]
pub struct Summary {
    pub command: &'static str,
    pub dry_run: bool,
    pub generated_at: String,
    pub headline: Option<String>,
    pub changes: Vec<String>,
    pub warnings: Vec<String>,
    pub failures: Vec<String>,
    pub files_changed: usize,
}

impl Summary {
    pub fn new(command: &'static str, dry_run: bool) -> Self {
        Summary {
            command,
            dry_run,
            generated_at: Local::now().to_rfc3339(),
            headline: None,
            changes: vec![],
            warnings: vec![],
            failures: vec![],
            files_changed: 0,
        }
    }

    pub fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn file_changed(&mut self, changed: bool) {
        self.files_changed += usize::from(changed);
    }

    pub fn render_text(&self) -> String {
        let mut out = vec![];
        if self.command != "verify" {
            if self.files_changed == 0 {
                out.push("No changes needed (already patched).".to_string());
            } else if self.dry_run {
                out.push("Dry run: patches detected and validated.".to_string());
            } else {
                out.push(format!("Applied {} patches:", self.command));
            }
        }
        out.extend(self.changes.iter().map(|c| format!("- {c}")));
        out.extend(self.warnings.iter().map(|w| format!("WARN: {w}")));
        out.extend(self.failures.iter().map(|f| format!("FAIL: {f}")));
        if let Some(headline) = &self.headline {
            out.push(headline.clone());
        }
        if self.dry_run && self.files_changed > 0 {
            out.push("Check mode: no files written".to_string());
        }
        out.join("\n")
    }

    pub fn print(&self, json: bool) -> Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(self)?);
        } else {
            println!("{}", self.render_text());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_to_do() {
        let summary = Summary::new("media", false);
        assert_eq!(summary.render_text(), "No changes needed (already patched).");
    }

    #[test]
    fn dry_run_lists_changes() {
        let mut summary = Summary::new("branding", true);
        summary.changes.push("decoder: +hevc".to_string());
        summary.file_changed(true);
        let text = summary.render_text();
        assert!(text.starts_with("Dry run: patches detected and validated."));
        assert!(text.contains("- decoder: +hevc"));
        assert!(text.ends_with("Check mode: no files written"));
    }

    #[test]
    fn json_has_every_field() {
        let mut summary = Summary::new("verify", false);
        summary.failures.push("x.h: missing `#define A 1`".to_string());
        let value: serde_json::Value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["command"], "verify");
        assert_eq!(value["failures"].as_array().unwrap().len(), 1);
        assert!(value["generated_at"].as_str().unwrap().contains('T'));
    }
}
