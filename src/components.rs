//! Patchers for the per-platform FFmpeg config files Chromium ships
//! pre-generated (`config_components.h` and the `*_list.c` tables).

use crate::patches::{indent_of, newline_of};
use anyhow::{Result, bail};
use once_cell::sync::Lazy;
use regex::Regex;

static NULL_TERMINATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*NULL\s*[,}; ]*(?://.*)?$").expect("invalid NULL regex"));

/// Flip `#define FLAG 0` to `#define FLAG 1` for every flag given.
///
/// Returns the number of defines flipped.
pub fn enable_config_flags(text: &str, flags: &[String]) -> Result<(String, usize)> {
    let mut patched = text.to_string();
    let mut enabled = 0;
    for flag in flags {
        let re = Regex::new(&format!(
            r"(?m)^([ \t]*#define[ \t]+{}[ \t]+)0\b",
            regex::escape(flag)
        ))?;
        let hits = re.find_iter(&patched).count();
        if hits > 0 {
            patched = re.replace_all(&patched, "${1}1").into_owned();
            enabled += hits;
        }
    }
    Ok((patched, enabled))
}

/// `entry,` on a line of its own, ignoring surrounding whitespace.
fn has_entry(text: &str, entry: &str) -> bool {
    text.lines().any(|line| {
        line.trim()
            .strip_suffix(',')
            .is_some_and(|head| head.trim_end() == entry)
    })
}

/// Insert missing entries into a NULL-terminated C pointer table.
///
/// New lines go right before the first `NULL` line, indented like it.
/// Returns the number of entries inserted.
pub fn insert_list_entries(text: &str, entries: &[String]) -> Result<(String, usize)> {
    let missing: Vec<&str> = entries
        .iter()
        .map(String::as_str)
        .filter(|entry| !has_entry(text, entry))
        .collect();
    if missing.is_empty() {
        return Ok((text.to_string(), 0));
    }

    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let Some(null_index) = lines
        .iter()
        .position(|line| NULL_TERMINATOR.is_match(line.trim_end_matches(['\r', '\n'])))
    else {
        bail!("could not find NULL terminator in list file");
    };

    let indent = indent_of(lines[null_index]);
    let newline = newline_of(text);
    let mut out = String::with_capacity(text.len() + missing.len() * 32);
    for line in &lines[..null_index] {
        out.push_str(line);
    }
    for entry in &missing {
        out.push_str(indent);
        out.push_str(entry);
        out.push(',');
        out.push_str(newline);
    }
    for line in &lines[null_index..] {
        out.push_str(line);
    }
    Ok((out, missing.len()))
}
