use crate::contexts::GniBlockContext;
use crate::patches::{indent_of, newline_of};
use crate::render::render;
use crate::templates::GNI_BLOCK;
use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static C_SOURCE_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*"(?P<path>[^"\r\n]+\.c)",[ \t]*\r?$"#).expect("invalid source regex")
});
static LIST_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*ffmpeg_c_sources\s*\+=\s*\[\s*$").expect("invalid list regex"));
static LIST_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\]\s*$").expect("invalid list regex"));
static QUOTED_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*"[^"\n]+",\s*$"#).expect("invalid entry regex"));

#[derive(Debug, Default)]
pub struct GniOutcome {
    pub added: Vec<String>,
    pub warnings: Vec<String>,
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn listed_sources(text: &str) -> HashSet<&str> {
    C_SOURCE_ENTRY
        .captures_iter(text)
        .filter_map(|caps| caps.name("path"))
        .map(|m| m.as_str())
        .collect()
}

/// Add `sources` to the Chrome-branded `ffmpeg_c_sources` of ffmpeg_generated.gni.
///
/// `sources` must already be filtered to files that exist on disk. Anything
/// already listed is skipped; so is anything whose basename clashes with a
/// listed or newly added source, since GN names objects by basename.
pub fn patch_generated_gni(
    text: &str,
    marker: &str,
    sources: &[String],
) -> Result<(String, GniOutcome)> {
    let listed = listed_sources(text);
    let listed_basenames: HashSet<&str> = listed.iter().map(|s| basename(s)).collect();

    let mut outcome = GniOutcome::default();
    let mut added_basenames = HashSet::new();
    for source in sources {
        if listed.contains(source.as_str()) {
            continue;
        }
        let name = basename(source);
        if listed_basenames.contains(name) || !added_basenames.insert(name) {
            outcome.warnings.push(format!(
                "skipping {source} due to duplicate object basename: {name}"
            ));
            continue;
        }
        outcome.added.push(source.clone());
    }

    if outcome.added.is_empty() {
        return Ok((text.to_string(), outcome));
    }

    let patched = match insert_into_managed_block(text, marker, &outcome.added) {
        Some(patched) => patched,
        None => append_managed_block(text, marker, &outcome.added)?,
    };
    Ok((patched, outcome))
}

fn insert_into_managed_block(text: &str, marker: &str, sources: &[String]) -> Option<String> {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let bare = |i: usize| lines[i].trim_end_matches(['\r', '\n']);

    let marker_index = (0..lines.len()).find(|&i| lines[i].contains(marker))?;
    let list_start = (marker_index..lines.len()).find(|&i| LIST_OPEN.is_match(bare(i)))?;
    let list_end = (list_start + 1..lines.len()).find(|&i| LIST_CLOSE.is_match(bare(i)))?;

    let entry_indent = (list_start + 1..list_end)
        .find(|&i| QUOTED_ENTRY.is_match(bare(i)))
        .map(|i| indent_of(lines[i]).to_string())
        .unwrap_or_else(|| format!("{}  ", indent_of(lines[list_end])));

    let newline = newline_of(text);
    let mut out = String::with_capacity(text.len() + sources.len() * 40);
    for line in &lines[..list_end] {
        out.push_str(line);
    }
    for source in sources {
        out.push_str(&format!("{entry_indent}\"{source}\",{newline}"));
    }
    for line in &lines[list_end..] {
        out.push_str(line);
    }
    Some(out)
}

fn append_managed_block(text: &str, marker: &str, sources: &[String]) -> Result<String> {
    let newline = newline_of(text);
    let mut block = render(GNI_BLOCK, &GniBlockContext { marker, sources })?;
    if newline != "\n" {
        block = block.replace('\n', newline);
    }

    let separator = if text.ends_with(&newline.repeat(2)) {
        String::new()
    } else if text.ends_with(newline) {
        newline.to_string()
    } else {
        newline.repeat(2)
    };
    Ok(format!("{text}{separator}{block}"))
}
