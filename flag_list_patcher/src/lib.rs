mod error;
mod model;

pub use crate::error::PatchError;
pub use crate::model::{FlagRule, FlagSpec, PatchResult};

use regex::Regex;
use std::collections::{BTreeMap, HashSet};

/// Position of the first marker spelling present, trying them in priority order.
fn find_marker<S: AsRef<str>>(buffer: &str, markers: &[S]) -> Result<usize, PatchError> {
    markers
        .iter()
        .map(AsRef::as_ref)
        .filter(|m| !m.is_empty())
        .find_map(|m| buffer.find(m))
        .ok_or_else(|| PatchError::MarkerNotFound {
            tried: markers.iter().map(|m| m.as_ref().to_string()).collect(),
        })
}

fn assignment_regex(prefix: &str, name: &str) -> Result<Regex, PatchError> {
    let pattern = format!(
        r#"{}{}=(?P<tokens>[^\s'"]*)"#,
        regex::escape(prefix),
        regex::escape(name)
    );
    Ok(Regex::new(&pattern)?)
}

/// A single list value: non-empty, without commas, whitespace or quotes.
pub fn is_token(token: &str) -> bool {
    !token.is_empty()
        && !token
            .chars()
            .any(|c| c == ',' || c == '\'' || c == '"' || c.is_whitespace())
}

fn check_tokens(spec: &FlagSpec) -> Result<(), PatchError> {
    for rule in &spec.rules {
        if let Some(bad) = rule.required.iter().find(|t| !is_token(t)) {
            return Err(PatchError::InvalidToken {
                flag: rule.name.clone(),
                token: bad.clone(),
            });
        }
    }
    Ok(())
}

/// Split a comma-separated list, dropping empty tokens left by stray commas.
pub fn split_tokens(list: &str) -> Vec<&str> {
    list.split(',').filter(|t| !t.is_empty()).collect()
}

/// Merge `required` into `list`.
///
/// Existing tokens keep their order (repeats collapse to the first
/// occurrence); missing required tokens are appended in the order given.
/// Returns `None` when every required token is already present, so callers
/// can leave the original text untouched.
pub fn merge_tokens(list: &str, required: &[String]) -> Option<(String, Vec<String>)> {
    let mut seen = HashSet::new();
    let mut kept = vec![];
    for token in split_tokens(list) {
        if seen.insert(token) {
            kept.push(token);
        }
    }

    let mut added = vec![];
    for token in required {
        if !token.is_empty() && seen.insert(token.as_str()) {
            added.push(token.clone());
        }
    }
    if added.is_empty() {
        return None;
    }

    let merged = kept
        .into_iter()
        .chain(added.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(",");
    Some((merged, added))
}

/// Ensure every flag in `spec` lists its required tokens.
///
/// The region searched starts at the first marker spelling found (tried in
/// order); text before it is never touched. For each flag only the first
/// `<prefix><name>=...` assignment inside the region is merged. Any missing
/// marker or assignment fails the whole call, so no partial result escapes.
/// Required tokens are checked with [`is_token`] before the buffer is read.
pub fn patch<S: AsRef<str>>(
    buffer: &str,
    markers: &[S],
    spec: &FlagSpec,
) -> Result<PatchResult, PatchError> {
    check_tokens(spec)?;
    let start = find_marker(buffer, markers)?;
    let (head, tail) = buffer.split_at(start);
    let mut region = tail.to_string();

    let mut matches = BTreeMap::new();
    let mut added: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for rule in &spec.rules {
        let re = assignment_regex(&spec.prefix, &rule.name)?;
        let span = re
            .captures(&region)
            .and_then(|caps| caps.name("tokens"))
            .map(|m| m.range())
            .ok_or_else(|| PatchError::AssignmentNotFound {
                flag: rule.name.clone(),
            })?;
        *matches.entry(rule.name.clone()).or_insert(0) += 1;

        let merged = merge_tokens(&region[span.clone()], &rule.required);
        let appended = added.entry(rule.name.clone()).or_default();
        if let Some((list, tokens)) = merged {
            region.replace_range(span, &list);
            appended.extend(tokens);
        }
    }

    let patched = format!("{head}{region}");
    let changed = patched != buffer;
    Ok(PatchResult {
        buffer: patched,
        matches,
        added,
        changed,
    })
}
