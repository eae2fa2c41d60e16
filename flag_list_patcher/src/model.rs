use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One list-valued setting and the tokens it must end up containing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FlagRule {
    pub name: String,
    /// Appended in this order when absent.
    #[serde(rename = "add")]
    pub required: Vec<String>,
}

impl FlagRule {
    pub fn new<N, I, T>(name: N, required: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        FlagRule {
            name: name.into(),
            required: required.into_iter().map(Into::into).collect(),
        }
    }
}

/// Assignments look like `<prefix><name>=tok1,tok2,...`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FlagSpec {
    pub prefix: String,
    #[serde(rename = "flags")]
    pub rules: Vec<FlagRule>,
}

impl FlagSpec {
    pub fn new(prefix: impl Into<String>) -> Self {
        FlagSpec {
            prefix: prefix.into(),
            rules: vec![],
        }
    }

    pub fn rule(mut self, rule: FlagRule) -> Self {
        self.rules.push(rule);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchResult {
    pub buffer: String,
    /// Assignments found and merged per flag name.
    pub matches: BTreeMap<String, usize>,
    /// Tokens appended per flag name, empty if the flag was already complete.
    pub added: BTreeMap<String, Vec<String>>,
    pub changed: bool,
}

impl PatchResult {
    pub fn total_added(&self) -> usize {
        self.added.values().map(Vec::len).sum()
    }
}
