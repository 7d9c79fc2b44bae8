//! Raw grammar definition as read from YAML.
//!
//! Context items follow the `.sublime-syntax` layout: a context is a list whose
//! entries are either match rules, `include` directives, or meta entries.

use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
pub struct RawGrammar {
    pub name: String,
    pub scope: String,
    #[serde(default)]
    pub file_extensions: Vec<String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    pub contexts: BTreeMap<String, Vec<RawContextItem>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawContextItem {
    Match(RawMatchRule),
    Include(RawInclude),
    Meta(RawMeta),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawMatchRule {
    #[serde(rename = "match")]
    pub pattern: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub captures: BTreeMap<usize, String>,
    #[serde(default)]
    pub push: Option<RawContextRef>,
    #[serde(default)]
    pub set: Option<RawContextRef>,
    #[serde(default)]
    pub pop: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawInclude {
    pub include: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawMeta {
    #[serde(default)]
    pub meta_scope: Option<String>,
    #[serde(default)]
    pub meta_content_scope: Option<String>,
    #[serde(default)]
    pub meta_include_prototype: Option<bool>,
}

/// Target of a `push` or `set`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawContextRef {
    Named(String),
    /// Several named contexts, pushed in order so the last one ends up on top.
    Stacked(Vec<String>),
    Anonymous(Vec<RawContextItem>),
}

impl RawGrammar {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }
}
