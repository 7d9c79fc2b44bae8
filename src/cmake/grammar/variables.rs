//! Variable expansion for grammar patterns.
//!
//! Variables are regex fragments referenced as `{{name}}`. They may reference
//! each other; expansion happens once at load time and never at match time.

use crate::cmake::error::GrammarError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, HashMap};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").expect("placeholder regex is valid"));

/// Fully expanded variable table.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    resolved: HashMap<String, String>,
}

impl Variables {
    /// Resolve every variable, following references between variables.
    pub fn resolve(raw: &BTreeMap<String, String>) -> Result<Self, GrammarError> {
        let mut resolved = HashMap::new();
        for name in raw.keys() {
            let mut visiting = Vec::new();
            resolve_one(name, raw, &mut resolved, &mut visiting)?;
        }
        Ok(Self { resolved })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.resolved.get(name).map(String::as_str)
    }

    /// Substitute every `{{name}}` in `pattern`; `used_in` names the context for errors.
    pub fn expand(&self, pattern: &str, used_in: &str) -> Result<String, GrammarError> {
        let mut missing = None;
        let expanded = PLACEHOLDER.replace_all(pattern, |caps: &Captures| {
            match self.resolved.get(&caps[1]) {
                Some(value) => value.clone(),
                None => {
                    missing.get_or_insert_with(|| caps[1].to_string());
                    String::new()
                }
            }
        });
        match missing {
            Some(name) => Err(GrammarError::UnknownVariable {
                name,
                used_in: used_in.to_string(),
            }),
            None => Ok(expanded.into_owned()),
        }
    }
}

fn resolve_one(
    name: &str,
    raw: &BTreeMap<String, String>,
    resolved: &mut HashMap<String, String>,
    visiting: &mut Vec<String>,
) -> Result<String, GrammarError> {
    if let Some(done) = resolved.get(name) {
        return Ok(done.clone());
    }
    if visiting.iter().any(|v| v == name) {
        return Err(GrammarError::RecursiveVariable(name.to_string()));
    }
    let Some(body) = raw.get(name) else {
        let used_in = visiting.last().cloned().unwrap_or_default();
        return Err(GrammarError::UnknownVariable {
            name: name.to_string(),
            used_in,
        });
    };

    visiting.push(name.to_string());
    let mut expanded = String::with_capacity(body.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(body) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        expanded.push_str(&body[last..whole.start]);
        expanded.push_str(&resolve_one(&caps[1], raw, resolved, visiting)?);
        last = whole.end;
    }
    expanded.push_str(&body[last..]);
    visiting.pop();

    resolved.insert(name.to_string(), expanded.clone());
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_expands_nested_variables() {
        let vars = Variables::resolve(&table(&[
            ("ident", "[A-Za-z_]{{tail}}*"),
            ("tail", "[A-Za-z0-9_]"),
        ]))
        .unwrap();
        assert_eq!(vars.get("ident"), Some("[A-Za-z_][A-Za-z0-9_]*"));
        assert_eq!(
            vars.expand(r"\b{{ident}}(?=\()", "main").unwrap(),
            r"\b[A-Za-z_][A-Za-z0-9_]*(?=\()"
        );
    }

    #[test]
    fn test_pattern_without_placeholders_is_untouched() {
        let vars = Variables::default();
        assert_eq!(vars.expand(r"\[(=*)\[", "main").unwrap(), r"\[(=*)\[");
    }

    #[test]
    fn test_unknown_variable_in_pattern() {
        let vars = Variables::default();
        let err = vars.expand("{{nope}}", "arguments").unwrap_err();
        assert!(matches!(
            err,
            GrammarError::UnknownVariable { ref name, ref used_in } if name == "nope" && used_in == "arguments"
        ));
    }

    #[test]
    fn test_unknown_variable_in_definition() {
        let err = Variables::resolve(&table(&[("a", "{{b}}")])).unwrap_err();
        assert!(matches!(err, GrammarError::UnknownVariable { ref name, .. } if name == "b"));
    }

    #[test]
    fn test_recursive_variables_are_rejected() {
        let err = Variables::resolve(&table(&[("a", "x{{b}}"), ("b", "{{a}}")])).unwrap_err();
        assert!(matches!(err, GrammarError::RecursiveVariable(_)));
    }
}
