//! Hierarchical scope names
//!
//!     A scope is a dotted tag such as `string.quoted.double.cmake`. Scopes are
//!     matched by prefix on whole atoms, so the selector `string.quoted` matches
//!     `string.quoted.double.cmake` but `string.quo` matches nothing.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Scope(String);

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Scope(name.into())
    }

    /// Parse a space separated scope list, as written in grammar rules.
    pub fn parse_list(names: &str) -> Vec<Scope> {
        names.split_whitespace().map(Scope::new).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn atoms(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// True when every atom of `selector` matches the leading atoms of this scope.
    pub fn matches(&self, selector: &str) -> bool {
        let mut atoms = self.atoms();
        selector
            .split('.')
            .all(|wanted| atoms.next().is_some_and(|atom| atom == wanted))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Scope {
    fn from(name: &str) -> Self {
        Scope::new(name)
    }
}

/// Render a scope path outermost first, space separated.
pub fn join_scopes(scopes: &[Scope]) -> String {
    scopes
        .iter()
        .map(Scope::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_matching_on_atoms() {
        let scope = Scope::new("string.quoted.double.cmake");
        assert!(scope.matches("string"));
        assert!(scope.matches("string.quoted"));
        assert!(scope.matches("string.quoted.double.cmake"));
        assert!(!scope.matches("string.quo"));
        assert!(!scope.matches("string.quoted.double.cmake.extra"));
        assert!(!scope.matches("comment"));
    }

    #[test]
    fn test_parse_list() {
        let scopes = Scope::parse_list("meta.group.cmake  punctuation.section.begin.cmake");
        assert_eq!(
            scopes,
            vec![
                Scope::new("meta.group.cmake"),
                Scope::new("punctuation.section.begin.cmake")
            ]
        );
        assert!(Scope::parse_list("   ").is_empty());
    }

    #[test]
    fn test_join_scopes() {
        let scopes = vec![Scope::new("source.cmake"), Scope::new("comment.line.cmake")];
        assert_eq!(join_scopes(&scopes), "source.cmake comment.line.cmake");
    }
}
