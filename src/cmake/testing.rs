//! Test helpers for tokenizer output
//!
//! Two tools are meant to be used together in tests:
//!
//! 1. [Fixtures] for curated CMake sources under `tests/fixtures/`, so sample
//!    files are vetted once instead of being scattered across test bodies.
//! 2. [assert_tokens] for checking a token stream with a fluent API, one token
//!    at a time:
//!
//! ```rust-example
//! let source = "set(x)";
//! let result = tokenize(&grammar, source);
//! assert_tokens(source, &result)
//!     .token(0, |t| t.text("set").innermost("support.function.cmake"))
//!     .token(2, |t| t.text("x").has("string.unquoted"))
//!     .count(4);
//! ```

use crate::cmake::grammar::{builtin, Grammar};
use crate::cmake::tokenizer::{ScopedToken, StackEventKind, Tokenized};
use std::fs;
use std::path::PathBuf;

/// Compiled bundled CMake grammar; panics if it does not compile.
pub fn cmake_grammar() -> Grammar {
    builtin::cmake().expect("bundled CMake grammar compiles")
}

/// Access to files under `tests/fixtures/`.
pub struct Fixtures;

impl Fixtures {
    pub fn path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name)
    }

    pub fn get_string(name: &str) -> Result<String, String> {
        let path = Self::path(name);
        fs::read_to_string(&path).map_err(|e| format!("{}: {}", path.display(), e))
    }
}

/// Texts of tokens that carry a scope matching `selector`.
pub fn texts_with_scope<'a>(source: &'a str, result: &Tokenized, selector: &str) -> Vec<&'a str> {
    result
        .tokens
        .iter()
        .filter(|t| t.has_scope(selector))
        .map(|t| t.text(source))
        .collect()
}

/// `(text, innermost scope)` for every token.
pub fn innermost_pairs<'a, 'r>(source: &'a str, result: &'r Tokenized) -> Vec<(&'a str, &'r str)> {
    result
        .tokens
        .iter()
        .map(|t| (t.text(source), t.innermost().map_or("", |s| s.as_str())))
        .collect()
}

/// True when every pop closes the most recent unclosed push of the same context.
pub fn events_are_nested(result: &Tokenized) -> bool {
    let mut open: Vec<&str> = Vec::new();
    for event in &result.events {
        match event.kind {
            StackEventKind::Push => open.push(&event.context),
            StackEventKind::Pop => {
                if open.pop() != Some(event.context.as_str()) {
                    return false;
                }
            }
        }
    }
    true
}

pub fn assert_tokens<'a>(source: &'a str, result: &'a Tokenized) -> TokensAssertion<'a> {
    TokensAssertion { source, result }
}

pub struct TokensAssertion<'a> {
    source: &'a str,
    result: &'a Tokenized,
}

impl<'a> TokensAssertion<'a> {
    pub fn count(self, expected: usize) -> Self {
        assert_eq!(
            self.result.tokens.len(),
            expected,
            "token count mismatch, tokens: {:?}",
            innermost_pairs(self.source, self.result)
        );
        self
    }

    pub fn token(self, index: usize, check: impl FnOnce(TokenAssertion<'a>)) -> Self {
        let token = self.result.tokens.get(index).unwrap_or_else(|| {
            panic!(
                "no token at index {}, tokens: {:?}",
                index,
                innermost_pairs(self.source, self.result)
            )
        });
        check(TokenAssertion {
            source: self.source,
            token,
            index,
        });
        self
    }

    pub fn open_contexts(self, expected: &[&str]) -> Self {
        assert_eq!(self.result.open_contexts, expected);
        self
    }
}

pub struct TokenAssertion<'a> {
    source: &'a str,
    token: &'a ScopedToken,
    index: usize,
}

impl<'a> TokenAssertion<'a> {
    pub fn text(self, expected: &str) -> Self {
        assert_eq!(
            self.token.text(self.source),
            expected,
            "token {} text mismatch",
            self.index
        );
        self
    }

    pub fn innermost(self, expected: &str) -> Self {
        let actual = self.token.innermost().map_or("", |s| s.as_str());
        assert_eq!(actual, expected, "token {} innermost scope mismatch", self.index);
        self
    }

    pub fn has(self, selector: &str) -> Self {
        assert!(
            self.token.has_scope(selector),
            "token {} ({:?}) lacks scope {}, has {:?}",
            self.index,
            self.token.text(self.source),
            selector,
            self.token.scopes
        );
        self
    }

    pub fn lacks(self, selector: &str) -> Self {
        assert!(
            !self.token.has_scope(selector),
            "token {} ({:?}) unexpectedly has scope {}",
            self.index,
            self.token.text(self.source),
            selector
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmake::tokenizer::tokenize;

    #[test]
    fn test_fluent_assertions() {
        let grammar = cmake_grammar();
        let source = "set(x)";
        let result = tokenize(&grammar, source);
        assert_tokens(source, &result)
            .token(0, |t| {
                t.text("set").innermost("support.function.cmake");
            })
            .token(2, |t| {
                t.text("x").has("string.unquoted").lacks("comment");
            })
            .count(4)
            .open_contexts(&["main"]);
        assert!(events_are_nested(&result));
    }

    #[test]
    fn test_fixture_is_readable() {
        let source = Fixtures::get_string("CMakeLists.txt").unwrap();
        assert!(source.contains("project("));
        assert!(Fixtures::get_string("missing.txt").is_err());
    }
}
