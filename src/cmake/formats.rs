//! Serializers for token streams and their registry.
//!
//! Formats are looked up by name, the way the CLI's `--format` flag expects.

use crate::cmake::error::FormatError;
use crate::cmake::scope::{join_scopes, Scope};
use crate::cmake::tokenizer::{StackEvent, Tokenized};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write;

/// Turns a tokenized buffer into text.
pub trait TokenFormat: Send + Sync {
    /// Name used to select the format, e.g. `tag`.
    fn name(&self) -> &str;

    /// One-line summary for listings.
    fn description(&self) -> &str {
        ""
    }

    /// Render `tokenized`, whose ranges index into `source`.
    fn serialize(&self, source: &str, tokenized: &Tokenized) -> Result<String, FormatError>;
}

/// `start..end innermost.scope "text"`, one token per line.
pub struct TagFormat;

impl TokenFormat for TagFormat {
    fn name(&self) -> &str {
        "tag"
    }

    fn description(&self) -> &str {
        "One line per token with its innermost scope"
    }

    fn serialize(&self, source: &str, tokenized: &Tokenized) -> Result<String, FormatError> {
        let mut out = String::new();
        for token in &tokenized.tokens {
            let scope = token.innermost().map(Scope::as_str).unwrap_or("");
            let _ = writeln!(
                out,
                "{}..{} {} {:?}",
                token.range.start,
                token.range.end,
                scope,
                token.text(source)
            );
        }
        Ok(out)
    }
}

/// Like `tag`, with the whole scope path.
pub struct ScopesFormat;

impl TokenFormat for ScopesFormat {
    fn name(&self) -> &str {
        "scopes"
    }

    fn description(&self) -> &str {
        "One line per token with the full scope path"
    }

    fn serialize(&self, source: &str, tokenized: &Tokenized) -> Result<String, FormatError> {
        let mut out = String::new();
        for token in &tokenized.tokens {
            let _ = writeln!(
                out,
                "{}..{} {} {:?}",
                token.range.start,
                token.range.end,
                join_scopes(&token.scopes),
                token.text(source)
            );
        }
        Ok(out)
    }
}

/// Tokens, stack events and open contexts as pretty-printed JSON.
pub struct JsonFormat;

#[derive(Serialize)]
struct JsonToken<'a> {
    start: usize,
    end: usize,
    text: &'a str,
    scopes: &'a [Scope],
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    tokens: Vec<JsonToken<'a>>,
    events: &'a [StackEvent],
    open_contexts: &'a [String],
}

impl TokenFormat for JsonFormat {
    fn name(&self) -> &str {
        "json"
    }

    fn description(&self) -> &str {
        "Tokens, stack events and open contexts as JSON"
    }

    fn serialize(&self, source: &str, tokenized: &Tokenized) -> Result<String, FormatError> {
        let output = JsonOutput {
            tokens: tokenized
                .tokens
                .iter()
                .map(|token| JsonToken {
                    start: token.range.start,
                    end: token.range.end,
                    text: token.text(source),
                    scopes: &token.scopes,
                })
                .collect(),
            events: &tokenized.events,
            open_contexts: &tokenized.open_contexts,
        };
        Ok(serde_json::to_string_pretty(&output)?)
    }
}

/// Registry of token formats
///
/// Formats are registered and retrieved by name.
///
/// # Examples
///
/// ```ignore
/// let registry = FormatRegistry::with_defaults();
/// let text = registry.serialize(source, &tokenized, "json")?;
/// ```
pub struct FormatRegistry {
    formats: HashMap<String, Box<dyn TokenFormat>>,
}

impl FormatRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        FormatRegistry {
            formats: HashMap::new(),
        }
    }

    /// Register a format, replacing any format with the same name.
    pub fn register<F: TokenFormat + 'static>(&mut self, format: F) {
        self.formats
            .insert(format.name().to_string(), Box::new(format));
    }

    /// Get a format by name
    pub fn get(&self, name: &str) -> Result<&dyn TokenFormat, FormatError> {
        self.formats
            .get(name)
            .map(|f| f.as_ref())
            .ok_or_else(|| FormatError::FormatNotFound(name.to_string()))
    }

    /// Check if a format exists
    pub fn has(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn list_formats(&self) -> Vec<String> {
        let mut names: Vec<_> = self.formats.keys().cloned().collect();
        names.sort();
        names
    }

    /// Serialize tokens using the named format
    pub fn serialize(
        &self,
        source: &str,
        tokenized: &Tokenized,
        format: &str,
    ) -> Result<String, FormatError> {
        self.get(format)?.serialize(source, tokenized)
    }

    /// Registry holding the `tag`, `scopes` and `json` formats
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(TagFormat);
        registry.register(ScopesFormat);
        registry.register(JsonFormat);
        registry
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmake::grammar::builtin;
    use crate::cmake::tokenizer::tokenize;

    #[test]
    fn test_registry_defaults() {
        let registry = FormatRegistry::with_defaults();
        assert_eq!(registry.list_formats(), vec!["json", "scopes", "tag"]);
        assert!(registry.has("tag"));
        assert!(matches!(
            registry.get("xml"),
            Err(FormatError::FormatNotFound(name)) if name == "xml"
        ));
    }

    #[test]
    fn test_tag_format() {
        let grammar = builtin::cmake().unwrap();
        let source = "set(x)";
        let tokens = tokenize(&grammar, source);
        let out = FormatRegistry::with_defaults()
            .serialize(source, &tokens, "tag")
            .unwrap();
        assert_eq!(
            out,
            "0..3 support.function.cmake \"set\"\n\
             3..4 punctuation.section.parens.begin.cmake \"(\"\n\
             4..5 string.unquoted.cmake \"x\"\n\
             5..6 punctuation.section.parens.end.cmake \")\"\n"
        );
    }

    #[test]
    fn test_scopes_format_includes_base_scope() {
        let grammar = builtin::cmake().unwrap();
        let source = "# hi";
        let tokens = tokenize(&grammar, source);
        let out = ScopesFormat.serialize(source, &tokens).unwrap();
        let first = out.lines().next().unwrap();
        assert_eq!(
            first,
            "0..1 source.cmake comment.line.number-sign.cmake punctuation.definition.comment.cmake \"#\""
        );
    }

    #[test]
    fn test_json_format_is_valid_json() {
        let grammar = builtin::cmake().unwrap();
        let source = "message(\"${A}\")";
        let tokens = tokenize(&grammar, source);
        let out = JsonFormat.serialize(source, &tokens).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["open_contexts"], serde_json::json!(["main"]));
        assert_eq!(value["tokens"][0]["text"], "message");
        assert_eq!(value["events"][0]["kind"], "push");
    }
}
