//! Registry of compiled grammars, keyed by file association.
//!
//! A grammar's `file_extensions` entries double as exact file names, so
//! `CMakeLists.txt` matches by name while `cmake` matches `foo.cmake`.
//! Exact names win over extensions.

use crate::cmake::error::GrammarError;
use crate::cmake::grammar::{builtin, Grammar};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Default)]
pub struct SyntaxSet {
    grammars: Vec<Grammar>,
    by_filename: HashMap<String, usize>,
    by_extension: HashMap<String, usize>,
}

impl SyntaxSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set holding every bundled grammar.
    pub fn with_defaults() -> Result<Self, GrammarError> {
        let mut set = Self::new();
        for grammar in builtin::all()? {
            set.add(grammar);
        }
        Ok(set)
    }

    /// Register a grammar. Later registrations take over associations of
    /// earlier ones.
    pub fn add(&mut self, grammar: Grammar) {
        let index = self.grammars.len();
        for association in grammar.file_extensions() {
            self.by_filename.insert(association.clone(), index);
            self.by_extension
                .insert(association.to_ascii_lowercase(), index);
        }
        debug!(
            name = grammar.name(),
            associations = grammar.file_extensions().len(),
            "registered grammar"
        );
        self.grammars.push(grammar);
    }

    /// Grammar with the given display name.
    pub fn find_by_name(&self, name: &str) -> Option<&Grammar> {
        self.grammars.iter().find(|g| g.name() == name)
    }

    /// Grammar for a path: exact file name first, then extension (case-insensitive fallback).
    pub fn find_for_path(&self, path: impl AsRef<Path>) -> Option<&Grammar> {
        let path = path.as_ref();
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if let Some(&index) = self.by_filename.get(name) {
                return Some(&self.grammars[index]);
            }
        }

        let extension = path.extension().and_then(|e| e.to_str())?;
        self.by_extension
            .get(extension)
            .or_else(|| self.by_extension.get(&extension.to_ascii_lowercase()))
            .map(|&index| &self.grammars[index])
    }

    /// Grammars in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Grammar> {
        self.grammars.iter()
    }

    pub fn len(&self) -> usize {
        self.grammars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grammars.is_empty()
    }
}
