//! # cmake-syntax
//!
//! Scope tokenizer, parser and formatter for the CMake language.
//!
//! The crate is organised around a declarative grammar table (see
//! [grammar](cmake::grammar)) interpreted by a push-down
//! [tokenizer](cmake::tokenizer). The [parser](cmake::parser) and
//! [formatter](cmake::formatter) work on a concrete syntax tree instead.
//!
//! ## Testing
//!
//! Shared test helpers live in the [testing module](cmake::testing).

pub mod cmake;

pub use cmake::grammar::{Grammar, GrammarError};
pub use cmake::syntax_set::SyntaxSet;
pub use cmake::tokenizer::{tokenize, Tokenized, Tokenizer};
