//! Error types for grammar loading, parsing and output formatting.

use crate::cmake::ast::Position;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or compiling a grammar definition.
#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("failed to read grammar {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid grammar definition: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("grammar `{0}` has no `main` context")]
    MissingMain(String),

    #[error("context `{from}` references unknown context `{name}`")]
    UnknownContext { name: String, from: String },

    #[error("context `{0}` includes itself")]
    RecursiveInclude(String),

    #[error("`{used_in}` uses unknown variable `{name}`")]
    UnknownVariable { name: String, used_in: String },

    #[error("variable `{0}` references itself")]
    RecursiveVariable(String),

    #[error("rule in context `{0}` combines more than one of push, set and pop")]
    ConflictingActions(String),

    #[error("invalid pattern in context `{context}`: {pattern}: {message}")]
    InvalidPattern {
        context: String,
        pattern: String,
        message: String,
    },
}

/// What went wrong while parsing CMake source into an AST.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("unexpected character {0:?}")]
    UnexpectedCharacter(char),

    #[error("unterminated quoted argument")]
    UnterminatedQuote,

    #[error("unterminated bracket, expected `{0}`")]
    UnterminatedBracket(String),

    #[error("expected '(' after command name `{0}`")]
    MissingOpenParen(String),

    #[error("argument list is never closed")]
    UnclosedArguments,

    #[error("parentheses nested deeper than {0} levels")]
    NestingTooDeep(usize),

    #[error("unexpected ')'")]
    UnexpectedCloseParen,

    #[error("expected a command name, found `{0}`")]
    ExpectedCommand(String),
}

/// A parse failure with the 1-based position where it was detected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at {position}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub position: Position,
}

impl ParseError {
    pub fn at(kind: ParseErrorKind, source: &str, offset: usize) -> Self {
        Self {
            kind,
            position: Position::from_offset(source, offset),
        }
    }
}

/// Errors from token stream serializers.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("format `{0}` not found")]
    FormatNotFound(String),

    #[error("failed to serialize tokens: {0}")]
    Json(#[from] serde_json::Error),
}
