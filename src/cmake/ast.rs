//! Concrete syntax tree for CMake source.
//!
//! The tree keeps every byte of the input: whitespace, newlines and comments
//! are nodes of their own, so concatenating the spans of a file's elements
//! reproduces the source. The formatter depends on this.

use serde::Serialize;
use std::fmt;
use std::ops::Range;

/// A 1-based line and column. Columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// 1-based line and column (in chars) of a byte offset into `source`.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        Position { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct File {
    pub elements: Vec<FileElement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileElement {
    Command(CommandInvocation),
    Comment(Comment),
    Space(Whitespace),
    Newline(Whitespace),
}

impl FileElement {
    pub fn span(&self) -> Range<usize> {
        match self {
            FileElement::Command(command) => command.span.clone(),
            FileElement::Comment(comment) => comment.span.clone(),
            FileElement::Space(ws) | FileElement::Newline(ws) => ws.span.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Whitespace {
    pub text: String,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandInvocation {
    pub name: Identifier,
    /// Spaces between the name and `(`, possibly empty.
    pub space_before_paren: String,
    pub arguments: Arguments,
    pub span: Range<usize>,
}

impl CommandInvocation {
    /// Arguments in order, flattening nested groups.
    pub fn flat_arguments(&self) -> Vec<&Argument> {
        let mut out = Vec::new();
        self.arguments.collect_into(&mut out);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identifier {
    pub text: String,
    pub span: Range<usize>,
}

/// A parenthesized argument list, including its delimiters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Arguments {
    pub open: Range<usize>,
    pub items: Vec<ArgumentItem>,
    pub close: Range<usize>,
}

impl Arguments {
    pub fn span(&self) -> Range<usize> {
        self.open.start..self.close.end
    }

    fn collect_into<'a>(&'a self, out: &mut Vec<&'a Argument>) {
        for item in &self.items {
            match item {
                ArgumentItem::Argument(argument) => out.push(argument),
                ArgumentItem::Group(group) => group.collect_into(out),
                _ => {}
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArgumentItem {
    Argument(Argument),
    Group(Arguments),
    Space(Whitespace),
    Newline(Whitespace),
    Comment(Comment),
}

impl ArgumentItem {
    pub fn span(&self) -> Range<usize> {
        match self {
            ArgumentItem::Argument(argument) => argument.span.clone(),
            ArgumentItem::Group(group) => group.span(),
            ArgumentItem::Space(ws) | ArgumentItem::Newline(ws) => ws.span.clone(),
            ArgumentItem::Comment(comment) => comment.span.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentKind {
    Bracket,
    Quoted,
    Unquoted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Argument {
    pub kind: ArgumentKind,
    /// Source text including quotes or brackets.
    pub text: String,
    pub span: Range<usize>,
}

impl Argument {
    /// Text without the surrounding quotes or brackets. Escapes are kept as written.
    pub fn content(&self) -> &str {
        match self.kind {
            ArgumentKind::Unquoted => &self.text,
            ArgumentKind::Quoted => self
                .text
                .strip_prefix('"')
                .and_then(|t| t.strip_suffix('"'))
                .unwrap_or(&self.text),
            ArgumentKind::Bracket => {
                let level = self.text[1..].bytes().take_while(|&b| b == b'=').count();
                let delimiter = level + 2;
                self.text
                    .get(delimiter..self.text.len().saturating_sub(delimiter))
                    .unwrap_or("")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentKind {
    Line,
    Bracket,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub kind: CommentKind,
    pub text: String,
    pub span: Range<usize>,
}
