//! Lexer for CMake source, used by the AST parser.
//!
//! This module defines the tokens of the CMake language as the parser sees
//! them. Simple tokens are plain logos patterns; comments, quoted arguments and
//! bracket arguments need a callback because their end depends on what was
//! opened (escape sequences, or the `=` count of `[==[`).

use crate::cmake::error::{ParseError, ParseErrorKind};
use logos::{Lexer, Logos};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexError {
    #[default]
    UnexpectedCharacter,
    UnterminatedQuote,
    /// Carries the `=` count of the opener.
    UnterminatedBracket(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    Line,
    Bracket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SquareKind {
    /// `[=*[ ... ]=*]`
    Bracket,
    /// A `[` that starts an ordinary unquoted argument.
    Unquoted,
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(error = LexError)]
pub enum Token {
    #[regex(r"[ \t]+")]
    Space,

    #[regex(r"\r?\n")]
    Newline,

    #[token("(")]
    OpenParen,

    #[token(")")]
    CloseParen,

    #[token("#", lex_comment)]
    Comment(CommentKind),

    #[token("\"", lex_quoted)]
    Quoted,

    #[token("[", lex_square)]
    Square(SquareKind),

    #[regex(r#"(?:[^\s()#"\\\[]|\\[^\r\n])(?:[^\s()#"\\]|\\[^\r\n])*"#)]
    Unquoted,
}

impl Token {
    pub fn is_whitespace(&self) -> bool {
        matches!(self, Token::Space | Token::Newline)
    }

    /// True for anything that can be a command argument.
    pub fn is_argument(&self) -> bool {
        matches!(self, Token::Quoted | Token::Square(_) | Token::Unquoted)
    }
}

/// Number of `=` in a bracket opener at the start of `rest`, which begins just
/// after the first `[`. None when `rest` is not `=*[`.
fn bracket_level(rest: &str) -> Option<usize> {
    let equals = rest.bytes().take_while(|&b| b == b'=').count();
    (rest.as_bytes().get(equals) == Some(&b'[')).then_some(equals)
}

/// Consume the rest of a bracket construct whose opener `[=*[` starts at the
/// beginning of `lex.remainder()` minus the leading `[`.
fn finish_bracket(lex: &mut Lexer<Token>, level: usize) -> Result<(), LexError> {
    let opener = level + 1;
    let closer = format!("]{}]", "=".repeat(level));
    let rest = &lex.remainder()[opener..];
    match rest.find(&closer) {
        Some(end) => {
            lex.bump(opener + end + closer.len());
            Ok(())
        }
        None => Err(LexError::UnterminatedBracket(level)),
    }
}

fn lex_comment(lex: &mut Lexer<Token>) -> Result<CommentKind, LexError> {
    let rest = lex.remainder();
    if let Some(level) = rest.strip_prefix('[').and_then(bracket_level) {
        lex.bump(1);
        finish_bracket(lex, level)?;
        return Ok(CommentKind::Bracket);
    }

    let end = rest.find('\n').unwrap_or(rest.len());
    let end = if rest[..end].ends_with('\r') { end - 1 } else { end };
    lex.bump(end);
    Ok(CommentKind::Line)
}

fn lex_quoted(lex: &mut Lexer<Token>) -> Result<(), LexError> {
    let mut chars = lex.remainder().char_indices();
    while let Some((index, c)) = chars.next() {
        match c {
            '"' => {
                lex.bump(index + 1);
                return Ok(());
            }
            '\\' => {
                chars.next();
            }
            _ => {}
        }
    }
    Err(LexError::UnterminatedQuote)
}

fn lex_square(lex: &mut Lexer<Token>) -> Result<SquareKind, LexError> {
    if let Some(level) = bracket_level(lex.remainder()) {
        finish_bracket(lex, level)?;
        return Ok(SquareKind::Bracket);
    }

    let mut chars = lex.remainder().char_indices().peekable();
    let mut end = 0;
    while let Some(&(index, c)) = chars.peek() {
        if c.is_whitespace() || matches!(c, '(' | ')' | '#' | '"') {
            break;
        }
        chars.next();
        if c == '\\' {
            match chars.next() {
                Some((next, escaped)) if escaped != '\n' && escaped != '\r' => {
                    end = next + escaped.len_utf8();
                    continue;
                }
                _ => break,
            }
        }
        end = index + c.len_utf8();
    }
    lex.bump(end);
    Ok(SquareKind::Unquoted)
}

/// Tokenize CMake source into tokens with their byte spans.
pub fn lex(source: &str) -> Result<Vec<(Token, Range<usize>)>, ParseError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(err) => return Err(lex_error(err, source, span.start)),
        }
    }

    Ok(tokens)
}

fn lex_error(err: LexError, source: &str, offset: usize) -> ParseError {
    let kind = match err {
        LexError::UnexpectedCharacter => {
            ParseErrorKind::UnexpectedCharacter(source[offset..].chars().next().unwrap_or('\0'))
        }
        LexError::UnterminatedQuote => ParseErrorKind::UnterminatedQuote,
        LexError::UnterminatedBracket(level) => {
            ParseErrorKind::UnterminatedBracket(format!("]{}]", "=".repeat(level)))
        }
    };
    ParseError::at(kind, source, offset)
}
