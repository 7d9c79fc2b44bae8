//! Recursive-descent parser from CMake source to the concrete syntax tree.
//!
//!     file               ::= file_element*
//!     file_element       ::= command_invocation | comment | space | newline
//!     command_invocation ::= identifier space* '(' arguments ')'
//!     arguments          ::= (argument | '(' arguments ')' | space | newline | comment)*
//!
//! Lexing is done up front by [lex](crate::cmake::lexing::lex); the parser
//! walks the token vector with a cursor. Groups deeper than
//! [MAX_NESTING_DEPTH] are rejected with
//! [NestingTooDeep](ParseErrorKind::NestingTooDeep).

use crate::cmake::ast::{
    Argument, ArgumentItem, ArgumentKind, Arguments, CommandInvocation, Comment, CommentKind,
    File, FileElement, Identifier, Whitespace,
};
use crate::cmake::error::{ParseError, ParseErrorKind};
use crate::cmake::lexing::{self, SquareKind, Token};
use std::ops::Range;
use tracing::debug;

/// Deepest parenthesis nesting accepted, counting the command's own list.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Parse CMake source into a [File].
pub fn parse(source: &str) -> Result<File, ParseError> {
    let tokens = lexing::lex(source)?;
    let mut parser = Parser {
        source,
        tokens,
        cursor: 0,
    };
    let file = parser.file()?;
    debug!(elements = file.elements.len(), "parsed cmake source");
    Ok(file)
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<(Token, Range<usize>)>,
    cursor: usize,
}

impl<'s> Parser<'s> {
    fn peek(&self) -> Option<(Token, Range<usize>)> {
        self.tokens.get(self.cursor).cloned()
    }

    fn advance(&mut self) {
        self.cursor += 1;
    }

    fn text(&self, span: &Range<usize>) -> &'s str {
        &self.source[span.clone()]
    }

    fn error(&self, kind: ParseErrorKind, offset: usize) -> ParseError {
        ParseError::at(kind, self.source, offset)
    }

    fn whitespace(&mut self, span: Range<usize>) -> Whitespace {
        self.advance();
        Whitespace {
            text: self.text(&span).to_string(),
            span,
        }
    }

    fn comment(&mut self, kind: lexing::CommentKind, span: Range<usize>) -> Comment {
        self.advance();
        let kind = match kind {
            lexing::CommentKind::Line => CommentKind::Line,
            lexing::CommentKind::Bracket => CommentKind::Bracket,
        };
        Comment {
            kind,
            text: self.text(&span).to_string(),
            span,
        }
    }

    fn file(&mut self) -> Result<File, ParseError> {
        let mut elements = Vec::new();
        while let Some((token, span)) = self.peek() {
            let element = match token {
                Token::Space => FileElement::Space(self.whitespace(span)),
                Token::Newline => FileElement::Newline(self.whitespace(span)),
                Token::Comment(kind) => FileElement::Comment(self.comment(kind, span)),
                Token::Unquoted if is_identifier(self.text(&span)) => {
                    FileElement::Command(self.command(span)?)
                }
                Token::CloseParen => {
                    return Err(self.error(ParseErrorKind::UnexpectedCloseParen, span.start))
                }
                _ => {
                    let found = self.text(&span).to_string();
                    return Err(self.error(ParseErrorKind::ExpectedCommand(found), span.start));
                }
            };
            elements.push(element);
        }
        Ok(File { elements })
    }

    fn command(&mut self, name_span: Range<usize>) -> Result<CommandInvocation, ParseError> {
        self.advance();
        let name = Identifier {
            text: self.text(&name_span).to_string(),
            span: name_span.clone(),
        };

        let mut space_before_paren = String::new();
        while let Some((Token::Space, span)) = self.peek() {
            space_before_paren.push_str(self.text(&span));
            self.advance();
        }

        match self.peek() {
            Some((Token::OpenParen, open)) => {
                self.advance();
                let arguments = self.arguments(open, 1)?;
                let span = name_span.start..arguments.close.end;
                Ok(CommandInvocation {
                    name,
                    space_before_paren,
                    arguments,
                    span,
                })
            }
            other => {
                let offset = other.map_or(self.source.len(), |(_, span)| span.start);
                Err(self.error(ParseErrorKind::MissingOpenParen(name.text), offset))
            }
        }
    }

    /// Parse after an already consumed `(` up to and including its `)`.
    /// `depth` is the nesting level of that `(`.
    fn arguments(&mut self, open: Range<usize>, depth: usize) -> Result<Arguments, ParseError> {
        let mut items = Vec::new();
        loop {
            let Some((token, span)) = self.peek() else {
                return Err(self.error(ParseErrorKind::UnclosedArguments, open.start));
            };
            let item = match token {
                Token::CloseParen => {
                    self.advance();
                    return Ok(Arguments {
                        open,
                        items,
                        close: span,
                    });
                }
                Token::OpenParen if depth >= MAX_NESTING_DEPTH => {
                    return Err(self.error(
                        ParseErrorKind::NestingTooDeep(MAX_NESTING_DEPTH),
                        span.start,
                    ));
                }
                Token::OpenParen => {
                    self.advance();
                    ArgumentItem::Group(self.arguments(span, depth + 1)?)
                }
                Token::Space => ArgumentItem::Space(self.whitespace(span)),
                Token::Newline => ArgumentItem::Newline(self.whitespace(span)),
                Token::Comment(kind) => ArgumentItem::Comment(self.comment(kind, span)),
                Token::Quoted => ArgumentItem::Argument(self.argument(ArgumentKind::Quoted, span)),
                Token::Square(SquareKind::Bracket) => {
                    ArgumentItem::Argument(self.argument(ArgumentKind::Bracket, span))
                }
                Token::Square(SquareKind::Unquoted) | Token::Unquoted => {
                    ArgumentItem::Argument(self.argument(ArgumentKind::Unquoted, span))
                }
            };
            items.push(item);
        }
    }

    fn argument(&mut self, kind: ArgumentKind, span: Range<usize>) -> Argument {
        self.advance();
        Argument {
            kind,
            text: self.text(&span).to_string(),
            span,
        }
    }
}
