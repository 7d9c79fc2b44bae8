//! Whitespace formatter for CMake source.
//!
//! The formatter works on the concrete syntax tree, so it only ever touches
//! whitespace tokens: argument text is copied verbatim and comments lose
//! nothing but trailing blanks. Rules:
//!
//!     - trailing whitespace before a newline or end of file is dropped
//!     - runs of blank lines are capped, with a separate cap inside argument lists
//!     - whitespace between a command name and `(` follows [SpaceBeforeParen]
//!     - whitespace right after `(` and right before `)` is dropped
//!     - whitespace between arguments becomes a single space
//!     - indentation at the start of a line is kept as written
//!     - the file ends with exactly one newline when `final_newline` is set
//!
//! Formatting already formatted output returns it unchanged.

use crate::cmake::ast::{
    ArgumentItem, Arguments, CommandInvocation, Comment, CommentKind, File, FileElement,
};
use crate::cmake::error::ParseError;
use crate::cmake::parser::parse;
use crate::cmake::settings::{FormattingConfig, SpaceBeforeParen};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct Formatter {
    config: FormattingConfig,
}

impl Formatter {
    pub fn new(config: FormattingConfig) -> Self {
        Formatter { config }
    }

    pub fn config(&self) -> &FormattingConfig {
        &self.config
    }

    /// Parse and reformat `source`.
    pub fn format(&self, source: &str) -> Result<String, ParseError> {
        let file = parse(source)?;
        let formatted = self.format_file(&file);
        debug!(
            changed = formatted != source,
            bytes = formatted.len(),
            "formatted cmake source"
        );
        Ok(formatted)
    }

    /// True when formatting would leave `source` unchanged.
    pub fn is_formatted(&self, source: &str) -> Result<bool, ParseError> {
        Ok(self.format(source)? == source)
    }

    /// Render an already parsed file.
    pub fn format_file(&self, file: &File) -> String {
        let mut writer = Writer::default();
        let elements = &file.elements;

        for (index, element) in elements.iter().enumerate() {
            match element {
                FileElement::Newline(ws) => writer.newline(&ws.text, self.config.max_blank_lines),
                FileElement::Space(ws) => {
                    let ends_line = matches!(elements.get(index + 1), None | Some(FileElement::Newline(_)));
                    if !ends_line {
                        writer.space(&ws.text);
                    }
                }
                FileElement::Comment(comment) => writer.comment(comment),
                FileElement::Command(command) => self.write_command(&mut writer, command),
            }
        }

        writer.finish(self.config.final_newline)
    }

    fn write_command(&self, writer: &mut Writer, command: &CommandInvocation) {
        writer.content(&command.name.text);
        match self.config.space_before_paren {
            SpaceBeforeParen::Preserve => writer.space(&command.space_before_paren),
            SpaceBeforeParen::Single if !command.space_before_paren.is_empty() => {
                writer.space(" ")
            }
            SpaceBeforeParen::Single | SpaceBeforeParen::Remove => {}
        }
        self.write_arguments(writer, &command.arguments);
    }

    fn write_arguments(&self, writer: &mut Writer, arguments: &Arguments) {
        let items = &arguments.items;
        let cap = self.config.max_blank_lines_in_arguments;
        writer.content("(");

        for (index, item) in items.iter().enumerate() {
            match item {
                ArgumentItem::Space(ws) => {
                    let prev = index.checked_sub(1).and_then(|i| items.get(i));
                    let next = items.get(index + 1);
                    let ends_line = matches!(next, Some(ArgumentItem::Newline(_)));
                    if ends_line {
                        continue;
                    }
                    match prev {
                        Some(ArgumentItem::Newline(_)) => writer.space(&ws.text),
                        None => {}
                        Some(_) if next.is_none() => {}
                        Some(_) => writer.space(" "),
                    }
                }
                ArgumentItem::Newline(ws) => writer.newline(&ws.text, cap),
                ArgumentItem::Comment(comment) => writer.comment(comment),
                ArgumentItem::Argument(argument) => writer.content(&argument.text),
                ArgumentItem::Group(group) => self.write_arguments(writer, group),
            }
        }

        writer.content(")");
    }
}

/// Output buffer that tracks how many newlines were written in a row.
#[derive(Debug, Default)]
struct Writer {
    out: String,
    newline_run: usize,
    newline_style: Option<String>,
}

impl Writer {
    fn content(&mut self, text: &str) {
        self.out.push_str(text);
        self.newline_run = 0;
    }

    fn space(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn comment(&mut self, comment: &Comment) {
        match comment.kind {
            CommentKind::Line => self.content(comment.text.trim_end()),
            CommentKind::Bracket => self.content(&comment.text),
        }
    }

    /// Write a newline unless it would exceed `max_blank_lines` blank lines.
    fn newline(&mut self, text: &str, max_blank_lines: usize) {
        if self.newline_style.is_none() {
            self.newline_style = Some(text.to_string());
        }
        if self.newline_run > max_blank_lines {
            return;
        }
        self.out.push_str(text);
        self.newline_run += 1;
    }

    fn finish(mut self, final_newline: bool) -> String {
        if final_newline && !self.out.trim().is_empty() {
            let kept = self.out.trim_end_matches(['\n', '\r']).len();
            self.out.truncate(kept);
            self.out
                .push_str(self.newline_style.as_deref().unwrap_or("\n"));
        }
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(source: &str) -> String {
        Formatter::default().format(source).unwrap()
    }

    fn format_with(config: FormattingConfig, source: &str) -> String {
        Formatter::new(config).format(source).unwrap()
    }

    #[test]
    fn test_trailing_whitespace_is_removed() {
        assert_eq!(format("set(a b)   \n# note   \n"), "set(a b)\n# note\n");
    }

    #[test]
    fn test_blank_lines_are_capped() {
        let source = "a()\n\n\n\n\n\nb()\n";
        assert_eq!(format(source), "a()\n\n\n\nb()\n");

        let config = FormattingConfig {
            max_blank_lines: 0,
            ..FormattingConfig::default()
        };
        assert_eq!(format_with(config, source), "a()\nb()\n");
    }

    #[test]
    fn test_blank_lines_inside_arguments_use_their_own_cap() {
        let source = "set(a\n\n\n\n  b)\n";
        assert_eq!(format(source), "set(a\n\n  b)\n");
    }

    #[test]
    fn test_space_before_paren_modes() {
        let source = "if  (x)\nset(y)\n";
        assert_eq!(format(source), "if (x)\nset(y)\n");

        let remove = FormattingConfig {
            space_before_paren: SpaceBeforeParen::Remove,
            ..FormattingConfig::default()
        };
        assert_eq!(format_with(remove, source), "if(x)\nset(y)\n");

        let preserve = FormattingConfig {
            space_before_paren: SpaceBeforeParen::Preserve,
            ..FormattingConfig::default()
        };
        assert_eq!(format_with(preserve, source), source);
    }

    #[test]
    fn test_spaces_between_arguments_collapse() {
        assert_eq!(
            format("set(  a \t b   \"c  d\"  )\n"),
            "set(a b \"c  d\")\n"
        );
    }

    #[test]
    fn test_nested_groups_are_kept() {
        assert_eq!(
            format("if( ( A  OR  B ) AND C )\n"),
            "if((A OR B) AND C)\n"
        );
    }

    #[test]
    fn test_indentation_is_preserved() {
        let source = "target_sources(app\n    PRIVATE\n        main.cpp\n  )\n";
        assert_eq!(format(source), source);
    }

    #[test]
    fn test_final_newline() {
        assert_eq!(format("project(x)"), "project(x)\n");
        assert_eq!(format("project(x)\n\n\n"), "project(x)\n");
        assert_eq!(format(""), "");

        let config = FormattingConfig {
            final_newline: false,
            ..FormattingConfig::default()
        };
        assert_eq!(format_with(config, "project(x)"), "project(x)");
    }

    #[test]
    fn test_crlf_line_endings_are_kept() {
        assert_eq!(format("a()  \r\nb()"), "a()\r\nb()\r\n");
    }

    #[test]
    fn test_bracket_content_is_untouched() {
        let source = "message([==[  keep   this  \n  ]==])\n";
        assert_eq!(format(source), source);
    }

    #[test]
    fn test_parse_errors_propagate() {
        assert!(Formatter::default().format("set(x").is_err());
    }

    #[test]
    fn test_formatting_is_idempotent() {
        let source = "cmake_minimum_required (VERSION 3.20)  \n\n\n\n\n\
                      project( demo )\n\
                      if ( WIN32 )   # platform\n\
                      \tadd_definitions( -DWIN  )\n\
                      endif ( )\n\n\n";
        let once = format(source);
        let twice = format(&once);
        assert_eq!(once, twice);
        assert!(Formatter::default().is_formatted(&once).unwrap());
    }
}
