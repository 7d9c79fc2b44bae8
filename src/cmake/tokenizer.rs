//! Push-down scope tokenizer
//!
//!     The tokenizer walks a text buffer one line at a time while keeping a
//!     stack of active grammar contexts. At each offset the rules of the top
//!     context are tried in declaration order; the first rule whose match
//!     starts exactly at the offset wins. Patterns are compiled anchored, so a
//!     rule that does not match at the offset fails without scanning ahead.
//!     When nothing matches, the offset advances by one character and no scope
//!     is emitted.
//!
//! Scope Composition
//!
//!     Every token starts with the grammar's base scope, followed by the
//!     `meta_scope` and `meta_content_scope` of every context on the stack.
//!     Matches that push or pop are treated specially so delimiters share the
//!     scope of the construct they open or close:
//!
//!         plain match:  stack content scopes + rule scope
//!         push:         stack content scopes + pushed meta_scope + rule scope
//!         pop:          parent content scopes + popped meta_scope + rule scope
//!
//!     Capture groups add their own scopes on top for the text they cover, so a
//!     single match may produce several tokens. Spans that end up with nothing
//!     beyond the base scope are not emitted.
//!
//! Stack Invariants
//!
//!     The stack always holds at least the `main` context. A pop matched at the
//!     root is ignored. Contexts whose patterns refer to `\1` .. `\9` see the
//!     captures of the match that pushed them; those patterns are compiled on
//!     first use and cached per tokenizer.

use crate::cmake::grammar::compiled::{compile_anchored, substitute_backrefs};
use crate::cmake::grammar::{Action, ContextId, Grammar, Pattern, Rule};
use crate::cmake::scope::Scope;
use fancy_regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::ops::Range;
use tracing::{trace, warn};

/// Zero-width push/pop steps allowed at one offset before a character is skipped.
const MAX_STALLED_STEPS: usize = 32;

/// A span of the input with its scope path, outermost scope first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopedToken {
    pub range: Range<usize>,
    pub scopes: Vec<Scope>,
}

impl ScopedToken {
    /// The covered text; `source` must be the tokenized buffer.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.range.clone()]
    }

    /// The most specific scope on the path.
    pub fn innermost(&self) -> Option<&Scope> {
        self.scopes.last()
    }

    /// True when any scope on the path matches the selector by atom prefix.
    pub fn has_scope(&self, selector: &str) -> bool {
        self.scopes.iter().any(|scope| scope.matches(selector))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StackEventKind {
    Push,
    Pop,
}

/// A change to the context stack, at the offset of the match that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackEvent {
    pub offset: usize,
    pub kind: StackEventKind,
    pub context: String,
}

/// Result of tokenizing a buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tokenized {
    pub tokens: Vec<ScopedToken>,
    pub events: Vec<StackEvent>,
    /// Contexts still on the stack at end of input, bottom first.
    pub open_contexts: Vec<String>,
}

impl Tokenized {
    /// Token texts in order; handy for assertions and debugging.
    pub fn texts<'a>(&self, source: &'a str) -> Vec<&'a str> {
        self.tokens.iter().map(|t| t.text(source)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Frame {
    context: ContextId,
    /// Captures of the match that pushed this context; index 0 is the whole match.
    captures: Vec<Option<String>>,
}

/// Snapshot of the context stack. Cloning it lets a caller resume
/// tokenizing from any line boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseState {
    frames: Vec<Frame>,
}

impl ParseState {
    /// A stack holding only the grammar's `main` context.
    pub fn new(grammar: &Grammar) -> Self {
        ParseState {
            frames: vec![Frame {
                context: grammar.main(),
                captures: Vec::new(),
            }],
        }
    }

    /// Number of contexts on the stack, at least one.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Context ids on the stack, bottom first.
    pub fn contexts(&self) -> impl Iterator<Item = ContextId> + '_ {
        self.frames.iter().map(|frame| frame.context)
    }

    /// Names of the contexts on the stack, bottom first.
    pub fn context_names(&self, grammar: &Grammar) -> Vec<String> {
        self.contexts()
            .map(|id| grammar.context(id).name.clone())
            .collect()
    }
}

/// Tokenizer over a borrowed grammar.
///
/// Owns the context stack and the cache of instantiated backreference
/// patterns, so one instance should be reused across the lines of a buffer.
pub struct Tokenizer<'g> {
    grammar: &'g Grammar,
    state: ParseState,
    instantiated: HashMap<String, Regex>,
}

impl<'g> Tokenizer<'g> {
    /// Start from the grammar's `main` context.
    pub fn new(grammar: &'g Grammar) -> Self {
        Self::with_state(grammar, ParseState::new(grammar))
    }

    /// Resume from a stack saved with [Tokenizer::state] or [Tokenizer::into_state].
    pub fn with_state(grammar: &'g Grammar, state: ParseState) -> Self {
        Tokenizer {
            grammar,
            state,
            instantiated: HashMap::new(),
        }
    }

    /// Current context stack.
    pub fn state(&self) -> &ParseState {
        &self.state
    }

    /// Consume the tokenizer, keeping its context stack.
    pub fn into_state(self) -> ParseState {
        self.state
    }

    /// Tokenize a whole buffer starting from the current state.
    pub fn tokenize(mut self, text: &str) -> Tokenized {
        let mut out = Tokenized::default();
        let mut offset = 0;
        for line in text.split_inclusive('\n') {
            let content = line.strip_suffix('\n').unwrap_or(line);
            let content = content.strip_suffix('\r').unwrap_or(content);
            self.tokenize_line(content, offset, &mut out);
            offset += line.len();
        }
        out.open_contexts = self.state.context_names(self.grammar);
        out
    }

    /// Tokenize one line without its terminator. `base` is the line's offset
    /// in the buffer; token ranges are reported relative to the buffer.
    pub fn tokenize_line(&mut self, line: &str, base: usize, out: &mut Tokenized) {
        let mut pos = 0;
        let mut stalled = 0;
        while pos <= line.len() {
            match self.step(line, pos, base, out) {
                Some(end) if end > pos => {
                    pos = end;
                    stalled = 0;
                }
                Some(_) => {
                    stalled += 1;
                    if stalled > MAX_STALLED_STEPS {
                        warn!(
                            offset = base + pos,
                            depth = self.state.depth(),
                            "zero-width rules keep firing without progress, skipping a character"
                        );
                        pos = next_char_boundary(line, pos);
                        stalled = 0;
                    }
                }
                None if pos == line.len() => break,
                None => pos = next_char_boundary(line, pos),
            }
        }
    }

    /// Apply the first rule matching at `pos`. Returns the end of the match.
    fn step(&mut self, line: &str, pos: usize, base: usize, out: &mut Tokenized) -> Option<usize> {
        let (rule, groups) = self.find_match(line, pos)?;
        let whole = groups.first().cloned().flatten()?;

        let prefix = self.prefix_scopes(&rule.action);
        emit_segments(out, base, &whole, &groups, prefix, rule);

        let captured: Vec<Option<String>> = groups
            .iter()
            .map(|group| group.clone().map(|range| line[range].to_string()))
            .collect();
        self.apply_action(&rule.action, captured, base + whole.start, out);

        Some(whole.end)
    }

    #[allow(clippy::type_complexity)]
    fn find_match(&mut self, line: &str, pos: usize) -> Option<(&'g Rule, Vec<Option<Range<usize>>>)> {
        let grammar = self.grammar;
        let frame = self.state.frames.last()?;
        let context = grammar.context(frame.context);

        for rule in &context.rules {
            let regex = match &rule.pattern {
                Pattern::Static { regex, .. } => regex,
                Pattern::Backref(source) => {
                    let expanded = substitute_backrefs(source, &frame.captures);
                    match instantiate(&mut self.instantiated, expanded) {
                        Some(regex) => regex,
                        None => continue,
                    }
                }
            };

            let captures = match regex.captures_from_pos(line, pos) {
                Ok(Some(captures)) => captures,
                Ok(None) => continue,
                Err(err) => {
                    warn!(
                        context = %context.name,
                        pattern = rule.pattern.source(),
                        error = %err,
                        "pattern failed at runtime, treating as no match"
                    );
                    continue;
                }
            };
            let Some(whole) = captures.get(0) else {
                continue;
            };
            if whole.end() == pos && rule.action == Action::None {
                continue;
            }

            let groups = (0..captures.len())
                .map(|index| captures.get(index).map(|m| m.start()..m.end()))
                .collect();
            return Some((rule, groups));
        }
        None
    }

    fn prefix_scopes(&self, action: &Action) -> Vec<Scope> {
        let grammar = self.grammar;
        let frames = &self.state.frames;
        let parent = &frames[..frames.len().saturating_sub(1)];

        match action {
            Action::None => content_scopes(grammar, frames),
            Action::Push(targets) => {
                let mut scopes = content_scopes(grammar, frames);
                for target in targets {
                    scopes.extend(grammar.context(*target).meta_scope.iter().cloned());
                }
                scopes
            }
            Action::Pop if frames.len() > 1 => {
                let mut scopes = content_scopes(grammar, parent);
                if let Some(top) = frames.last() {
                    scopes.extend(grammar.context(top.context).meta_scope.iter().cloned());
                }
                scopes
            }
            Action::Pop => content_scopes(grammar, frames),
            Action::Set(targets) => {
                let mut scopes = content_scopes(grammar, parent);
                for target in targets {
                    scopes.extend(grammar.context(*target).meta_scope.iter().cloned());
                }
                scopes
            }
        }
    }

    fn apply_action(
        &mut self,
        action: &Action,
        captured: Vec<Option<String>>,
        offset: usize,
        out: &mut Tokenized,
    ) {
        match action {
            Action::None => {}
            Action::Push(targets) => self.push_all(targets, &captured, offset, out),
            Action::Pop => {
                if self.state.frames.len() > 1 {
                    self.pop(offset, out);
                } else {
                    trace!(offset, "pop at the root context ignored");
                }
            }
            Action::Set(targets) => {
                // The replacement is pushed right away, so the stack is never observed empty.
                self.pop(offset, out);
                self.push_all(targets, &captured, offset, out);
            }
        }
    }

    fn push_all(
        &mut self,
        targets: &[ContextId],
        captured: &[Option<String>],
        offset: usize,
        out: &mut Tokenized,
    ) {
        for target in targets {
            let name = &self.grammar.context(*target).name;
            trace!(context = %name, offset, "push");
            out.events.push(StackEvent {
                offset,
                kind: StackEventKind::Push,
                context: name.clone(),
            });
            self.state.frames.push(Frame {
                context: *target,
                captures: captured.to_vec(),
            });
        }
    }

    fn pop(&mut self, offset: usize, out: &mut Tokenized) {
        if let Some(frame) = self.state.frames.pop() {
            let name = &self.grammar.context(frame.context).name;
            trace!(context = %name, offset, "pop");
            out.events.push(StackEvent {
                offset,
                kind: StackEventKind::Pop,
                context: name.clone(),
            });
        }
    }
}

/// Tokenize `text` from the grammar's `main` context.
pub fn tokenize(grammar: &Grammar, text: &str) -> Tokenized {
    Tokenizer::new(grammar).tokenize(text)
}

fn content_scopes(grammar: &Grammar, frames: &[Frame]) -> Vec<Scope> {
    let mut scopes = vec![grammar.scope().clone()];
    for frame in frames {
        let context = grammar.context(frame.context);
        scopes.extend(context.meta_scope.iter().cloned());
        scopes.extend(context.meta_content_scope.iter().cloned());
    }
    scopes
}

/// Split a match at capture boundaries and emit one token per piece.
fn emit_segments(
    out: &mut Tokenized,
    base: usize,
    whole: &Range<usize>,
    groups: &[Option<Range<usize>>],
    prefix: Vec<Scope>,
    rule: &Rule,
) {
    let mut rule_scopes = prefix;
    rule_scopes.extend(rule.scope.iter().cloned());

    let captures: Vec<(Range<usize>, &[Scope])> = rule
        .captures
        .iter()
        .filter_map(|(group, scopes)| {
            let range = groups.get(*group).cloned().flatten()?;
            let inside = whole.start <= range.start && range.end <= whole.end;
            (inside && !range.is_empty()).then_some((range, scopes.as_slice()))
        })
        .collect();

    let mut cuts = vec![whole.start, whole.end];
    for (range, _) in &captures {
        cuts.push(range.start);
        cuts.push(range.end);
    }
    cuts.sort_unstable();
    cuts.dedup();

    for pair in cuts.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        let mut scopes = rule_scopes.clone();
        for (range, extra) in &captures {
            if range.start <= start && end <= range.end {
                scopes.extend(extra.iter().cloned());
            }
        }
        // Only the base scope: nothing worth reporting.
        if scopes.len() > 1 {
            out.tokens.push(ScopedToken {
                range: base + start..base + end,
                scopes,
            });
        }
    }
}

fn instantiate(cache: &mut HashMap<String, Regex>, source: String) -> Option<&Regex> {
    if !cache.contains_key(&source) {
        match compile_anchored(&source) {
            Ok(regex) => {
                cache.insert(source.clone(), regex);
            }
            Err(err) => {
                warn!(pattern = %source, error = %err, "failed to instantiate backreference pattern");
                return None;
            }
        }
    }
    cache.get(&source)
}

fn next_char_boundary(line: &str, pos: usize) -> usize {
    pos + line[pos..].chars().next().map_or(1, char::len_utf8)
}
