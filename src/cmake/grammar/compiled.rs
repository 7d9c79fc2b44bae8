//! Compiled grammar table
//!
//!     Contexts are stored in a flat table and addressed by [ContextId]. Rule
//!     actions refer to contexts by id, so the tokenizer never looks up names
//!     at match time. Includes and the `prototype` context are inlined here;
//!     anonymous contexts written inline under `push`/`set` get their own
//!     table slot.
//!
//!     Patterns are compiled with `fancy-regex` since grammar rules lean on
//!     lookaround. Every pattern is wrapped as `\G(?:...)` so it can only match
//!     at the offset the search starts from, while lookbehind still sees the
//!     text before that offset. A pattern that refers back to the captures of
//!     the match that pushed its context (`\1` .. `\9`) cannot be compiled up
//!     front; it is kept as source and instantiated by the tokenizer when the
//!     context is entered.

use super::definition::{RawContextItem, RawContextRef, RawGrammar, RawMatchRule};
use super::variables::Variables;
use crate::cmake::error::GrammarError;
use crate::cmake::scope::Scope;
use fancy_regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

const PROTOTYPE: &str = "prototype";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(usize);

impl ContextId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A rule's pattern, either compiled or waiting for the captures it refers to.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Anchored regex plus the pattern as written in the grammar.
    Static { regex: Regex, source: String },
    /// Pattern source containing references to the pushing match's captures.
    Backref(String),
}

impl Pattern {
    fn compile(source: &str, context: &str) -> Result<Self, GrammarError> {
        if has_backrefs(source) {
            // Validate the syntax now with every reference bound to the empty string.
            compile_regex(&substitute_backrefs(source, &[]), context)?;
            Ok(Pattern::Backref(source.to_string()))
        } else {
            Ok(Pattern::Static {
                regex: compile_regex(source, context)?,
                source: source.to_string(),
            })
        }
    }

    /// The pattern as written in the grammar, after variable expansion.
    pub fn source(&self) -> &str {
        match self {
            Pattern::Static { source, .. } => source,
            Pattern::Backref(source) => source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    /// Push contexts in order; the last one ends up on top.
    Push(Vec<ContextId>),
    /// Pop the current context, then push.
    Set(Vec<ContextId>),
    Pop,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: Pattern,
    pub scope: Vec<Scope>,
    /// Capture group index to the scopes applied to that group's text.
    pub captures: Vec<(usize, Vec<Scope>)>,
    pub action: Action,
}

#[derive(Debug, Clone)]
pub struct Context {
    pub name: String,
    pub meta_scope: Vec<Scope>,
    pub meta_content_scope: Vec<Scope>,
    pub rules: Vec<Rule>,
}

impl Context {
    fn placeholder(name: &str) -> Self {
        Context {
            name: name.to_string(),
            meta_scope: Vec::new(),
            meta_content_scope: Vec::new(),
            rules: Vec::new(),
        }
    }
}

/// An immutable, compiled grammar.
#[derive(Debug, Clone)]
pub struct Grammar {
    name: String,
    scope: Scope,
    file_extensions: Vec<String>,
    hidden: bool,
    contexts: Vec<Context>,
    by_name: HashMap<String, ContextId>,
    main: ContextId,
}

impl Grammar {
    /// Parse and compile a YAML grammar definition.
    pub fn from_yaml(text: &str) -> Result<Self, GrammarError> {
        let raw = RawGrammar::from_yaml(text)?;
        Self::compile(&raw)
    }

    /// Read a grammar definition from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GrammarError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| GrammarError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Resolve contexts, inline includes and compile every pattern.
    pub fn compile(raw: &RawGrammar) -> Result<Self, GrammarError> {
        Compiler::new(raw)?.run()
    }

    /// Display name, e.g. `CMake`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base scope applied to every token, e.g. `source.cmake`.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// File names and extensions this grammar is associated with.
    pub fn file_extensions(&self) -> &[String] {
        &self.file_extensions
    }

    /// Value of the definition's `hidden` key.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// The context every tokenizer starts in.
    pub fn main(&self) -> ContextId {
        self.main
    }

    /// Context by id. Ids come from this grammar, so the lookup cannot miss.
    pub fn context(&self, id: ContextId) -> &Context {
        &self.contexts[id.0]
    }

    /// Look up a named context. Anonymous contexts are not registered by name.
    pub fn context_id(&self, name: &str) -> Option<ContextId> {
        self.by_name.get(name).copied()
    }

    /// All contexts, anonymous ones included, in id order.
    pub fn contexts(&self) -> &[Context] {
        &self.contexts
    }
}

#[derive(Debug, Default)]
struct Meta {
    meta_scope: Vec<Scope>,
    meta_content_scope: Vec<Scope>,
    include_prototype: bool,
}

fn collect_meta(items: &[RawContextItem]) -> Meta {
    let mut meta = Meta {
        include_prototype: true,
        ..Meta::default()
    };
    for item in items {
        if let RawContextItem::Meta(raw) = item {
            if let Some(scope) = &raw.meta_scope {
                meta.meta_scope.extend(Scope::parse_list(scope));
            }
            if let Some(scope) = &raw.meta_content_scope {
                meta.meta_content_scope.extend(Scope::parse_list(scope));
            }
            if let Some(include) = raw.meta_include_prototype {
                meta.include_prototype = include;
            }
        }
    }
    meta
}

struct Compiler<'a> {
    raw: &'a RawGrammar,
    variables: Variables,
    ids: HashMap<String, ContextId>,
    contexts: Vec<Context>,
    rule_cache: HashMap<String, Vec<Rule>>,
    including: Vec<String>,
    prototype: Option<Vec<Rule>>,
    anonymous: usize,
}

impl<'a> Compiler<'a> {
    fn new(raw: &'a RawGrammar) -> Result<Self, GrammarError> {
        if !raw.contexts.contains_key("main") {
            return Err(GrammarError::MissingMain(raw.name.clone()));
        }
        let variables = Variables::resolve(&raw.variables)?;
        let ids = raw
            .contexts
            .keys()
            .enumerate()
            .map(|(index, name)| (name.clone(), ContextId(index)))
            .collect();
        let contexts = raw.contexts.keys().map(|n| Context::placeholder(n)).collect();

        Ok(Self {
            raw,
            variables,
            ids,
            contexts,
            rule_cache: HashMap::new(),
            including: Vec::new(),
            prototype: None,
            anonymous: 0,
        })
    }

    fn run(mut self) -> Result<Grammar, GrammarError> {
        let raw = self.raw;
        if raw.contexts.contains_key(PROTOTYPE) {
            let rules = self.rules_of(PROTOTYPE, PROTOTYPE)?;
            self.prototype = Some(rules);
        }

        for (name, items) in &raw.contexts {
            let meta = collect_meta(items);
            let mut rules = match &self.prototype {
                Some(prototype) if meta.include_prototype && name != PROTOTYPE => {
                    prototype.clone()
                }
                _ => Vec::new(),
            };
            rules.extend(self.rules_of(name, name)?);

            let id = self.lookup(name, name)?;
            self.contexts[id.0] = Context {
                name: name.clone(),
                meta_scope: meta.meta_scope,
                meta_content_scope: meta.meta_content_scope,
                rules,
            };
        }

        let main = self.lookup("main", "main")?;
        debug!(
            grammar = %raw.name,
            contexts = self.contexts.len(),
            "compiled grammar"
        );

        Ok(Grammar {
            name: raw.name.clone(),
            scope: Scope::new(raw.scope.as_str()),
            file_extensions: raw.file_extensions.clone(),
            hidden: raw.hidden,
            contexts: self.contexts,
            by_name: self.ids,
            main,
        })
    }

    fn lookup(&self, name: &str, from: &str) -> Result<ContextId, GrammarError> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| GrammarError::UnknownContext {
                name: name.to_string(),
                from: from.to_string(),
            })
    }

    /// Rules of a named context with includes inlined, excluding the prototype.
    fn rules_of(&mut self, name: &str, from: &str) -> Result<Vec<Rule>, GrammarError> {
        if let Some(rules) = self.rule_cache.get(name) {
            return Ok(rules.clone());
        }
        if self.including.iter().any(|n| n == name) {
            return Err(GrammarError::RecursiveInclude(name.to_string()));
        }
        let raw = self.raw;
        let items = raw
            .contexts
            .get(name)
            .ok_or_else(|| GrammarError::UnknownContext {
                name: name.to_string(),
                from: from.to_string(),
            })?;

        self.including.push(name.to_string());
        let rules = self.compile_items(name, items)?;
        self.including.pop();

        self.rule_cache.insert(name.to_string(), rules.clone());
        Ok(rules)
    }

    fn compile_items(
        &mut self,
        context: &str,
        items: &'a [RawContextItem],
    ) -> Result<Vec<Rule>, GrammarError> {
        let mut rules = Vec::new();
        for item in items {
            match item {
                RawContextItem::Meta(_) => {}
                RawContextItem::Include(include) => {
                    rules.extend(self.rules_of(&include.include, context)?);
                }
                RawContextItem::Match(rule) => rules.push(self.compile_rule(context, rule)?),
            }
        }
        Ok(rules)
    }

    fn compile_rule(
        &mut self,
        context: &str,
        raw: &'a RawMatchRule,
    ) -> Result<Rule, GrammarError> {
        let source = self.variables.expand(&raw.pattern, context)?;
        let pattern = Pattern::compile(&source, context)?;

        let action = match (&raw.push, &raw.set, raw.pop) {
            (None, None, false) => Action::None,
            (None, None, true) => Action::Pop,
            (Some(target), None, false) => Action::Push(self.resolve_targets(context, target)?),
            (None, Some(target), false) => Action::Set(self.resolve_targets(context, target)?),
            _ => return Err(GrammarError::ConflictingActions(context.to_string())),
        };

        Ok(Rule {
            pattern,
            scope: raw
                .scope
                .as_deref()
                .map(Scope::parse_list)
                .unwrap_or_default(),
            captures: raw
                .captures
                .iter()
                .map(|(group, scope)| (*group, Scope::parse_list(scope)))
                .collect(),
            action,
        })
    }

    fn resolve_targets(
        &mut self,
        context: &str,
        target: &'a RawContextRef,
    ) -> Result<Vec<ContextId>, GrammarError> {
        match target {
            RawContextRef::Named(name) => Ok(vec![self.lookup(name, context)?]),
            RawContextRef::Stacked(names) => names
                .iter()
                .map(|name| self.lookup(name, context))
                .collect(),
            RawContextRef::Anonymous(items) => Ok(vec![self.compile_anonymous(context, items)?]),
        }
    }

    fn compile_anonymous(
        &mut self,
        parent: &str,
        items: &'a [RawContextItem],
    ) -> Result<ContextId, GrammarError> {
        let name = format!("{}#anon{}", parent, self.anonymous);
        self.anonymous += 1;

        // Reserve the slot first so nested anonymous contexts get later ids.
        let id = ContextId(self.contexts.len());
        self.contexts.push(Context::placeholder(&name));

        let meta = collect_meta(items);
        let mut rules = match &self.prototype {
            Some(prototype) if meta.include_prototype => prototype.clone(),
            _ => Vec::new(),
        };
        rules.extend(self.compile_items(&name, items)?);

        self.contexts[id.0] = Context {
            name,
            meta_scope: meta.meta_scope,
            meta_content_scope: meta.meta_content_scope,
            rules,
        };
        Ok(id)
    }
}

fn compile_regex(source: &str, context: &str) -> Result<Regex, GrammarError> {
    compile_anchored(source).map_err(|err| GrammarError::InvalidPattern {
        context: context.to_string(),
        pattern: source.to_string(),
        message: err.to_string(),
    })
}

/// Compile a rule pattern so it only matches where the search starts.
///
/// With `captures_from_pos(line, pos)` a failed rule gives up at `pos`
/// instead of scanning the rest of the line.
pub fn compile_anchored(source: &str) -> Result<Regex, fancy_regex::Error> {
    Regex::new(&anchor(source))
}

fn anchor(source: &str) -> String {
    // A leading `(?x)` turns `#` into a comment that would swallow the `)`.
    if extended_from_start(source) {
        format!("\\G(?:{}\n)", source)
    } else {
        format!("\\G(?:{})", source)
    }
}

fn extended_from_start(source: &str) -> bool {
    let Some(rest) = source.strip_prefix("(?") else {
        return false;
    };
    let flags = rest.split(')').next().unwrap_or_default();
    !flags.contains(':') && flags.split('-').next().is_some_and(|on| on.contains('x'))
}

/// True when the pattern refers to a capture group with `\1` .. `\9`.
pub fn has_backrefs(pattern: &str) -> bool {
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some('1'..='9') = chars.next() {
                return true;
            }
        }
    }
    false
}

/// Replace `\1` .. `\9` with the escaped text of the given captures.
///
/// Missing or non-participating groups become the empty string.
pub fn substitute_backrefs(pattern: &str, captures: &[Option<String>]) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(digit @ '1'..='9') => {
                let group = digit as usize - '0' as usize;
                if let Some(Some(text)) = captures.get(group) {
                    out.push_str(&regex::escape(text));
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
