//! Declarative grammar tables
//!
//!     A grammar is data, not code. It is written as YAML in the shape of a
//!     `.sublime-syntax` file: named contexts holding ordered lists of rules,
//!     plus a table of regex fragments (variables) spliced into patterns.
//!
//! Loading Stages
//!
//!     definition: serde types mirroring the YAML document.
//!     variables:  `{{name}}` macro expansion over pattern strings.
//!     compiled:   context ids resolved, includes and the prototype inlined,
//!                 every pattern compiled. The result is immutable.
//!
//!     The built-in CMake and CMakeCache grammars are embedded in the binary,
//!     see [builtin].

pub mod builtin;
pub mod compiled;
pub mod definition;
pub mod variables;

pub use crate::cmake::error::GrammarError;
pub use compiled::{Action, Context, ContextId, Grammar, Pattern, Rule};
pub use definition::RawGrammar;
