//! Grammars shipped with the crate.
//!
//! The YAML sources are embedded at build time so the binary needs no data
//! files. Compilation still happens at runtime and can fail only if a bundled
//! definition is broken, which the tests below guard against.

use super::compiled::Grammar;
use crate::cmake::error::GrammarError;

pub const CMAKE_SOURCE: &str = include_str!("../../../grammars/CMake.sublime-syntax");
pub const CMAKE_CACHE_SOURCE: &str = include_str!("../../../grammars/CMakeCache.sublime-syntax");

/// Grammar for `CMakeLists.txt` and `*.cmake` files.
pub fn cmake() -> Result<Grammar, GrammarError> {
    Grammar::from_yaml(CMAKE_SOURCE)
}

/// Grammar for `CMakeCache.txt`.
pub fn cmake_cache() -> Result<Grammar, GrammarError> {
    Grammar::from_yaml(CMAKE_CACHE_SOURCE)
}

/// Every bundled grammar, in registration order.
pub fn all() -> Result<Vec<Grammar>, GrammarError> {
    Ok(vec![cmake()?, cmake_cache()?])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmake_grammar_compiles() {
        let grammar = cmake().unwrap();
        assert_eq!(grammar.name(), "CMake");
        assert_eq!(grammar.scope().as_str(), "source.cmake");
        assert_eq!(grammar.file_extensions(), ["CMakeLists.txt", "cmake"]);
        for name in [
            "main",
            "arguments",
            "quoted_argument",
            "bracket_argument",
            "bracket_comment",
            "line_comment",
            "variable_reference",
            "environment_reference",
            "generator_expression",
        ] {
            assert!(grammar.context_id(name).is_some(), "missing context {}", name);
        }
    }

    #[test]
    fn test_cmake_cache_grammar_compiles() {
        let grammar = cmake_cache().unwrap();
        assert_eq!(grammar.name(), "CMakeCache");
        assert_eq!(grammar.file_extensions(), ["CMakeCache.txt"]);
    }

    #[test]
    fn test_all_returns_both() {
        let names: Vec<_> = all()
            .unwrap()
            .iter()
            .map(|g| g.name().to_string())
            .collect();
        assert_eq!(names, vec!["CMake", "CMakeCache"]);
    }
}
