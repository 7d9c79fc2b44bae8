//! Scenario tests for the bundled CMake grammar
//!
//! Each test tokenizes a short snippet and checks the scopes of the pieces
//! that matter. The fixture test at the bottom runs a whole project file.

use cmake_syntax::cmake::formats::FormatRegistry;
use cmake_syntax::cmake::grammar::builtin;
use cmake_syntax::cmake::testing::{
    assert_tokens, cmake_grammar, events_are_nested, innermost_pairs, texts_with_scope, Fixtures,
};
use cmake_syntax::{tokenize, SyntaxSet};
use rstest::rstest;
use std::time::{Duration, Instant};

#[test]
fn test_set_with_quoted_list() {
    let grammar = cmake_grammar();
    let source = r#"set(x "a;b")"#;
    let result = tokenize(&grammar, source);

    assert_eq!(
        innermost_pairs(source, &result),
        vec![
            ("set", "support.function.cmake"),
            ("(", "punctuation.section.parens.begin.cmake"),
            ("x", "string.unquoted.cmake"),
            ("\"", "punctuation.definition.string.begin.cmake"),
            ("a", "string.quoted.double.cmake"),
            (";", "punctuation.separator.sequence.cmake"),
            ("b", "string.quoted.double.cmake"),
            ("\"", "punctuation.definition.string.end.cmake"),
            (")", "punctuation.section.parens.end.cmake"),
        ]
    );
    assert_tokens(source, &result)
        .token(5, |t| {
            t.has("string.quoted.double");
        })
        .open_contexts(&["main"]);
}

#[test]
fn test_line_comment_spans_to_end_of_line() {
    let grammar = cmake_grammar();
    let source = "# comment\nset(x)";
    let result = tokenize(&grammar, source);

    let comment: Vec<_> = result
        .tokens
        .iter()
        .filter(|t| t.has_scope("comment.line.number-sign"))
        .collect();
    assert_eq!(comment.first().map(|t| t.range.start), Some(0));
    assert_eq!(comment.last().map(|t| t.range.end), Some(9));
    assert_eq!(texts_with_scope(source, &result, "comment").concat(), "# comment");
    assert_eq!(texts_with_scope(source, &result, "support.function"), vec!["set"]);
}

#[test]
fn test_bracket_comment_covers_delimiters_and_body() {
    let grammar = cmake_grammar();
    let source = "#[[ comment ]]";
    let result = tokenize(&grammar, source);

    assert!(result
        .tokens
        .iter()
        .all(|t| t.has_scope("comment.block.bracket")));
    assert_eq!(texts_with_scope(source, &result, "comment.block").concat(), source);
    assert_tokens(source, &result)
        .token(0, |t| {
            t.text("#[[").innermost("punctuation.definition.comment.begin.cmake");
        })
        .token(2, |t| {
            t.text("]]").innermost("punctuation.definition.comment.end.cmake");
        })
        .count(3);
}

#[test]
fn test_multiline_bracket_argument() {
    let grammar = cmake_grammar();
    let source = "file(APPEND out [=[\nline ]] still\n]=])";
    let result = tokenize(&grammar, source);

    assert_eq!(
        texts_with_scope(source, &result, "string.quoted.other.bracket"),
        vec!["[=[", "line ", "]", "]", " still", "]=]"]
    );
    assert_eq!(texts_with_scope(source, &result, "keyword.other"), vec!["APPEND"]);
    assert_eq!(result.open_contexts, vec!["main"]);
}

#[rstest]
#[case::control("if(A)", "if", "keyword.control.cmake")]
#[case::control_uppercase("ENDIF()", "ENDIF", "keyword.control.cmake")]
#[case::builtin("add_library(a)", "add_library", "support.function.cmake")]
#[case::user_command("my_helper(a)", "my_helper", "variable.function.cmake")]
#[case::declaration("function(f)", "function", "keyword.declaration.function.cmake")]
#[case::space_before_paren("message (x)", "message", "support.function.cmake")]
fn test_command_names(#[case] source: &str, #[case] name: &str, #[case] scope: &str) {
    let grammar = cmake_grammar();
    let result = tokenize(&grammar, source);
    assert_tokens(source, &result).token(0, |t| {
        t.text(name).innermost(scope);
    });
}

#[rstest]
#[case::operator("if(NOT A)", "NOT", "keyword.operator.word.cmake")]
#[case::keyword("add_library(a STATIC b)", "STATIC", "keyword.other.cmake")]
#[case::constant("option(A \"\" ON)", "ON", "constant.language.cmake")]
#[case::notfound("set(A FOO-NOTFOUND)", "FOO-NOTFOUND", "constant.language.cmake")]
#[case::number("cmake_minimum_required(VERSION 3.20)", "3.20", "constant.numeric.cmake")]
#[case::plain("set(A NOTHING)", "NOTHING", "string.unquoted.cmake")]
#[case::path_is_not_keyword("set(A src/STATIC)", "src/STATIC", "string.unquoted.cmake")]
fn test_argument_words(#[case] source: &str, #[case] word: &str, #[case] scope: &str) {
    let grammar = cmake_grammar();
    let result = tokenize(&grammar, source);
    let found: Vec<_> = innermost_pairs(source, &result)
        .into_iter()
        .filter(|(text, _)| *text == word)
        .collect();
    assert_eq!(found, vec![(word, scope)]);
}

#[rstest]
#[case::variable("${NAME}", "meta.interpolation.variable", "variable.other.readwrite.cmake")]
#[case::environment("$ENV{HOME}", "meta.interpolation.environment", "variable.other.environment.cmake")]
#[case::cache("$CACHE{NAME}", "meta.interpolation.cache", "variable.other.cache.cmake")]
#[case::make("$(NAME)", "meta.interpolation.make", "variable.other.make.cmake")]
#[case::generator("$<NAME>", "meta.generator-expression", "support.function.generator-expression.cmake")]
fn test_reference_forms(#[case] reference: &str, #[case] meta: &str, #[case] name_scope: &str) {
    let grammar = cmake_grammar();
    let source = format!("message({})", reference);
    let result = tokenize(&grammar, &source);

    assert_eq!(texts_with_scope(&source, &result, meta).concat(), reference);
    let names: Vec<_> = innermost_pairs(&source, &result)
        .into_iter()
        .filter(|(text, _)| *text == "NAME" || *text == "HOME")
        .map(|(_, scope)| scope)
        .collect();
    assert_eq!(names, vec![name_scope]);
    assert_eq!(result.open_contexts, vec!["main"]);
}

#[test]
fn test_references_inside_quotes_and_nesting() {
    let grammar = cmake_grammar();
    let source = r#"message("${A_${B}} $<$<CONFIG:Debug>:x>")"#;
    let result = tokenize(&grammar, source);

    assert!(events_are_nested(&result));
    assert_eq!(
        texts_with_scope(source, &result, "variable.other.readwrite"),
        vec!["A_", "B"]
    );
    assert_eq!(
        texts_with_scope(source, &result, "support.function.generator-expression"),
        vec!["CONFIG"]
    );
    assert_eq!(result.open_contexts, vec!["main"]);
}

#[test]
fn test_escapes() {
    let grammar = cmake_grammar();
    let source = r#"set(A "x\"y\n" a\;b \q)"#;
    let result = tokenize(&grammar, source);

    assert_eq!(
        texts_with_scope(source, &result, "constant.character.escape"),
        vec![r#"\""#, r"\n", r"\;"]
    );
    assert_eq!(
        texts_with_scope(source, &result, "invalid.illegal.escape"),
        vec![r"\q"]
    );
}

#[test]
fn test_unterminated_quote_reports_open_contexts() {
    let grammar = cmake_grammar();
    let result = tokenize(&grammar, "set(x \"never closed\n");
    assert_eq!(result.open_contexts, vec!["main", "arguments", "quoted_argument"]);
}

#[test]
fn test_function_definition_name() {
    let grammar = cmake_grammar();
    let source = "function(add_things a b)";
    let result = tokenize(&grammar, source);
    assert_eq!(
        texts_with_scope(source, &result, "entity.name.function"),
        vec!["add_things"]
    );
    assert_eq!(texts_with_scope(source, &result, "string.unquoted"), vec!["a", "b"]);
    assert_eq!(result.open_contexts, vec!["main"]);
}

#[test]
fn test_cache_grammar_entries() {
    let grammar = builtin::cmake_cache().unwrap();
    let source = "//Choose the type\nCMAKE_BUILD_TYPE:STRING=Debug\n";
    let result = tokenize(&grammar, source);

    assert_eq!(
        innermost_pairs(source, &result),
        vec![
            ("//", "punctuation.definition.comment.cmakecache"),
            ("Choose the type", "comment.line.double-slash.cmakecache"),
            ("CMAKE_BUILD_TYPE", "variable.other.cache.cmakecache"),
            (":", "punctuation.separator.type.cmakecache"),
            ("STRING", "storage.type.cmakecache"),
            ("=", "keyword.operator.assignment.cmakecache"),
            ("Debug", "string.unquoted.value.cmakecache"),
        ]
    );
}

#[test]
fn test_fixture_project_tokenizes_cleanly() {
    let source = Fixtures::get_string("CMakeLists.txt").unwrap();
    let syntaxes = SyntaxSet::with_defaults().unwrap();
    let grammar = syntaxes
        .find_for_path(Fixtures::path("CMakeLists.txt"))
        .unwrap();
    let result = tokenize(grammar, &source);

    assert!(events_are_nested(&result));
    assert_eq!(result.open_contexts, vec!["main"]);
    assert!(texts_with_scope(&source, &result, "entity.name.function").contains(&"demo_add_target"));
    assert!(texts_with_scope(&source, &result, "variable.function").contains(&"demo_add_target"));
    let bracket = texts_with_scope(&source, &result, "string.quoted.other.bracket").concat();
    assert_eq!(bracket, "[==[\n  raw ]] text ]=] kept\n]==]".replace('\n', ""));
}

#[test]
fn test_long_argument_line_tokenizes_in_linear_time() {
    let grammar = cmake_grammar();
    let source = format!("set(SOURCES{})", " a.cpp".repeat(1500));

    let started = Instant::now();
    let result = tokenize(&grammar, &source);
    let elapsed = started.elapsed();

    assert!(
        elapsed < Duration::from_secs(20),
        "9 KB line took {:?}",
        elapsed
    );
    assert_eq!(texts_with_scope(&source, &result, "keyword.other"), vec!["SOURCES"]);
    assert_eq!(texts_with_scope(&source, &result, "string.unquoted").len(), 1500);
    assert_eq!(result.open_contexts, vec!["main"]);
}

#[test]
fn test_tag_output_snapshot() {
    let grammar = cmake_grammar();
    let source = "if(NOT ${A})";
    let result = tokenize(&grammar, source);
    let output = FormatRegistry::with_defaults()
        .serialize(source, &result, "tag")
        .unwrap();

    insta::assert_snapshot!(output.trim_end(), @r###"
    0..2 keyword.control.cmake "if"
    2..3 punctuation.section.parens.begin.cmake "("
    3..6 keyword.operator.word.cmake "NOT"
    7..9 punctuation.definition.variable.begin.cmake "${"
    9..10 variable.other.readwrite.cmake "A"
    10..11 punctuation.definition.variable.end.cmake "}"
    11..12 punctuation.section.parens.end.cmake ")"
    "###);
}
