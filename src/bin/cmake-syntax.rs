//! Command-line interface for cmake-syntax
//! Tokenizes, parses and formats CMake files.
//!
//! Usage:
//!   cmake-syntax tokenize `<path>` [--format `<format>`] [--grammar `<file>`]  - Print scoped tokens
//!   cmake-syntax parse `<path>`                                              - Print the syntax tree as JSON
//!   cmake-syntax format `<path>` [--check] [--write]                         - Normalize whitespace
//!   cmake-syntax syntaxes                                                  - List bundled grammars
//!
//! A `--config <file>` before the subcommand layers settings over the defaults.
//! Set `RUST_LOG` (e.g. `RUST_LOG=cmake_syntax=trace`) to see tokenizer logs.

use clap::{Arg, ArgAction, ArgMatches, Command};
use cmake_syntax::cmake::formats::FormatRegistry;
use cmake_syntax::cmake::formatter::Formatter;
use cmake_syntax::cmake::parser::parse;
use cmake_syntax::cmake::settings::{Loader, Settings};
use cmake_syntax::{Grammar, SyntaxSet, Tokenizer};
use std::fmt::Display;
use std::fs;
use std::process;
use tracing::warn;

fn main() {
    init_tracing();

    let matches = Command::new("cmake-syntax")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Scope tokenizer, parser and formatter for CMake files")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .help("Configuration file layered over the built-in defaults"),
        )
        .subcommand(
            Command::new("tokenize")
                .about("Print the scoped tokens of a file")
                .arg(
                    Arg::new("path")
                        .help("Path to the CMake file")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format: tag, scopes or json (default from config)"),
                )
                .arg(
                    Arg::new("grammar")
                        .long("grammar")
                        .short('g')
                        .help("Grammar definition to use instead of the bundled ones"),
                ),
        )
        .subcommand(
            Command::new("parse")
                .about("Print the syntax tree of a file as JSON")
                .arg(
                    Arg::new("path")
                        .help("Path to the CMake file")
                        .required(true)
                        .index(1),
                ),
        )
        .subcommand(
            Command::new("format")
                .about("Normalize whitespace in a file")
                .arg(
                    Arg::new("path")
                        .help("Path to the CMake file")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("check")
                        .long("check")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("write")
                        .help("Exit with status 1 if the file is not formatted"),
                )
                .arg(
                    Arg::new("write")
                        .long("write")
                        .short('w')
                        .action(ArgAction::SetTrue)
                        .help("Rewrite the file in place"),
                ),
        )
        .subcommand(Command::new("syntaxes").about("List bundled grammars and their file associations"))
        .get_matches();

    let settings = load_settings(&matches);

    match matches.subcommand() {
        Some(("tokenize", sub)) => handle_tokenize_command(sub, &settings),
        Some(("parse", sub)) => handle_parse_command(required(sub, "path")),
        Some(("format", sub)) => handle_format_command(sub, &settings),
        Some(("syntaxes", _)) => handle_syntaxes_command(),
        _ => unreachable!(),
    }
}

/// Install a stderr subscriber, only when `RUST_LOG` asks for output.
fn init_tracing() {
    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

fn fail(message: impl Display) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .unwrap_or_else(|| fail(format!("missing argument <{}>", name)))
}

fn read_source(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| fail(format!("failed to read {}: {}", path, e)))
}

fn load_settings(matches: &ArgMatches) -> Settings {
    let mut loader = Loader::new();
    if let Some(path) = matches.get_one::<String>("config") {
        loader = loader.with_file(path);
    }
    loader
        .build()
        .unwrap_or_else(|e| fail(format!("invalid configuration: {}", e)))
}

fn handle_tokenize_command(matches: &ArgMatches, settings: &Settings) {
    let path = required(matches, "path");
    let format = matches
        .get_one::<String>("format")
        .cloned()
        .unwrap_or_else(|| settings.tokenize.format.clone());

    let registry = FormatRegistry::with_defaults();
    if !registry.has(&format) {
        fail(format!(
            "unknown format `{}`, available: {}",
            format,
            registry.list_formats().join(", ")
        ));
    }

    let source = read_source(path);
    let syntaxes = SyntaxSet::with_defaults().unwrap_or_else(|e| fail(e));
    let custom;
    let grammar: &Grammar = match matches.get_one::<String>("grammar") {
        Some(grammar_path) => {
            custom = Grammar::load(grammar_path).unwrap_or_else(|e| fail(e));
            &custom
        }
        None => match syntaxes.find_for_path(path) {
            Some(grammar) => grammar,
            None => {
                warn!(path, "no grammar associated with file, using CMake");
                syntaxes
                    .find_by_name("CMake")
                    .unwrap_or_else(|| fail("bundled CMake grammar missing"))
            }
        },
    };

    let tokenized = Tokenizer::new(grammar).tokenize(&source);
    let output = registry
        .serialize(&source, &tokenized, &format)
        .unwrap_or_else(|e| fail(e));
    print!("{}", output);
}

fn handle_parse_command(path: &str) {
    let source = read_source(path);
    let file = parse(&source).unwrap_or_else(|e| fail(format!("{}: {}", path, e)));
    let json = serde_json::to_string_pretty(&file).unwrap_or_else(|e| fail(e));
    println!("{}", json);
}

fn handle_format_command(matches: &ArgMatches, settings: &Settings) {
    let path = required(matches, "path");
    let source = read_source(path);
    let formatter = Formatter::new(settings.formatting.clone());
    let formatted = formatter
        .format(&source)
        .unwrap_or_else(|e| fail(format!("{}: {}", path, e)));

    if matches.get_flag("check") {
        if formatted != source {
            eprintln!("{} is not formatted", path);
            process::exit(1);
        }
        return;
    }

    if matches.get_flag("write") {
        if formatted != source {
            fs::write(path, &formatted)
                .unwrap_or_else(|e| fail(format!("failed to write {}: {}", path, e)));
        }
        return;
    }

    print!("{}", formatted);
}

fn handle_syntaxes_command() {
    let syntaxes = SyntaxSet::with_defaults().unwrap_or_else(|e| fail(e));
    println!("Available syntaxes:\n");
    for grammar in syntaxes.iter() {
        println!("  {} ({})", grammar.name(), grammar.scope());
        println!("    {}", grammar.file_extensions().join(", "));
    }
}
