//! Main module for cmake-syntax library functionality

pub mod ast;
pub mod error;
pub mod formats;
pub mod formatter;
pub mod grammar;
pub mod lexing;
pub mod parser;
pub mod scope;
pub mod settings;
pub mod syntax_set;
pub mod testing;
pub mod tokenizer;
