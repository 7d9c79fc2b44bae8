//! Configuration loading.
//!
//! `defaults/cmake-syntax.default.toml` is embedded into the crate so the
//! documented defaults and runtime behavior cannot drift apart. Callers layer
//! user files and single-key overrides on top with [Loader] before
//! deserializing into [Settings].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../../defaults/cmake-syntax.default.toml");

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub formatting: FormattingConfig,
    pub tokenize: TokenizeConfig,
}

/// Knobs of the source formatter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FormattingConfig {
    pub max_blank_lines: usize,
    pub max_blank_lines_in_arguments: usize,
    pub space_before_paren: SpaceBeforeParen,
    pub final_newline: bool,
}

impl Default for FormattingConfig {
    fn default() -> Self {
        FormattingConfig {
            max_blank_lines: 3,
            max_blank_lines_in_arguments: 1,
            space_before_paren: SpaceBeforeParen::Single,
            final_newline: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpaceBeforeParen {
    Preserve,
    Single,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenizeConfig {
    /// Name of a registered token format.
    pub format: String,
}

impl Default for TokenizeConfig {
    fn default() -> Self {
        TokenizeConfig {
            format: "tag".to_string(),
        }
    }
}

/// Layers user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files are an error at build time.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer a configuration file if it exists.
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override, e.g. from a command-line flag.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Merge every layer over the embedded defaults.
    pub fn build(self) -> Result<Settings, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Settings from the embedded defaults alone.
pub fn load_defaults() -> Result<Settings, ConfigError> {
    Loader::new().build()
}
