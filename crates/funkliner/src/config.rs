//! `funkliner.toml` loading

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use funkliner_transform::InlineOptions;
use serde::Deserialize;

use crate::OutputFormat;

pub const CONFIG_FILE: &str = "funkliner.toml";

/// Settings read from `funkliner.toml`. Missing keys fall back to the
/// inliner's defaults; command-line flags override both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub inline: InlineSection,
    pub output: OutputSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InlineSection {
    pub passes: Option<usize>,
    pub max_unroll: Option<usize>,
    pub max_expansions: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    pub format: Option<OutputFormat>,
    /// Print hint diagnostics as well as warnings and errors
    pub show_hints: bool,
}

impl Config {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid funkliner configuration")
    }

    /// Read `explicit` if given, otherwise `./funkliner.toml` if it exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path,
            None if Path::new(CONFIG_FILE).is_file() => Path::new(CONFIG_FILE),
            None => return Ok(Self::default()),
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        log::debug!("using configuration from {}", path.display());
        Self::parse(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Inliner options with `passes` from the command line taking precedence.
    pub fn inline_options(&self, passes: Option<usize>) -> InlineOptions {
        let defaults = InlineOptions::default();
        InlineOptions {
            max_unroll: self.inline.max_unroll.unwrap_or(defaults.max_unroll),
            max_expansions: self.inline.max_expansions.unwrap_or(defaults.max_expansions),
            max_passes: passes.or(self.inline.passes).unwrap_or(defaults.max_passes),
        }
    }
}
