//! User-facing completion settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Completion settings, usually read from the editor's settings file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionOptions {
    /// Offer free functions that accept the receiver as member completions
    pub enable_ufcs_completion: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            enable_ufcs_completion: true,
        }
    }
}

impl CompletionOptions {
    /// Parse options from TOML text; missing keys keep their defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or a key has the wrong type.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse completion options")
    }

    /// Load options from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read completion options: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse completion options: {}", path.display()))
    }
}
