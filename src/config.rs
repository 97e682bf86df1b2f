use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{GrepError, GrepResult};

/// Options governing how lines are matched, mirroring GNU grep's
/// matching-control flags.
///
/// # Configuration Locations
///
/// Options can be loaded from multiple locations in order of precedence:
/// 1. Custom config file passed to [`MatchOptions::load_from`]
/// 2. Local `.linegrep.yaml` in the current directory
/// 3. Global `$HOME/.config/linegrep/options.yaml`
///
/// # Configuration Format
///
/// The configuration uses YAML format. Example:
/// ```yaml
/// # Ignore case distinctions in patterns and input
/// ignore_case: true
///
/// # Select non-matching lines
/// invert_match: false
///
/// # Match only whole words
/// word_regexp: true
/// ```
///
/// # Mutual Exclusion
///
/// `word_regexp` and `line_regexp` are mutually exclusive. Enabling
/// `line_regexp` clears `word_regexp`; enabling `word_regexp` while
/// `line_regexp` is already set has no effect. The conflict is resolved
/// when the options value is constructed, never at match time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchOptions {
    /// Ignore case distinctions, so that characters that differ only in
    /// case match each other (`-i`)
    #[serde(default)]
    pub ignore_case: bool,

    /// Invert the sense of matching, to select non-matching lines (`-v`)
    #[serde(default)]
    pub invert_match: bool,

    /// Select only lines containing matches that form whole words (`-w`).
    /// Has no effect when `line_regexp` is also set.
    #[serde(default)]
    pub word_regexp: bool,

    /// Select only matches that exactly match the whole line (`-x`)
    #[serde(default)]
    pub line_regexp: bool,

    /// Stop after this many selected lines (`-m`). Accepted but not yet
    /// honored by the engine.
    #[serde(default)]
    pub max_count: Option<u64>,

    /// Print the byte offset with output lines (`-b`). Reserved.
    #[serde(default)]
    pub byte_offset: bool,

    /// Print line numbers with output lines (`-n`). Reserved.
    #[serde(default)]
    pub line_number: bool,

    /// Print the file name with output lines (`-H`). Reserved.
    #[serde(default)]
    pub with_filename: bool,

    /// Standard input label for filename prefixing (`--label`). Reserved.
    #[serde(default)]
    pub label: Option<String>,

    /// Treat a data line as ending in a zero byte, not newline (`-z`).
    /// Reserved.
    #[serde(default)]
    pub null_data: bool,

    /// Flush output on every line (`--line-buffered`). Reserved.
    #[serde(default)]
    pub line_buffered: bool,

    /// Suppress all normal output (`-q`). Reserved.
    #[serde(default)]
    pub quiet: bool,
}

impl MatchOptions {
    /// Creates options with every flag unset
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables case-insensitive matching
    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    /// Selects non-matching lines
    pub fn invert_match(mut self) -> Self {
        self.invert_match = true;
        self
    }

    /// Restricts matches to whole words. No-op when whole-line matching
    /// is already enabled.
    pub fn word_regexp(mut self) -> Self {
        if !self.line_regexp {
            self.word_regexp = true;
        }
        self
    }

    /// Restricts matches to whole lines, clearing any whole-word setting
    pub fn line_regexp(mut self) -> Self {
        self.line_regexp = true;
        self.word_regexp = false;
        self
    }

    /// Re-asserts the word/line mutual exclusion on an options value built
    /// by hand or deserialized from a file. Line-regexp wins.
    pub fn resolve(mut self) -> Self {
        if self.line_regexp {
            self.word_regexp = false;
        }
        self
    }

    /// Loads options from the default locations
    pub fn load() -> GrepResult<Self> {
        Self::load_from(None)
    }

    /// Loads options from a specific file, falling back to the default
    /// locations for anything it does not set
    pub fn load_from(config_path: Option<&Path>) -> GrepResult<Self> {
        let mut builder = ConfigBuilder::builder();

        // Default config locations
        let config_files = [
            // Global config
            dirs::config_dir().map(|p| p.join("linegrep/options.yaml")),
            // Local config
            Some(PathBuf::from(".linegrep.yaml")),
            // Custom config
            config_path.map(PathBuf::from),
        ];

        // Add existing config files
        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        let opts: MatchOptions = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| GrepError::config_error(e.to_string()))?;

        Ok(opts.resolve())
    }

    /// Merges caller-supplied overrides into file-loaded options. Set
    /// flags in `overrides` take precedence; the word/line exclusion is
    /// re-resolved on the merged value.
    pub fn merge(mut self, overrides: MatchOptions) -> Self {
        if overrides.ignore_case {
            self.ignore_case = true;
        }
        if overrides.invert_match {
            self.invert_match = true;
        }
        if overrides.word_regexp {
            self.word_regexp = true;
        }
        if overrides.line_regexp {
            self.line_regexp = true;
        }
        if overrides.max_count.is_some() {
            self.max_count = overrides.max_count;
        }
        if overrides.byte_offset {
            self.byte_offset = true;
        }
        if overrides.line_number {
            self.line_number = true;
        }
        if overrides.with_filename {
            self.with_filename = true;
        }
        if overrides.label.is_some() {
            self.label = overrides.label;
        }
        if overrides.null_data {
            self.null_data = true;
        }
        if overrides.line_buffered {
            self.line_buffered = true;
        }
        if overrides.quiet {
            self.quiet = true;
        }
        self.resolve()
    }
}
