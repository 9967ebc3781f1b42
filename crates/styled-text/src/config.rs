//! Buffer configuration.
//!
//! [`TextConfig`] collects the per-buffer knobs: undo depth, illegal character handling and
//! paragraph reflow. Every field has a default, so a JSON document only needs to name the
//! values it changes:
//!
//! ```rust
//! use styled_text::{IllegalCharPolicy, TextConfig, UndoMode};
//!
//! let config = TextConfig::from_json_str(r#"{
//!     "undo": { "mode": "multi", "depth": 20 },
//!     "illegal_chars": "reject",
//!     "reflow": {
//!         "line_width": 72,
//!         "rules": [ { "first": "[ \\t]*>[ \\t>]*", "rest": "[ \\t]*>[ \\t>]*", "replace": "$0" } ]
//!     }
//! }"#).unwrap();
//!
//! assert_eq!(config.undo, UndoMode::Multi { depth: 20 });
//! assert_eq!(config.illegal_chars, IllegalCharPolicy::Reject);
//! assert_eq!(config.reflow.line_width, 72);
//! assert_eq!(config.reflow.tab_char_count, 8);
//! ```

use crate::error::ConfigError;
use crate::reflow::ReflowRule;
use crate::undo::UndoMode;
use serde::{Deserialize, Serialize};

/// Default reflow line width, in columns.
pub const DEFAULT_LINE_WIDTH: usize = 75;
/// Default number of columns per tab stop.
pub const DEFAULT_TAB_CHAR_COUNT: usize = 8;

/// What to do with control characters other than tab, newline and form feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IllegalCharPolicy {
    /// Remove them and report that the text was cleaned.
    #[default]
    Strip,
    /// Refuse the whole edit.
    Reject,
}

/// A reflow prefix rule as written in configuration.
///
/// `first` matches the prefix of a paragraph's first line, `rest` the prefix of its
/// continuation lines, and `replace` turns a `first` prefix into the `rest` prefix (it may
/// reference capture groups of `first`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflowRuleConfig {
    /// Pattern for the first line's prefix.
    pub first: String,
    /// Pattern for continuation line prefixes.
    pub rest: String,
    /// Replacement applied to the first prefix to build continuation prefixes.
    pub replace: String,
}

/// Paragraph reflow settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflowConfig {
    /// Target line width in columns.
    pub line_width: usize,
    /// Columns per tab stop.
    pub tab_char_count: usize,
    /// Ordered prefix rules.
    pub rules: Vec<ReflowRuleConfig>,
}

impl Default for ReflowConfig {
    fn default() -> Self {
        Self {
            line_width: DEFAULT_LINE_WIDTH,
            tab_char_count: DEFAULT_TAB_CHAR_COUNT,
            rules: Vec::new(),
        }
    }
}

impl ReflowConfig {
    /// Compile the configured rules.
    pub fn compile_rules(&self) -> Result<Vec<ReflowRule>, ConfigError> {
        self.rules
            .iter()
            .enumerate()
            .map(|(index, rule)| {
                ReflowRule::new(&rule.first, &rule.rest, &rule.replace)
                    .map_err(|source| ConfigError::InvalidRule { index, source })
            })
            .collect()
    }
}

/// Settings for a [`StyledText`](crate::StyledText).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Undo history depth.
    pub undo: UndoMode,
    /// Handling of illegal control characters.
    pub illegal_chars: IllegalCharPolicy,
    /// Indent with spaces instead of tab characters.
    pub tab_to_spaces: bool,
    /// Paragraph reflow settings.
    pub reflow: ReflowConfig,
}

impl TextConfig {
    /// Parse a configuration from JSON and check that its reflow rules compile.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: TextConfig = serde_json::from_str(json)?;
        config.reflow.compile_rules()?;
        Ok(config)
    }
}
