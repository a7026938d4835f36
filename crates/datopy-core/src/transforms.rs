//! Processing step configuration
//!
//! Processing steps clean up raw records before they are checked against a
//! model. Steps are declared in a processor file and applied in order by
//! [`crate::interpreter`].
//!
//! # Built-in Steps
//!
//! - `map` - Copy a source field to a target field
//! - `drop` - Remove fields
//! - `add_fields` - Add static fields
//! - `coalesce` - Use first non-null value
//! - `omit_patterns` - Strip literal substrings from a string field
//! - `regex` - Extract capture groups into new fields
//! - `index_items` - Index array fields by 1-based position
//! - `flatten` - Flatten nested objects into dotted keys
//!
//! # Example
//!
//! ```yaml
//! transforms:
//!   - map:
//!       director: director.1.name
//!
//!   - omit_patterns:
//!       field: genre
//!       patterns: ["[[", "]]", "* "]
//!
//!   - drop:
//!       - available_markets
//! ```

use serde::{Deserialize, Serialize};
use indexmap::IndexMap;

/// Regex step configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegexConfig {
    /// Source field to match against
    pub field: String,
    /// Regex pattern (with optional named capture groups)
    pub pattern: String,
    /// Capture group mappings: output_field -> group (index or name)
    pub captures: IndexMap<String, String>,
    /// Behavior when the pattern doesn't match
    #[serde(default)]
    pub on_no_match: OnNoMatch,
}

/// What a regex step does when its pattern doesn't match
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OnNoMatch {
    /// Set every capture output to null
    #[default]
    Null,
    /// Leave the record untouched
    Skip,
    /// Fail the record
    Error,
}

/// Omit-patterns step configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OmitPatternsConfig {
    /// String field to clean
    pub field: String,
    /// Literal substrings to remove
    pub patterns: Vec<String>,
}

/// Processing step configuration from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransformConfig {
    /// Field mapping: target <- source path (dotted for nested fields)
    Map {
        /// Field mappings
        map: IndexMap<String, String>,
    },

    /// Drop specified fields
    Drop {
        /// Fields to drop
        drop: Vec<String>,
    },

    /// Add static fields
    AddFields {
        /// Fields to add
        add_fields: IndexMap<String, serde_json::Value>,
    },

    /// Coalesce: use first non-null value from list
    Coalesce {
        /// Coalesce mappings
        coalesce: IndexMap<String, Vec<String>>,
    },

    /// Strip literal substrings from a string field
    OmitPatterns {
        /// Omit-patterns configuration
        omit_patterns: OmitPatternsConfig,
    },

    /// Regex pattern matching and capture extraction
    Regex {
        /// Regex configuration
        regex: RegexConfig,
    },

    /// Index array fields by 1-based position
    IndexItems {
        /// Array fields to index
        index_items: Vec<String>,
    },

    /// Flatten nested objects into dotted keys
    Flatten {
        /// Whether to flatten
        flatten: bool,
    },
}

impl TransformConfig {
    /// Short step name, used in errors and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Map { .. } => "map",
            Self::Drop { .. } => "drop",
            Self::AddFields { .. } => "add_fields",
            Self::Coalesce { .. } => "coalesce",
            Self::OmitPatterns { .. } => "omit_patterns",
            Self::Regex { .. } => "regex",
            Self::IndexItems { .. } => "index_items",
            Self::Flatten { .. } => "flatten",
        }
    }
}
