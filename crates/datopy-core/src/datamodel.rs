//! Auto-generated data models for retrieved records
//!
//! [`extract_datamodel`] bundles everything needed to get acquainted with an
//! unfamiliar record: its type tree, a draft JSON Schema, a string-rendered
//! copy, and a flattened table row. [`save_datamodel`] writes the bundle to
//! an output directory.

use serde_json::{Map, Value};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::modeling::{schema_jsonify, stringify, type_tree_with_limit, ARRAY_SAMPLE_LIMIT};
use crate::normalize::{json_normalize, write_csv};

/// Search terms for a metadata lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// A film, by title
    Film {
        /// Film title
        title: String,
    },
    /// An album, by artist and title
    Album {
        /// Recording artist
        artist: String,
        /// Album title
        title: String,
    },
    /// A book, by title
    Book {
        /// Book title
        title: String,
    },
}

impl Query {
    /// Medium name used in output file names
    pub fn medium(&self) -> &'static str {
        match self {
            Self::Film { .. } => "film",
            Self::Album { .. } => "album",
            Self::Book { .. } => "book",
        }
    }

    /// Title of the requested item
    pub fn title(&self) -> &str {
        match self {
            Self::Film { title } | Self::Album { title, .. } | Self::Book { title } => title,
        }
    }

    /// Lowercased title with spaces replaced by underscores
    pub fn slug(&self) -> String {
        self.title().to_lowercase().replace(' ', "_")
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Film { title } => write!(f, "Film(title='{title}')"),
            Self::Album { artist, title } => {
                write!(f, "Album(artist='{artist}', title='{title}')")
            }
            Self::Book { title } => write!(f, "Book(title='{title}')"),
        }
    }
}

/// Fields compared against a query title, in order
const TITLE_FIELDS: [&str; 2] = ["title", "name"];

/// Pick the first record whose title matches the query, ignoring case
pub fn select_record<'a>(records: &'a [Value], query: &Query) -> Result<&'a Value> {
    let wanted = query.title().trim().to_lowercase();
    records
        .iter()
        .find(|record| {
            TITLE_FIELDS
                .iter()
                .filter_map(|field| record.get(*field).and_then(Value::as_str))
                .any(|title| title.trim().to_lowercase() == wanted)
        })
        .ok_or_else(|| Error::LookupFailed {
            query: query.to_string(),
        })
}

/// Data dictionary elements extracted from a single record
#[derive(Debug, Clone)]
pub struct DataModel {
    /// The record as retrieved
    pub record: Value,
    /// Field/type pairs
    pub type_tree: Value,
    /// Draft JSON Schema generated from the type tree
    pub json_schema: Value,
    /// String-rendered record, pretty-printed
    pub serialized: String,
    /// Flattened string-rendered record
    pub normalized: Map<String, Value>,
}

/// Extract a data model using the default array sample limit
pub fn extract_datamodel(record: &Value) -> Result<DataModel> {
    extract_datamodel_with_limit(record, ARRAY_SAMPLE_LIMIT)
}

/// Extract a data model, sampling at most `limit` elements of each array
pub fn extract_datamodel_with_limit(record: &Value, limit: usize) -> Result<DataModel> {
    let type_tree = type_tree_with_limit(record, limit);
    let json_schema = schema_jsonify(&type_tree);
    let rendered = stringify(record);
    let serialized = to_pretty_json(&rendered)?;
    let normalized = json_normalize(&rendered);

    tracing::debug!(
        fields = normalized.len(),
        "extracted data model from record"
    );

    Ok(DataModel {
        record: record.clone(),
        type_tree,
        json_schema,
        serialized,
        normalized,
    })
}

fn to_pretty_json(value: &Value) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    serde::Serialize::serialize(value, &mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Paths written by [`save_datamodel`]
#[derive(Debug, Clone)]
pub struct SavedDataModel {
    /// `{source}_{medium}_schema.json`
    pub type_tree: PathBuf,
    /// `{source}_{medium}_json_schema.json`
    pub json_schema: PathBuf,
    /// `{source}_{slug}_obj.json`
    pub record: PathBuf,
    /// `{source}_{slug}_df.csv`
    pub table: PathBuf,
}

/// Save a data model's type tree, schema, rendered record, and table row
pub fn save_datamodel(
    model: &DataModel,
    source: &str,
    query: &Query,
    out_dir: impl AsRef<Path>,
) -> Result<SavedDataModel> {
    let out_dir = out_dir.as_ref();
    std::fs::create_dir_all(out_dir)?;

    let medium = query.medium();
    let slug = query.slug();

    let saved = SavedDataModel {
        type_tree: out_dir.join(format!("{source}_{medium}_schema.json")),
        json_schema: out_dir.join(format!("{source}_{medium}_json_schema.json")),
        record: out_dir.join(format!("{source}_{slug}_obj.json")),
        table: out_dir.join(format!("{source}_{slug}_df.csv")),
    };

    std::fs::write(&saved.type_tree, to_pretty_json(&model.type_tree)?)?;
    std::fs::write(&saved.json_schema, to_pretty_json(&model.json_schema)?)?;
    std::fs::write(&saved.record, &model.serialized)?;
    write_csv(
        std::slice::from_ref(&model.normalized),
        File::create(&saved.table)?,
    )?;

    tracing::info!(
        source,
        query = %query,
        dir = %out_dir.display(),
        "saved data model"
    );

    Ok(saved)
}
