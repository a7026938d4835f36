//! Raw record validation against JSON Schemas
//!
//! Two schemas ship with the crate:
//!
//! - `spotify_album` - album details merged with per-track audio features
//!   and stream counts
//! - `imdb_film` - closed film record; cast and crew keyed by person id
//!
//! Project-specific schemas are compiled the same way through
//! [`SchemaValidator::new`].

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

const SPOTIFY_ALBUM_SCHEMA: &str = include_str!("../schemas/spotify_album.json");
const IMDB_FILM_SCHEMA: &str = include_str!("../schemas/imdb_film.json");

/// Schemas embedded in the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinSchema {
    /// Music-catalog album metadata
    SpotifyAlbum,
    /// Film metadata
    ImdbFilm,
}

impl BuiltinSchema {
    /// All builtin schemas
    pub const ALL: [BuiltinSchema; 2] = [Self::SpotifyAlbum, Self::ImdbFilm];

    /// Canonical name
    pub fn name(self) -> &'static str {
        match self {
            Self::SpotifyAlbum => "spotify_album",
            Self::ImdbFilm => "imdb_film",
        }
    }

    /// Raw schema document
    pub fn source(self) -> &'static str {
        match self {
            Self::SpotifyAlbum => SPOTIFY_ALBUM_SCHEMA,
            Self::ImdbFilm => IMDB_FILM_SCHEMA,
        }
    }

    /// Parsed schema document
    pub fn document(self) -> Result<Value> {
        Ok(serde_json::from_str(self.source())?)
    }

    /// Compile into a validator
    pub fn validator(self) -> Result<SchemaValidator> {
        SchemaValidator::new(self.name(), &self.document()?)
    }
}

impl FromStr for BuiltinSchema {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "spotify_album" | "album" => Ok(Self::SpotifyAlbum),
            "imdb_film" | "film" => Ok(Self::ImdbFilm),
            other => Err(Error::ConfigInvalid {
                message: format!("unknown builtin schema '{other}'"),
            }),
        }
    }
}

impl fmt::Display for BuiltinSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single schema violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// JSON pointer into the record; empty for the root
    pub instance_path: String,
    /// JSON pointer into the schema
    pub schema_path: String,
    /// Validator message
    pub message: String,
}

impl Violation {
    fn depth(&self) -> usize {
        self.instance_path.matches('/').count()
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.instance_path.is_empty() {
            "/"
        } else {
            &self.instance_path
        };
        write!(f, "{path}: {}", self.message)
    }
}

/// Outcome of validating one record
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    /// Every violation, in validator order
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Whether the record conforms
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// The violation with the deepest instance path; the first one wins ties
    pub fn most_specific(&self) -> Option<&Violation> {
        self.violations
            .iter()
            .fold(None, |best: Option<&Violation>, v| match best {
                Some(b) if b.depth() >= v.depth() => Some(b),
                _ => Some(v),
            })
    }
}

/// A compiled schema
pub struct SchemaValidator {
    name: String,
    inner: jsonschema::Validator,
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl SchemaValidator {
    /// Compile a schema document
    pub fn new(name: impl Into<String>, schema: &Value) -> Result<Self> {
        let name = name.into();
        let inner = jsonschema::validator_for(schema).map_err(|e| Error::SchemaError {
            schema: name.clone(),
            message: e.to_string(),
        })?;
        tracing::debug!(schema = %name, "compiled schema");
        Ok(Self { name, inner })
    }

    /// Schema name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fast conformance check
    pub fn is_valid(&self, record: &Value) -> bool {
        self.inner.is_valid(record)
    }

    /// Collect every violation
    pub fn validate(&self, record: &Value) -> ValidationReport {
        let violations = self
            .inner
            .iter_errors(record)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();
        ValidationReport { violations }
    }

    /// Reject a non-conforming record with its most specific violation
    pub fn check(&self, record: &Value) -> Result<()> {
        let report = self.validate(record);
        match report.most_specific() {
            None => Ok(()),
            Some(v) => Err(Error::SchemaViolation {
                schema: self.name.clone(),
                path: v.instance_path.clone(),
                message: v.message.clone(),
            }),
        }
    }
}
