//! Field constraints for processed records
//!
//! Raw records are checked against JSON Schemas in [`crate::schemas`]. Once a
//! record has been cleaned up, its fields are checked against a [`ModelSpec`]:
//! a static table of per-field rules. Unlike deserialization, which stops at
//! the first problem, a spec reports every violation at once.
//!
//! # Example
//!
//! ```rust
//! use datopy_core::models::IMDB_FILM;
//! use serde_json::json;
//!
//! let record = json!({"title": "name", "imdb_id": "tt12", "year": 1975, "votes": -2, "rating": 5.0});
//! let violations = IMDB_FILM.validate(&record);
//! assert_eq!(violations.len(), 3);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};

/// Lowercase comma-separated words; no digits or special characters
pub const CSV_STR: &str = r"^[a-z, ]+$";
/// Lowercase comma-separated words; digits and `.`/`!` allowed
pub const CSV_NUM_STR: &str = r"^[a-z0-9,.! ]+$";
/// Lowercase sentence text
pub const CSV_NUM_SENT: &str = r"^[a-z0-9,.! ]+$";
/// IMDb title identifier
pub const IMDB_ID: &str = r"^tt.*\d{7}$";

static PATTERNS: Lazy<HashMap<&'static str, Regex>> = Lazy::new(|| {
    [CSV_STR, CSV_NUM_STR, IMDB_ID]
        .into_iter()
        .filter_map(|p| Regex::new(p).ok().map(|re| (p, re)))
        .collect()
});

fn pattern_matches(pattern: &'static str, text: &str) -> bool {
    match PATTERNS.get(pattern) {
        Some(re) => re.is_match(text),
        None => Regex::new(pattern).is_ok_and(|re| re.is_match(text)),
    }
}

/// Constraint on a single field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldRule {
    /// String, optionally matching a pattern
    Str {
        /// Full-match pattern
        pattern: Option<&'static str>,
    },
    /// Integer with inclusive bounds
    Int {
        /// Lower bound (inclusive)
        ge: Option<i64>,
        /// Upper bound (inclusive)
        le: Option<i64>,
    },
    /// Float with bounds
    Float {
        /// Lower bound (exclusive)
        gt: Option<f64>,
        /// Lower bound (inclusive)
        ge: Option<f64>,
        /// Upper bound (inclusive)
        le: Option<f64>,
    },
}

/// A named, constrained field
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Field name
    pub name: &'static str,
    /// Whether the field must be present and non-null
    pub required: bool,
    /// Value constraint
    pub rule: FieldRule,
}

const fn required(name: &'static str, rule: FieldRule) -> FieldSpec {
    FieldSpec {
        name,
        required: true,
        rule,
    }
}

const fn optional(name: &'static str, rule: FieldRule) -> FieldSpec {
    FieldSpec {
        name,
        required: false,
        rule,
    }
}

const fn text(pattern: &'static str) -> FieldRule {
    FieldRule::Str {
        pattern: Some(pattern),
    }
}

const ANY_TEXT: FieldRule = FieldRule::Str { pattern: None };

const NON_NEGATIVE: FieldRule = FieldRule::Float {
    gt: None,
    ge: Some(0.0),
    le: None,
};

/// What went wrong with a field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViolationKind {
    /// Required field absent or null
    Missing,
    /// Value has the wrong JSON type
    WrongType {
        /// Expected type name
        expected: &'static str,
    },
    /// String does not match the field pattern
    PatternMismatch {
        /// The pattern
        pattern: &'static str,
    },
    /// Value below an inclusive lower bound
    GreaterThanEqual {
        /// The bound
        limit: f64,
    },
    /// Value at or below an exclusive lower bound
    GreaterThan {
        /// The bound
        limit: f64,
    },
    /// Value above an inclusive upper bound
    LessThanEqual {
        /// The bound
        limit: f64,
    },
}

/// A field that broke its constraint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldViolation {
    /// Field name
    pub field: String,
    /// Violation kind
    #[serde(flatten)]
    pub kind: ViolationKind,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = &self.field;
        match &self.kind {
            ViolationKind::Missing => write!(f, "{field}: field required"),
            ViolationKind::WrongType { expected } => {
                write!(f, "{field}: input should be a valid {expected}")
            }
            ViolationKind::PatternMismatch { pattern } => {
                write!(f, "{field}: string should match pattern '{pattern}'")
            }
            ViolationKind::GreaterThanEqual { limit } => {
                write!(f, "{field}: input should be greater than or equal to {limit}")
            }
            ViolationKind::GreaterThan { limit } => {
                write!(f, "{field}: input should be greater than {limit}")
            }
            ViolationKind::LessThanEqual { limit } => {
                write!(f, "{field}: input should be less than or equal to {limit}")
            }
        }
    }
}

/// A named table of field constraints
#[derive(Debug, Clone, Copy)]
pub struct ModelSpec {
    /// Model name
    pub name: &'static str,
    /// Field constraints, in report order
    pub fields: &'static [FieldSpec],
}

impl ModelSpec {
    /// Collect every violation. Fields not named in the spec are ignored.
    pub fn validate(&self, record: &Value) -> Vec<FieldViolation> {
        let Some(obj) = record.as_object() else {
            return vec![FieldViolation {
                field: self.name.to_string(),
                kind: ViolationKind::WrongType { expected: "object" },
            }];
        };

        let mut violations = Vec::new();
        for spec in self.fields {
            let kind = match obj.get(spec.name) {
                None | Some(Value::Null) if spec.required => Some(ViolationKind::Missing),
                None | Some(Value::Null) => None,
                Some(value) => check_rule(&spec.rule, value),
            };
            if let Some(kind) = kind {
                violations.push(FieldViolation {
                    field: spec.name.to_string(),
                    kind,
                });
            }
        }
        violations
    }

    /// Reject a record that breaks any constraint
    pub fn check(&self, record: &Value) -> Result<()> {
        let violations = self.validate(record);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(Error::ModelViolation {
                model: self.name.to_string(),
                violations,
            })
        }
    }

    /// Check a record, then deserialize it into a typed model
    pub fn parse<T: DeserializeOwned>(&self, record: &Value) -> Result<T> {
        self.check(record)?;
        let mut record = record.clone();
        if let Some(obj) = record.as_object_mut() {
            for spec in self.fields {
                if !matches!(spec.rule, FieldRule::Int { .. }) {
                    continue;
                }
                if let Some(n) = obj.get(spec.name).and_then(as_integer) {
                    obj.insert(spec.name.to_string(), Value::from(n));
                }
            }
        }
        Ok(serde_json::from_value(record)?)
    }
}

/// Integer value of a number, accepting floats with no fractional part
fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn check_rule(rule: &FieldRule, value: &Value) -> Option<ViolationKind> {
    match *rule {
        FieldRule::Str { pattern } => {
            let Some(s) = value.as_str() else {
                return Some(ViolationKind::WrongType { expected: "string" });
            };
            pattern
                .filter(|p| !pattern_matches(*p, s))
                .map(|pattern| ViolationKind::PatternMismatch { pattern })
        }
        FieldRule::Int { ge, le } => {
            let Some(n) = as_integer(value) else {
                return Some(ViolationKind::WrongType { expected: "integer" });
            };
            if let Some(limit) = ge.filter(|&l| n < l) {
                Some(ViolationKind::GreaterThanEqual {
                    limit: limit as f64,
                })
            } else {
                le.filter(|&l| n > l).map(|limit| ViolationKind::LessThanEqual {
                    limit: limit as f64,
                })
            }
        }
        FieldRule::Float { gt, ge, le } => {
            let Some(n) = value.as_f64() else {
                return Some(ViolationKind::WrongType { expected: "number" });
            };
            if let Some(limit) = gt.filter(|&l| n <= l) {
                Some(ViolationKind::GreaterThan { limit })
            } else if let Some(limit) = ge.filter(|&l| n < l) {
                Some(ViolationKind::GreaterThanEqual { limit })
            } else {
                le.filter(|&l| n > l)
                    .map(|limit| ViolationKind::LessThanEqual { limit })
            }
        }
    }
}

/// Processed IMDb film metadata
pub static IMDB_FILM: ModelSpec = ModelSpec {
    name: "imdb_film",
    fields: &[
        // Identifiers
        required("title", text(CSV_NUM_STR)),
        required("imdb_id", text(IMDB_ID)),
        required("kind", text(CSV_STR)),
        // Numeric
        required(
            "year",
            FieldRule::Int {
                ge: Some(1880),
                le: Some(3000),
            },
        ),
        required(
            "rating",
            FieldRule::Float {
                gt: None,
                ge: Some(0.0),
                le: Some(10.0),
            },
        ),
        required(
            "votes",
            FieldRule::Int {
                ge: Some(0),
                le: None,
            },
        ),
        optional(
            "runtime_mins",
            FieldRule::Float {
                gt: Some(0.0),
                ge: None,
                le: None,
            },
        ),
        // String lists
        optional("genres", text(CSV_STR)),
        optional("countries", text(CSV_STR)),
        optional("director", text(CSV_STR)),
        optional("writer", text(CSV_STR)),
        optional("composer", text(CSV_STR)),
        optional("cast", text(CSV_STR)),
        // Strings
        optional("plot", text(CSV_NUM_SENT)),
        optional("synopsis", text(CSV_NUM_SENT)),
        optional("plot_outline", text(CSV_NUM_SENT)),
        // Financial
        optional("budget_mil", NON_NEGATIVE),
        optional("opening_weekend_gross_mil", NON_NEGATIVE),
        optional("cumulative_worldwide_gross_mil", NON_NEGATIVE),
    ],
};

/// Processed Spotify album metadata
pub static SPOTIFY_ALBUM: ModelSpec = ModelSpec {
    name: "spotify_album",
    fields: &[required("title", ANY_TEXT), required("album_type", ANY_TEXT)],
};

/// Processed Wikipedia novel metadata
pub static WIKI_BOOK: ModelSpec = ModelSpec {
    name: "wiki_book",
    fields: &[required("title", ANY_TEXT)],
};

/// Processed Wikipedia film metadata
pub static WIKI_FILM: ModelSpec = ModelSpec {
    name: "wiki_film",
    fields: &[required("title", ANY_TEXT)],
};

/// Processed Wikipedia album metadata
pub static WIKI_ALBUM: ModelSpec = ModelSpec {
    name: "wiki_album",
    fields: &[required("title", ANY_TEXT)],
};

/// Every known model spec
pub static MODELS: [&ModelSpec; 5] = [
    &IMDB_FILM,
    &SPOTIFY_ALBUM,
    &WIKI_BOOK,
    &WIKI_FILM,
    &WIKI_ALBUM,
];

/// Look up a model spec by name
pub fn find_model(name: &str) -> Option<&'static ModelSpec> {
    MODELS.iter().copied().find(|m| m.name == name)
}

/// Typed processed film record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImdbFilm {
    /// Title
    pub title: String,
    /// IMDb title identifier
    pub imdb_id: String,
    /// Kind of title, e.g. movie
    pub kind: String,
    /// Release year
    pub year: i64,
    /// Average user rating
    pub rating: f64,
    /// Number of user ratings
    pub votes: i64,
    /// Runtime in minutes
    #[serde(default)]
    pub runtime_mins: Option<f64>,
    /// Comma-separated genres
    #[serde(default)]
    pub genres: Option<String>,
    /// Comma-separated countries
    #[serde(default)]
    pub countries: Option<String>,
    /// Comma-separated directors
    #[serde(default)]
    pub director: Option<String>,
    /// Comma-separated writers
    #[serde(default)]
    pub writer: Option<String>,
    /// Comma-separated composers
    #[serde(default)]
    pub composer: Option<String>,
    /// Comma-separated cast
    #[serde(default)]
    pub cast: Option<String>,
    /// Plot summary
    #[serde(default)]
    pub plot: Option<String>,
    /// Full synopsis
    #[serde(default)]
    pub synopsis: Option<String>,
    /// Short plot outline
    #[serde(default)]
    pub plot_outline: Option<String>,
    /// Budget in millions
    #[serde(default)]
    pub budget_mil: Option<f64>,
    /// Opening weekend gross in millions
    #[serde(default)]
    pub opening_weekend_gross_mil: Option<f64>,
    /// Worldwide gross in millions
    #[serde(default)]
    pub cumulative_worldwide_gross_mil: Option<f64>,
}

impl ImdbFilm {
    /// Validate and convert a processed record
    pub fn from_record(record: &Value) -> Result<Self> {
        IMDB_FILM.parse(record)
    }
}

/// Typed processed album record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyAlbum {
    /// Title
    pub title: String,
    /// Album type, e.g. album or single
    pub album_type: String,
}

impl SpotifyAlbum {
    /// Validate and convert a processed record
    pub fn from_record(record: &Value) -> Result<Self> {
        SPOTIFY_ALBUM.parse(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn valid_film() -> Value {
        json!({
            "title": "name 10!", "imdb_id": "tt1234567", "kind": "movie",
            "year": 1990, "rating": 7.2, "votes": 122,
            "genres": "romantic comedy, thriller", "cast": "mrs smith,mr smith",
            "plot": "alas! once upon a time, ...",
            "budget_mil": 1123929
        })
    }

    #[test]
    fn test_valid_film_parses() {
        let film = ImdbFilm::from_record(&valid_film()).unwrap();
        assert_eq!(film.imdb_id, "tt1234567");
        assert_eq!(film.year, 1990);
        assert_eq!(film.budget_mil, Some(1123929.0));
        assert!(film.runtime_mins.is_none());
    }

    #[test]
    fn test_invalid_film_reports_all_violations() {
        let record = json!({"title": "name", "imdb_id": "tt12", "year": 1975, "votes": -2, "rating": 5.0});
        let violations = IMDB_FILM.validate(&record);

        assert_eq!(
            violations,
            vec![
                FieldViolation {
                    field: "imdb_id".to_string(),
                    kind: ViolationKind::PatternMismatch { pattern: IMDB_ID },
                },
                FieldViolation {
                    field: "kind".to_string(),
                    kind: ViolationKind::Missing,
                },
                FieldViolation {
                    field: "votes".to_string(),
                    kind: ViolationKind::GreaterThanEqual { limit: 0.0 },
                },
            ]
        );
        assert_eq!(
            violations[0].to_string(),
            r"imdb_id: string should match pattern '^tt.*\d{7}$'"
        );
    }

    #[test]
    fn test_model_violation_error_message() {
        let err = IMDB_FILM
            .check(&json!({"title": "name", "imdb_id": "tt1234567", "kind": "movie", "year": 1990, "rating": 5.0}))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "1 validation error(s) for imdb_film: votes: field required"
        );
    }

    #[rstest]
    #[case("year", json!(1879), ViolationKind::GreaterThanEqual { limit: 1880.0 })]
    #[case("year", json!(3001), ViolationKind::LessThanEqual { limit: 3000.0 })]
    #[case("year", json!("1990"), ViolationKind::WrongType { expected: "integer" })]
    #[case("year", json!(1990.5), ViolationKind::WrongType { expected: "integer" })]
    #[case("year", json!(1879.0), ViolationKind::GreaterThanEqual { limit: 1880.0 })]
    #[case("rating", json!(10.5), ViolationKind::LessThanEqual { limit: 10.0 })]
    #[case("runtime_mins", json!(0), ViolationKind::GreaterThan { limit: 0.0 })]
    #[case("genres", json!("Drama"), ViolationKind::PatternMismatch { pattern: CSV_STR })]
    #[case("plot", json!(["a"]), ViolationKind::WrongType { expected: "string" })]
    fn test_film_field_constraints(
        #[case] field: &str,
        #[case] value: Value,
        #[case] expected: ViolationKind,
    ) {
        let mut record = valid_film();
        record[field] = value;
        let violations = IMDB_FILM.validate(&record);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, field);
        assert_eq!(violations[0].kind, expected);
    }

    #[test]
    fn test_integral_float_counts_as_integer() {
        let mut record = valid_film();
        record["year"] = json!(1990.0);
        record["votes"] = json!(122.0);
        assert!(IMDB_FILM.validate(&record).is_empty());

        let film = ImdbFilm::from_record(&record).unwrap();
        assert_eq!(film.year, 1990);
        assert_eq!(film.votes, 122);
    }

    #[test]
    fn test_null_optional_field_is_absent() {
        let mut record = valid_film();
        record["writer"] = Value::Null;
        assert!(IMDB_FILM.validate(&record).is_empty());
    }

    #[test]
    fn test_non_object_record() {
        let violations = SPOTIFY_ALBUM.validate(&json!([1, 2]));
        assert_eq!(
            violations[0].kind,
            ViolationKind::WrongType { expected: "object" }
        );
    }

    #[test]
    fn test_find_model() {
        assert_eq!(find_model("wiki_book").unwrap().name, "wiki_book");
        assert!(find_model("unknown").is_none());
        let album = SpotifyAlbum::from_record(&json!({"title": "kid a", "album_type": "album"}))
            .unwrap();
        assert_eq!(album.album_type, "album");
    }
}
