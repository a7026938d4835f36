//! Datopy Core Library
//!
//! This crate provides the core functionality for datopy:
//! - Data dictionary helpers: type trees, key diffs, generated JSON Schemas
//! - Raw record validation against the embedded album and film schemas
//! - Field models for processed records
//! - Processing steps and the retrieve/process/validate/load processor
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Source    │────▶│ JSON Schema │────▶│ Processing  │────▶│ Field model │──▶ Sink
//! │ (jsonl/json)│     │   (raw)     │     │   steps     │     │ (processed) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use datopy_core::{Config, Processor};
//!
//! let config = Config::load("./datopy.yaml")?;
//! for processor in config.load_processors()? {
//!     println!("Processor: {}", processor.name());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod datamodel;
pub mod error;
pub mod etl;
pub mod interpreter;
pub mod modeling;
pub mod models;
pub mod normalize;
pub mod processor;
pub mod schemas;
pub mod sources;
pub mod transforms;

pub use config::{Config, ProjectConfig};
pub use datamodel::{DataModel, Query};
pub use error::{Error, Result};
pub use modeling::KeyDiff;
pub use models::{FieldViolation, ModelSpec};
pub use processor::{Processor, ProcessorConfig, RunSummary};
pub use schemas::{BuiltinSchema, SchemaValidator, ValidationReport};
