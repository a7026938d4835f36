//! CLI command implementations

pub mod diff;
pub mod infer;
pub mod init;
pub mod list;
pub mod normalize;
pub mod run;
pub mod validate;

use anyhow::{Context, Result};
use datopy_core::schemas::BuiltinSchema;
use datopy_core::sources::read_records;
use datopy_core::{Config, Error};
use serde_json::Value;

/// Load the project configuration, or `None` when there is no project
pub fn load_optional_config(config_path: &str) -> Result<Option<Config>> {
    match Config::load(config_path) {
        Ok(config) => Ok(Some(config)),
        Err(Error::ConfigNotFound { path }) => {
            tracing::debug!(path = %path, "no project configuration; using defaults");
            Ok(None)
        }
        Err(e) => Err(e).context("Failed to load configuration"),
    }
}

/// Resolve a schema reference with or without a project
pub fn resolve_schema(config: Option<&Config>, reference: &str) -> Result<(String, Value)> {
    if let Some(config) = config {
        return config
            .resolve_schema(reference)
            .with_context(|| format!("Failed to resolve schema '{reference}'"));
    }
    if let Ok(builtin) = reference.parse::<BuiltinSchema>() {
        return Ok((builtin.name().to_string(), builtin.document()?));
    }
    let contents = std::fs::read_to_string(reference)
        .with_context(|| format!("Failed to read schema '{reference}'"))?;
    let document = serde_json::from_str(&contents)
        .with_context(|| format!("Schema '{reference}' is not valid JSON"))?;
    let name = std::path::Path::new(reference)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| reference.to_string());
    Ok((name, document))
}

/// First record of a .json or .jsonl file
pub async fn first_record(path: &str) -> Result<Value> {
    read_records(path)
        .await
        .with_context(|| format!("Failed to read records from {path}"))?
        .into_iter()
        .next()
        .map(|record| record.payload)
        .with_context(|| format!("{path} contains no records"))
}
