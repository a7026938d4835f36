//! Infer a data model from a record

use anyhow::{Context, Result};
use clap::ValueEnum;
use datopy_core::Query;
use datopy_core::datamodel::{extract_datamodel_with_limit, save_datamodel, select_record};
use datopy_core::modeling::ARRAY_SAMPLE_LIMIT;
use datopy_core::sources::read_records;
use serde_json::Value;
use std::path::PathBuf;

use super::{first_record, load_optional_config};

/// The record matching the query, or the first record without one
async fn pick_record(file: &str, query: Option<&Query>) -> Result<Value> {
    let Some(query) = query else {
        return first_record(file).await;
    };
    let records: Vec<Value> = read_records(file)
        .await
        .with_context(|| format!("Failed to read records from {file}"))?
        .into_iter()
        .map(|record| record.payload)
        .collect();
    Ok(select_record(&records, query)?.clone())
}

/// Kind of media a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueryKind {
    /// Film, by title
    Film,
    /// Album, by artist and title
    Album,
    /// Book, by title
    Book,
}

/// Build the lookup query from command-line flags
pub fn query(
    kind: Option<QueryKind>,
    title: Option<String>,
    artist: Option<String>,
) -> Result<Option<Query>> {
    let Some(kind) = kind else {
        return Ok(None);
    };
    let title = title.context("--title is required with --query-kind")?;
    let query = match kind {
        QueryKind::Film => Query::Film { title },
        QueryKind::Book => Query::Book { title },
        QueryKind::Album => Query::Album {
            artist: artist.context("--artist is required for albums")?,
            title,
        },
    };
    Ok(Some(query))
}

/// Run the infer command
pub async fn run(
    config_path: &str,
    file: &str,
    source: &str,
    query: Option<&Query>,
    save: bool,
) -> Result<()> {
    let config = load_optional_config(config_path)?;
    let limit = config
        .as_ref()
        .map_or(ARRAY_SAMPLE_LIMIT, |c| c.project.sample_limit);

    let record = pick_record(file, query).await?;
    let model = extract_datamodel_with_limit(&record, limit)?;

    let report = serde_json::json!({
        "type_tree": model.type_tree,
        "json_schema": model.json_schema,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if save {
        let query = query.context("--save needs --query-kind and --title")?;
        let out_dir = config
            .as_ref()
            .map_or_else(|| PathBuf::from("output"), |c| c.output_dir());
        let saved = save_datamodel(&model, source, query, &out_dir)
            .with_context(|| format!("Failed to save data model for {query}"))?;
        for path in [&saved.type_tree, &saved.json_schema, &saved.record, &saved.table] {
            tracing::info!("✓ Wrote {}", path.display());
        }
    }

    Ok(())
}
