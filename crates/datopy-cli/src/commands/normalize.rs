//! Flatten records into a CSV table

use anyhow::{Context, Result};
use datopy_core::normalize::{json_normalize, write_csv};
use datopy_core::sources::read_records;
use std::fs::File;
use std::io::BufWriter;

/// Run the normalize command
pub async fn run(file: &str, output: Option<&str>) -> Result<()> {
    let records = read_records(file)
        .await
        .with_context(|| format!("Failed to read records from {file}"))?;
    let rows: Vec<_> = records.iter().map(|r| json_normalize(&r.payload)).collect();

    match output {
        Some(path) => {
            let out = File::create(path).with_context(|| format!("Failed to create {path}"))?;
            write_csv(&rows, BufWriter::new(out))?;
            tracing::info!(rows = rows.len(), output = path, "wrote table");
        }
        None => write_csv(&rows, std::io::stdout().lock())?,
    }
    Ok(())
}
