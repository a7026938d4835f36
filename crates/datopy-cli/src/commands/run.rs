//! Run processors

use anyhow::{Context, Result};
use datopy_core::{Config, Processor, ProcessorConfig, SchemaValidator};

use super::resolve_schema;

async fn run_one(config: &Config, processor_config: ProcessorConfig) -> Result<()> {
    let schema = match &processor_config.schema {
        Some(reference) => {
            let (name, document) = resolve_schema(Some(config), reference)?;
            Some(SchemaValidator::new(name, &document)?)
        }
        None => None,
    };
    let processor = Processor::new(processor_config, schema)?;
    let summary = processor.run(&config.base_path).await?;

    tracing::info!(
        processor = processor.config().name(),
        read = summary.read,
        rejected = summary.rejected_raw + summary.rejected_processed,
        written = summary.written,
        "✓ Processor complete"
    );
    Ok(())
}

/// Run the run command
pub async fn run(config_path: &str, processor: Option<&str>) -> Result<()> {
    tracing::info!("Loading configuration from {}", config_path);

    let config = Config::load(config_path).context("Failed to load configuration")?;

    tracing::info!("Project: {}", config.project.name);

    let processors = match processor {
        Some(name) => vec![config.find_processor(name)?],
        None => config.load_processors()?,
    };
    if processors.is_empty() {
        tracing::warn!("No processors to run");
        return Ok(());
    }

    let mut failed = Vec::new();
    for processor_config in processors {
        let name = processor_config.name.clone();
        if let Err(e) = run_one(&config, processor_config).await {
            tracing::error!(processor = %name, error = %format!("{e:#}"), "processor failed");
            failed.push(name);
        }
    }

    if !failed.is_empty() {
        anyhow::bail!("{} processor(s) failed: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}
