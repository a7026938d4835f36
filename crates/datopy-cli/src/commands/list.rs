//! List processors

use anyhow::{Context, Result};
use datopy_core::Config;

/// Run the list command
pub async fn run(config_path: &str) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;
    let processors = config.load_processors()?;

    if processors.is_empty() {
        println!("No processors defined in {}", config.base_path.join("processors").display());
        return Ok(());
    }

    for processor in &processors {
        match &processor.description {
            Some(description) => println!("{}\t{}", processor.name(), description),
            None => println!("{}", processor.name()),
        }
    }
    Ok(())
}
