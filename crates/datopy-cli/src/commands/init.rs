//! Initialize a new datopy project

use anyhow::Result;
use datopy_core::config::CONFIG_FILE;
use std::fs;
use std::path::Path;

/// Run the init command
pub async fn run(path: &str, name: Option<&str>) -> Result<()> {
    let project_dir = Path::new(path);

    // Create directory if it doesn't exist
    if !project_dir.exists() {
        fs::create_dir_all(project_dir)?;
    }

    let abs_path = project_dir.canonicalize()?;

    let project_name = match name {
        Some(n) => n.to_string(),
        None => abs_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Could not determine project name from path"))?,
    };

    if project_dir.join(CONFIG_FILE).exists() {
        anyhow::bail!(
            "Directory '{}' already contains a {}",
            project_dir.display(),
            CONFIG_FILE
        );
    }

    tracing::info!("Creating new datopy project: {}", project_name);

    fs::create_dir_all(project_dir.join("processors"))?;
    fs::create_dir_all(project_dir.join("data"))?;

    let config = format!(
        r#"# datopy project configuration
name: {project_name}
version: "0.1.0"

# Saved data models go here
output_dir: output

# Array elements sampled when inferring type trees
sample_limit: 5

# Project schemas, referenced by name from processors and `datopy validate`
schemas: {{}}
"#
    );
    fs::write(project_dir.join(CONFIG_FILE), config)?;

    let example_processor = r#"# Example processor
name: films
description: Flatten raw film records into a table

source:
  type: file
  path: data/sample.jsonl
  format: jsonl

schema: imdb_film

transforms:
  - map:
      director_name: director.1.name
  - drop:
      - director
  - omit_patterns:
      field: title
      patterns: ["[[", "]]"]

model: wiki_film

output:
  type: csv
  path: output/films.csv

on_invalid: skip
"#;
    fs::write(project_dir.join("processors/films.yaml"), example_processor)?;

    let sample_data = r#"{"title": "[[Heat]]", "year": 1995, "kind": "movie", "director": {"1": {"name": "Michael Mann"}}}
{"title": "Eternal Sunshine of the Spotless Mind", "year": 2004, "kind": "movie", "director": {"1": {"name": "Michel Gondry"}}}
{"title": "Untitled", "kind": "movie"}
"#;
    fs::write(project_dir.join("data/sample.jsonl"), sample_data)?;

    let gitignore = r#"# Generated data models and tables
output/

# IDE
.idea/
.vscode/
*.swp
"#;
    fs::write(project_dir.join(".gitignore"), gitignore)?;

    tracing::info!(
        "✓ Created project '{}' at {}",
        project_name,
        abs_path.display()
    );
    tracing::info!("Next steps:");
    if path != "." {
        tracing::info!("  cd {}", project_dir.display());
    }
    tracing::info!("  datopy list          # Show processors");
    tracing::info!("  datopy run           # Process sample records");

    Ok(())
}
