//! Validate record files against a JSON Schema

use anyhow::{Context, Result};
use datopy_core::SchemaValidator;
use datopy_core::sources::read_records;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{load_optional_config, resolve_schema};

fn is_record_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "json" || ext == "jsonl")
}

/// Expand directories into the record files beneath them
fn record_files(paths: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        let path = Path::new(path);
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_record_file(e.path()))
                .map(|e| e.into_path())
                .collect();
            found.sort();
            files.extend(found);
        } else if path.exists() {
            files.push(path.to_path_buf());
        } else {
            anyhow::bail!("No such file or directory: {}", path.display());
        }
    }
    Ok(files)
}

/// Run the validate command
pub async fn run(config_path: &str, schema: &str, paths: &[String]) -> Result<()> {
    let config = load_optional_config(config_path)?;
    let (name, document) = resolve_schema(config.as_ref(), schema)?;
    let validator = SchemaValidator::new(name, &document).context("Failed to compile schema")?;

    let files = record_files(paths)?;
    if files.is_empty() {
        anyhow::bail!("No record files found");
    }

    let mut checked = 0;
    let mut failed = 0;
    for file in &files {
        let records = read_records(file)
            .await
            .with_context(|| format!("Failed to read records from {}", file.display()))?;
        for (index, record) in records.iter().enumerate() {
            checked += 1;
            let line = record.metadata.line.unwrap_or(index + 1);
            let report = validator.validate(&record.payload);
            if report.is_valid() {
                continue;
            }
            failed += 1;
            for violation in &report.violations {
                println!("{}:{}: {}", file.display(), line, violation);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!(
            "{failed} of {checked} record(s) failed validation against {}",
            validator.name()
        );
    }

    tracing::info!(
        schema = validator.name(),
        records = checked,
        files = files.len(),
        "✓ All records are valid"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_files_walks_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.jsonl"), "{}").unwrap();
        std::fs::write(dir.path().join("nested/a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = record_files(&[dir.path().display().to_string()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["b.jsonl", "a.json"]);
    }

    #[test]
    fn test_record_files_missing_path() {
        assert!(record_files(&["/definitely/not/here.json".to_string()]).is_err());
    }
}
