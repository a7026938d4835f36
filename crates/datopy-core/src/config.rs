//! Configuration parsing and validation
//!
//! This module handles loading datopy project files.
//!
//! # Configuration Files
//!
//! - `datopy.yaml` - Project root configuration
//! - `processors/*.yaml` - Individual processor definitions

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::modeling::ARRAY_SAMPLE_LIMIT;
use crate::processor::ProcessorConfig;
use crate::schemas::BuiltinSchema;

/// Project configuration file name
pub const CONFIG_FILE: &str = "datopy.yaml";

/// Root project configuration from `datopy.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Project version
    #[serde(default = "default_version")]
    pub version: String,

    /// Directory for saved data models, relative to the project root
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Array elements sampled when building type trees
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,

    /// Project schemas: name -> path relative to the project root
    #[serde(default)]
    pub schemas: HashMap<String, String>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_sample_limit() -> usize {
    ARRAY_SAMPLE_LIMIT
}

/// Main configuration container
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Base path of the project
    pub base_path: PathBuf,
}

impl Config {
    /// Load configuration from a directory
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the project directory or datopy.yaml file
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config = Config::load("./my-project")?;
    /// println!("Project: {}", config.project.name);
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let (config_path, base_path) = if path.is_dir() {
            (path.join(CONFIG_FILE), path.to_path_buf())
        } else {
            (
                path.to_path_buf(),
                path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            )
        };

        if !config_path.exists() {
            return Err(Error::ConfigNotFound {
                path: config_path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let project: ProjectConfig = serde_yaml::from_str(&contents)?;
        if project.sample_limit == 0 {
            return Err(Error::ConfigInvalid {
                message: "sample_limit must be at least 1".to_string(),
            });
        }

        tracing::debug!(path = %config_path.display(), project = %project.name, "loaded project config");
        Ok(Self { project, base_path })
    }

    /// Output directory for saved data models
    pub fn output_dir(&self) -> PathBuf {
        self.base_path.join(&self.project.output_dir)
    }

    /// Load all processor definitions from `processors/*.yaml`
    pub fn load_processors(&self) -> Result<Vec<ProcessorConfig>> {
        let processors_dir = self.base_path.join("processors");
        if !processors_dir.exists() {
            return Ok(vec![]);
        }

        let mut entries: Vec<_> = std::fs::read_dir(&processors_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .is_some_and(|ext| ext == "yaml" || ext == "yml")
            })
            .collect();
        entries.sort_by_key(|e| e.path());

        let mut processors: Vec<ProcessorConfig> = Vec::new();
        for entry in entries {
            let contents = std::fs::read_to_string(entry.path())?;
            let processor: ProcessorConfig = serde_yaml::from_str(&contents)?;
            if processors.iter().any(|p| p.name == processor.name) {
                return Err(Error::InvalidProcessor {
                    processor: processor.name,
                    message: format!("duplicate name in {}", entry.path().display()),
                });
            }
            processors.push(processor);
        }
        Ok(processors)
    }

    /// Find a processor by name
    pub fn find_processor(&self, name: &str) -> Result<ProcessorConfig> {
        self.load_processors()?
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::InvalidProcessor {
                processor: name.to_string(),
                message: "not found in processors/".to_string(),
            })
    }

    /// Resolve a schema reference to its name and document.
    ///
    /// Builtin schemas win, then project schemas from `datopy.yaml`, then a
    /// path relative to the project root.
    pub fn resolve_schema(&self, reference: &str) -> Result<(String, Value)> {
        if let Ok(builtin) = reference.parse::<BuiltinSchema>() {
            return Ok((builtin.name().to_string(), builtin.document()?));
        }

        if let Some(path) = self.project.schemas.get(reference) {
            let document = read_schema(&self.base_path.join(path), reference)?;
            return Ok((reference.to_string(), document));
        }

        let path = self.base_path.join(reference);
        if path.is_file() {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| reference.to_string());
            return Ok((name, read_schema(&path, reference)?));
        }

        Err(Error::SchemaError {
            schema: reference.to_string(),
            message: "not a builtin schema, project schema, or file".to_string(),
        })
    }
}

fn read_schema(path: &Path, reference: &str) -> Result<Value> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::SchemaError {
        schema: reference.to_string(),
        message: format!("{}: {e}", path.display()),
    })?;
    serde_json::from_str(&contents).map_err(|e| Error::SchemaError {
        schema: reference.to_string(),
        message: format!("{}: {e}", path.display()),
    })
}
