//! Processor definition and execution
//!
//! A processor takes records through four stages:
//!
//! 1. **retrieve** - pull raw records from a source, optionally checking
//!    each one against a JSON Schema
//! 2. **process** - apply the configured processing steps
//! 3. **validate** - check processed records against a field model
//! 4. **load** - push accepted records to a sink

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::error::{Error, Result};
use crate::interpreter::apply_transforms;
use crate::models::{find_model, ModelSpec};
use crate::schemas::SchemaValidator;
use crate::sources::{Record, RecordMetadata, RecordSink, RecordSource, SinkConfig, SourceConfig};
use crate::transforms::TransformConfig;

/// A processor definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Processor name (must be unique within project)
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Where raw records come from
    pub source: SourceConfig,

    /// Schema reference for raw records: builtin, project schema, or path
    #[serde(default)]
    pub schema: Option<String>,

    /// Processing steps
    #[serde(default)]
    pub transforms: Vec<TransformConfig>,

    /// Field model for processed records
    #[serde(default)]
    pub model: Option<String>,

    /// Where accepted records go
    #[serde(default)]
    pub output: Option<SinkConfig>,

    /// What to do with a rejected record
    #[serde(default)]
    pub on_invalid: OnInvalid,
}

/// Rejected-record behavior
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OnInvalid {
    /// Log, count, and drop the record
    #[default]
    Skip,
    /// Abort the run with the rejection
    Stop,
}

impl ProcessorConfig {
    /// Get the processor name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve the model reference
    pub fn model_spec(&self) -> Result<Option<&'static ModelSpec>> {
        self.model
            .as_deref()
            .map(|name| {
                find_model(name).ok_or_else(|| Error::InvalidProcessor {
                    processor: self.name.clone(),
                    message: format!("unknown model '{name}'"),
                })
            })
            .transpose()
    }
}

/// Counts from a processor run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Records pulled from the source
    pub read: usize,
    /// Records rejected by the raw schema
    pub rejected_raw: usize,
    /// Records rejected by processing or the field model
    pub rejected_processed: usize,
    /// Records pushed to the sink
    pub written: usize,
}

/// A ready-to-run processor
pub struct Processor {
    config: ProcessorConfig,
    schema: Option<SchemaValidator>,
    model: Option<&'static ModelSpec>,
}

impl Processor {
    /// Build a processor with an already-compiled raw schema
    pub fn new(config: ProcessorConfig, schema: Option<SchemaValidator>) -> Result<Self> {
        let model = config.model_spec()?;
        Ok(Self {
            config,
            schema,
            model,
        })
    }

    /// Processor configuration
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Validate a raw record against the schema
    pub fn check_raw(&self, record: &Value) -> Result<()> {
        match &self.schema {
            Some(schema) => schema.check(record),
            None => Ok(()),
        }
    }

    /// Apply the processing steps and check the field model
    pub fn process(&self, record: &Value) -> Result<Value> {
        let processed = apply_transforms(record, &self.config.transforms)?;
        if let Some(model) = self.model {
            model.check(&processed)?;
        }
        Ok(processed)
    }

    /// Run against sources resolved relative to `base`
    pub async fn run(&self, base: &Path) -> Result<RunSummary> {
        let mut source = self.config.source.open(base);
        let mut sink = self.config.output.as_ref().map(|o| o.open(base));
        self.run_with(source.as_mut(), sink.as_deref_mut()).await
    }

    /// Run against explicit source and sink
    pub async fn run_with(
        &self,
        source: &mut (dyn RecordSource + '_),
        mut sink: Option<&mut (dyn RecordSink + '_)>,
    ) -> Result<RunSummary> {
        let name = self.config.name();
        let mut summary = RunSummary::default();

        tracing::info!(processor = name, "starting processor");

        while let Some(record) = source.pull().await? {
            summary.read += 1;

            if let Err(e) = self.check_raw(&record.payload) {
                summary.rejected_raw += 1;
                self.reject(&record.metadata, summary.read, e)?;
                continue;
            }

            let processed = match self.process(&record.payload) {
                Ok(processed) => processed,
                Err(e) => {
                    summary.rejected_processed += 1;
                    self.reject(&record.metadata, summary.read, e)?;
                    continue;
                }
            };

            if let Some(sink) = sink.as_deref_mut() {
                sink.push(Record {
                    payload: processed,
                    metadata: record.metadata,
                })
                .await?;
                summary.written += 1;
            }
        }

        if let Some(sink) = sink.as_deref_mut() {
            sink.flush().await?;
        }

        tracing::info!(
            processor = name,
            read = summary.read,
            rejected_raw = summary.rejected_raw,
            rejected_processed = summary.rejected_processed,
            written = summary.written,
            "processor finished"
        );
        Ok(summary)
    }

    fn reject(&self, metadata: &RecordMetadata, position: usize, error: Error) -> Result<()> {
        match self.config.on_invalid {
            OnInvalid::Skip => {
                tracing::warn!(
                    processor = self.config.name(),
                    source = metadata.source.as_deref().unwrap_or("-"),
                    record = metadata.line.unwrap_or(position),
                    error = %error,
                    "skipping rejected record"
                );
                Ok(())
            }
            OnInvalid::Stop => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::BuiltinSchema;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;

    struct VecSource(VecDeque<Value>);

    #[async_trait]
    impl RecordSource for VecSource {
        async fn pull(&mut self) -> Result<Option<Record>> {
            Ok(self.0.pop_front().map(Record::new))
        }
    }

    #[derive(Default)]
    struct VecSink {
        records: Vec<Value>,
        flushed: bool,
    }

    #[async_trait]
    impl RecordSink for VecSink {
        async fn push(&mut self, record: Record) -> Result<()> {
            self.records.push(record.payload);
            Ok(())
        }

        async fn flush(&mut self) -> Result<()> {
            self.flushed = true;
            Ok(())
        }
    }

    fn film_processor(on_invalid: &str) -> ProcessorConfig {
        let yaml = format!(
            r#"
name: films
source:
  type: file
  path: data/films.jsonl
schema: imdb_film
transforms:
  - map:
      director_name: director.1.name
  - drop:
      - director
model: wiki_film
on_invalid: {on_invalid}
"#
        );
        serde_yaml::from_str(&yaml).unwrap()
    }

    fn films() -> VecDeque<Value> {
        VecDeque::from([
            json!({"title": "eternal sunshine", "year": 2004, "kind": "movie",
                   "director": {"1": {"name": "Michel Gondry"}}}),
            json!({"name": 1, "price": 34.99}),
            json!({"title": "heat", "year": 1995, "kind": "movie", "director": {}}),
        ])
    }

    #[test]
    fn test_parse_processor() {
        let config = film_processor("skip");
        assert_eq!(config.name(), "films");
        assert_eq!(config.schema.as_deref(), Some("imdb_film"));
        assert_eq!(config.transforms.len(), 2);
        assert_eq!(config.on_invalid, OnInvalid::Skip);
        assert!(config.output.is_none());
    }

    #[test]
    fn test_unknown_model_is_rejected() {
        let mut config = film_processor("skip");
        config.model = Some("imdb_series".to_string());
        let err = Processor::new(config, None).err().unwrap();
        assert!(err.to_string().contains("unknown model 'imdb_series'"));
    }

    #[tokio::test]
    async fn test_run_skips_invalid_records() {
        let schema = BuiltinSchema::ImdbFilm.validator().unwrap();
        let processor = Processor::new(film_processor("skip"), Some(schema)).unwrap();
        let mut source = VecSource(films());
        let mut sink = VecSink::default();

        let summary = processor
            .run_with(&mut source, Some(&mut sink))
            .await
            .unwrap();

        assert_eq!(
            summary,
            RunSummary {
                read: 3,
                rejected_raw: 1,
                rejected_processed: 0,
                written: 2,
            }
        );
        assert!(sink.flushed);
        assert_eq!(sink.records[0]["director_name"], "Michel Gondry");
        assert!(sink.records[0].get("director").is_none());
        assert_eq!(sink.records[1]["director_name"], Value::Null);
    }

    #[tokio::test]
    async fn test_run_stops_on_first_rejection() {
        let schema = BuiltinSchema::ImdbFilm.validator().unwrap();
        let processor = Processor::new(film_processor("stop"), Some(schema)).unwrap();
        let mut source = VecSource(films());
        let mut sink = VecSink::default();

        let err = processor
            .run_with(&mut source, Some(&mut sink))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::SchemaViolation { .. }));
        assert_eq!(sink.records.len(), 1);
    }

    #[tokio::test]
    async fn test_model_rejections_are_counted() {
        let mut config = film_processor("skip");
        config.transforms.push(TransformConfig::Drop {
            drop: vec!["title".to_string()],
        });
        let processor = Processor::new(config, None).unwrap();
        let mut source = VecSource(VecDeque::from([json!({"title": "heat"})]));

        let summary = processor.run_with(&mut source, None).await.unwrap();
        assert_eq!(summary.read, 1);
        assert_eq!(summary.rejected_processed, 1);
        assert_eq!(summary.written, 0);
    }
}
