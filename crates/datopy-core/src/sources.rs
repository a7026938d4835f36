//! Record sources and sinks
//!
//! Sources feed raw records into a processor; sinks load processed records.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::normalize::{json_normalize, write_csv};

/// A record read from or written to a connector
#[derive(Debug, Clone)]
pub struct Record {
    /// Record payload as JSON
    pub payload: Value,

    /// Record metadata
    pub metadata: RecordMetadata,
}

impl Record {
    /// Wrap a bare payload
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            metadata: RecordMetadata::default(),
        }
    }
}

/// Record metadata
#[derive(Debug, Clone, Default)]
pub struct RecordMetadata {
    /// Source path or name
    pub source: Option<String>,

    /// 1-based position of the record in its source
    pub line: Option<usize>,
}

/// Trait for record sources
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Pull the next record, or `None` once the source is exhausted
    async fn pull(&mut self) -> Result<Option<Record>>;
}

/// Trait for record sinks
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Push a record to the sink
    async fn push(&mut self, record: Record) -> Result<()>;

    /// Flush any buffered records
    async fn flush(&mut self) -> Result<()>;
}

/// Source configuration from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Local record file
    File(FileSourceConfig),
}

/// Record file layout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// One JSON document per line
    #[default]
    Jsonl,
    /// A single JSON array or object
    Json,
}

impl FileFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some("json") => Self::Json,
            _ => Self::Jsonl,
        }
    }
}

/// File source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSourceConfig {
    /// File path
    pub path: String,

    /// Format: jsonl or json
    #[serde(default)]
    pub format: FileFormat,
}

/// Sink configuration from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfig {
    /// One compact JSON document per line
    Jsonl(FileSinkConfig),

    /// Flattened table with a union header
    Csv(FileSinkConfig),
}

/// File sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSinkConfig {
    /// Output file path
    pub path: String,
}

impl SourceConfig {
    /// Open the configured source, resolving relative paths against `base`
    pub fn open(&self, base: &Path) -> Box<dyn RecordSource> {
        match self {
            Self::File(config) => {
                let mut config = config.clone();
                config.path = base.join(&config.path).display().to_string();
                Box::new(FileSource::new(config))
            }
        }
    }
}

impl SinkConfig {
    /// Open the configured sink, resolving relative paths against `base`
    pub fn open(&self, base: &Path) -> Box<dyn RecordSink> {
        match self {
            Self::Jsonl(config) => Box::new(JsonlSink::new(base.join(&config.path))),
            Self::Csv(config) => Box::new(CsvSink::new(base.join(&config.path))),
        }
    }
}

// ============================================================================
// File Source
// ============================================================================

/// File-based record source
pub struct FileSource {
    config: FileSourceConfig,
    reader: Option<BufReader<std::fs::File>>,
    pending: Option<VecDeque<Value>>,
    line_number: usize,
}

impl FileSource {
    /// Create a new file source
    pub fn new(config: FileSourceConfig) -> Self {
        Self {
            config,
            reader: None,
            pending: None,
            line_number: 0,
        }
    }

    fn source_error(&self, message: impl Into<String>) -> Error {
        Error::SourceError {
            source_name: self.config.path.clone(),
            message: message.into(),
        }
    }

    fn record(&mut self, payload: Value) -> Record {
        self.line_number += 1;
        Record {
            payload,
            metadata: RecordMetadata {
                source: Some(self.config.path.clone()),
                line: Some(self.line_number),
            },
        }
    }

    fn pull_jsonl(&mut self) -> Result<Option<Record>> {
        if self.reader.is_none() {
            let file = std::fs::File::open(&self.config.path)?;
            self.reader = Some(BufReader::new(file));
        }
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        let mut line = String::new();
        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line)?;
            if bytes_read == 0 {
                return Ok(None);
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let payload: Value = serde_json::from_str(trimmed).map_err(|e| {
                self.source_error(format!("record {}: {e}", self.line_number + 1))
            })?;
            return Ok(Some(self.record(payload)));
        }
    }

    fn pull_json(&mut self) -> Result<Option<Record>> {
        if self.pending.is_none() {
            let contents = std::fs::read_to_string(&self.config.path)?;
            let document: Value = serde_json::from_str(&contents)
                .map_err(|e| self.source_error(e.to_string()))?;
            let items = match document {
                Value::Array(items) => items.into(),
                other => VecDeque::from([other]),
            };
            self.pending = Some(items);
        }
        let next = self.pending.as_mut().and_then(VecDeque::pop_front);
        Ok(next.map(|payload| self.record(payload)))
    }
}

#[async_trait]
impl RecordSource for FileSource {
    async fn pull(&mut self) -> Result<Option<Record>> {
        match self.config.format {
            FileFormat::Jsonl => self.pull_jsonl(),
            FileFormat::Json => self.pull_json(),
        }
    }
}

/// Read every record from a file, choosing the format from its extension
pub async fn read_records(path: impl AsRef<Path>) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let mut source = FileSource::new(FileSourceConfig {
        path: path.display().to_string(),
        format: FileFormat::from_path(path),
    });
    let mut records = Vec::new();
    while let Some(record) = source.pull().await? {
        records.push(record);
    }
    Ok(records)
}

// ============================================================================
// File Sinks
// ============================================================================

fn create_with_parents(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(std::fs::File::create(path)?)
}

/// JSON-lines sink
pub struct JsonlSink {
    path: std::path::PathBuf,
    writer: Option<BufWriter<std::fs::File>>,
}

impl JsonlSink {
    /// Create a new JSON-lines sink
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
        }
    }
}

#[async_trait]
impl RecordSink for JsonlSink {
    async fn push(&mut self, record: Record) -> Result<()> {
        if self.writer.is_none() {
            self.writer = Some(BufWriter::new(create_with_parents(&self.path)?));
        }
        if let Some(writer) = self.writer.as_mut() {
            let line = serde_json::to_string(&record.payload)?;
            writeln!(writer, "{}", line)?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

/// CSV sink; rows are buffered so the header covers every column
pub struct CsvSink {
    path: std::path::PathBuf,
    rows: Vec<Map<String, Value>>,
}

impl CsvSink {
    /// Create a new CSV sink
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            path: path.into(),
            rows: Vec::new(),
        }
    }
}

#[async_trait]
impl RecordSink for CsvSink {
    async fn push(&mut self, record: Record) -> Result<()> {
        self.rows.push(json_normalize(&record.payload));
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        let file = create_with_parents(&self.path)?;
        write_csv(&self.rows, BufWriter::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_file_source() {
        let yaml = r#"
type: file
path: "./data/albums.jsonl"
format: jsonl
"#;
        let config: SourceConfig = serde_yaml::from_str(yaml).unwrap();
        match config {
            SourceConfig::File(f) => {
                assert_eq!(f.path, "./data/albums.jsonl");
                assert_eq!(f.format, FileFormat::Jsonl);
            }
        }
    }

    #[test]
    fn test_parse_file_source_default_format() {
        let yaml = r#"
type: file
path: "./data/films.jsonl"
"#;
        let SourceConfig::File(f) = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(f.format, FileFormat::Jsonl);
    }

    #[test]
    fn test_parse_sinks() {
        let csv: SinkConfig = serde_yaml::from_str("type: csv\npath: out/films.csv\n").unwrap();
        assert!(matches!(csv, SinkConfig::Csv(ref f) if f.path == "out/films.csv"));
        let jsonl: SinkConfig = serde_yaml::from_str("type: jsonl\npath: out/films.jsonl\n").unwrap();
        assert!(matches!(jsonl, SinkConfig::Jsonl(_)));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(FileFormat::from_path("a/b.json"), FileFormat::Json);
        assert_eq!(FileFormat::from_path("a/b.jsonl"), FileFormat::Jsonl);
        assert_eq!(FileFormat::from_path("a/b"), FileFormat::Jsonl);
    }

    #[tokio::test]
    async fn test_file_source_reads_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("films.jsonl");
        std::fs::write(
            &path,
            "{\"title\":\"Spirited Away\",\"year\":2001}\n\n{\"title\":\"Heat\",\"year\":1995}\n",
        )
        .unwrap();

        let mut source = FileSource::new(FileSourceConfig {
            path: path.to_str().unwrap().to_string(),
            format: FileFormat::Jsonl,
        });

        let first = source.pull().await.unwrap().unwrap();
        assert_eq!(first.payload["title"], "Spirited Away");
        assert_eq!(first.metadata.line, Some(1));
        assert_eq!(first.metadata.source.as_deref(), path.to_str());

        let second = source.pull().await.unwrap().unwrap();
        assert_eq!(second.payload["year"], 1995);
        assert_eq!(second.metadata.line, Some(2));

        assert!(source.pull().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_source_reads_json_array_and_object() {
        let dir = tempfile::tempdir().unwrap();
        let array = dir.path().join("many.json");
        std::fs::write(&array, r#"[{"a": 1}, {"a": 2}]"#).unwrap();
        let single = dir.path().join("one.json");
        std::fs::write(&single, r#"{"a": 3}"#).unwrap();

        let records = read_records(&array).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].payload["a"], 2);

        let records = read_records(&single).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload["a"], 3);
    }

    #[tokio::test]
    async fn test_file_source_bad_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "{\"a\":1}\nnot json\n").unwrap();

        let mut source = FileSource::new(FileSourceConfig {
            path: path.to_str().unwrap().to_string(),
            format: FileFormat::Jsonl,
        });
        assert!(source.pull().await.unwrap().is_some());
        let err = source.pull().await.unwrap_err();
        assert!(err.to_string().contains("record 2"));
    }

    #[tokio::test]
    async fn test_jsonl_sink_writes_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.jsonl");
        let mut sink = JsonlSink::new(&path);

        sink.push(Record::new(json!({"x": 1}))).await.unwrap();
        sink.push(Record::new(json!({"x": 2}))).await.unwrap();
        sink.flush().await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.trim().split('\n').collect();
        assert_eq!(lines, ["{\"x\":1}", "{\"x\":2}"]);
    }

    #[tokio::test]
    async fn test_csv_sink_writes_union_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut sink = CsvSink::new(&path);

        sink.push(Record::new(json!({"title": "heat", "box": {"budget": 60}})))
            .await
            .unwrap();
        sink.push(Record::new(json!({"title": "ran", "year": 1985})))
            .await
            .unwrap();
        sink.flush().await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, ["title,box.budget,year", "heat,60,", "ran,,1985"]);
    }

    #[tokio::test]
    async fn test_csv_sink_without_records_writes_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty/out.csv");
        let mut sink = CsvSink::new(&path);

        sink.flush().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
