//! Flatten nested records into table rows

use serde_json::{Map, Value};
use std::io::Write;

use crate::error::Result;

/// Column used when the record itself is not an object
pub const SCALAR_COLUMN: &str = "value";

/// Flatten nested objects into dotted column names.
///
/// Arrays and scalars are kept as leaf values. Empty objects produce no
/// column.
pub fn json_normalize(value: &Value) -> Map<String, Value> {
    let mut row = Map::new();
    match value {
        Value::Object(map) => flatten_into(&mut row, None, map),
        other => {
            row.insert(SCALAR_COLUMN.to_string(), other.clone());
        }
    }
    row
}

fn flatten_into(row: &mut Map<String, Value>, prefix: Option<&str>, map: &Map<String, Value>) {
    for (key, value) in map {
        let column = match prefix {
            Some(p) => format!("{p}.{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(nested) => flatten_into(row, Some(&column), nested),
            other => {
                row.insert(column, other.clone());
            }
        }
    }
}

/// Union of all row columns in first-seen order
pub fn columns(rows: &[Map<String, Value>]) -> Vec<String> {
    let mut header: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !header.iter().any(|h| h == key) {
                header.push(key.clone());
            }
        }
    }
    header
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Write flattened rows as CSV with a union header
pub fn write_csv<W: Write>(rows: &[Map<String, Value>], writer: W) -> Result<()> {
    let header = columns(rows);
    if header.is_empty() {
        return Ok(());
    }
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(&header)?;
    for row in rows {
        csv_writer.write_record(header.iter().map(|column| cell(row.get(column))))?;
    }
    csv_writer.flush()?;
    Ok(())
}
