//! Processing step interpreter
//!
//! Applies processing steps directly to JSON records.

use regex::Regex;
use serde_json::{Map, Value};
use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::etl::omit_string_patterns;
use crate::modeling::list_to_dict;
use crate::normalize::json_normalize;
use crate::transforms::{OmitPatternsConfig, OnNoMatch, RegexConfig, TransformConfig};

/// Apply a sequence of steps to an input record.
pub fn apply_transforms(input: &Value, transforms: &[TransformConfig]) -> Result<Value> {
    let mut current = input.clone();
    for transform in transforms {
        current = apply_one(&current, transform)?;
    }
    Ok(current)
}

fn apply_one(input: &Value, transform: &TransformConfig) -> Result<Value> {
    let obj = input.as_object().ok_or_else(|| Error::TransformError {
        transform: transform.kind().to_string(),
        message: "input is not a JSON object".to_string(),
    })?;

    match transform {
        TransformConfig::Map { map } => Ok(apply_map(obj, map)),
        TransformConfig::Drop { drop } => Ok(apply_drop(obj, drop)),
        TransformConfig::AddFields { add_fields } => Ok(apply_add_fields(obj, add_fields)),
        TransformConfig::Coalesce { coalesce } => Ok(apply_coalesce(obj, coalesce)),
        TransformConfig::OmitPatterns { omit_patterns } => apply_omit_patterns(obj, omit_patterns),
        TransformConfig::Regex { regex } => apply_regex(obj, regex),
        TransformConfig::IndexItems { index_items } => Ok(apply_index_items(obj, index_items)),
        TransformConfig::Flatten { flatten: true } => Ok(Value::Object(json_normalize(input))),
        TransformConfig::Flatten { flatten: false } => Ok(input.clone()),
    }
}

/// Resolve a field name, falling back to a dotted path through nested values
fn lookup<'a>(obj: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    if let Some(value) = obj.get(path) {
        return Some(value);
    }
    let mut segments = path.split('.');
    let mut current = obj.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn apply_map(obj: &Map<String, Value>, mappings: &IndexMap<String, String>) -> Value {
    let mut output = obj.clone();
    for (output_field, input_field) in mappings {
        let value = lookup(obj, input_field).cloned().unwrap_or(Value::Null);
        output.insert(output_field.clone(), value);
    }
    Value::Object(output)
}

fn apply_drop(obj: &Map<String, Value>, fields: &[String]) -> Value {
    let mut output = obj.clone();
    for field in fields {
        output.shift_remove(field);
    }
    Value::Object(output)
}

fn apply_add_fields(obj: &Map<String, Value>, fields: &IndexMap<String, Value>) -> Value {
    let mut output = obj.clone();
    for (key, value) in fields {
        output.insert(key.clone(), value.clone());
    }
    Value::Object(output)
}

fn apply_coalesce(obj: &Map<String, Value>, mappings: &IndexMap<String, Vec<String>>) -> Value {
    let mut output = obj.clone();
    for (output_field, source_fields) in mappings {
        let value = source_fields
            .iter()
            .find_map(|f| lookup(obj, f).filter(|v| !v.is_null()).cloned())
            .unwrap_or(Value::Null);
        output.insert(output_field.clone(), value);
    }
    Value::Object(output)
}

fn apply_omit_patterns(obj: &Map<String, Value>, config: &OmitPatternsConfig) -> Result<Value> {
    let mut output = obj.clone();
    match obj.get(&config.field) {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) => {
            let cleaned = omit_string_patterns(s, &config.patterns);
            output.insert(config.field.clone(), Value::String(cleaned));
        }
        Some(_) => {
            return Err(Error::TransformError {
                transform: "omit_patterns".to_string(),
                message: format!("field '{}' is not a string", config.field),
            });
        }
    }
    Ok(Value::Object(output))
}

fn apply_regex(obj: &Map<String, Value>, config: &RegexConfig) -> Result<Value> {
    let re = Regex::new(&config.pattern).map_err(|e| Error::TransformError {
        transform: "regex".to_string(),
        message: format!("invalid pattern '{}': {e}", config.pattern),
    })?;

    let text = lookup(obj, &config.field).and_then(Value::as_str);
    let caps = text.and_then(|t| re.captures(t));

    let mut output = obj.clone();
    match caps {
        Some(caps) => {
            for (output_field, group) in &config.captures {
                let matched = match group.parse::<usize>() {
                    Ok(idx) => caps.get(idx),
                    Err(_) => caps.name(group),
                };
                let value = matched
                    .map(|m| Value::String(m.as_str().to_string()))
                    .unwrap_or(Value::Null);
                output.insert(output_field.clone(), value);
            }
        }
        None => match config.on_no_match {
            OnNoMatch::Null => {
                for output_field in config.captures.keys() {
                    output.insert(output_field.clone(), Value::Null);
                }
            }
            OnNoMatch::Skip => {}
            OnNoMatch::Error => {
                return Err(Error::TransformError {
                    transform: "regex".to_string(),
                    message: format!(
                        "pattern '{}' did not match field '{}'",
                        config.pattern, config.field
                    ),
                });
            }
        },
    }
    Ok(Value::Object(output))
}

fn apply_index_items(obj: &Map<String, Value>, fields: &[String]) -> Value {
    let mut output = obj.clone();
    for field in fields {
        if let Some(value) = obj.get(field) {
            output.insert(field.clone(), list_to_dict(value, None));
        }
    }
    Value::Object(output)
}
