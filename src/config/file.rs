//! Built-in file format loaders.
//!
//! Every loader reads a file and returns its top-level table as a [`RawTree`],
//! keeping the key order of the source document.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use super::error::BoxError;
use super::RawTree;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FileError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[source] BoxError),

    #[error("top level of the document must be a table, found {0}")]
    NotATable(&'static str),
}

/// Loads a TOML config file.
pub fn load_toml(path: &Path) -> Result<RawTree, FileError> {
    let contents = read(path)?;
    let table: toml::Table = toml::from_str(&contents)?;
    Ok(table
        .into_iter()
        .map(|(key, value)| (key, toml_to_raw(value)))
        .collect())
}

/// Loads a JSON config file.
pub fn load_json(path: &Path) -> Result<RawTree, FileError> {
    let contents = read(path)?;
    into_tree(serde_json::from_str(&contents)?)
}

/// Loads a YAML config file.
///
/// Merge keys (`<<: *anchor`) are applied before conversion.
#[cfg(feature = "yaml")]
pub fn load_yaml(path: &Path) -> Result<RawTree, FileError> {
    let contents = read(path)?;
    let mut value: serde_yaml::Value =
        serde_yaml::from_str(&contents).map_err(|e| FileError::Yaml(Box::new(e)))?;
    value.apply_merge().map_err(|e| FileError::Yaml(Box::new(e)))?;
    let value = serde_json::to_value(value).map_err(|e| FileError::Yaml(Box::new(e)))?;
    into_tree(value)
}

fn read(path: &Path) -> Result<String, FileError> {
    std::fs::read_to_string(path).map_err(|e| FileError::Read {
        path: path.to_path_buf(),
        source: e,
    })
}

fn into_tree(value: Value) -> Result<RawTree, FileError> {
    match value {
        Value::Object(map) => Ok(map),
        // An empty YAML document parses as null.
        Value::Null => Ok(RawTree::new()),
        other => Err(FileError::NotATable(kind(&other))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a table",
    }
}

fn toml_to_raw(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        // Non-finite floats have no JSON form and become null.
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_raw).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, toml_to_raw(value)))
                .collect(),
        ),
    }
}
