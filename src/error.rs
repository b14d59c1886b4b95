use std::path::PathBuf;

use crate::config::ConfigError;
use thiserror::Error;

/// Top-level error type for the nested-config library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// `field` is the dotted location in the expanded tree, which may come
    /// from a file referenced by `path` rather than `path` itself.
    #[error("config loaded from '{path}' is invalid at '{field}': {source}")]
    Validation {
        path: PathBuf,
        field: String,
        source: serde_json::Error,
    },
}
