use std::path::PathBuf;

use thiserror::Error;

/// Boxed error returned by a format loader.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("no loader for file extension '{extension}' of config file '{path}'")]
    NoLoader { path: PathBuf, extension: String },

    #[error("failed to load config file '{path}': {source}")]
    Load { path: PathBuf, source: BoxError },

    #[error(
        "config file '{referrer}' contains a path to another config file '{reference}' \
         (field '{field}') that could not be found"
    )]
    MissingFile {
        referrer: PathBuf,
        field: String,
        reference: String,
    },

    #[error("config file '{path}' sets field '{field}', which is not declared on {type_name}")]
    UnknownField {
        path: PathBuf,
        type_name: &'static str,
        field: String,
    },

    #[error("circular reference to config file '{path}' (chain: {})", display_chain(.chain))]
    CyclicReference { path: PathBuf, chain: Vec<PathBuf> },

    #[error("in config file '{referrer}', field '{field}': {source}")]
    Reference {
        referrer: PathBuf,
        field: String,
        source: Box<ConfigError>,
    },

    #[error("no root config file was given")]
    NoFile,

    #[error("cannot resolve relative config path '{path}': {source}")]
    CurrentDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Returns the innermost error, skipping over [`ConfigError::Reference`] links.
    pub fn root_cause(&self) -> &ConfigError {
        let mut current = self;
        while let ConfigError::Reference { source, .. } = current {
            current = source;
        }
        current
    }
}

fn display_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
