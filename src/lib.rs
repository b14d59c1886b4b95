//! Load configuration files whose nested structures may live in other files.
//!
//! A field that the schema declares as a nested structure can hold either the
//! structure itself or a path to another config file (TOML, JSON, or YAML).
//! Referenced files are loaded and expanded recursively before the result is
//! deserialized with serde.

pub mod config;
mod error;

pub use config::{
    expand_config, load_config, validate_config, Config, ConfigError, ConfigPath, Expander,
    FieldShape, LoaderRegistry, RawTree, Schema, StructType,
};
pub use error::Error;
