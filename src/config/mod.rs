//! Configuration loading and path-reference expansion.

mod builder;
mod error;
mod expand;
pub mod file;
mod loader;
mod path;
mod schema;

pub use builder::{expand_config, load_config, validate, validate_config, Config};
pub use error::{BoxError, ConfigError};
pub use expand::Expander;
pub use loader::{Loader, LoaderRegistry};
pub use path::ConfigPath;
pub use schema::{field_shape, FieldShape, Schema, StructType};

/// A parsed config file: an ordered map of field names to values.
pub type RawTree = serde_json::Map<String, serde_json::Value>;
