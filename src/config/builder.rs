use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::BoxError;
use super::schema::{Schema, StructType};
use super::{ConfigError, ConfigPath, Expander, LoaderRegistry, RawTree};
use crate::Error;

/// Builder for loading a config file whose nested structures may live in other files.
///
/// Wherever the schema of `T` expects a nested structure, the file may give a
/// path to another config file instead. Relative paths are resolved against
/// the directory of the file that contains them.
///
/// ```toml
/// # house.toml
/// name = "Mom's house"
/// dimensions = "dims.toml"
/// ```
///
/// ## Example
///
/// ```no_run
/// use nested_config::{config_schema, Config, FieldShape};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Dimensions {
///     length: u32,
///     width: u32,
///     height: u32,
/// }
///
/// #[derive(Deserialize)]
/// struct House {
///     name: String,
///     dimensions: Dimensions,
/// }
///
/// config_schema!(Dimensions {
///     "length" => FieldShape::Scalar,
///     "width" => FieldShape::Scalar,
///     "height" => FieldShape::Scalar,
/// });
///
/// config_schema!(House {
///     "name" => FieldShape::Scalar,
///     "dimensions" => FieldShape::nested::<Dimensions>(),
/// });
///
/// let house: House = Config::builder()
///     .with_file("house.toml")
///     .build()?;
/// # Ok::<(), nested_config::Error>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct Config {
    file: Option<PathBuf>,
    default_suffix: Option<String>,
    registry: LoaderRegistry,
}

impl Config {
    /// Creates a new configuration builder with the default loaders.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Sets the root config file.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the extension to load with when a file's own extension has no
    /// loader, or the file has none (e.g. `"toml"` or `".yml"`).
    pub fn with_default_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.default_suffix = Some(suffix.into());
        self
    }

    /// Replaces the loader registry.
    pub fn with_registry(mut self, registry: LoaderRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Adds a loader for `extension` to the registry.
    pub fn with_loader<F, E>(mut self, extension: &str, loader: F) -> Self
    where
        F: Fn(&Path) -> Result<RawTree, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.registry.register(extension, loader);
        self
    }

    /// Loads the root file and expands its path references against the schema
    /// of `T`, without validating the result.
    pub fn expand<T: Schema + ?Sized + 'static>(&self) -> Result<RawTree, ConfigError> {
        let file = self.file.as_deref().ok_or(ConfigError::NoFile)?;
        self.expander()
            .expand(&ConfigPath::new(file), StructType::of::<T>())
    }

    /// Loads, expands, and deserializes the configuration into `T`.
    pub fn build<T: Schema + DeserializeOwned + 'static>(self) -> Result<T, Error> {
        let tree = self.expand::<T>()?;
        let path = self.file.unwrap_or_default();
        validate(path, tree)
    }

    fn expander(&self) -> Expander<'_> {
        let expander = Expander::new(&self.registry);
        match &self.default_suffix {
            Some(suffix) => expander.with_default_suffix(suffix.clone()),
            None => expander,
        }
    }
}

/// Deserializes an expanded tree into `T`.
///
/// On failure the error names the field that did not match, e.g.
/// `dimensions.width`. `path` is the root file and only appears in the error.
pub fn validate<T: DeserializeOwned>(path: impl Into<PathBuf>, tree: RawTree) -> Result<T, Error> {
    serde_path_to_error::deserialize(Value::Object(tree)).map_err(|e| Error::Validation {
        path: path.into(),
        field: e.path().to_string(),
        source: e.into_inner(),
    })
}

/// Loads a config file into `T`, expanding path references to other config files.
pub fn validate_config<T: Schema + DeserializeOwned + 'static>(
    path: impl AsRef<Path>,
    default_suffix: Option<&str>,
) -> Result<T, Error> {
    let mut builder = Config::builder().with_file(path);
    if let Some(suffix) = default_suffix {
        builder = builder.with_default_suffix(suffix);
    }
    builder.build()
}

/// Loads a config file and expands its path references against `ty`.
pub fn expand_config(
    path: impl AsRef<Path>,
    ty: StructType,
    default_suffix: Option<&str>,
) -> Result<RawTree, ConfigError> {
    let registry = LoaderRegistry::default();
    let mut expander = Expander::new(&registry);
    if let Some(suffix) = default_suffix {
        expander = expander.with_default_suffix(suffix);
    }
    expander.expand(&ConfigPath::new(path), ty)
}

/// Loads a single config file as-is, without expanding path references.
pub fn load_config(
    path: impl AsRef<Path>,
    default_suffix: Option<&str>,
) -> Result<RawTree, ConfigError> {
    let path = ConfigPath::new(path).resolve()?;
    LoaderRegistry::default().load(&path, default_suffix)
}
