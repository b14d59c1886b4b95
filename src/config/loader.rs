//! Registry mapping file extensions to format loaders.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::error::BoxError;
use super::{file, ConfigError, RawTree};

/// A format loader: reads the file at an absolute path into a [`RawTree`].
pub type Loader = Arc<dyn Fn(&Path) -> Result<RawTree, BoxError> + Send + Sync>;

/// Maps file extensions to loaders.
///
/// The default registry knows `toml` and `json`, plus `yaml` and `yml` when
/// the `yaml` feature is enabled. Extensions may be given with or without a
/// leading dot.
///
/// Extensions are matched case-insensitively, so `HOUSE.TOML` loads with the
/// `toml` loader. This is a deliberate departure from exact suffix matching:
/// registering `"TOML"` and `"toml"` names the same slot.
///
/// ```
/// use nested_config::{LoaderRegistry, RawTree};
///
/// let mut registry = LoaderRegistry::default();
/// registry.register(".conf", |_path: &std::path::Path| {
///     Ok::<_, std::io::Error>(RawTree::new())
/// });
/// assert!(registry.contains("conf"));
/// ```
#[derive(Clone)]
pub struct LoaderRegistry {
    loaders: HashMap<String, Loader>,
}

impl LoaderRegistry {
    /// Creates a registry with no loaders at all.
    pub fn empty() -> Self {
        Self {
            loaders: HashMap::new(),
        }
    }

    /// Adds a loader for `extension`, replacing any existing one.
    pub fn register<F, E>(&mut self, extension: &str, loader: F) -> &mut Self
    where
        F: Fn(&Path) -> Result<RawTree, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let loader: Loader = Arc::new(move |path: &Path| -> Result<RawTree, BoxError> {
            loader(path).map_err(Into::into)
        });
        self.loaders.insert(normalize(extension), loader);
        self
    }

    /// Whether a loader is registered for `extension`.
    pub fn contains(&self, extension: &str) -> bool {
        self.loaders.contains_key(&normalize(extension))
    }

    /// Finds the loader for `extension`, falling back to `default` if given.
    ///
    /// `path` is only used for the error message.
    pub fn resolve(
        &self,
        path: &Path,
        extension: Option<&str>,
        default: Option<&str>,
    ) -> Result<&Loader, ConfigError> {
        extension
            .and_then(|ext| self.loaders.get(&normalize(ext)))
            .or_else(|| default.and_then(|ext| self.loaders.get(&normalize(ext))))
            .ok_or_else(|| ConfigError::NoLoader {
                path: path.to_path_buf(),
                extension: extension.unwrap_or_default().to_string(),
            })
    }

    /// Loads `path` with the loader registered for its extension.
    ///
    /// If there is no loader for the extension, or the file has none, the
    /// loader for `default_suffix` is used instead.
    pub fn load(&self, path: &Path, default_suffix: Option<&str>) -> Result<RawTree, ConfigError> {
        let extension = path.extension().and_then(|ext| ext.to_str());
        let loader = self.resolve(path, extension, default_suffix)?;
        debug!(path = %path.display(), "loading config file");
        loader(path).map_err(|source| ConfigError::Load {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("toml", file::load_toml);
        registry.register("json", file::load_json);
        #[cfg(feature = "yaml")]
        {
            registry.register("yaml", file::load_yaml);
            registry.register("yml", file::load_yaml);
        }
        registry
    }
}

impl fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut extensions: Vec<_> = self.loaders.keys().collect();
        extensions.sort();
        f.debug_struct("LoaderRegistry")
            .field("extensions", &extensions)
            .finish()
    }
}

fn normalize(extension: &str) -> String {
    extension.trim_start_matches('.').to_ascii_lowercase()
}
