use std::path::{Path, PathBuf};

use super::ConfigError;

/// A config file path together with the directory relative paths resolve against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPath {
    path: PathBuf,
    base_dir: Option<PathBuf>,
}

impl ConfigPath {
    /// A path that, if relative, resolves against the current working directory.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            base_dir: None,
        }
    }

    /// A path that, if relative, resolves against `base_dir`.
    pub fn relative_to(path: impl AsRef<Path>, base_dir: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            base_dir: Some(base_dir.as_ref().to_path_buf()),
        }
    }

    /// The path of a file referenced from inside `referrer`.
    pub(crate) fn referenced_from(reference: &str, referrer: &Path) -> Self {
        match referrer.parent() {
            Some(dir) => Self::relative_to(reference, dir),
            None => Self::new(reference),
        }
    }

    /// The path as given, before resolution.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the absolute form of this path.
    ///
    /// Absolute paths are returned unchanged. The path is not required to exist.
    pub fn resolve(&self) -> Result<PathBuf, ConfigError> {
        if self.path.is_absolute() {
            return Ok(self.path.clone());
        }
        let base = match &self.base_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => current_dir(&self.path)?.join(dir),
            None => current_dir(&self.path)?,
        };
        Ok(base.join(&self.path))
    }
}

fn current_dir(path: &Path) -> Result<PathBuf, ConfigError> {
    std::env::current_dir().map_err(|e| ConfigError::CurrentDir {
        path: path.to_path_buf(),
        source: e,
    })
}
