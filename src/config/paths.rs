//! Path resolution for mecal configuration and data files.
//!
//! All mecal data is stored in `~/.mecal/` (or `$MECAL_HOME`):
//! - `config.yaml` - Main configuration file
//! - `mecal.db` - SQLite database for the sync queue and local cache

use std::path::PathBuf;

use crate::error::MecalError;

/// Environment variable that overrides the data root.
pub const HOME_ENV: &str = "MECAL_HOME";

/// Paths to mecal configuration and data files.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root directory: `~/.mecal/`
    pub root: PathBuf,
    /// Config file: `~/.mecal/config.yaml`
    pub config_file: PathBuf,
    /// Database file: `~/.mecal/mecal.db`
    pub database: PathBuf,
}

impl Paths {
    /// Resolve paths from `$MECAL_HOME`, falling back to `$HOME/.mecal`.
    ///
    /// # Errors
    ///
    /// Returns an error if neither variable is set.
    pub fn new() -> Result<Self, MecalError> {
        if let Some(root) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::with_root(PathBuf::from(root)));
        }

        let home = std::env::var("HOME").map_err(|_| {
            MecalError::Config("Could not determine home directory".to_string())
        })?;

        Ok(Self::with_root(PathBuf::from(home).join(".mecal")))
    }

    /// Create paths with a custom root directory.
    #[must_use]
    pub fn with_root(root: PathBuf) -> Self {
        Self {
            config_file: root.join("config.yaml"),
            database: root.join("mecal.db"),
            root,
        }
    }

    /// Ensure the root directory exists.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails.
    pub fn ensure_dirs(&self) -> Result<(), MecalError> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root).map_err(|e| {
                MecalError::Config(format!(
                    "Failed to create directory {}: {e}",
                    self.root.display()
                ))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths_with_root() {
        let root = PathBuf::from("/tmp/test-mecal");
        let paths = Paths::with_root(root.clone());

        assert_eq!(paths.root, root);
        assert_eq!(paths.config_file, root.join("config.yaml"));
        assert_eq!(paths.database, root.join("mecal.db"));
    }

    #[test]
    fn test_ensure_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let paths = Paths::with_root(temp_dir.path().join("nested").join("mecal"));

        paths.ensure_dirs().unwrap();
        assert!(paths.root.exists());

        // Second call is a no-op
        paths.ensure_dirs().unwrap();
    }
}
