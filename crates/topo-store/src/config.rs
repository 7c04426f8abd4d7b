//! Storage location configuration

use std::path::{Path, PathBuf};

use crate::error::{StoreError, StoreResult};

/// Environment variable overriding the storage root
pub const HOME_ENV: &str = "TOPOCTL_HOME";

/// Directory name used under the user's home when no override is given
pub const DEFAULT_DIR_NAME: &str = ".topoctl";

/// Where cluster metadata lives
///
/// Layout: `<root>/clusters/<name>/meta.yaml`, with previous records kept
/// under `<root>/clusters/<name>/backup/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Storage root
    pub root: PathBuf,
}

impl StoreConfig {
    /// Use an explicit root
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the root: explicit override, then `TOPOCTL_HOME`, then `~/.topoctl`
    ///
    /// # Errors
    /// Returns error if no override is given and the home directory is unknown.
    pub fn resolve(explicit: Option<&Path>) -> StoreResult<Self> {
        if let Some(root) = explicit {
            return Ok(Self::new(root));
        }
        if let Some(root) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(root));
        }
        let home = dirs::home_dir().ok_or_else(|| {
            StoreError::io_error(
                DEFAULT_DIR_NAME,
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "could not determine home directory",
                ),
            )
        })?;
        Ok(Self::new(home.join(DEFAULT_DIR_NAME)))
    }

    /// Directory holding every cluster
    #[inline]
    #[must_use]
    pub fn clusters_dir(&self) -> PathBuf {
        self.root.join("clusters")
    }

    /// Directory of one cluster
    #[inline]
    #[must_use]
    pub fn cluster_dir(&self, name: &str) -> PathBuf {
        self.clusters_dir().join(name)
    }

    /// Metadata file of one cluster
    #[inline]
    #[must_use]
    pub fn meta_path(&self, name: &str) -> PathBuf {
        self.cluster_dir(name).join("meta.yaml")
    }

    /// Backup directory of one cluster
    #[inline]
    #[must_use]
    pub fn backup_dir(&self, name: &str) -> PathBuf {
        self.cluster_dir(name).join("backup")
    }
}
