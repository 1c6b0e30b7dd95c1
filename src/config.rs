//! Runtime configuration
//!
//! Resolution order: built-in defaults, then a JSON config file, then
//! `HUE_GALLERY_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{GalleryError, Result};
use crate::gallery::nearest::DEFAULT_LIMIT;

const APP_DIR: &str = "hue-gallery";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    /// SQLite gallery database
    pub database_path: PathBuf,
    /// Root directory of the local object store
    pub object_store_dir: PathBuf,
    /// Prefix for image references; `file://` URLs when absent
    pub public_base_url: Option<String>,
    /// Maximum images accepted in one upload
    pub max_batch_size: usize,
    /// Results returned by a nearest-hue query without a limit
    pub nearest_default_limit: usize,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            object_store_dir: default_object_store_dir(),
            public_base_url: None,
            max_batch_size: 10,
            nearest_default_limit: DEFAULT_LIMIT,
        }
    }
}

/// Get the path where the database should be stored
///
/// - Linux: ~/.local/share/hue-gallery/gallery.db
/// - macOS: ~/Library/Application Support/hue-gallery/gallery.db
/// - Windows: %APPDATA%\hue-gallery\gallery.db
fn default_database_path() -> PathBuf {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path.push("gallery.db");
    path
}

/// Returns ~/.cache/hue-gallery/objects on Linux
fn default_object_store_dir() -> PathBuf {
    let mut path = dirs::cache_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path.push("objects");
    path
}

/// Config file consulted when no explicit path is given
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.json"))
}

impl GalleryConfig {
    /// Load configuration from `config_path` (or the default location when
    /// it exists), then apply environment overrides.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let file = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        let mut config = match file {
            Some(path) => {
                debug!(path = %path.display(), "loading config file");
                let content = std::fs::read_to_string(&path)?;
                serde_json::from_str(&content).map_err(|e| {
                    GalleryError::validation(format!("invalid config {}: {}", path.display(), e))
                })?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `HUE_GALLERY_*` overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup("HUE_GALLERY_DB") {
            self.database_path = PathBuf::from(db);
        }
        if let Some(dir) = lookup("HUE_GALLERY_OBJECTS") {
            self.object_store_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("HUE_GALLERY_PUBLIC_URL") {
            self.public_base_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Some(max) = lookup("HUE_GALLERY_MAX_BATCH") {
            self.max_batch_size = max.trim().parse().map_err(|_| {
                GalleryError::validation(format!("HUE_GALLERY_MAX_BATCH={:?} is not a number", max))
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            return Err(GalleryError::validation("max_batch_size must be at least 1"));
        }
        if self.nearest_default_limit == 0 {
            return Err(GalleryError::validation("nearest_default_limit must be at least 1"));
        }
        Ok(())
    }
}
