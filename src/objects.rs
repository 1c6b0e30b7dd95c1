//! Object store for uploaded image bytes
//!
//! The core hands every uploaded image to an `ObjectStore` and keeps only
//! the returned reference and pixel dimensions.

use async_trait::async_trait;
use chrono::Utc;
use image::ImageReader;
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::error::{GalleryError, Result};

/// Where an uploaded image ended up, and how big it is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Durable reference (URL) to the stored bytes
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// Accepts raw image bytes and returns a durable reference to them
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, file_name: &str, bytes: &[u8]) -> Result<StoredObject>;
}

/// Object store that writes images under a local directory.
///
/// Keys are `{digest}-{millis}-{seq}.{ext}`, so uploading the same bytes
/// twice yields two distinct references.
#[derive(Debug)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: Option<String>,
    seq: AtomicU64,
}

impl LocalObjectStore {
    /// Store objects under `root`; references are `file://` URLs unless
    /// `public_base_url` is given.
    pub fn new(root: impl Into<PathBuf>, public_base_url: Option<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.map(|u| u.trim_end_matches('/').to_string()),
            seq: AtomicU64::new(0),
        }
    }

    /// Root directory objects are written to
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_key(&self, bytes: &[u8], extension: &str) -> String {
        let digest = format!("{:x}", Sha256::digest(bytes));
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        format!(
            "{}-{}-{}.{}",
            &digest[..16],
            Utc::now().timestamp_millis(),
            seq,
            extension
        )
    }

    fn reference_for(&self, key: &str, path: &Path) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base, key),
            None => format!("file://{}", path.display()),
        }
    }
}

/// Read format and pixel dimensions from the image header.
///
/// Bytes that are not a recognizable image are the client's fault and
/// surface as validation errors.
fn probe(bytes: &[u8]) -> Result<(&'static str, u32, u32)> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| GalleryError::upstream("object store", "could not read upload", e))?;

    let extension = reader
        .format()
        .and_then(|f| f.extensions_str().first().copied())
        .ok_or_else(|| GalleryError::validation("upload is not a supported image format"))?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| GalleryError::validation(format!("could not read image size: {}", e)))?;

    if width == 0 || height == 0 {
        return Err(GalleryError::validation("image has no pixels"));
    }
    Ok((extension, width, height))
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(&self, file_name: &str, bytes: &[u8]) -> Result<StoredObject> {
        let (extension, width, height) = probe(bytes)?;

        tokio::fs::create_dir_all(&self.root).await?;
        let key = self.object_key(bytes, extension);
        let path = self.root.join(&key);
        tokio::fs::write(&path, bytes).await?;

        debug!(file_name, key = %key, width, height, "object stored");
        Ok(StoredObject {
            url: self.reference_for(&key, &path),
            width,
            height,
        })
    }
}
