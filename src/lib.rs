//! # Hue Gallery
//!
//! Gallery ingestion and hue-similarity search for an art marketplace.
//!
//! - Uploads are paired with their name, price and tags, stored in an
//!   object store, and tagged with the image's dominant hue
//! - Owners can feature up to three entries in ranked slots
//! - Any hue can be matched against every gallery by circular distance
//!
//! ## Example
//!
//! ```rust,no_run
//! use hue_gallery::{GalleryService, Library, LocalObjectStore};
//! use std::sync::Arc;
//!
//! # async fn run() -> hue_gallery::Result<()> {
//! let store = Arc::new(Library::open("gallery.db")?);
//! let objects = Arc::new(LocalObjectStore::new("objects", None));
//! let service = GalleryService::new(store, objects);
//!
//! for entry in service.nearest_hue("200", Some("5"))? {
//!     println!("{} ({}°)", entry.name, entry.average_hue);
//! }
//! # Ok(())
//! # }
//! ```

pub mod color;
pub mod config;
pub mod error;
pub mod gallery;
pub mod objects;
pub mod service;
pub mod state;
pub mod swatch;

pub use config::GalleryConfig;
pub use error::{GalleryError, Result};
pub use gallery::request::{ArtworkUpload, IngestForm, OneOrMany, PriceInput, UploadedImage};
pub use objects::{LocalObjectStore, ObjectStore, StoredObject};
pub use service::GalleryService;
pub use state::data::{GalleryEntry, Owner, OwnerId, MAX_IMPORTANT};
pub use state::library::Library;
pub use state::memory::MemoryStore;
pub use state::GalleryStore;
