//! Shared data structures for the gallery state
//!
//! These structs represent the documents that flow between
//! the gallery store and the ingestion/query layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a gallery owner (a registered user)
pub type OwnerId = i64;

/// Maximum number of entries an owner may flag as important
pub const MAX_IMPORTANT: usize = 3;

/// One artwork in an owner's gallery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryEntry {
    /// Display name (defaults to "Artwork {n}")
    pub name: String,
    /// Handle/URL of the stored image bytes
    pub image_ref: String,
    /// Pixel width of the stored image
    pub width: u32,
    /// Pixel height of the stored image
    pub height: u32,
    /// Owner's full name at creation time; never refreshed
    pub artist_name: String,
    /// Non-negative asking price
    pub price: f64,
    /// Free-form tags, in submission order
    pub tags: Vec<String>,
    /// Flagged for featured display
    pub is_important: bool,
    /// Rank slot in [0, MAX_IMPORTANT) while important
    pub important_index: Option<u8>,
    /// Dominant hue in [0, 360), fixed at ingestion
    pub average_hue: u16,
    /// Creation timestamp
    pub date_added: DateTime<Utc>,
}

impl GalleryEntry {
    /// Clear the important flag and release its slot
    pub fn clear_importance(&mut self) {
        self.is_important = false;
        self.important_index = None;
    }
}

/// A gallery owner together with their gallery, in display order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub id: OwnerId,
    pub first_name: String,
    pub last_name: String,
    pub gallery: Vec<GalleryEntry>,
}

impl Owner {
    /// "First Last", as stamped onto new entries
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Find an entry by its image reference
    pub fn entry(&self, image_ref: &str) -> Option<&GalleryEntry> {
        self.gallery.iter().find(|e| e.image_ref == image_ref)
    }

    /// Find an entry by its image reference, mutably
    pub fn entry_mut(&mut self, image_ref: &str) -> Option<&mut GalleryEntry> {
        self.gallery.iter_mut().find(|e| e.image_ref == image_ref)
    }

    /// Number of entries currently flagged important
    pub fn important_count(&self) -> usize {
        self.gallery.iter().filter(|e| e.is_important).count()
    }

    /// Remove an entry by image reference, keeping the rest in order.
    ///
    /// Other entries' important slots are left as they are.
    pub fn remove_entry(&mut self, image_ref: &str) -> Option<GalleryEntry> {
        let position = self.gallery.iter().position(|e| e.image_ref == image_ref)?;
        Some(self.gallery.remove(position))
    }
}
