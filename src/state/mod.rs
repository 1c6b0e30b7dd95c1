//! Gallery state management
//!
//! This module handles all persisted gallery state:
//! - The owner/entry documents (data.rs)
//! - The SQLite-backed gallery store (library.rs)
//! - An in-memory store with the same contract (memory.rs)
//! - Per-owner serialization of read-modify-write cycles (locks.rs)

pub mod data;
pub mod library;
pub mod locks;
pub mod memory;

use crate::error::Result;
use data::{GalleryEntry, Owner, OwnerId};

/// Durable document store holding owners and their embedded galleries.
///
/// Implementations must preserve the insertion order of every gallery.
pub trait GalleryStore: Send + Sync {
    /// Provision a new owner with an empty gallery
    fn create_owner(&self, first_name: &str, last_name: &str) -> Result<Owner>;

    /// Fetch one owner document, gallery included
    fn fetch_owner(&self, id: OwnerId) -> Result<Option<Owner>>;

    /// Fetch every owner document, in id order
    fn fetch_all_owners(&self) -> Result<Vec<Owner>>;

    /// Append a batch of entries to an owner's gallery.
    ///
    /// The batch becomes visible to readers all at once or not at all.
    fn append_entries(&self, owner: OwnerId, entries: &[GalleryEntry]) -> Result<()>;

    /// Overwrite one stored entry, matched by `image_ref`
    fn update_entry(&self, owner: OwnerId, entry: &GalleryEntry) -> Result<()>;

    /// Replace the whole owner document (names and gallery)
    fn save_owner(&self, owner: &Owner) -> Result<()>;

    /// Change an owner's names without touching existing entries
    fn rename_owner(&self, id: OwnerId, first_name: &str, last_name: &str) -> Result<()>;
}

/// Apply the identity provider's defaults to a new owner's names
pub(crate) fn normalize_owner_names(first_name: &str, last_name: &str) -> (String, String) {
    let first = match first_name.trim() {
        "" => "User".to_string(),
        name => name.to_string(),
    };
    (first, last_name.trim().to_string())
}
