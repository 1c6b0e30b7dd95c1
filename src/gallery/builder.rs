//! Gallery entry building and batch ingestion
//!
//! Ingestion runs in three phases:
//! 1. Validate the whole batch (no side effects)
//! 2. Fan out per image: hue extraction and object-store upload run concurrently
//! 3. Build every entry and append the batch to the owner's gallery at once

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use super::metrics::IngestMetrics;
use super::request::{validate_price, ArtworkUpload};
use crate::color::{self, FALLBACK_HUE};
use crate::error::{GalleryError, Result};
use crate::objects::{ObjectStore, StoredObject};
use crate::state::data::{GalleryEntry, Owner};
use crate::state::GalleryStore;

/// An upload after its image has been stored and its hue computed
#[derive(Debug, Clone)]
pub struct ProcessedArtwork {
    pub name: Option<String>,
    pub price: f64,
    pub tags: Vec<String>,
    pub stored: StoredObject,
    pub average_hue: u16,
}

/// Reject a batch that is empty, too large, or carries an invalid price
pub fn validate_batch(artworks: &[ArtworkUpload], max_batch_size: usize) -> Result<()> {
    if artworks.is_empty() {
        return Err(GalleryError::validation("no images were uploaded"));
    }
    if artworks.len() > max_batch_size {
        return Err(GalleryError::validation(format!(
            "{} images exceed the limit of {} per upload",
            artworks.len(),
            max_batch_size
        )));
    }
    for artwork in artworks {
        validate_price(artwork.price)?;
    }
    Ok(())
}

/// Default display name for the entry at `position` (1-based) in a gallery
pub fn default_name(position: usize) -> String {
    format!("Artwork {}", position)
}

/// Turn processed uploads into gallery entries for `owner`.
///
/// Unnamed entries are numbered after the owner's existing gallery, in
/// input order.
pub fn build_entries(
    owner: &Owner,
    artworks: Vec<ProcessedArtwork>,
    now: DateTime<Utc>,
) -> Vec<GalleryEntry> {
    let existing = owner.gallery.len();
    let artist_name = owner.full_name();

    artworks
        .into_iter()
        .enumerate()
        .map(|(i, artwork)| GalleryEntry {
            name: artwork
                .name
                .unwrap_or_else(|| default_name(existing + i + 1)),
            image_ref: artwork.stored.url,
            width: artwork.stored.width,
            height: artwork.stored.height,
            artist_name: artist_name.clone(),
            price: artwork.price,
            tags: artwork.tags,
            is_important: false,
            important_index: None,
            average_hue: artwork.average_hue,
            date_added: now,
        })
        .collect()
}

/// Store every image and compute its hue, concurrently and in input order.
///
/// A failed hue extraction is logged, counted and replaced with
/// `FALLBACK_HUE`. A failed upload aborts the batch; images already
/// uploaded by then are left in the object store.
pub async fn process_artworks<O>(
    objects: Arc<O>,
    metrics: &IngestMetrics,
    artworks: Vec<ArtworkUpload>,
) -> Result<Vec<ProcessedArtwork>>
where
    O: ObjectStore + 'static,
{
    let handles: Vec<_> = artworks
        .iter()
        .map(|artwork| {
            let objects = objects.clone();
            let file_name = artwork.image.file_name.clone();
            let bytes = artwork.image.bytes.clone();

            tokio::spawn(async move {
                let hue_bytes = bytes.clone();
                let hue = tokio::task::spawn_blocking(move || {
                    color::extract_hue_or_fallback(&hue_bytes)
                });
                let upload = objects.upload(&file_name, &bytes);
                let (hue, stored) = tokio::join!(hue, upload);
                (file_name, hue, stored)
            })
        })
        .collect();

    let mut processed = Vec::with_capacity(artworks.len());
    for (artwork, handle) in artworks.into_iter().zip(handles) {
        let (file_name, hue, stored) = handle.await?;
        // Only images that made it into the object store count as fallbacks
        let stored = stored?;

        let average_hue = match hue {
            Ok((hue, None)) => hue,
            Ok((_, Some(err))) => {
                warn!(file_name = %file_name, error = %err, "hue extraction failed, using fallback");
                metrics.record_hue_fallback();
                FALLBACK_HUE
            }
            Err(err) => {
                warn!(file_name = %file_name, error = %err, "hue worker failed, using fallback");
                metrics.record_hue_fallback();
                FALLBACK_HUE
            }
        };

        processed.push(ProcessedArtwork {
            name: artwork.name,
            price: artwork.price,
            tags: artwork.tags,
            stored,
            average_hue,
        });
    }

    Ok(processed)
}

/// Ingest a validated batch into `owner`'s gallery.
///
/// The caller must hold the owner's lock so that default names are
/// numbered against the gallery that is actually appended to.
pub async fn ingest_batch<S, O>(
    store: &S,
    objects: Arc<O>,
    metrics: &IngestMetrics,
    owner: &Owner,
    artworks: Vec<ArtworkUpload>,
) -> Result<Vec<GalleryEntry>>
where
    S: GalleryStore + ?Sized,
    O: ObjectStore + 'static,
{
    let processed = process_artworks(objects, metrics, artworks).await?;
    let entries = build_entries(owner, processed, Utc::now());

    store.append_entries(owner.id, &entries)?;
    metrics.record_batch(entries.len());

    info!(owner = owner.id, count = entries.len(), "gallery batch ingested");
    Ok(entries)
}
