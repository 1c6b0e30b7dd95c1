//! Boundary operations of the gallery core
//!
//! `GalleryService` wires the store, the object store, per-owner locks and
//! ingestion metrics together. Each method is one request: it validates
//! before any side effect and reports failures through `GalleryError`,
//! whose `status_code()` gives the response class.

use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::{GalleryError, Result};
use crate::gallery::builder::{self, validate_batch};
use crate::gallery::metrics::{IngestMetrics, MetricsSnapshot};
use crate::gallery::nearest::{self, HueQuery, DEFAULT_LIMIT};
use crate::gallery::ranker;
use crate::gallery::request::{ArtworkUpload, IngestForm};
use crate::objects::ObjectStore;
use crate::state::data::{GalleryEntry, Owner, OwnerId};
use crate::state::locks::OwnerLocks;
use crate::state::GalleryStore;

/// Status reported for a successful ingestion
pub const STATUS_CREATED: u16 = 201;
/// Status reported for every other successful operation
pub const STATUS_OK: u16 = 200;

/// Default cap on images per upload
pub const DEFAULT_MAX_BATCH: usize = 10;

pub struct GalleryService<S, O> {
    store: Arc<S>,
    objects: Arc<O>,
    locks: OwnerLocks,
    metrics: IngestMetrics,
    max_batch_size: usize,
    default_limit: usize,
}

impl<S, O> GalleryService<S, O>
where
    S: GalleryStore,
    O: ObjectStore + 'static,
{
    pub fn new(store: Arc<S>, objects: Arc<O>) -> Self {
        Self {
            store,
            objects,
            locks: OwnerLocks::new(),
            metrics: IngestMetrics::new(),
            max_batch_size: DEFAULT_MAX_BATCH,
            default_limit: DEFAULT_LIMIT,
        }
    }

    /// Override the upload cap and the default nearest-hue limit
    pub fn with_limits(mut self, max_batch_size: usize, default_limit: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self.default_limit = default_limit;
        self
    }

    /// Most images accepted in one upload
    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn require_owner(&self, owner_id: OwnerId) -> Result<Owner> {
        self.store
            .fetch_owner(owner_id)?
            .ok_or_else(|| GalleryError::not_found(format!("Owner {}", owner_id)))
    }

    /// Provision an owner (identity provider bridge)
    pub fn create_owner(&self, first_name: &str, last_name: &str) -> Result<Owner> {
        self.store.create_owner(first_name, last_name)
    }

    /// Rename an owner; existing entries keep their artist name
    pub async fn rename_owner(&self, owner_id: OwnerId, first_name: &str, last_name: &str) -> Result<Owner> {
        let _guard = self.locks.acquire(owner_id).await;
        self.store.rename_owner(owner_id, first_name, last_name)?;
        self.require_owner(owner_id)
    }

    /// Ingest a form of images with parallel `names`/`prices`/`tags` fields
    #[instrument(skip(self, form), fields(images = form.images.len()))]
    pub async fn ingest_form(&self, owner_id: OwnerId, form: IngestForm) -> Result<Vec<GalleryEntry>> {
        let artworks = form.align()?;
        self.ingest(owner_id, artworks).await
    }

    /// Ingest already-paired uploads into the owner's gallery.
    ///
    /// Nothing is appended unless every image was stored.
    #[instrument(skip(self, artworks), fields(images = artworks.len()))]
    pub async fn ingest(&self, owner_id: OwnerId, artworks: Vec<ArtworkUpload>) -> Result<Vec<GalleryEntry>> {
        validate_batch(&artworks, self.max_batch_size)?;

        let _guard = self.locks.acquire(owner_id).await;
        let owner = self.require_owner(owner_id)?;

        builder::ingest_batch(
            self.store.as_ref(),
            self.objects.clone(),
            &self.metrics,
            &owner,
            artworks,
        )
        .await
    }

    /// Flag or unflag one entry as important
    #[instrument(skip(self))]
    pub async fn set_importance(&self, owner_id: OwnerId, image_ref: &str, is_important: bool) -> Result<GalleryEntry> {
        if image_ref.trim().is_empty() {
            return Err(GalleryError::validation("image reference is required"));
        }

        let _guard = self.locks.acquire(owner_id).await;
        ranker::set_important(self.store.as_ref(), owner_id, image_ref, is_important)
    }

    /// Remove one entry, matched by image reference
    #[instrument(skip(self))]
    pub async fn delete_entry(&self, owner_id: OwnerId, image_ref: &str) -> Result<GalleryEntry> {
        let _guard = self.locks.acquire(owner_id).await;
        let mut owner = self.require_owner(owner_id)?;

        let removed = owner
            .remove_entry(image_ref)
            .ok_or_else(|| GalleryError::not_found(format!("Image {}", image_ref)))?;
        self.store.save_owner(&owner)?;

        info!(owner = owner_id, image_ref, "gallery entry deleted");
        Ok(removed)
    }

    /// The owner's full document, gallery in display order
    pub fn gallery(&self, owner_id: OwnerId) -> Result<Owner> {
        self.require_owner(owner_id)
    }

    /// The owner's important entries, by rank slot
    pub fn important_entries(&self, owner_id: OwnerId) -> Result<Vec<GalleryEntry>> {
        let owner = self.require_owner(owner_id)?;
        Ok(ranker::important_entries(&owner).into_iter().cloned().collect())
    }

    /// Closest entries to a hue across every gallery, from raw parameters
    #[instrument(skip(self))]
    pub fn nearest_hue(&self, target: &str, limit: Option<&str>) -> Result<Vec<GalleryEntry>> {
        let query = HueQuery::parse(target, limit, self.default_limit)?;
        nearest::nearest(self.store.as_ref(), &query)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
