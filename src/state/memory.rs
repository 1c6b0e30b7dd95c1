use std::sync::{Mutex, MutexGuard};

use super::data::{GalleryEntry, Owner, OwnerId};
use super::{normalize_owner_names, GalleryStore};
use crate::error::{GalleryError, Result};

/// Gallery store that keeps every owner document in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    owners: Mutex<Vec<Owner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn owners(&self) -> Result<MutexGuard<'_, Vec<Owner>>> {
        self.owners
            .lock()
            .map_err(|_| GalleryError::upstream_message("gallery store", "store lock poisoned"))
    }
}

fn find_mut(owners: &mut [Owner], id: OwnerId) -> Result<&mut Owner> {
    owners
        .iter_mut()
        .find(|o| o.id == id)
        .ok_or_else(|| GalleryError::not_found(format!("Owner {}", id)))
}

impl GalleryStore for MemoryStore {
    fn create_owner(&self, first_name: &str, last_name: &str) -> Result<Owner> {
        let (first_name, last_name) = normalize_owner_names(first_name, last_name);
        let mut owners = self.owners()?;
        let owner = Owner {
            id: owners.last().map_or(1, |o| o.id + 1),
            first_name,
            last_name,
            gallery: Vec::new(),
        };
        owners.push(owner.clone());
        Ok(owner)
    }

    fn fetch_owner(&self, id: OwnerId) -> Result<Option<Owner>> {
        Ok(self.owners()?.iter().find(|o| o.id == id).cloned())
    }

    fn fetch_all_owners(&self) -> Result<Vec<Owner>> {
        Ok(self.owners()?.clone())
    }

    fn append_entries(&self, owner: OwnerId, entries: &[GalleryEntry]) -> Result<()> {
        let mut owners = self.owners()?;
        let doc = find_mut(&mut owners, owner)?;

        // Mirrors the UNIQUE(owner_id, image_ref) constraint of the SQLite store
        let duplicate = entries.iter().enumerate().find(|(i, e)| {
            doc.entry(&e.image_ref).is_some()
                || entries[..*i].iter().any(|p| p.image_ref == e.image_ref)
        });
        if let Some((_, dup)) = duplicate {
            return Err(GalleryError::upstream_message(
                "gallery store",
                format!("duplicate image reference {}", dup.image_ref),
            ));
        }

        doc.gallery.extend_from_slice(entries);
        Ok(())
    }

    fn update_entry(&self, owner: OwnerId, entry: &GalleryEntry) -> Result<()> {
        let mut owners = self.owners()?;
        let stored = find_mut(&mut owners, owner)?
            .entry_mut(&entry.image_ref)
            .ok_or_else(|| GalleryError::not_found(format!("Image {}", entry.image_ref)))?;
        *stored = entry.clone();
        Ok(())
    }

    fn save_owner(&self, owner: &Owner) -> Result<()> {
        let mut owners = self.owners()?;
        *find_mut(&mut owners, owner.id)? = owner.clone();
        Ok(())
    }

    fn rename_owner(&self, id: OwnerId, first_name: &str, last_name: &str) -> Result<()> {
        let (first_name, last_name) = normalize_owner_names(first_name, last_name);
        let mut owners = self.owners()?;
        let doc = find_mut(&mut owners, id)?;
        doc.first_name = first_name;
        doc.last_name = last_name;
        Ok(())
    }
}
