//! Important-image ranking
//!
//! An owner may feature up to `MAX_IMPORTANT` entries. Each featured entry
//! holds a rank slot in [0, MAX_IMPORTANT). Slots are tickets: un-featuring
//! an entry frees its slot without moving anyone else, and the next entry
//! to be featured takes the lowest free slot.

use tracing::debug;

use crate::error::{GalleryError, Result};
use crate::state::data::{GalleryEntry, Owner, OwnerId, MAX_IMPORTANT};
use crate::state::GalleryStore;

/// Outcome of toggling one entry
#[derive(Debug, Clone, PartialEq)]
pub struct ImportanceChange {
    /// The entry after the toggle
    pub entry: GalleryEntry,
    /// False when the entry was already in the requested state
    pub changed: bool,
}

/// Lowest rank slot not held by any important entry
fn lowest_free_slot(owner: &Owner) -> Option<u8> {
    (0..MAX_IMPORTANT as u8).find(|slot| {
        !owner
            .gallery
            .iter()
            .any(|e| e.is_important && e.important_index == Some(*slot))
    })
}

/// Set or clear the important flag on one entry of an in-memory owner document
pub fn apply_importance(owner: &mut Owner, image_ref: &str, flag: bool) -> Result<ImportanceChange> {
    let position = owner
        .gallery
        .iter()
        .position(|e| e.image_ref == image_ref)
        .ok_or_else(|| GalleryError::not_found(format!("Image {}", image_ref)))?;

    if owner.gallery[position].is_important == flag {
        return Ok(ImportanceChange {
            entry: owner.gallery[position].clone(),
            changed: false,
        });
    }

    if flag {
        if owner.important_count() >= MAX_IMPORTANT {
            return Err(GalleryError::CapacityExceeded {
                limit: MAX_IMPORTANT,
            });
        }
        let slot = lowest_free_slot(owner).ok_or(GalleryError::CapacityExceeded {
            limit: MAX_IMPORTANT,
        })?;

        let entry = &mut owner.gallery[position];
        entry.is_important = true;
        entry.important_index = Some(slot);
    } else {
        owner.gallery[position].clear_importance();
    }

    Ok(ImportanceChange {
        entry: owner.gallery[position].clone(),
        changed: true,
    })
}

/// Toggle importance on a stored entry and persist the change.
///
/// Read-modify-write: callers serialize calls per owner (see
/// `state::locks::OwnerLocks`) to keep the cap from being overrun.
pub fn set_important<S>(store: &S, owner_id: OwnerId, image_ref: &str, flag: bool) -> Result<GalleryEntry>
where
    S: GalleryStore + ?Sized,
{
    let mut owner = store
        .fetch_owner(owner_id)?
        .ok_or_else(|| GalleryError::not_found(format!("Owner {}", owner_id)))?;

    let change = apply_importance(&mut owner, image_ref, flag)?;
    if change.changed {
        store.update_entry(owner_id, &change.entry)?;
        debug!(owner = owner_id, image_ref, flag, slot = ?change.entry.important_index, "importance updated");
    }
    Ok(change.entry)
}

/// An owner's important entries, ordered by rank slot
pub fn important_entries(owner: &Owner) -> Vec<&GalleryEntry> {
    let mut featured: Vec<_> = owner.gallery.iter().filter(|e| e.is_important).collect();
    featured.sort_by_key(|e| e.important_index);
    featured
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::memory::MemoryStore;
    use chrono::Utc;

    fn entry(image_ref: &str) -> GalleryEntry {
        GalleryEntry {
            name: image_ref.to_string(),
            image_ref: image_ref.to_string(),
            width: 1,
            height: 1,
            artist_name: "Hilma af Klint".to_string(),
            price: 1.0,
            tags: vec![],
            is_important: false,
            important_index: None,
            average_hue: 0,
            date_added: Utc::now(),
        }
    }

    fn seeded(refs: &[&str]) -> (MemoryStore, OwnerId) {
        let store = MemoryStore::new();
        let owner = store.create_owner("Hilma", "af Klint").unwrap();
        let entries: Vec<_> = refs.iter().map(|r| entry(r)).collect();
        store.append_entries(owner.id, &entries).unwrap();
        (store, owner.id)
    }

    #[test]
    fn test_three_slots_then_capacity_exceeded() {
        let (store, id) = seeded(&["a", "b", "c", "d"]);

        for (i, r) in ["a", "b", "c"].iter().enumerate() {
            let entry = set_important(&store, id, r, true).unwrap();
            assert_eq!(entry.important_index, Some(i as u8));
        }

        let before = store.fetch_owner(id).unwrap().unwrap();
        let err = set_important(&store, id, "d", true).unwrap_err();
        assert!(matches!(err, GalleryError::CapacityExceeded { limit: 3 }));
        assert_eq!(store.fetch_owner(id).unwrap().unwrap(), before);
    }

    #[test]
    fn test_clearing_unimportant_entry_is_noop() {
        let (store, id) = seeded(&["a"]);
        let before = store.fetch_owner(id).unwrap().unwrap();

        let entry = set_important(&store, id, "a", false).unwrap();
        assert!(!entry.is_important);
        assert_eq!(entry.important_index, None);
        assert_eq!(store.fetch_owner(id).unwrap().unwrap(), before);
    }

    #[test]
    fn test_marking_twice_keeps_slot() {
        let (store, id) = seeded(&["a", "b"]);
        set_important(&store, id, "a", true).unwrap();
        let again = set_important(&store, id, "a", true).unwrap();
        assert_eq!(again.important_index, Some(0));
        assert_eq!(store.fetch_owner(id).unwrap().unwrap().important_count(), 1);
    }

    #[test]
    fn test_removal_leaves_gap_then_refills_it() {
        let (store, id) = seeded(&["a", "b", "c", "d"]);
        for r in ["a", "b", "c"] {
            set_important(&store, id, r, true).unwrap();
        }

        set_important(&store, id, "b", false).unwrap();
        let owner = store.fetch_owner(id).unwrap().unwrap();
        let slots: Vec<_> = important_entries(&owner).iter().map(|e| e.important_index).collect();
        assert_eq!(slots, [Some(0), Some(2)]);

        let entry = set_important(&store, id, "d", true).unwrap();
        assert_eq!(entry.important_index, Some(1));

        let owner = store.fetch_owner(id).unwrap().unwrap();
        let order: Vec<_> = important_entries(&owner).iter().map(|e| e.image_ref.as_str()).collect();
        assert_eq!(order, ["a", "d", "c"]);
    }

    #[test]
    fn test_unknown_image_and_owner() {
        let (store, id) = seeded(&["a"]);
        assert!(matches!(
            set_important(&store, id, "missing", true),
            Err(GalleryError::NotFound { .. })
        ));
        assert!(matches!(
            set_important(&store, id + 1, "a", true),
            Err(GalleryError::NotFound { .. })
        ));
    }
}
