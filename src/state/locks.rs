use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::data::OwnerId;

/// Serializes read-modify-write cycles per owner within this process.
///
/// Two requests touching the same owner run one after the other; requests
/// for different owners never wait on each other.
#[derive(Debug, Default)]
pub struct OwnerLocks {
    slots: Mutex<HashMap<OwnerId, Arc<AsyncMutex<()>>>>,
}

impl OwnerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `owner`; released when the guard drops
    pub async fn acquire(&self, owner: OwnerId) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // Drop slots nobody holds or waits on
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots.entry(owner).or_default().clone()
        };
        slot.lock_owned().await
    }
}
