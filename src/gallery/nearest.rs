//! Nearest-hue search across every gallery
//!
//! Hues live on a wheel, so 350 and 10 are 20 degrees apart, not 340.
//! The query is a full scan: every entry of every owner is ranked by
//! circular distance to the target and the closest `limit` are returned.

use crate::color::HUE_DEGREES;
use crate::error::{GalleryError, Result};
use crate::state::data::GalleryEntry;
use crate::state::GalleryStore;

/// Number of results when the caller gives no usable limit
pub const DEFAULT_LIMIT: usize = 24;

/// Shortest angular distance between two hues, in [0, 180]
pub fn circular_distance(a: u16, b: u16) -> u16 {
    let d = (i32::from(a) - i32::from(b)).abs() % i32::from(HUE_DEGREES);
    d.min(i32::from(HUE_DEGREES) - d) as u16
}

/// A parsed nearest-hue request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HueQuery {
    /// Target hue, normalized into [0, 360)
    pub target: u16,
    pub limit: usize,
}

impl HueQuery {
    pub fn new(target: u16, limit: usize) -> Self {
        Self {
            target: target % HUE_DEGREES,
            limit,
        }
    }

    /// Parse raw query parameters.
    ///
    /// `target` must be an integer (wrapped onto the wheel). `limit` falls
    /// back to `default_limit` when absent, non-numeric or not positive.
    pub fn parse(target: &str, limit: Option<&str>, default_limit: usize) -> Result<Self> {
        let target: i64 = target.trim().parse().map_err(|_| {
            GalleryError::validation(format!("hue {:?} is not an integer", target))
        })?;

        let limit = limit
            .and_then(|l| l.trim().parse::<usize>().ok())
            .filter(|l| *l > 0)
            .unwrap_or(default_limit);

        Ok(Self {
            target: target.rem_euclid(i64::from(HUE_DEGREES)) as u16,
            limit,
        })
    }
}

/// Order entries by circular distance to `target` and keep the first `limit`.
///
/// Ties keep their input order.
pub fn rank_by_hue(mut entries: Vec<GalleryEntry>, target: u16, limit: usize) -> Vec<GalleryEntry> {
    entries.sort_by_key(|e| circular_distance(e.average_hue, target));
    entries.truncate(limit);
    entries
}

/// Run a nearest-hue query over every owner's gallery
pub fn nearest<S>(store: &S, query: &HueQuery) -> Result<Vec<GalleryEntry>>
where
    S: GalleryStore + ?Sized,
{
    let entries: Vec<GalleryEntry> = store
        .fetch_all_owners()?
        .into_iter()
        .flat_map(|owner| owner.gallery)
        .collect();

    Ok(rank_by_hue(entries, query.target, query.limit))
}
