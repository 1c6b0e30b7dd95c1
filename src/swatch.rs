//! Solid-colour swatch generation
//!
//! Renders fully saturated swatches at evenly spaced hues. Handy as
//! fixtures for exercising hue extraction and nearest-hue search.

use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::color::{hsv_to_rgb, HUE_DEGREES};
use crate::error::{GalleryError, Result};

/// `count` evenly spaced integer hues starting at 0
pub fn hues(count: usize) -> Vec<u16> {
    (0..count)
        .map(|i| {
            let hue = (i as f64 * f64::from(HUE_DEGREES) / count as f64).round() as u16;
            hue % HUE_DEGREES
        })
        .collect()
}

/// A `size` x `size` image filled with HSV(hue, 1, 1)
pub fn render(hue: u16, size: u32) -> RgbImage {
    RgbImage::from_pixel(size, size, Rgb(hsv_to_rgb(f64::from(hue), 1.0, 1.0)))
}

/// Write `swatch_{hue}.png` files into `out_dir`, returning their paths
pub fn write_swatches(out_dir: &Path, count: usize, size: u32) -> Result<Vec<PathBuf>> {
    if size == 0 {
        return Err(GalleryError::validation("swatch size must be positive"));
    }
    std::fs::create_dir_all(out_dir)?;

    let mut written = Vec::with_capacity(count);
    for hue in hues(count) {
        let path = out_dir.join(format!("swatch_{}.png", hue));
        render(hue, size)
            .save(&path)
            .map_err(|e| GalleryError::upstream("swatch writer", path.display().to_string(), e))?;
        written.push(path);
    }

    info!(count = written.len(), dir = %out_dir.display(), "swatches written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::extract_hue;
    use tempfile::tempdir;

    #[test]
    fn test_hues_are_evenly_spaced() {
        assert_eq!(hues(4), [0, 90, 180, 270]);
        assert_eq!(hues(50)[1], 7);
        assert!(hues(0).is_empty());
    }

    #[test]
    fn test_written_swatches_extract_close_to_their_hue() {
        let dir = tempdir().unwrap();
        let paths = write_swatches(dir.path(), 12, 8).unwrap();
        assert_eq!(paths.len(), 12);

        for (path, hue) in paths.iter().zip(hues(12)) {
            let bytes = std::fs::read(path).unwrap();
            let extracted = extract_hue(&bytes).unwrap();
            // 8-bit quantization can shift the hue by a degree
            assert!(
                crate::gallery::nearest::circular_distance(extracted, hue) <= 1,
                "{} extracted as {}",
                hue,
                extracted
            );
        }
    }

    #[test]
    fn test_zero_size_is_rejected() {
        let dir = tempdir().unwrap();
        assert!(write_swatches(dir.path(), 3, 0).is_err());
    }
}
