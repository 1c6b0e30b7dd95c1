//! Color extraction utilities
//!
//! This module turns raw image bytes into a single hue angle:
//! - Decode the image (any format the `image` crate understands)
//! - Average every pixel into one representative RGB triple
//! - Convert that triple to the HSL hue channel in whole degrees

use image::DynamicImage;
use thiserror::Error;

/// Number of degrees on the hue wheel
pub const HUE_DEGREES: u16 = 360;

/// Hue stored when an image cannot be read
pub const FALLBACK_HUE: u16 = 0;

/// Why a hue could not be computed for an image
#[derive(Error, Debug)]
pub enum HueError {
    /// The bytes are not a decodable image
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// The image decoded but has no pixels
    #[error("Image has no pixels")]
    Empty,
}

/// Compute the dominant hue of an encoded image
///
/// # Arguments
/// * `bytes` - Encoded image data (PNG, JPEG, WebP, ...)
///
/// # Returns
/// * Hue in whole degrees, always within [0, 360)
///
/// # Algorithm
/// 1. Decode the bytes
/// 2. Average all pixels to one RGB triple (alpha is ignored)
/// 3. Convert to HSL and keep the hue channel
pub fn extract_hue(bytes: &[u8]) -> Result<u16, HueError> {
    let img = image::load_from_memory(bytes)?;
    let [r, g, b] = average_rgb(&img).ok_or(HueError::Empty)?;
    Ok(rgb_to_hue(r, g, b))
}

/// Compute the dominant hue, degrading to `FALLBACK_HUE` on failure
///
/// The error is returned alongside the hue so the caller can log and
/// count it without failing the batch.
pub fn extract_hue_or_fallback(bytes: &[u8]) -> (u16, Option<HueError>) {
    match extract_hue(bytes) {
        Ok(hue) => (hue, None),
        Err(err) => (FALLBACK_HUE, Some(err)),
    }
}

/// Average every pixel of an image into a single 8-bit RGB triple
///
/// Returns None for an image with zero pixels.
pub fn average_rgb(img: &DynamicImage) -> Option<[u8; 3]> {
    let rgb = img.to_rgb8();
    let count = u64::from(rgb.width()) * u64::from(rgb.height());
    if count == 0 {
        return None;
    }

    let mut sums = [0u64; 3];
    for pixel in rgb.pixels() {
        sums[0] += u64::from(pixel[0]);
        sums[1] += u64::from(pixel[1]);
        sums[2] += u64::from(pixel[2]);
    }

    // Round to nearest, same as collapsing the image to a 1x1 pixel
    let mean = |sum: u64| ((sum + count / 2) / count) as u8;
    Some([mean(sums[0]), mean(sums[1]), mean(sums[2])])
}

/// Convert an 8-bit RGB triple to its HSL hue in whole degrees
///
/// Grayscale input (r == g == b) has no hue and yields 0.
pub fn rgb_to_hue(r: u8, g: u8, b: u8) -> u16 {
    let r = f64::from(r) / 255.0;
    let g = f64::from(g) / 255.0;
    let b = f64::from(b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    // Rounding 359.5+ gives 360, which wraps back to 0
    (hue.round() as i64).rem_euclid(i64::from(HUE_DEGREES)) as u16
}

/// Convert HSV (hue in degrees, saturation and value in 0..=1) to 8-bit RGB
pub fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> [u8; 3] {
    let h = hue.rem_euclid(f64::from(HUE_DEGREES));
    let c = value * saturation;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = value - c;

    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    [channel(r), channel(g), channel(b)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(img: RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_primary_hues() {
        assert_eq!(rgb_to_hue(255, 0, 0), 0);
        assert_eq!(rgb_to_hue(255, 255, 0), 60);
        assert_eq!(rgb_to_hue(0, 255, 0), 120);
        assert_eq!(rgb_to_hue(0, 255, 255), 180);
        assert_eq!(rgb_to_hue(0, 0, 255), 240);
        assert_eq!(rgb_to_hue(255, 0, 255), 300);
    }

    #[test]
    fn test_grayscale_has_zero_hue() {
        for v in [0u8, 17, 128, 255] {
            assert_eq!(rgb_to_hue(v, v, v), 0);
        }
    }

    #[test]
    fn test_hue_always_in_range() {
        for r in (0..=255u16).step_by(15) {
            for g in (0..=255u16).step_by(15) {
                for b in (0..=255u16).step_by(15) {
                    let hue = rgb_to_hue(r as u8, g as u8, b as u8);
                    assert!(hue < HUE_DEGREES, "hue {} for ({}, {}, {})", hue, r, g, b);
                }
            }
        }
    }

    #[test]
    fn test_near_red_wraps_to_zero() {
        // 60 * (-1/255 mod 6) = 359.76..., rounds to 360 and wraps
        assert_eq!(rgb_to_hue(255, 0, 1), 0);
    }

    #[test]
    fn test_hsv_round_trip_on_sextants() {
        for hue in [0u16, 60, 120, 180, 240, 300] {
            let [r, g, b] = hsv_to_rgb(f64::from(hue), 1.0, 1.0);
            assert_eq!(rgb_to_hue(r, g, b), hue);
        }
    }

    #[test]
    fn test_average_mixes_halves() {
        // Left half red, right half blue: mean is (128, 0, 128), magenta
        let img = RgbImage::from_fn(4, 2, |x, _| {
            if x < 2 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        let avg = average_rgb(&DynamicImage::ImageRgb8(img)).unwrap();
        assert_eq!(avg, [128, 0, 128]);
        assert_eq!(rgb_to_hue(avg[0], avg[1], avg[2]), 300);
    }

    #[test]
    fn test_extract_hue_from_png() {
        let bytes = png_bytes(RgbImage::from_pixel(8, 8, Rgb([0, 255, 0])));
        assert_eq!(extract_hue(&bytes).unwrap(), 120);
    }

    #[test]
    fn test_unreadable_bytes_fall_back() {
        let (hue, err) = extract_hue_or_fallback(b"definitely not an image");
        assert_eq!(hue, FALLBACK_HUE);
        assert!(matches!(err, Some(HueError::Decode(_))));
    }
}
