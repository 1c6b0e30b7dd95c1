//! Gallery upload requests
//!
//! Clients submit images together with parallel `names`, `prices` and
//! `tags` sequences. `IngestForm::align` folds them into one
//! `ArtworkUpload` per image so nothing downstream indexes into
//! parallel arrays.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::{GalleryError, Result};

/// A form field that may hold one value or a list of values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    /// Normalize to a sequence; a lone value becomes a one-element list
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(values) => values,
            OneOrMany::One(value) => vec![value],
        }
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(values: Vec<T>) -> Self {
        OneOrMany::Many(values)
    }
}

/// A price as submitted: form fields arrive as text, JSON may send numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Number(f64),
    Text(String),
}

impl PriceInput {
    /// Parse into a finite, non-negative price
    pub fn parse(&self) -> Result<f64> {
        let value = match self {
            PriceInput::Number(n) => *n,
            PriceInput::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| GalleryError::validation(format!("price {:?} is not a number", text)))?,
        };
        validate_price(value)?;
        Ok(value)
    }
}

impl From<&str> for PriceInput {
    fn from(text: &str) -> Self {
        PriceInput::Text(text.to_string())
    }
}

pub(crate) fn validate_price(value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(GalleryError::validation(format!(
            "price {} must be a non-negative number",
            value
        )));
    }
    Ok(())
}

/// Raw bytes of one uploaded file
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedImage {
    /// Client-side file name, for logs only
    pub file_name: String,
    pub bytes: Arc<[u8]>,
}

impl UploadedImage {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

impl fmt::Debug for UploadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedImage")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// One image and its metadata, validated as a unit
#[derive(Debug, Clone, PartialEq)]
pub struct ArtworkUpload {
    pub image: UploadedImage,
    /// Trimmed display name; None means "use the default"
    pub name: Option<String>,
    pub price: f64,
    pub tags: Vec<String>,
}

impl ArtworkUpload {
    pub fn new(image: UploadedImage, name: &str, price: f64, tags: Vec<String>) -> Self {
        Self {
            image,
            name: normalize_name(name),
            price,
            tags,
        }
    }
}

fn normalize_name(name: &str) -> Option<String> {
    match name.trim() {
        "" => None,
        trimmed => Some(trimmed.to_string()),
    }
}

/// A multi-image upload with its parallel metadata fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestForm {
    pub images: Vec<UploadedImage>,
    pub names: OneOrMany<String>,
    pub prices: OneOrMany<PriceInput>,
    pub tags: OneOrMany<OneOrMany<String>>,
}

impl IngestForm {
    /// Zip images with their metadata, position by position.
    ///
    /// Every metadata field must hold exactly one value per image; any
    /// mismatch or unparsable price rejects the whole form.
    pub fn align(self) -> Result<Vec<ArtworkUpload>> {
        let count = self.images.len();
        if count == 0 {
            return Err(GalleryError::validation("no images were uploaded"));
        }

        let names = self.names.into_vec();
        let prices = self.prices.into_vec();
        let tags = self.tags.into_vec();

        for (field, len) in [("names", names.len()), ("prices", prices.len()), ("tags", tags.len())] {
            if len != count {
                return Err(GalleryError::validation(format!(
                    "{} images but {} {}",
                    count, len, field
                )));
            }
        }

        self.images
            .into_iter()
            .zip(names)
            .zip(prices)
            .zip(tags)
            .map(|(((image, name), price), tags)| {
                Ok(ArtworkUpload {
                    image,
                    name: normalize_name(&name),
                    price: price.parse()?,
                    tags: tags.into_vec(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn images(n: usize) -> Vec<UploadedImage> {
        (0..n)
            .map(|i| UploadedImage::new(format!("{}.png", i), vec![i as u8]))
            .collect()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_align_zips_by_position() {
        let form = IngestForm {
            images: images(2),
            names: vec!["".to_string(), "  Sunset ".to_string()].into(),
            prices: vec![PriceInput::from("10"), PriceInput::from("20.5")].into(),
            tags: vec![
                OneOrMany::Many(strings(&["red"])),
                OneOrMany::Many(strings(&["blue", "sky"])),
            ]
            .into(),
        };

        let uploads = form.align().unwrap();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0].name, None);
        assert_eq!(uploads[1].name.as_deref(), Some("Sunset"));
        assert_eq!(uploads[0].price, 10.0);
        assert_eq!(uploads[1].price, 20.5);
        assert_eq!(uploads[1].tags, strings(&["blue", "sky"]));
        assert_eq!(uploads[1].image.file_name, "1.png");
    }

    #[test]
    fn test_lone_scalars_become_single_values() {
        let form = IngestForm {
            images: images(1),
            names: OneOrMany::One("Dawn".to_string()),
            prices: OneOrMany::One(PriceInput::Number(3.0)),
            tags: OneOrMany::One(OneOrMany::One("gold".to_string())),
        };

        let uploads = form.align().unwrap();
        assert_eq!(uploads[0].tags, strings(&["gold"]));
        assert_eq!(uploads[0].price, 3.0);
    }

    #[test]
    fn test_mismatched_lengths_are_rejected() {
        let form = IngestForm {
            images: images(3),
            names: vec![String::new(); 3].into(),
            prices: vec![PriceInput::from("1"), PriceInput::from("2")].into(),
            tags: vec![OneOrMany::<String>::default(); 3].into(),
        };

        let err = form.align().unwrap_err();
        assert_eq!(err.to_string(), "Validation failed: 3 images but 2 prices");
    }

    #[test]
    fn test_missing_field_counts_as_empty() {
        let form = IngestForm {
            images: images(1),
            names: vec![String::new()].into(),
            prices: vec![PriceInput::from("1")].into(),
            ..Default::default()
        };
        assert!(matches!(form.align(), Err(GalleryError::Validation { .. })));
    }

    #[test]
    fn test_empty_upload_is_rejected() {
        assert!(IngestForm::default().align().is_err());
    }

    #[test]
    fn test_bad_prices_are_rejected() {
        for bad in ["abc", "", "-5", "NaN", "inf"] {
            assert!(PriceInput::from(bad).parse().is_err(), "{:?} accepted", bad);
        }
        assert_eq!(PriceInput::from(" 7.25 ").parse().unwrap(), 7.25);
    }

    #[test]
    fn test_form_fields_deserialize_from_json() {
        let names: OneOrMany<String> = serde_json::from_str(r#"["", "Sunset"]"#).unwrap();
        assert_eq!(names.into_vec().len(), 2);

        let prices: OneOrMany<PriceInput> = serde_json::from_str(r#"["10", 20.5]"#).unwrap();
        let parsed: Vec<f64> = prices.into_vec().iter().map(|p| p.parse().unwrap()).collect();
        assert_eq!(parsed, [10.0, 20.5]);

        let tags: OneOrMany<OneOrMany<String>> =
            serde_json::from_str(r#"[["red"], ["blue", "sky"]]"#).unwrap();
        let tags: Vec<Vec<String>> = tags.into_vec().into_iter().map(OneOrMany::into_vec).collect();
        assert_eq!(tags, vec![strings(&["red"]), strings(&["blue", "sky"])]);

        let lone: OneOrMany<OneOrMany<String>> = serde_json::from_str(r#""red""#).unwrap();
        assert_eq!(lone.into_vec().len(), 1);
    }
}
