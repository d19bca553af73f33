//! JSON card configuration loader.
//!
//! Parses the card configuration document served by the remote configuration
//! endpoint into a [`CardConfiguration`].
//!
//! # Feature
//!
//! Requires the `config-json` feature.
//!
//! # Format
//!
//! ```json
//! [
//!   {
//!     "name": "amex",
//!     "pattern": "^3[47]\\d*$",
//!     "panLengths": [15],
//!     "cvvLength": 4,
//!     "panGrouping": [4, 6, 5],
//!     "images": [{ "type": "image/svg+xml", "url": "https://example.com/amex.svg" }]
//!   }
//! ]
//! ```
//!
//! Missing `pattern`, `panLengths` or `cvvLength` fall back to the default
//! rules. A brand that cannot be built (no name, a pattern the regex engine
//! rejects) is skipped with a warning; the rest of the document still loads.

use super::CardConfiguration;
use crate::brand::{BrandImage, CardBrand};
use crate::error::{Error, Result};
use crate::rule::CardDefaults;
use serde::Deserialize;
use std::io::Read;
use tracing::{debug, warn};

impl CardConfiguration {
    /// Parses a card configuration document.
    ///
    /// # Example
    ///
    /// ```
    /// use cardfield::config::CardConfiguration;
    ///
    /// let config = CardConfiguration::from_json(
    ///     r#"[{"name": "visa", "pattern": "^4\\d*$", "panLengths": [16], "cvvLength": 3}]"#,
    /// ).unwrap();
    ///
    /// assert_eq!(config.brands().len(), 1);
    /// assert_eq!(config.brands()[0].pan_lengths(), &[16]);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<JsonBrandEntry> = serde_json::from_str(json)
            .map_err(|e| Error::Document(format!("JSON parse error: {}", e)))?;

        let total = entries.len();
        let brands: Vec<CardBrand> = entries
            .into_iter()
            .filter_map(|entry| {
                let name = entry.name.clone();
                match entry.into_brand() {
                    Ok(brand) => Some(brand),
                    Err(e) => {
                        warn!("skipping card brand '{}': {}", name, e);
                        None
                    }
                }
            })
            .collect();

        debug!("parsed card configuration: {} of {} brands", brands.len(), total);

        Ok(Self::new(brands, CardDefaults::default()))
    }

    /// Parses a card configuration document from a reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|e| Error::Document(format!("read error: {}", e)))?;
        Self::from_json(&content)
    }
}

/// One brand record as it appears on the wire.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct JsonBrandEntry {
    #[serde(default)]
    name: String,

    #[serde(default)]
    pattern: Option<String>,

    #[serde(default)]
    pan_lengths: Option<Vec<usize>>,

    #[serde(default, alias = "cvcLength")]
    cvv_length: Option<usize>,

    #[serde(default)]
    pan_grouping: Option<Vec<usize>>,

    #[serde(default)]
    images: Vec<JsonBrandImage>,
}

#[derive(Debug, Deserialize, Default)]
struct JsonBrandImage {
    #[serde(default, rename = "type")]
    kind: String,

    #[serde(default)]
    url: String,
}

impl JsonBrandEntry {
    fn into_brand(self) -> Result<CardBrand> {
        let mut builder = CardBrand::builder(self.name).images(
            self.images
                .into_iter()
                .map(|image| BrandImage::new(image.kind, image.url)),
        );

        if let Some(pattern) = self.pattern.filter(|p| !p.is_empty()) {
            builder = builder.pan_pattern(pattern);
        }
        builder = builder.pan_lengths(
            self.pan_lengths
                .unwrap_or_else(|| CardDefaults::pan().valid_lengths().to_vec()),
        );
        if let Some(length) = self.cvv_length {
            builder = builder.cvc_length(length);
        }
        if let Some(grouping) = self.pan_grouping {
            builder = builder.pan_grouping(grouping);
        }

        builder.build()
    }
}
