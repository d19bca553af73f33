//! Card configuration: the brand table plus fallback rules.
//!
//! A [`CardConfiguration`] is built once at startup from built-in defaults and
//! replaced wholesale when a remote configuration document arrives. It is
//! never partially updated.
//!
//! # Features
//!
//! Parsing the remote JSON document requires the `config-json` feature.
//!
//! # Example
//!
//! ```
//! use cardfield::config::CardConfiguration;
//!
//! let config = CardConfiguration::default();
//! assert!(config.brand("visa").is_some());
//!
//! let bare = CardConfiguration::rules_only();
//! assert!(bare.brands().is_empty());
//! ```

mod builtin;

#[cfg(feature = "config-json")]
mod json;

use crate::brand::CardBrand;
use crate::rule::CardDefaults;
use std::sync::Arc;

/// Ordered brand table plus the fallback rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardConfiguration {
    brands: Vec<Arc<CardBrand>>,
    defaults: CardDefaults,
}

impl CardConfiguration {
    /// Creates a configuration from brands (in detection order) and defaults.
    pub fn new(brands: impl IntoIterator<Item = CardBrand>, defaults: CardDefaults) -> Self {
        Self {
            brands: brands.into_iter().map(Arc::new).collect(),
            defaults,
        }
    }

    /// A configuration with no brands, only the fallback rules.
    ///
    /// This is what a failed remote fetch degrades to.
    pub fn rules_only() -> Self {
        Self::new(Vec::new(), CardDefaults::default())
    }

    /// Returns the brands in detection order.
    #[inline]
    pub fn brands(&self) -> &[Arc<CardBrand>] {
        &self.brands
    }

    /// Returns the fallback rules.
    #[inline]
    pub fn defaults(&self) -> &CardDefaults {
        &self.defaults
    }

    /// Looks up a brand by name, ignoring ASCII case.
    pub fn brand(&self, name: &str) -> Option<&Arc<CardBrand>> {
        self.brands.iter().find(|brand| brand.is_named(name))
    }
}

impl Default for CardConfiguration {
    /// The built-in brand table with the default rules.
    fn default() -> Self {
        Self::new(builtin::brands(), CardDefaults::default())
    }
}
