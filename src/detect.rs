//! Card brand detection by prefix pattern.
//!
//! The detector walks the active brand table in order and returns the first
//! brand whose PAN pattern matches the digits typed so far. Built-in and
//! well-formed remote tables use mutually exclusive prefixes, so first match
//! is best match; for an accidental overlap the earlier brand wins.
//!
//! Detection is pure in (configuration, digits). Nothing is cached between
//! keystrokes since the prefix changes on every edit.

use crate::brand::CardBrand;
use crate::catalog::BrandCatalog;
use crate::config::CardConfiguration;
use std::sync::Arc;

/// Detects brands against a [`BrandCatalog`]'s active configuration.
///
/// # Example
///
/// ```
/// use cardfield::catalog::BrandCatalog;
/// use cardfield::detect::BrandDetector;
///
/// let detector = BrandDetector::new(BrandCatalog::new());
///
/// assert_eq!(detector.detect("4111 1111").unwrap().name(), "visa");
/// assert_eq!(detector.detect("37").unwrap().name(), "amex");
/// assert!(detector.detect("9").is_none());
/// assert!(detector.detect("").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct BrandDetector {
    catalog: BrandCatalog,
}

impl BrandDetector {
    /// Creates a detector reading from `catalog`.
    pub fn new(catalog: BrandCatalog) -> Self {
        Self { catalog }
    }

    /// Returns the brand of the PAN prefix `pan`, if any.
    ///
    /// Non-digit characters (formatting spaces) are ignored.
    pub fn detect(&self, pan: &str) -> Option<Arc<CardBrand>> {
        detect_brand(&self.catalog.current(), pan)
    }
}

/// Returns the first brand of `config` whose pattern matches the digits of
/// `pan`.
///
/// # Example
///
/// ```
/// use cardfield::config::CardConfiguration;
/// use cardfield::detect::detect_brand;
///
/// let config = CardConfiguration::default();
/// assert_eq!(detect_brand(&config, "5105").unwrap().name(), "mastercard");
/// assert_eq!(detect_brand(&config, "6011").unwrap().name(), "discover");
/// ```
pub fn detect_brand(config: &CardConfiguration, pan: &str) -> Option<Arc<CardBrand>> {
    let digits: String = pan.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }

    config
        .brands()
        .iter()
        .find(|brand| brand.pan_pattern().is_match(&digits))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_of(pan: &str) -> Option<String> {
        detect_brand(&CardConfiguration::default(), pan).map(|b| b.name().to_string())
    }

    #[test]
    fn test_detect_builtin_brands() {
        assert_eq!(name_of("4111111111111111").as_deref(), Some("visa"));
        assert_eq!(name_of("5500000000000004").as_deref(), Some("mastercard"));
        assert_eq!(name_of("2221000000000009").as_deref(), Some("mastercard"));
        assert_eq!(name_of("378282246310005").as_deref(), Some("amex"));
        assert_eq!(name_of("30569309025904").as_deref(), Some("diners"));
        assert_eq!(name_of("6011111111111117").as_deref(), Some("discover"));
        assert_eq!(name_of("3530111333300000").as_deref(), Some("jcb"));
        assert_eq!(name_of("6759649826438453").as_deref(), Some("maestro"));
    }

    #[test]
    fn test_detect_ignores_spaces() {
        assert_eq!(name_of("4111 1111 1111").as_deref(), Some("visa"));
    }

    #[test]
    fn test_detect_partial_prefix() {
        assert_eq!(name_of("4").as_deref(), Some("visa"));
        assert_eq!(name_of("3").as_deref(), None);
        assert_eq!(name_of("34").as_deref(), Some("amex"));
    }

    #[test]
    fn test_detect_unknown() {
        assert_eq!(name_of(""), None);
        assert_eq!(name_of("   "), None);
        assert_eq!(name_of("9999"), None);
    }

    #[test]
    fn test_first_match_wins_on_overlap() {
        let first = CardBrand::builder("first").pan_pattern(r"^4\d*$").build().unwrap();
        let second = CardBrand::builder("second").pan_pattern(r"^41\d*$").build().unwrap();
        let config = CardConfiguration::new([first, second], Default::default());
        assert_eq!(detect_brand(&config, "4111").unwrap().name(), "first");
    }

    #[test]
    fn test_detector_follows_catalog_replacement() {
        let catalog = BrandCatalog::new();
        let detector = BrandDetector::new(catalog.clone());
        assert!(detector.detect("4111").is_some());

        catalog.load(CardConfiguration::rules_only());
        assert!(detector.detect("4111").is_none());
    }
}
