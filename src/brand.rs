//! Card brand records.
//!
//! A [`CardBrand`] describes one card scheme: the pattern its PAN prefix
//! matches, the PAN lengths it issues, its CVC length and how its PAN is
//! grouped for display. Brands are immutable once built and are shared as
//! `Arc<CardBrand>` between the active configuration and the controllers.

use crate::error::{Error, Result};
use crate::rule::{ValidationRule, DEFAULT_MATCHER};
use regex::Regex;
use std::fmt;

/// Grouping used when a brand does not declare one.
pub const DEFAULT_PAN_GROUPING: [usize; 5] = [4, 4, 4, 4, 3];

/// Grouping for 15-digit brands such as American Express.
pub const FIFTEEN_DIGIT_GROUPING: [usize; 3] = [4, 6, 5];

/// An image attached to a brand. Passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BrandImage {
    /// Media type, e.g. `image/svg+xml`.
    pub kind: String,
    /// Where the host can fetch the image.
    pub url: String,
}

impl BrandImage {
    /// Creates a new image record.
    pub fn new(kind: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            url: url.into(),
        }
    }
}

/// A card scheme with its own PAN pattern, lengths, CVC length and grouping.
#[derive(Clone, PartialEq, Eq)]
pub struct CardBrand {
    name: String,
    pan_rule: ValidationRule,
    cvc_rule: ValidationRule,
    pan_grouping: Vec<usize>,
    images: Vec<BrandImage>,
}

impl CardBrand {
    /// Starts building a brand called `name`.
    pub fn builder(name: impl Into<String>) -> CardBrandBuilder {
        CardBrandBuilder::new(name)
    }

    /// Returns the brand identifier, e.g. `visa`.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the pattern matched against the digit-only PAN prefix.
    #[inline]
    pub fn pan_pattern(&self) -> &Regex {
        self.pan_rule.matcher()
    }

    /// Returns the accepted PAN digit counts.
    #[inline]
    pub fn pan_lengths(&self) -> &[usize] {
        self.pan_rule.valid_lengths()
    }

    /// Returns the CVC digit count.
    #[inline]
    pub fn cvc_length(&self) -> usize {
        self.cvc_rule.valid_lengths().first().copied().unwrap_or(3)
    }

    /// Returns the group sizes used to format the PAN.
    #[inline]
    pub fn pan_grouping(&self) -> &[usize] {
        &self.pan_grouping
    }

    /// Returns the brand images.
    #[inline]
    pub fn images(&self) -> &[BrandImage] {
        &self.images
    }

    /// Returns the rule a PAN of this brand must satisfy.
    #[inline]
    pub fn pan_rule(&self) -> &ValidationRule {
        &self.pan_rule
    }

    /// Returns the rule a CVC of this brand must satisfy.
    #[inline]
    pub fn cvc_rule(&self) -> &ValidationRule {
        &self.cvc_rule
    }

    /// Returns true if this brand's name matches `name`, ignoring ASCII case.
    #[inline]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl fmt::Debug for CardBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardBrand")
            .field("name", &self.name)
            .field("pan_pattern", &self.pan_rule.matcher().as_str())
            .field("pan_lengths", &self.pan_rule.valid_lengths())
            .field("cvc_length", &self.cvc_length())
            .field("pan_grouping", &self.pan_grouping)
            .finish()
    }
}

impl fmt::Display for CardBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Builder for [`CardBrand`].
///
/// # Example
///
/// ```
/// use cardfield::brand::CardBrand;
///
/// let amex = CardBrand::builder("amex")
///     .pan_pattern(r"^3[47]\d*$")
///     .pan_lengths([15])
///     .cvc_length(4)
///     .pan_grouping([4, 6, 5])
///     .build()
///     .unwrap();
///
/// assert!(amex.pan_pattern().is_match("3782"));
/// assert_eq!(amex.cvc_length(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct CardBrandBuilder {
    name: String,
    pan_pattern: String,
    pan_lengths: Vec<usize>,
    cvc_length: Option<usize>,
    pan_grouping: Option<Vec<usize>>,
    images: Vec<BrandImage>,
}

impl CardBrandBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pan_pattern: DEFAULT_MATCHER.to_string(),
            pan_lengths: Vec::new(),
            cvc_length: None,
            pan_grouping: None,
            images: Vec::new(),
        }
    }

    /// Sets the PAN prefix pattern.
    pub fn pan_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pan_pattern = pattern.into();
        self
    }

    /// Sets the accepted PAN digit counts.
    pub fn pan_lengths(mut self, lengths: impl IntoIterator<Item = usize>) -> Self {
        self.pan_lengths = lengths.into_iter().collect();
        self
    }

    /// Sets the CVC digit count.
    pub fn cvc_length(mut self, length: usize) -> Self {
        self.cvc_length = Some(length);
        self
    }

    /// Sets the PAN display grouping.
    pub fn pan_grouping(mut self, grouping: impl IntoIterator<Item = usize>) -> Self {
        self.pan_grouping = Some(grouping.into_iter().collect());
        self
    }

    /// Adds an image.
    pub fn image(mut self, image: BrandImage) -> Self {
        self.images.push(image);
        self
    }

    /// Replaces all images.
    pub fn images(mut self, images: impl IntoIterator<Item = BrandImage>) -> Self {
        self.images = images.into_iter().collect();
        self
    }

    /// Builds the brand.
    ///
    /// Without an explicit CVC length the default CVC lengths (3 or 4) apply.
    /// Without an explicit grouping, brands whose only PAN length is 15 use
    /// 4-6-5 and everything else 4-4-4-4-3.
    pub fn build(self) -> Result<CardBrand> {
        if self.name.trim().is_empty() {
            return Err(Error::MissingBrandName);
        }

        let pan_rule = ValidationRule::from_pattern(&self.pan_pattern, self.pan_lengths.clone())
            .map_err(|e| Error::InvalidPattern {
                brand: self.name.clone(),
                reason: e.to_string(),
            })?;

        let cvc_rule = match self.cvc_length {
            Some(length) => ValidationRule::builtin(DEFAULT_MATCHER, vec![length]),
            None => crate::rule::CardDefaults::cvc(),
        };

        let pan_grouping = match self.pan_grouping {
            Some(grouping) => {
                if grouping.contains(&0) {
                    return Err(Error::EmptyGroup(self.name));
                }
                grouping
            }
            None if self.pan_lengths == [15] => FIFTEEN_DIGIT_GROUPING.to_vec(),
            None => DEFAULT_PAN_GROUPING.to_vec(),
        };

        Ok(CardBrand {
            name: self.name,
            pan_rule,
            cvc_rule,
            pan_grouping,
            images: self.images,
        })
    }
}
