//! Field validators.
//!
//! Failing a rule is never an error: every validator answers with a plain
//! `bool` (or a [`PanCheck`] when the reason matters).

use crate::brand::CardBrand;
use crate::luhn;
use crate::rule::{CardDefaults, ValidationRule};
use std::fmt;

/// Checks text against a [`ValidationRule`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericValidator;

impl GenericValidator {
    /// Returns true if `text` is non-empty, fully matches the rule's matcher
    /// and has an accepted length.
    ///
    /// # Example
    ///
    /// ```
    /// use cardfield::rule::CardDefaults;
    /// use cardfield::validate::GenericValidator;
    ///
    /// let cvc = CardDefaults::cvc();
    /// assert!(GenericValidator::validate("123", &cvc));
    /// assert!(!GenericValidator::validate("12", &cvc));
    /// assert!(!GenericValidator::validate("12a", &cvc));
    /// assert!(!GenericValidator::validate("", &cvc));
    /// ```
    #[inline]
    pub fn validate(text: &str, rule: &ValidationRule) -> bool {
        !text.is_empty()
            && rule.matcher().is_match(text)
            && rule.accepts_length(text.chars().count())
    }
}

/// Why a PAN was accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanCheck {
    /// Pattern, length, checksum and allow-list all pass.
    Valid,
    /// Empty, wrong pattern or wrong length.
    Invalid,
    /// The Luhn checksum fails.
    InvalidLuhn,
    /// The detected brand is not in the accepted brands.
    BrandNotAccepted,
}

impl PanCheck {
    /// Returns true for [`PanCheck::Valid`].
    #[inline]
    pub fn is_valid(self) -> bool {
        self == PanCheck::Valid
    }
}

impl fmt::Display for PanCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PanCheck::Valid => "valid",
            PanCheck::Invalid => "invalid",
            PanCheck::InvalidLuhn => "invalid luhn checksum",
            PanCheck::BrandNotAccepted => "card brand not accepted",
        })
    }
}

/// Validates a PAN: rule, Luhn checksum and accepted-brand allow-list.
///
/// An empty allow-list accepts every brand. A PAN whose brand is not
/// recognised is never rejected by the allow-list; only a recognised brand
/// missing from the list is.
///
/// # Example
///
/// ```
/// use cardfield::config::CardConfiguration;
/// use cardfield::validate::{PanCheck, PanValidator};
///
/// let config = CardConfiguration::default();
/// let visa = config.brand("visa").unwrap();
///
/// let any = PanValidator::default();
/// assert!(any.validate("4111 1111 1111 1111", visa.pan_rule(), Some(visa)));
///
/// let mastercard_only = PanValidator::new(["MASTERCARD"]);
/// assert_eq!(
///     mastercard_only.check("4111111111111111", visa.pan_rule(), Some(visa)),
///     PanCheck::BrandNotAccepted
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanValidator {
    accepted_brands: Vec<String>,
}

impl PanValidator {
    /// Creates a validator accepting the named brands (any brand if empty).
    pub fn new<I, S>(accepted_brands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accepted_brands: accepted_brands.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the accepted brand names.
    #[inline]
    pub fn accepted_brands(&self) -> &[String] {
        &self.accepted_brands
    }

    /// Returns true if `pan` passes every check.
    #[inline]
    pub fn validate(&self, pan: &str, rule: &ValidationRule, brand: Option<&CardBrand>) -> bool {
        self.check(pan, rule, brand).is_valid()
    }

    /// Runs every check and reports the first that fails.
    ///
    /// Formatting spaces are removed before checking.
    pub fn check(&self, pan: &str, rule: &ValidationRule, brand: Option<&CardBrand>) -> PanCheck {
        let digits: String = pan.chars().filter(|c| *c != ' ').collect();

        if !GenericValidator::validate(&digits, rule) {
            return PanCheck::Invalid;
        }
        if !luhn::passes(&digits) {
            return PanCheck::InvalidLuhn;
        }
        if !self.is_accepted(brand) {
            return PanCheck::BrandNotAccepted;
        }
        PanCheck::Valid
    }

    /// Returns true if `brand` passes the allow-list.
    pub fn is_accepted(&self, brand: Option<&CardBrand>) -> bool {
        match brand {
            _ if self.accepted_brands.is_empty() => true,
            None => true,
            Some(brand) => self.accepted_brands.iter().any(|name| brand.is_named(name)),
        }
    }
}

/// Validates a CVC against a rule that changes with the detected brand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CvcValidator {
    rule: ValidationRule,
}

impl CvcValidator {
    /// Creates a validator with `rule` as the current rule.
    pub fn new(rule: ValidationRule) -> Self {
        Self { rule }
    }

    /// Replaces the current rule.
    ///
    /// The caller re-validates a non-blank CVC afterwards.
    pub fn update_rule(&mut self, rule: ValidationRule) {
        self.rule = rule;
    }

    /// Returns the current rule.
    #[inline]
    pub fn rule(&self) -> &ValidationRule {
        &self.rule
    }

    /// Returns true if `cvc` satisfies the current rule.
    #[inline]
    pub fn validate(&self, cvc: &str) -> bool {
        GenericValidator::validate(cvc, &self.rule)
    }
}

impl Default for CvcValidator {
    fn default() -> Self {
        Self::new(CardDefaults::cvc())
    }
}
