//! Effective validation rule per field.

use crate::brand::CardBrand;
use crate::config::CardConfiguration;
use crate::rule::ValidationRule;
use std::fmt;

/// Stable identity of a card form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldId {
    /// Card number.
    Pan,
    /// `MM/YY` expiry date.
    ExpiryDate,
    /// Card verification code.
    Cvc,
}

impl FieldId {
    /// All card fields in form order.
    pub const ALL: [FieldId; 3] = [FieldId::Pan, FieldId::ExpiryDate, FieldId::Cvc];

    /// Returns the field name used in logs and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldId::Pan => "pan",
            FieldId::ExpiryDate => "expiry date",
            FieldId::Cvc => "cvc",
        }
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves the rule that applies to a field.
///
/// PAN and CVC use the detected brand's rule, or the configuration default
/// without a brand. The expiry date is brand independent.
///
/// # Example
///
/// ```
/// use cardfield::config::CardConfiguration;
/// use cardfield::resolve::{FieldId, RuleResolver};
///
/// let config = CardConfiguration::default();
/// let resolver = RuleResolver::new(&config);
/// let amex = config.brand("amex").map(|b| b.as_ref());
///
/// assert_eq!(resolver.resolve(FieldId::Cvc, amex).valid_lengths(), &[4]);
/// assert_eq!(resolver.resolve(FieldId::Cvc, None).valid_lengths(), &[3, 4]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RuleResolver<'a> {
    config: &'a CardConfiguration,
}

impl<'a> RuleResolver<'a> {
    /// Creates a resolver over `config`.
    pub fn new(config: &'a CardConfiguration) -> Self {
        Self { config }
    }

    /// Returns the rule for `field` given the detected brand.
    pub fn resolve<'b>(&self, field: FieldId, brand: Option<&'b CardBrand>) -> &'b ValidationRule
    where
        'a: 'b,
    {
        let defaults = self.config.defaults();
        match (field, brand) {
            (FieldId::Pan, Some(brand)) => brand.pan_rule(),
            (FieldId::Pan, None) => &defaults.pan,
            (FieldId::Cvc, Some(brand)) => brand.cvc_rule(),
            (FieldId::Cvc, None) => &defaults.cvc,
            (FieldId::ExpiryDate, _) => &defaults.expiry_date,
        }
    }
}
