//! Validation rules and the built-in fallback rules.
//!
//! A [`ValidationRule`] pairs a regular expression that the raw field text
//! must fully match with the set of accepted lengths. [`CardDefaults`] holds
//! the rules used when no brand is detected or before a remote card
//! configuration has been loaded.

use regex::Regex;
use std::fmt;

/// Matcher accepting any run of ASCII digits, including the empty string.
pub const DEFAULT_MATCHER: &str = "^[0-9]*$";

/// Matcher for a (possibly partial) two-digit month.
pub const MONTH_MATCHER: &str = "^0[1-9]{0,1}$|^1[0-2]{0,1}$";

/// Matcher for a (possibly partial) two-digit year.
pub const YEAR_MATCHER: &str = r"^\d{0,2}$";

/// Matcher for a complete `MM/YY` expiry date.
pub const EXPIRY_DATE_MATCHER: &str = r"^(0[1-9]|1[0-2])\/([0-9][0-9])$";

/// Maximum PAN digit count when a rule does not say otherwise.
pub const DEFAULT_MAX_PAN_LENGTH: usize = 19;

/// A matcher plus the accepted lengths of the matched text.
///
/// An empty `valid_lengths` means any length is accepted once the matcher
/// passes.
#[derive(Clone)]
pub struct ValidationRule {
    matcher: Regex,
    valid_lengths: Vec<usize>,
}

impl ValidationRule {
    /// Creates a rule from an already compiled matcher.
    pub fn new(matcher: Regex, valid_lengths: Vec<usize>) -> Self {
        Self {
            matcher,
            valid_lengths,
        }
    }

    /// Compiles `pattern` and creates a rule from it.
    pub fn from_pattern(pattern: &str, valid_lengths: Vec<usize>) -> Result<Self, regex::Error> {
        Ok(Self::new(Regex::new(pattern)?, valid_lengths))
    }

    /// Rule for a built-in pattern that is known to compile.
    pub(crate) fn builtin(pattern: &'static str, valid_lengths: Vec<usize>) -> Self {
        match Regex::new(pattern) {
            Ok(matcher) => Self::new(matcher, valid_lengths),
            Err(e) => unreachable!("built-in pattern {pattern} does not compile: {e}"),
        }
    }

    /// Returns the matcher.
    #[inline]
    pub fn matcher(&self) -> &Regex {
        &self.matcher
    }

    /// Returns the accepted lengths in the order they were declared.
    #[inline]
    pub fn valid_lengths(&self) -> &[usize] {
        &self.valid_lengths
    }

    /// Returns the largest accepted length, if the rule declares any.
    #[inline]
    pub fn max_length(&self) -> Option<usize> {
        self.valid_lengths.iter().copied().max()
    }

    /// Returns true if `length` is accepted by this rule.
    #[inline]
    pub fn accepts_length(&self, length: usize) -> bool {
        self.valid_lengths.is_empty() || self.valid_lengths.contains(&length)
    }
}

impl PartialEq for ValidationRule {
    fn eq(&self, other: &Self) -> bool {
        self.matcher.as_str() == other.matcher.as_str() && self.valid_lengths == other.valid_lengths
    }
}

impl Eq for ValidationRule {}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("matcher", &self.matcher.as_str())
            .field("valid_lengths", &self.valid_lengths)
            .finish()
    }
}

/// Fallback rules for every card field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardDefaults {
    /// PAN rule when no brand is detected.
    pub pan: ValidationRule,
    /// CVC rule when no brand is detected.
    pub cvc: ValidationRule,
    /// Rule for a month entered on its own.
    pub month: ValidationRule,
    /// Rule for a year entered on its own.
    pub year: ValidationRule,
    /// Rule for a complete expiry date.
    pub expiry_date: ValidationRule,
}

impl CardDefaults {
    /// Digits only, 12 to 19 of them.
    pub fn pan() -> ValidationRule {
        ValidationRule::builtin(DEFAULT_MATCHER, (12..=19).collect())
    }

    /// Digits only, 3 or 4 of them.
    pub fn cvc() -> ValidationRule {
        ValidationRule::builtin(DEFAULT_MATCHER, vec![3, 4])
    }

    /// `01`-`12`, accepting a partial first digit.
    pub fn month() -> ValidationRule {
        ValidationRule::builtin(MONTH_MATCHER, vec![2])
    }

    /// Two digits.
    pub fn year() -> ValidationRule {
        ValidationRule::builtin(YEAR_MATCHER, vec![2])
    }

    /// `MM/YY`.
    pub fn expiry_date() -> ValidationRule {
        ValidationRule::builtin(EXPIRY_DATE_MATCHER, vec![5])
    }
}

impl Default for CardDefaults {
    fn default() -> Self {
        Self {
            pan: Self::pan(),
            cvc: Self::cvc(),
            month: Self::month(),
            year: Self::year(),
            expiry_date: Self::expiry_date(),
        }
    }
}
