//! Pre-commit input filters.
//!
//! Every edit the host reports passes through a [`FilterChain`] before it is
//! formatted or validated, so only well-formed characters ever reach a field
//! buffer. A filter maps a proposed [`FieldText`] (text plus caret) to the
//! text that may actually be committed, moving the caret with the characters
//! it keeps.

use std::fmt;
use zeroize::Zeroize;

/// Field text together with the caret position, in characters.
///
/// The text is wiped from memory when the value is dropped.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct FieldText {
    text: String,
    caret: usize,
}

impl FieldText {
    /// Creates a field text, clamping the caret to the end of `text`.
    pub fn new(text: impl Into<String>, caret: usize) -> Self {
        let text = text.into();
        let caret = caret.min(text.chars().count());
        Self { text, caret }
    }

    /// Creates a field text with the caret at the end.
    pub fn at_end(text: impl Into<String>) -> Self {
        let text = text.into();
        let caret = text.chars().count();
        Self { text, caret }
    }

    /// Returns the text.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the caret position in characters.
    #[inline]
    pub fn caret(&self) -> usize {
        self.caret
    }

    /// Returns the number of characters.
    #[inline]
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    /// Returns true if the text is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl fmt::Debug for FieldText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print field contents; a PAN or CVC may be in here.
        f.debug_struct("FieldText")
            .field("len", &self.len())
            .field("caret", &self.caret)
            .finish()
    }
}

impl Drop for FieldText {
    fn drop(&mut self) {
        self.text.zeroize();
    }
}

/// A pre-commit filter over proposed field text.
pub trait InputFilter {
    /// Returns the text that may be committed for the proposed `input`.
    fn apply(&self, input: &FieldText) -> FieldText;
}

/// Keeps characters matching `keep`, moving the caret with them.
fn retain_chars(input: &FieldText, mut keep: impl FnMut(char) -> bool) -> FieldText {
    let mut text = String::with_capacity(input.text.len());
    let mut caret = 0;
    for (index, c) in input.text.chars().enumerate() {
        if keep(c) {
            text.push(c);
            if index < input.caret {
                caret += 1;
            }
        }
    }
    FieldText { text, caret }
}

/// Strips every character that is not an ASCII digit.
///
/// For the PAN field, spaces can be allowed through so the formatter sees
/// the user's grouping.
///
/// # Example
///
/// ```
/// use cardfield::filter::{DigitFilter, FieldText, InputFilter};
///
/// let out = DigitFilter::digits_and_spaces().apply(&FieldText::new("41a1-1 1", 4));
/// assert_eq!(out.text(), "4111 1");
/// assert_eq!(out.caret(), 3);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DigitFilter {
    allow_spaces: bool,
}

impl DigitFilter {
    /// Digits only.
    pub fn digits() -> Self {
        Self {
            allow_spaces: false,
        }
    }

    /// Digits and spaces.
    pub fn digits_and_spaces() -> Self {
        Self { allow_spaces: true }
    }
}

impl InputFilter for DigitFilter {
    fn apply(&self, input: &FieldText) -> FieldText {
        let allow_spaces = self.allow_spaces;
        retain_chars(input, |c| c.is_ascii_digit() || (allow_spaces && c == ' '))
    }
}

/// Keeps digits, plus one character used as a separator (the `/` of an
/// expiry date).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeparatorFilter {
    separator: char,
}

impl SeparatorFilter {
    /// Keeps digits and `separator`.
    pub fn new(separator: char) -> Self {
        Self { separator }
    }
}

impl InputFilter for SeparatorFilter {
    fn apply(&self, input: &FieldText) -> FieldText {
        let separator = self.separator;
        retain_chars(input, |c| c.is_ascii_digit() || c == separator)
    }
}

/// Clamps the number of digits to a maximum.
///
/// Other characters (PAN formatting spaces) are not counted and are kept.
///
/// # Example
///
/// ```
/// use cardfield::filter::{FieldText, InputFilter, LengthFilter};
///
/// let out = LengthFilter::new(4).apply(&FieldText::at_end("12345"));
/// assert_eq!(out.text(), "1234");
/// assert_eq!(out.caret(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthFilter {
    max_digits: usize,
}

impl LengthFilter {
    /// Allows at most `max_digits` digits.
    pub fn new(max_digits: usize) -> Self {
        Self { max_digits }
    }

    /// Allows the rule's maximum length, or `fallback` if the rule has none.
    pub fn for_rule(rule: &crate::rule::ValidationRule, fallback: usize) -> Self {
        Self::new(rule.max_length().unwrap_or(fallback))
    }

    /// Returns the digit limit.
    #[inline]
    pub fn max_digits(&self) -> usize {
        self.max_digits
    }
}

impl InputFilter for LengthFilter {
    fn apply(&self, input: &FieldText) -> FieldText {
        let mut digits = 0;
        let max = self.max_digits;
        retain_chars(input, |c| {
            if !c.is_ascii_digit() {
                return true;
            }
            digits += 1;
            digits <= max
        })
    }
}

/// Ordered list of filters applied to every edit.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn InputFilter>>,
}

impl FilterChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a filter.
    pub fn with(mut self, filter: impl InputFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Returns the number of filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns true if the chain has no filters.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl InputFilter for FilterChain {
    fn apply(&self, input: &FieldText) -> FieldText {
        self.filters
            .iter()
            .fold(input.clone(), |text, filter| filter.apply(&text))
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("filters", &self.filters.len())
            .finish()
    }
}
