//! PAN grouping while the user types.
//!
//! The formatter rewrites whatever the user typed or pasted into the brand's
//! canonical grouping, e.g. `4111 1111 1111 1111` for Visa or
//! `3782 822463 10005` for American Express. Malformed spacing (doubled,
//! leading, misplaced) collapses back to canonical grouping. The one
//! exception is a single trailing space typed right after a completed group,
//! which is kept so the user sees the space they just typed.
//!
//! # Example
//!
//! ```
//! use cardfield::config::CardConfiguration;
//! use cardfield::format::PanFormatter;
//!
//! let config = CardConfiguration::default();
//! let formatter = PanFormatter::new(true);
//!
//! let visa = config.brand("visa").map(|b| b.as_ref());
//! assert_eq!(formatter.format("415012039284", visa), "4150 1203 9284");
//!
//! let amex = config.brand("amex").map(|b| b.as_ref());
//! assert_eq!(formatter.format("3434 01239 33333", amex), "3434 012393 3333");
//! ```

use crate::brand::{CardBrand, DEFAULT_PAN_GROUPING};
use crate::rule::DEFAULT_MAX_PAN_LENGTH;

/// Group size used past the end of a brand's declared grouping.
const TRAILING_GROUP: usize = 4;

/// Formats PAN text into brand-specific digit groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanFormatter {
    enabled: bool,
}

impl PanFormatter {
    /// Creates a formatter. A disabled formatter passes text through.
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Returns true if formatting is enabled.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Formats `text` for `brand`.
    ///
    /// Digits beyond the brand's longest PAN length (19 without a brand) are
    /// dropped.
    pub fn format(&self, text: &str, brand: Option<&CardBrand>) -> String {
        if !self.enabled {
            return text.to_string();
        }

        let max = max_pan_length(brand);
        let grouping = grouping_for(brand);
        let digits: String = text.chars().filter(char::is_ascii_digit).take(max).collect();
        let canonical = group_digits(&digits, grouping);

        if keeps_trailing_space(text, &canonical, digits.len(), grouping, max) {
            format!("{} ", canonical)
        } else {
            canonical
        }
    }
}

impl Default for PanFormatter {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Returns the longest PAN `brand` accepts.
pub fn max_pan_length(brand: Option<&CardBrand>) -> usize {
    brand
        .and_then(|b| b.pan_rule().max_length())
        .unwrap_or(DEFAULT_MAX_PAN_LENGTH)
}

fn grouping_for(brand: Option<&CardBrand>) -> &[usize] {
    match brand {
        Some(brand) => brand.pan_grouping(),
        None => &DEFAULT_PAN_GROUPING,
    }
}

/// The declared groups followed by an endless run of trailing groups.
fn group_sizes(grouping: &[usize]) -> impl Iterator<Item = usize> + '_ {
    grouping
        .iter()
        .copied()
        .chain(std::iter::repeat(TRAILING_GROUP))
}

fn group_digits(digits: &str, grouping: &[usize]) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / TRAILING_GROUP);
    let mut rest = digits;
    for size in group_sizes(grouping) {
        if rest.is_empty() {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        let take = size.min(rest.len());
        out.push_str(&rest[..take]);
        rest = &rest[take..];
    }
    out
}

/// True when `text` is canonical apart from one trailing space typed right
/// after a completed group that is not the last one.
fn keeps_trailing_space(
    text: &str,
    canonical: &str,
    digit_count: usize,
    grouping: &[usize],
    max: usize,
) -> bool {
    let Some(stripped) = text.strip_suffix(' ') else {
        return false;
    };
    if stripped.ends_with(' ') || stripped != canonical || digit_count == 0 || digit_count >= max {
        return false;
    }

    let mut boundary = 0;
    for size in group_sizes(grouping) {
        boundary += size;
        if boundary >= digit_count {
            return boundary == digit_count;
        }
    }
    false
}

/// Returns the caret position just after the `digits`-th digit of
/// `formatted`.
///
/// When `skip_space` is set and that position sits on a group separator,
/// the caret moves past it, which is where it belongs after typing the last
/// digit of a group.
///
/// # Example
///
/// ```
/// use cardfield::format::caret_after_digits;
///
/// assert_eq!(caret_after_digits("4111 1111", 5, false), 6);
/// assert_eq!(caret_after_digits("4111 ", 4, true), 5);
/// assert_eq!(caret_after_digits("4111 ", 4, false), 4);
/// ```
pub fn caret_after_digits(formatted: &str, digits: usize, skip_space: bool) -> usize {
    let mut seen = 0;
    let mut caret = 0;
    let mut chars = formatted.chars();

    if digits > 0 {
        for c in chars.by_ref() {
            caret += 1;
            if c.is_ascii_digit() {
                seen += 1;
                if seen == digits {
                    break;
                }
            }
        }
    }

    if skip_space && chars.next() == Some(' ') {
        caret += 1;
    }
    caret
}
