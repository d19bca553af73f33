//! Built-in brand table used until a remote configuration is loaded.
//!
//! Patterns are matched against the digits typed so far, so each one accepts
//! any continuation of its prefix. The prefixes are mutually exclusive; a
//! brand is only reported once enough digits disambiguate it.
//!
//! | Brand | Prefix | Length | CVC | Grouping |
//! |-------|--------|--------|-----|----------|
//! | visa | 4 | 13, 16, 18, 19 | 3 | 4-4-4-4-3 |
//! | mastercard | 51-55, 22-27 | 16 | 3 | 4-4-4-4 |
//! | amex | 34, 37 | 15 | 4 | 4-6-5 |
//! | diners | 300-305, 36, 38 | 14 | 3 | 4-6-4 |
//! | discover | 6011, 644-649, 65 | 16, 19 | 3 | 4-4-4-4-3 |
//! | jcb | 3528-3589 | 16-19 | 3 | 4-4-4-4-3 |
//! | maestro | 5018, 5020, 5038, 5893, 6304, 6759, 6761-6763 | 12-19 | 3 | 4-4-4-4-3 |

use crate::brand::{CardBrand, FIFTEEN_DIGIT_GROUPING};

struct BuiltinBrand {
    name: &'static str,
    pattern: &'static str,
    lengths: &'static [usize],
    cvc_length: usize,
    grouping: &'static [usize],
}

const BUILTIN_BRANDS: [BuiltinBrand; 7] = [
    BuiltinBrand {
        name: "visa",
        pattern: r"^4\d*$",
        lengths: &[13, 16, 18, 19],
        cvc_length: 3,
        grouping: &[4, 4, 4, 4, 3],
    },
    BuiltinBrand {
        name: "mastercard",
        pattern: r"^(5[1-5]|2[2-7])\d*$",
        lengths: &[16],
        cvc_length: 3,
        grouping: &[4, 4, 4, 4],
    },
    BuiltinBrand {
        name: "amex",
        pattern: r"^3[47]\d*$",
        lengths: &[15],
        cvc_length: 4,
        grouping: &FIFTEEN_DIGIT_GROUPING,
    },
    BuiltinBrand {
        name: "diners",
        pattern: r"^(30[0-5]|36|38)\d*$",
        lengths: &[14],
        cvc_length: 3,
        grouping: &[4, 6, 4],
    },
    BuiltinBrand {
        name: "discover",
        pattern: r"^(6011|64[4-9]|65)\d*$",
        lengths: &[16, 19],
        cvc_length: 3,
        grouping: &[4, 4, 4, 4, 3],
    },
    BuiltinBrand {
        name: "jcb",
        pattern: r"^35(2[89]|[3-8][0-9])\d*$",
        lengths: &[16, 17, 18, 19],
        cvc_length: 3,
        grouping: &[4, 4, 4, 4, 3],
    },
    BuiltinBrand {
        name: "maestro",
        pattern: r"^(5018|5020|5038|5893|6304|6759|676[1-3])\d*$",
        lengths: &[12, 13, 14, 15, 16, 17, 18, 19],
        cvc_length: 3,
        grouping: &[4, 4, 4, 4, 3],
    },
];

/// Builds the built-in brands in detection order.
pub(super) fn brands() -> Vec<CardBrand> {
    BUILTIN_BRANDS
        .iter()
        .filter_map(|entry| {
            CardBrand::builder(entry.name)
                .pan_pattern(entry.pattern)
                .pan_lengths(entry.lengths.iter().copied())
                .cvc_length(entry.cvc_length)
                .pan_grouping(entry.grouping.iter().copied())
                .build()
                .map_err(|e| tracing::error!("built-in brand {} rejected: {}", entry.name, e))
                .ok()
        })
        .collect()
}
