//! Fuzz target for expiry date sanitising and validation.
//!
//! Tests that expiry handling never panics on arbitrary input.

#![no_main]

use cardfield::expiry::{ExpiryDateSanitiser, ExpiryDateValidator, MAX_LENGTH};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let sanitised = ExpiryDateSanitiser::sanitise(data);
    if !data.trim().is_empty() {
        assert!(sanitised.len() <= MAX_LENGTH, "{:?} -> {:?}", data, sanitised);
        assert_eq!(ExpiryDateSanitiser::sanitise(&sanitised), sanitised);
    }

    let _ = ExpiryDateSanitiser::is_separator_deletion(data, &sanitised);
    let _ = ExpiryDateValidator::default().validate(data);
    let _ = ExpiryDateValidator::default().validate(&sanitised);
});
