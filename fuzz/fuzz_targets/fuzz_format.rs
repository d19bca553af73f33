//! Fuzz target for PAN grouping.
//!
//! Tests that formatting never panics and keeps the digits it is given.

#![no_main]

use cardfield::format::{max_pan_length, PanFormatter};
use cardfield::CardConfiguration;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let config = CardConfiguration::default();
    let formatter = PanFormatter::new(true);

    let brands = std::iter::once(None).chain(config.brands().iter().map(|b| Some(b.as_ref())));
    for brand in brands {
        let formatted = formatter.format(data, brand);

        let kept: String = formatted.chars().filter(char::is_ascii_digit).collect();
        let input: String = data
            .chars()
            .filter(char::is_ascii_digit)
            .take(max_pan_length(brand))
            .collect();
        assert_eq!(kept, input, "Formatting should keep the digit prefix");
        assert!(!formatted.contains("  "));

        let again = formatter.format(&formatted, brand);
        assert_eq!(again, formatted, "Formatting should be idempotent");
    }
});
