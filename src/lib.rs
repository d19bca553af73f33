//! # cardfield
//!
//! Real-time validation and formatting for card-entry forms.
//!
//! ## Features
//!
//! - Brand detection from the PAN prefix against a replaceable brand table
//! - PAN grouping while typing, with caret preservation
//! - Expiry date auto-separator (`2` becomes `02/`)
//! - PAN (rule, Luhn, accepted brands), expiry date and CVC validation
//! - Notification state machine that tells a listener when a field's
//!   validity changed, without repeating itself
//! - Live reload when a new card configuration arrives
//!
//! ## Quick Start
//!
//! ```rust
//! use cardfield::{BrandCatalog, CardValidationConfig, CardValidationListener};
//! use cardfield::{FieldController, FieldId};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! #[derive(Default)]
//! struct SubmitButton {
//!     enabled: Cell<bool>,
//! }
//!
//! impl CardValidationListener for SubmitButton {
//!     fn on_pan_validated(&self, is_valid: bool) {
//!         if !is_valid {
//!             self.enabled.set(false);
//!         }
//!     }
//!
//!     fn on_all_valid(&self) {
//!         self.enabled.set(true);
//!     }
//! }
//!
//! let button = Rc::new(SubmitButton::default());
//! let config = CardValidationConfig::builder()
//!     .enable_pan_formatting()
//!     .listener(button.clone())
//!     .build()
//!     .unwrap();
//!
//! let catalog = BrandCatalog::new();
//! let form = FieldController::new(config, &catalog);
//!
//! let pan = form.on_text_changed(FieldId::Pan, "4111111111111111", 16).unwrap();
//! assert_eq!(pan.text(), "4111 1111 1111 1111");
//!
//! form.on_text_changed(FieldId::ExpiryDate, "12/99", 5).unwrap();
//! form.on_text_changed(FieldId::Cvc, "123", 3).unwrap();
//! assert!(button.enabled.get());
//! ```
//!
//! ## Formatting and sanitising
//!
//! ```rust
//! use cardfield::config::CardConfiguration;
//! use cardfield::expiry::ExpiryDateSanitiser;
//! use cardfield::format::PanFormatter;
//!
//! let config = CardConfiguration::default();
//! let amex = config.brand("amex").map(|b| b.as_ref());
//!
//! assert_eq!(PanFormatter::new(true).format("378282246310005", amex), "3782 822463 10005");
//! assert_eq!(ExpiryDateSanitiser::sanitise("2"), "02/");
//! assert_eq!(ExpiryDateSanitiser::sanitise("1"), "1");
//! ```
//!
//! ## Loading a card configuration
//!
//! The built-in brand table is active until a configuration is loaded. A
//! fetch that completes after a newer one is ignored.
//!
//! ```rust
//! use cardfield::{BrandCatalog, CardConfiguration};
//!
//! let catalog = BrandCatalog::new();
//! let ticket = catalog.begin_fetch();
//! // ... the document arrives ...
//! assert!(catalog.complete_fetch(ticket, CardConfiguration::rules_only()));
//! assert!(catalog.current().brands().is_empty());
//! ```
//!
//! ## Built-in Card Brands
//!
//! | Brand | Prefix | Length | CVC |
//! |-------|--------|--------|-----|
//! | visa | 4 | 13, 16, 18, 19 | 3 |
//! | mastercard | 51-55, 22-27 | 16 | 3 |
//! | amex | 34, 37 | 15 | 4 |
//! | diners | 300-305, 36, 38 | 14 | 3 |
//! | discover | 6011, 644-649, 65 | 16, 19 | 3 |
//! | jcb | 3528-3589 | 16-19 | 3 |
//! | maestro | 5018, 5020, 5038, 5893, 6304, 6759, 6761-6763 | 12-19 | 3 |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `config-json` | Parse card configuration documents |
//! | `cli` | Command-line tool |
//!
//! ## Security
//!
//! - PAN and CVC buffers are zeroized when dropped
//! - `Debug` output never includes field text
//! - PAN and CVC values are never logged, only their lengths
//! - No unsafe code (`#![deny(unsafe_code)]`)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod brand;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod detect;
pub mod error;
pub mod expiry;
pub mod filter;
pub mod format;
pub mod listener;
pub mod luhn;
pub mod resolve;
pub mod rule;
pub mod state;
pub mod validate;

// Re-export main types at crate root
pub use brand::{BrandImage, CardBrand};
pub use catalog::{BrandCatalog, FetchTicket};
pub use config::CardConfiguration;
pub use controller::{CardValidationConfig, CvcValidationConfig, FieldController};
pub use error::{Error, Result};
pub use filter::FieldText;
pub use listener::CardValidationListener;
pub use resolve::FieldId;
pub use rule::{CardDefaults, ValidationRule};
pub use state::{CardValidationSession, FieldValidationState};
pub use validate::PanCheck;

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    // Standard test card numbers from payment processors
    const VISA_16: &str = "4111111111111111";
    const MASTERCARD: &str = "5500000000000004";
    const AMEX: &str = "378282246310005";
    const DISCOVER: &str = "6011111111111117";
    const DINERS: &str = "30569309025904";
    const JCB: &str = "3530111333300000";

    #[derive(Default)]
    struct Log(RefCell<Vec<bool>>);

    impl CardValidationListener for Log {
        fn on_pan_validated(&self, is_valid: bool) {
            self.0.borrow_mut().push(is_valid);
        }
    }

    fn form() -> (FieldController, Rc<Log>) {
        let log = Rc::new(Log::default());
        let config = CardValidationConfig::builder()
            .enable_pan_formatting()
            .listener(log.clone())
            .build()
            .unwrap();
        (FieldController::new(config, &BrandCatalog::new()), log)
    }

    #[test]
    fn test_standard_test_cards_are_valid() {
        for (pan, brand) in [
            (VISA_16, "visa"),
            (MASTERCARD, "mastercard"),
            (AMEX, "amex"),
            (DISCOVER, "discover"),
            (DINERS, "diners"),
            (JCB, "jcb"),
        ] {
            let (form, _log) = form();
            form.on_text_changed(FieldId::Pan, pan, pan.len()).unwrap();
            assert_eq!(form.brand().unwrap().name(), brand, "{}", pan);
            assert_eq!(form.pan_check(), Some(PanCheck::Valid), "{}", pan);
        }
    }

    #[test]
    fn test_invalid_checksum() {
        let (form, log) = form();
        form.on_text_changed(FieldId::Pan, "4111111111111112", 16).unwrap();
        assert_eq!(form.pan_check(), Some(PanCheck::InvalidLuhn));
        assert_eq!(*log.0.borrow(), vec![false]);
    }

    #[test]
    fn test_formatted_input() {
        let (form, _log) = form();
        let out = form
            .on_text_changed(FieldId::Pan, "4111-1111-1111-1111", 19)
            .unwrap();
        assert_eq!(out.text(), "4111 1111 1111 1111");
        assert_eq!(form.pan_check(), Some(PanCheck::Valid));
    }

    #[test]
    fn test_debug_is_safe() {
        let (form, _log) = form();
        form.on_text_changed(FieldId::Pan, VISA_16, 16).unwrap();
        let text = form.text(FieldId::Pan).unwrap();

        assert!(!format!("{:?}", text).contains("4111"));
        assert!(!format!("{:?}", form).contains("4111"));
    }

    #[test]
    fn test_shared_types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CardConfiguration>();
        assert_send_sync::<CardBrand>();
        assert_send_sync::<CardValidationSession>();
        assert_send_sync::<Error>();
    }
}
