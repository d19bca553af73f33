//! End-to-end tests for cardfield.
//!
//! These drive a form the way a host UI does: one edit at a time, writing the
//! returned text back before the next key.

use cardfield::expiry::{ExpiryDateSanitiser, ExpiryDateValidator, FixedClock};
use cardfield::format::PanFormatter;
use cardfield::validate::PanValidator;
use cardfield::{
    BrandCatalog, CardBrand, CardConfiguration, CardValidationConfig, CardValidationListener,
    CardValidationSession, CvcValidationConfig, Error, FieldController, FieldId, FieldText,
    PanCheck,
};
use chrono::{TimeZone, Utc};
use std::cell::RefCell;
use std::rc::Rc;

// =============================================================================
// TEST CARD NUMBERS
// =============================================================================
// Official test numbers from payment processors. They pass Luhn but are not
// real cards.

mod test_cards {
    pub const VISA: &str = "4111111111111111";
    pub const VISA_12: &str = "415012039284";
    pub const MASTERCARD: &str = "5555555555554444";
    pub const MASTERCARD_2SERIES: &str = "2223000048400011";
    pub const AMEX: &str = "378282246310005";
    pub const DISCOVER: &str = "6011000990139424";
    pub const DINERS: &str = "38520000023237";
    pub const JCB: &str = "3566002020360505";
}

// =============================================================================
// HELPERS
// =============================================================================

#[derive(Default)]
struct Recorder {
    calls: RefCell<Vec<String>>,
}

impl Recorder {
    fn push(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }
}

impl CardValidationListener for Recorder {
    fn on_pan_validated(&self, is_valid: bool) {
        self.push(format!("pan {}", is_valid));
    }

    fn on_expiry_date_validated(&self, is_valid: bool) {
        self.push(format!("expiry {}", is_valid));
    }

    fn on_cvc_validated(&self, is_valid: bool) {
        self.push(format!("cvc {}", is_valid));
    }

    fn on_brand_changed(&self, brand: Option<&CardBrand>) {
        self.push(format!("brand {}", brand.map(CardBrand::name).unwrap_or("none")));
    }

    fn on_all_valid(&self) {
        self.push("all valid".to_string());
    }
}

fn june_2025() -> FixedClock {
    FixedClock::new(Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap())
}

fn card_form(catalog: &BrandCatalog) -> (FieldController, Rc<Recorder>) {
    let recorder = Rc::new(Recorder::default());
    let config = CardValidationConfig::builder()
        .enable_pan_formatting()
        .clock(june_2025())
        .listener(recorder.clone())
        .build()
        .unwrap();
    (FieldController::new(config, catalog), recorder)
}

/// Types `keys` at the end of `field`, one key at a time.
fn type_keys(form: &FieldController, field: FieldId, keys: &str) -> FieldText {
    let mut current = form.text(field).unwrap();
    for key in keys.chars() {
        let mut text = current.text().to_string();
        text.push(key);
        let caret = text.chars().count();
        current = form.on_text_changed(field, &text, caret).unwrap();
    }
    current
}

/// Deletes the character before the caret at the end of `field`.
fn backspace(form: &FieldController, field: FieldId) -> FieldText {
    let mut text = form.text(field).unwrap().text().to_string();
    text.pop();
    let caret = text.chars().count();
    form.on_text_changed(field, &text, caret).unwrap()
}

// =============================================================================
// CONCRETE SCENARIOS
// =============================================================================

#[test]
fn test_expiry_lone_digit_two_is_padded() {
    assert_eq!(ExpiryDateSanitiser::sanitise("2"), "02/");
}

#[test]
fn test_expiry_lone_digit_one_awaits_second_digit() {
    assert_eq!(ExpiryDateSanitiser::sanitise("1"), "1");
}

#[test]
fn test_twelve_digit_visa_is_grouped() {
    let config = CardConfiguration::default();
    let visa = config.brand("visa").map(|b| b.as_ref());
    assert_eq!(
        PanFormatter::new(true).format(test_cards::VISA_12, visa),
        "4150 1203 9284"
    );
}

#[test]
fn test_month_thirteen_is_never_valid() {
    for (y, m, d) in [(2000, 1, 1), (2025, 6, 15), (2099, 12, 31)] {
        let now = Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap();
        assert!(!ExpiryDateValidator::default().validate_at("13/25", &now));
    }
}

#[test]
fn test_expiry_valid_until_end_of_month() {
    let now = Utc.with_ymd_and_hms(2040, 5, 30, 23, 0, 0).unwrap();
    assert!(ExpiryDateValidator::new(FixedClock::new(now)).validate("06/40"));
}

#[test]
fn test_allow_list_excludes_otherwise_valid_visa() {
    let config = CardConfiguration::default();
    let visa = config.brand("visa").unwrap();
    let validator = PanValidator::new(["MASTERCARD"]);

    assert!(!validator.validate(test_cards::VISA, visa.pan_rule(), Some(visa)));
    assert_eq!(
        validator.check(test_cards::VISA, visa.pan_rule(), Some(visa)),
        PanCheck::BrandNotAccepted
    );
}

// =============================================================================
// TYPING A FULL CARD
// =============================================================================

#[test]
fn test_typing_visa_key_by_key() {
    let catalog = BrandCatalog::new();
    let (form, recorder) = card_form(&catalog);

    let out = type_keys(&form, FieldId::Pan, test_cards::VISA);

    assert_eq!(out.text(), "4111 1111 1111 1111");
    assert_eq!(out.caret(), 19);
    // Invalid is reported once, then nothing until the last digit.
    assert_eq!(recorder.take(), vec!["brand visa", "pan false", "pan true"]);
}

#[test]
fn test_typing_amex_uses_amex_grouping() {
    let catalog = BrandCatalog::new();
    let (form, _recorder) = card_form(&catalog);

    let out = type_keys(&form, FieldId::Pan, test_cards::AMEX);

    assert_eq!(out.text(), "3782 822463 10005");
    assert_eq!(form.brand().unwrap().name(), "amex");
    assert_eq!(form.pan_check(), Some(PanCheck::Valid));
}

#[test]
fn test_typing_past_brand_maximum_is_ignored() {
    let catalog = BrandCatalog::new();
    let (form, _recorder) = card_form(&catalog);

    type_keys(&form, FieldId::Pan, test_cards::AMEX);
    let out = type_keys(&form, FieldId::Pan, "9");

    assert_eq!(out.text(), "3782 822463 10005");
    assert_eq!(form.pan_check(), Some(PanCheck::Valid));
}

#[test]
fn test_full_form_reports_all_valid_once() {
    let catalog = BrandCatalog::new();
    let (form, recorder) = card_form(&catalog);

    type_keys(&form, FieldId::Pan, test_cards::MASTERCARD);
    type_keys(&form, FieldId::ExpiryDate, "1227");
    recorder.take();

    type_keys(&form, FieldId::Cvc, "123");

    assert_eq!(recorder.take(), vec!["cvc false", "cvc true", "all valid"]);
    assert!(form.all_valid());
}

#[test]
fn test_breaking_a_valid_form_reports_the_field() {
    let catalog = BrandCatalog::new();
    let (form, recorder) = card_form(&catalog);

    type_keys(&form, FieldId::Pan, test_cards::MASTERCARD);
    type_keys(&form, FieldId::ExpiryDate, "1227");
    type_keys(&form, FieldId::Cvc, "123");
    recorder.take();

    backspace(&form, FieldId::Cvc);

    assert_eq!(recorder.take(), vec!["cvc false"]);
    assert!(!form.all_valid());
}

#[test]
fn test_every_test_card_is_detected_and_valid() {
    for (pan, brand) in [
        (test_cards::VISA, "visa"),
        (test_cards::MASTERCARD, "mastercard"),
        (test_cards::MASTERCARD_2SERIES, "mastercard"),
        (test_cards::AMEX, "amex"),
        (test_cards::DISCOVER, "discover"),
        (test_cards::DINERS, "diners"),
        (test_cards::JCB, "jcb"),
    ] {
        let catalog = BrandCatalog::new();
        let (form, _recorder) = card_form(&catalog);
        type_keys(&form, FieldId::Pan, pan);

        assert_eq!(form.brand().unwrap().name(), brand, "{}", pan);
        assert_eq!(form.pan_check(), Some(PanCheck::Valid), "{}", pan);
    }
}

// =============================================================================
// EDITING
// =============================================================================

#[test]
fn test_backspace_over_space_removes_digit() {
    let catalog = BrandCatalog::new();
    let (form, _recorder) = card_form(&catalog);

    type_keys(&form, FieldId::Pan, "41111");
    // Caret sits after the space; the host deletes the space.
    let out = form.on_text_changed(FieldId::Pan, "41111", 4).unwrap();

    assert_eq!(out.text(), "4111");
    assert_eq!(out.caret(), 3);
}

#[test]
fn test_paste_with_dashes_is_cleaned() {
    let catalog = BrandCatalog::new();
    let (form, _recorder) = card_form(&catalog);

    let out = form
        .on_text_changed(FieldId::Pan, "4111-1111-1111-1111", 19)
        .unwrap();

    assert_eq!(out.text(), "4111 1111 1111 1111");
    assert_eq!(form.pan_check(), Some(PanCheck::Valid));
}

#[test]
fn test_brand_change_while_editing_prefix() {
    let catalog = BrandCatalog::new();
    let (form, recorder) = card_form(&catalog);

    type_keys(&form, FieldId::Pan, "4");
    backspace(&form, FieldId::Pan);
    // A lone 5 is not yet a Mastercard prefix.
    type_keys(&form, FieldId::Pan, "51");

    assert_eq!(
        recorder.take(),
        vec!["brand visa", "pan false", "brand none", "brand mastercard"]
    );
}

#[test]
fn test_expiry_typing_and_separator_deletion() {
    let catalog = BrandCatalog::new();
    let (form, _recorder) = card_form(&catalog);

    let out = type_keys(&form, FieldId::ExpiryDate, "1");
    assert_eq!(out.text(), "1");

    let out = type_keys(&form, FieldId::ExpiryDate, "2");
    assert_eq!(out.text(), "12/");
    assert_eq!(out.caret(), 3);

    // Deleting the separator must stick.
    let out = backspace(&form, FieldId::ExpiryDate);
    assert_eq!(out.text(), "12");

    let out = type_keys(&form, FieldId::ExpiryDate, "27");
    assert_eq!(out.text(), "12/27");
}

#[test]
fn test_expired_date_is_invalid() {
    let catalog = BrandCatalog::new();
    let (form, recorder) = card_form(&catalog);

    type_keys(&form, FieldId::ExpiryDate, "0525");
    assert_eq!(recorder.take(), vec!["expiry false"]);

    form.on_text_changed(FieldId::ExpiryDate, "", 0).unwrap();
    type_keys(&form, FieldId::ExpiryDate, "0625");

    assert_eq!(recorder.take(), vec!["expiry true"]);
}

#[test]
fn test_cvc_length_follows_brand() {
    let catalog = BrandCatalog::new();
    let (form, recorder) = card_form(&catalog);

    type_keys(&form, FieldId::Pan, "37");
    type_keys(&form, FieldId::Cvc, "1234");
    assert!(form.session().state(FieldId::Cvc).unwrap().is_valid);
    recorder.take();

    // Switching to Visa re-validates the CVC against a 3 digit rule.
    backspace(&form, FieldId::Pan);
    backspace(&form, FieldId::Pan);
    type_keys(&form, FieldId::Pan, "4");

    assert_eq!(recorder.take(), vec!["brand none", "brand visa", "cvc false"]);
    assert_eq!(form.text(FieldId::Cvc).unwrap().text(), "1234");
}

// =============================================================================
// LIFECYCLE
// =============================================================================

#[test]
fn test_focus_lost_on_untouched_field_reports_invalid() {
    let catalog = BrandCatalog::new();
    let (form, recorder) = card_form(&catalog);

    form.on_focus_changed(FieldId::Pan, true).unwrap();
    form.on_focus_changed(FieldId::Pan, false).unwrap();
    form.on_focus_changed(FieldId::Pan, false).unwrap();

    assert_eq!(recorder.take(), vec!["pan false"]);
}

#[test]
fn test_inactive_form_holds_reports_until_active() {
    let catalog = BrandCatalog::new();
    let (form, recorder) = card_form(&catalog);
    type_keys(&form, FieldId::Pan, test_cards::VISA);
    recorder.take();

    form.on_became_inactive();
    backspace(&form, FieldId::Pan);
    type_keys(&form, FieldId::Pan, "1");
    assert!(recorder.take().is_empty());

    form.on_became_active();
    assert_eq!(recorder.take(), vec!["pan true"]);
}

#[test]
fn test_recreated_form_reports_again() {
    let catalog = BrandCatalog::new();
    let (form, recorder) = card_form(&catalog);
    type_keys(&form, FieldId::Pan, test_cards::VISA);
    form.on_became_inactive();
    let session = form.into_session();
    assert_eq!(catalog.subscriber_count(), 0);

    let recorder2 = Rc::new(Recorder::default());
    let config = CardValidationConfig::builder()
        .enable_pan_formatting()
        .listener(recorder2.clone())
        .session(session)
        .build()
        .unwrap();
    let form = FieldController::new(config, &catalog);
    form.on_became_active();

    // Same validity, new widget: reported once more.
    form.on_text_changed(FieldId::Pan, test_cards::VISA, 16).unwrap();
    form.on_text_changed(FieldId::Pan, test_cards::VISA, 16).unwrap();

    assert_eq!(recorder2.take(), vec!["brand visa", "pan true"]);
    assert!(recorder.take().contains(&"pan true".to_string()));
}

// =============================================================================
// CONFIGURATION RELOAD
// =============================================================================

#[test]
fn test_reload_revalidates_without_touching_text() {
    let catalog = BrandCatalog::new();
    let (form, recorder) = card_form(&catalog);
    type_keys(&form, FieldId::Pan, test_cards::VISA);
    recorder.take();

    let visa_15 = CardBrand::builder("visa")
        .pan_pattern("^4\\d*$")
        .pan_lengths([15])
        .build()
        .unwrap();
    catalog.load(CardConfiguration::new([visa_15], Default::default()));

    assert_eq!(recorder.take(), vec!["brand visa", "pan false"]);
    assert_eq!(form.text(FieldId::Pan).unwrap().text(), "4111 1111 1111 1111");
}

#[test]
fn test_late_fetch_does_not_override_newer_configuration() {
    let catalog = BrandCatalog::new();
    let (form, _recorder) = card_form(&catalog);

    let slow = catalog.begin_fetch();
    let fast = catalog.begin_fetch();
    assert!(catalog.complete_fetch(fast, CardConfiguration::default()));
    assert!(!catalog.complete_fetch(slow, CardConfiguration::rules_only()));

    type_keys(&form, FieldId::Pan, "4");
    assert_eq!(form.brand().unwrap().name(), "visa");
}

#[test]
fn test_listener_may_load_configuration_from_callback() {
    struct Loader {
        catalog: RefCell<Option<BrandCatalog>>,
        calls: Recorder,
    }

    impl CardValidationListener for Loader {
        fn on_pan_validated(&self, is_valid: bool) {
            self.calls.on_pan_validated(is_valid);
        }

        fn on_brand_changed(&self, brand: Option<&CardBrand>) {
            self.calls.on_brand_changed(brand);
            let catalog = self.catalog.borrow_mut().take();
            if let Some(catalog) = catalog {
                catalog.load(CardConfiguration::rules_only());
            }
        }
    }

    let catalog = BrandCatalog::new();
    let loader = Rc::new(Loader {
        catalog: RefCell::new(Some(catalog.clone())),
        calls: Recorder::default(),
    });
    let config = CardValidationConfig::builder()
        .listener(loader.clone())
        .build()
        .unwrap();
    let form = FieldController::new(config, &catalog);

    form.on_text_changed(FieldId::Pan, "4", 1).unwrap();

    assert_eq!(
        loader.calls.take(),
        vec!["brand visa", "brand none", "pan false"]
    );
    assert!(form.brand().is_none());
}

#[test]
fn test_reload_from_callback_reaches_every_form() {
    /// Restores the built-in table the first time the brand is lost.
    struct Restorer {
        catalog: RefCell<Option<BrandCatalog>>,
    }

    impl CardValidationListener for Restorer {
        fn on_brand_changed(&self, brand: Option<&CardBrand>) {
            if brand.is_none() {
                let catalog = self.catalog.borrow_mut().take();
                if let Some(catalog) = catalog {
                    catalog.load(CardConfiguration::default());
                }
            }
        }
    }

    let catalog = BrandCatalog::new();
    let restorer = Rc::new(Restorer {
        catalog: RefCell::new(Some(catalog.clone())),
    });
    let config = CardValidationConfig::builder()
        .listener(restorer.clone())
        .build()
        .unwrap();
    let first = FieldController::new(config, &catalog);
    let (second, _recorder) = card_form(&catalog);

    first.on_text_changed(FieldId::Pan, test_cards::VISA, 16).unwrap();
    type_keys(&second, FieldId::Pan, test_cards::VISA);

    catalog.load(CardConfiguration::rules_only());

    assert_eq!(catalog.current().brands().len(), 7);
    assert_eq!(first.brand().unwrap().name(), "visa");
    assert_eq!(second.brand().unwrap().name(), "visa");
    assert_eq!(second.pan_check(), Some(PanCheck::Valid));
}

#[cfg(feature = "config-json")]
#[test]
fn test_remote_document_replaces_builtin_table() {
    let catalog = BrandCatalog::new();
    let (form, recorder) = card_form(&catalog);
    type_keys(&form, FieldId::Pan, "9999");
    assert!(form.brand().is_none());
    recorder.take();

    let document = r#"[
        {"name": "local", "pattern": "^9\\d*$", "panLengths": [16], "cvvLength": 3,
         "panGrouping": [4, 4, 4, 4]}
    ]"#;
    let ticket = catalog.begin_fetch();
    assert!(catalog.complete_fetch(ticket, CardConfiguration::from_json(document).unwrap()));

    assert_eq!(form.brand().unwrap().name(), "local");
    assert_eq!(recorder.take().first().map(String::as_str), Some("brand local"));
}

// =============================================================================
// CVC-ONLY FORMS AND CONTRACTS
// =============================================================================

#[test]
fn test_cvc_only_form() {
    let catalog = BrandCatalog::new();
    let recorder = Rc::new(Recorder::default());
    let config = CvcValidationConfig::builder()
        .listener(recorder.clone())
        .build()
        .unwrap();
    let form = FieldController::for_cvc(config, &catalog);

    type_keys(&form, FieldId::Cvc, "123");

    assert_eq!(recorder.take(), vec!["cvc false", "cvc true", "all valid"]);
    assert!(matches!(
        form.on_text_changed(FieldId::Pan, "4", 1),
        Err(Error::UntrackedField(FieldId::Pan))
    ));
}

#[test]
fn test_custom_session_limits_tracked_fields() {
    let catalog = BrandCatalog::new();
    let recorder = Rc::new(Recorder::default());
    let config = CardValidationConfig::builder()
        .listener(recorder.clone())
        .session(CardValidationSession::tracking([FieldId::Pan]))
        .build()
        .unwrap();
    let form = FieldController::new(config, &catalog);

    form.on_text_changed(FieldId::Pan, test_cards::VISA, 16).unwrap();

    assert_eq!(recorder.take(), vec!["brand visa", "pan true", "all valid"]);
    assert!(form.on_focus_changed(FieldId::Cvc, false).is_err());
}

#[test]
fn test_missing_listener_fails_fast() {
    let result = CardValidationConfig::builder().build();
    assert!(matches!(result, Err(Error::MissingCollaborator(_))));

    let result = CvcValidationConfig::builder().build();
    assert!(matches!(result, Err(Error::MissingCollaborator(_))));
}

#[test]
fn test_controller_clones_share_form() {
    let catalog = BrandCatalog::new();
    let (form, _recorder) = card_form(&catalog);
    let clone = form.clone();

    type_keys(&clone, FieldId::Pan, "4111");
    assert_eq!(form.text(FieldId::Pan).unwrap().text(), "4111");

    drop(form);
    assert_eq!(catalog.subscriber_count(), 1);
    drop(clone);
    assert_eq!(catalog.subscriber_count(), 0);
}
