//! Fuzz target for keystroke handling.
//!
//! Replays arbitrary edits against a form and checks that the returned text
//! is always something the field can display.

#![no_main]

use arbitrary::Arbitrary;
use cardfield::{
    BrandCatalog, CardConfiguration, CardValidationConfig, CardValidationListener,
    FieldController, FieldId,
};
use libfuzzer_sys::fuzz_target;
use std::rc::Rc;

#[derive(Debug, Arbitrary)]
enum Step {
    Edit { field: u8, text: String, caret: u8 },
    Focus { field: u8, has_focus: bool },
    Inactive,
    Active,
    Reload { rules_only: bool },
}

struct Silent;
impl CardValidationListener for Silent {}

fn field(id: u8) -> FieldId {
    FieldId::ALL[id as usize % FieldId::ALL.len()]
}

fuzz_target!(|steps: Vec<Step>| {
    let catalog = BrandCatalog::new();
    let config = CardValidationConfig::builder()
        .enable_pan_formatting()
        .listener(Rc::new(Silent))
        .build()
        .unwrap();
    let form = FieldController::new(config, &catalog);

    for step in steps {
        match step {
            Step::Edit { field: id, text, caret } => {
                let field = field(id);
                let out = form.on_text_changed(field, &text, caret as usize).unwrap();
                assert!(out.caret() <= out.len());
                match field {
                    FieldId::Pan => assert!(out.text().chars().all(|c| c.is_ascii_digit() || c == ' ')),
                    FieldId::ExpiryDate => assert!(out.text().chars().all(|c| c.is_ascii_digit() || c == '/')),
                    FieldId::Cvc => assert!(out.text().chars().all(|c| c.is_ascii_digit())),
                }
            }
            Step::Focus { field: id, has_focus } => {
                form.on_focus_changed(field(id), has_focus).unwrap();
            }
            Step::Inactive => form.on_became_inactive(),
            Step::Active => form.on_became_active(),
            Step::Reload { rules_only } => catalog.load(if rules_only {
                CardConfiguration::rules_only()
            } else {
                CardConfiguration::default()
            }),
        }
    }
});
