//! Simulates a user filling in a card form and prints what the form sees.
//!
//! Run with: `cargo run --example typing`

use cardfield::{
    BrandCatalog, CardBrand, CardConfiguration, CardValidationConfig, CardValidationListener,
    FieldController, FieldId,
};
use std::rc::Rc;

struct Printer;

impl CardValidationListener for Printer {
    fn on_pan_validated(&self, is_valid: bool) {
        println!("    pan valid: {}", is_valid);
    }

    fn on_expiry_date_validated(&self, is_valid: bool) {
        println!("    expiry valid: {}", is_valid);
    }

    fn on_cvc_validated(&self, is_valid: bool) {
        println!("    cvc valid: {}", is_valid);
    }

    fn on_brand_changed(&self, brand: Option<&CardBrand>) {
        println!(
            "    brand: {}",
            brand.map(CardBrand::name).unwrap_or("unknown")
        );
    }

    fn on_all_valid(&self) {
        println!("    ready to submit");
    }
}

fn type_into(form: &FieldController, field: FieldId, keys: &str) -> cardfield::Result<()> {
    println!("{}:", field);
    let mut text = String::new();
    for key in keys.chars() {
        text.push(key);
        let out = form.on_text_changed(field, &text, text.len())?;
        println!("  {:>22} | caret {}", out.text(), out.caret());
        text = out.text().to_string();
    }
    form.on_focus_changed(field, false)
}

fn main() -> cardfield::Result<()> {
    let config = CardValidationConfig::builder()
        .enable_pan_formatting()
        .listener(Rc::new(Printer))
        .build()?;
    let catalog = BrandCatalog::new();
    let form = FieldController::new(config, &catalog);

    type_into(&form, FieldId::Pan, "378282246310005")?;
    type_into(&form, FieldId::ExpiryDate, "1299")?;
    type_into(&form, FieldId::Cvc, "1234")?;

    println!("configuration reload (rules only):");
    catalog.load(CardConfiguration::rules_only());
    println!("  brand now: {:?}", form.brand().map(|b| b.name().to_string()));

    Ok(())
}
