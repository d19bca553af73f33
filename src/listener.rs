//! Outward validation callbacks.

use crate::brand::CardBrand;
use crate::state::ValidationEvent;
use crate::resolve::FieldId;

/// Receives validation notifications from a
/// [`FieldController`](crate::controller::FieldController).
///
/// Every method has an empty default so a listener only implements what it
/// cares about; a CVC-only form usually only needs
/// [`on_cvc_validated`](Self::on_cvc_validated) and
/// [`on_all_valid`](Self::on_all_valid).
///
/// Callbacks run synchronously on the caller's thread after the controller
/// has finished updating its own state, so a listener may call back into the
/// controller or load a new configuration.
pub trait CardValidationListener {
    /// The PAN became valid or invalid, or its state is being re-reported.
    fn on_pan_validated(&self, _is_valid: bool) {}

    /// The expiry date became valid or invalid.
    fn on_expiry_date_validated(&self, _is_valid: bool) {}

    /// The CVC became valid or invalid.
    fn on_cvc_validated(&self, _is_valid: bool) {}

    /// The detected brand changed. `None` means no brand is recognised.
    fn on_brand_changed(&self, _brand: Option<&CardBrand>) {}

    /// Every tracked field is valid.
    fn on_all_valid(&self) {}
}

/// Delivers `event` to `listener`.
pub(crate) fn dispatch(listener: &dyn CardValidationListener, event: &ValidationEvent) {
    match event {
        ValidationEvent::Validated(FieldId::Pan, is_valid) => listener.on_pan_validated(*is_valid),
        ValidationEvent::Validated(FieldId::ExpiryDate, is_valid) => {
            listener.on_expiry_date_validated(*is_valid)
        }
        ValidationEvent::Validated(FieldId::Cvc, is_valid) => listener.on_cvc_validated(*is_valid),
        ValidationEvent::BrandChanged(brand) => listener.on_brand_changed(brand.as_deref()),
        ValidationEvent::AllValid => listener.on_all_valid(),
    }
}
