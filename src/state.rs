//! Per-field validity and the notification state machine.
//!
//! A [`CardValidationSession`] holds one [`FieldValidationState`] per tracked
//! field. It is keyed by [`FieldId`], not by any widget, so a host can keep
//! it across UI recreation and hand it to a new controller.
//!
//! [`ValidationStateStore`] decides when the listener hears about a field:
//!
//! - a result is reported when validity changed, or when the current value
//!   has not been reported yet;
//! - losing focus reports a value that was never reported;
//! - becoming inactive marks every field unreported, so the first result
//!   after reactivation is reported even if nothing changed;
//! - while inactive, reports are held back and the latest one per field is
//!   delivered on reactivation.
//!
//! After every delivered field report, [`ValidationEvent::AllValid`] follows
//! if every tracked field is valid.

use crate::brand::CardBrand;
use crate::error::{Error, Result};
use crate::resolve::FieldId;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

/// Validity of one field and whether the listener has heard about it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FieldValidationState {
    /// Result of the last validation.
    pub is_valid: bool,
    /// True right after `is_valid` was delivered to the listener.
    pub notification_sent: bool,
}

/// The tracked fields of one form and their states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardValidationSession {
    fields: BTreeMap<FieldId, FieldValidationState>,
}

impl CardValidationSession {
    /// A session tracking the PAN, expiry date and CVC.
    pub fn card() -> Self {
        Self::tracking(FieldId::ALL)
    }

    /// A session tracking only the CVC.
    pub fn cvc_only() -> Self {
        Self::tracking([FieldId::Cvc])
    }

    /// A session tracking `fields`, all initially invalid and unreported.
    pub fn tracking(fields: impl IntoIterator<Item = FieldId>) -> Self {
        Self {
            fields: fields
                .into_iter()
                .map(|field| (field, FieldValidationState::default()))
                .collect(),
        }
    }

    /// Returns true if `field` is tracked.
    #[inline]
    pub fn tracks(&self, field: FieldId) -> bool {
        self.fields.contains_key(&field)
    }

    /// Returns the tracked fields in form order.
    pub fn fields(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.fields.keys().copied()
    }

    /// Returns the state of `field`, if tracked.
    pub fn state(&self, field: FieldId) -> Option<FieldValidationState> {
        self.fields.get(&field).copied()
    }

    /// Returns true if every tracked field is valid.
    pub fn all_valid(&self) -> bool {
        self.fields.values().all(|state| state.is_valid)
    }

    fn state_mut(&mut self, field: FieldId) -> Result<&mut FieldValidationState> {
        self.fields
            .get_mut(&field)
            .ok_or(Error::UntrackedField(field))
    }
}

impl Default for CardValidationSession {
    fn default() -> Self {
        Self::card()
    }
}

/// Outward notification produced by the store or the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationEvent {
    /// A field's validity was reported.
    Validated(FieldId, bool),
    /// The detected brand changed.
    BrandChanged(Option<Arc<CardBrand>>),
    /// Every tracked field is valid.
    AllValid,
}

/// Notification state machine over a [`CardValidationSession`].
///
/// Events are appended to a caller-supplied outbox; the caller delivers
/// them once it is safe to call back into user code.
///
/// # Example
///
/// ```
/// use cardfield::resolve::FieldId;
/// use cardfield::state::{CardValidationSession, ValidationEvent, ValidationStateStore};
///
/// let mut store = ValidationStateStore::new(CardValidationSession::cvc_only());
/// let mut outbox = Vec::new();
///
/// store.handle_result(FieldId::Cvc, true, &mut outbox).unwrap();
/// store.handle_result(FieldId::Cvc, true, &mut outbox).unwrap();
///
/// assert_eq!(
///     outbox,
///     vec![ValidationEvent::Validated(FieldId::Cvc, true), ValidationEvent::AllValid]
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationStateStore {
    session: CardValidationSession,
    active: bool,
    deferred: BTreeMap<FieldId, bool>,
}

impl ValidationStateStore {
    /// Creates an active store over `session`.
    pub fn new(session: CardValidationSession) -> Self {
        Self {
            session,
            active: true,
            deferred: BTreeMap::new(),
        }
    }

    /// Returns the session.
    #[inline]
    pub fn session(&self) -> &CardValidationSession {
        &self.session
    }

    /// Consumes the store, returning the session.
    pub fn into_session(self) -> CardValidationSession {
        self.session
    }

    /// Returns true unless the host reported the form inactive.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Records a validation result, reporting it if validity changed or the
    /// current value was never reported.
    pub fn handle_result(
        &mut self,
        field: FieldId,
        is_valid: bool,
        outbox: &mut Vec<ValidationEvent>,
    ) -> Result<()> {
        let state = *self.session.state_mut(field)?;
        if is_valid != state.is_valid || !state.notification_sent {
            self.notify(field, is_valid, outbox)?;
        } else {
            trace!("{} still {}, not reporting", field, validity(is_valid));
        }
        Ok(())
    }

    /// Reports the field's current validity if it was never reported.
    ///
    /// Ignored while inactive.
    pub fn handle_focus_lost(
        &mut self,
        field: FieldId,
        outbox: &mut Vec<ValidationEvent>,
    ) -> Result<()> {
        let state = *self.session.state_mut(field)?;
        if !state.notification_sent && self.active {
            self.notify(field, state.is_valid, outbox)?;
        }
        Ok(())
    }

    /// Marks every field unreported and holds back reports until
    /// [`on_became_active`](Self::on_became_active).
    pub fn on_became_inactive(&mut self) {
        self.active = false;
        for state in self.session.fields.values_mut() {
            state.notification_sent = false;
        }
        trace!("validation store inactive");
    }

    /// Delivers the reports held back while inactive.
    pub fn on_became_active(&mut self, outbox: &mut Vec<ValidationEvent>) -> Result<()> {
        self.active = true;
        let deferred = std::mem::take(&mut self.deferred);
        trace!(
            "validation store active, {} deferred reports",
            deferred.len()
        );
        for (field, is_valid) in deferred {
            self.notify(field, is_valid, outbox)?;
        }
        Ok(())
    }

    fn notify(
        &mut self,
        field: FieldId,
        is_valid: bool,
        outbox: &mut Vec<ValidationEvent>,
    ) -> Result<()> {
        let active = self.active;
        let state = self.session.state_mut(field)?;
        state.is_valid = is_valid;

        if !active {
            self.deferred.insert(field, is_valid);
            return Ok(());
        }

        state.notification_sent = true;
        outbox.push(ValidationEvent::Validated(field, is_valid));
        if self.session.all_valid() {
            outbox.push(ValidationEvent::AllValid);
        }
        Ok(())
    }
}

impl Default for ValidationStateStore {
    fn default() -> Self {
        Self::new(CardValidationSession::default())
    }
}

fn validity(is_valid: bool) -> &'static str {
    if is_valid {
        "valid"
    } else {
        "invalid"
    }
}
