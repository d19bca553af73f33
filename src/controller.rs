//! Keystroke orchestration for a card form.
//!
//! A [`FieldController`] owns the validation state of one form. The host
//! reports every edit with [`on_text_changed`](FieldController::on_text_changed)
//! and writes the returned [`FieldText`] back into its widget. Per edit:
//!
//! ```text
//! PAN:    filter -> space deletion -> detect brand -> clamp -> format -> caret
//!         -> (brand changed: notify, swap CVC rule, re-validate CVC)
//!         -> validate -> store
//! Expiry: filter -> sanitise (unless deleting the separator) -> validate -> store
//! CVC:    filter -> clamp -> validate -> store
//! ```
//!
//! The controller subscribes to its [`BrandCatalog`] and re-validates every
//! non-blank field when a new configuration is loaded, without touching the
//! text. Dropping the controller unsubscribes.
//!
//! Listener callbacks are delivered after the controller has released its
//! state, so a listener may call back into the controller.
//!
//! # Example
//!
//! ```
//! use cardfield::catalog::BrandCatalog;
//! use cardfield::controller::{CardValidationConfig, FieldController};
//! use cardfield::listener::CardValidationListener;
//! use cardfield::resolve::FieldId;
//! use std::rc::Rc;
//!
//! struct Ignore;
//! impl CardValidationListener for Ignore {}
//!
//! let config = CardValidationConfig::builder()
//!     .enable_pan_formatting()
//!     .listener(Rc::new(Ignore))
//!     .build()
//!     .unwrap();
//! let controller = FieldController::new(config, &BrandCatalog::new());
//!
//! let out = controller.on_text_changed(FieldId::Pan, "41111", 5).unwrap();
//! assert_eq!(out.text(), "4111 1");
//! assert_eq!(out.caret(), 6);
//! assert_eq!(controller.brand().unwrap().name(), "visa");
//! ```

use crate::brand::CardBrand;
use crate::catalog::{BrandCatalog, ConfigurationObserver, SubscriptionId};
use crate::config::CardConfiguration;
use crate::detect::detect_brand;
use crate::error::{Error, Result};
use crate::expiry::{Clock, ExpiryDateSanitiser, ExpiryDateValidator, SystemClock, SEPARATOR};
use crate::filter::{
    DigitFilter, FieldText, FilterChain, InputFilter, LengthFilter, SeparatorFilter,
};
use crate::format::{caret_after_digits, max_pan_length, PanFormatter};
use crate::listener::{dispatch, CardValidationListener};
use crate::resolve::{FieldId, RuleResolver};
use crate::state::{CardValidationSession, ValidationEvent, ValidationStateStore};
use crate::validate::{CvcValidator, PanCheck, PanValidator};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, trace};
use zeroize::Zeroize;

/// Longest CVC accepted when the rule declares no lengths.
const DEFAULT_MAX_CVC_LENGTH: usize = 4;

/// Runtime options for a card (PAN, expiry date, CVC) form.
pub struct CardValidationConfig {
    accepted_brands: Vec<String>,
    enable_pan_formatting: bool,
    listener: Rc<dyn CardValidationListener>,
    clock: Box<dyn Clock>,
    session: Option<CardValidationSession>,
}

impl CardValidationConfig {
    /// Starts building a configuration.
    pub fn builder() -> CardValidationConfigBuilder {
        CardValidationConfigBuilder::default()
    }

    /// Returns the accepted brand names; empty accepts every brand.
    pub fn accepted_brands(&self) -> &[String] {
        &self.accepted_brands
    }

    /// Returns true if the PAN is grouped while typing.
    pub fn pan_formatting_enabled(&self) -> bool {
        self.enable_pan_formatting
    }
}

impl fmt::Debug for CardValidationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardValidationConfig")
            .field("accepted_brands", &self.accepted_brands)
            .field("enable_pan_formatting", &self.enable_pan_formatting)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CardValidationConfig`].
#[derive(Default)]
pub struct CardValidationConfigBuilder {
    accepted_brands: Vec<String>,
    enable_pan_formatting: bool,
    listener: Option<Rc<dyn CardValidationListener>>,
    clock: Option<Box<dyn Clock>>,
    session: Option<CardValidationSession>,
}

impl CardValidationConfigBuilder {
    /// Restricts accepted cards to the named brands (case-insensitive).
    pub fn accepted_card_brands<I, S>(mut self, brands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accepted_brands = brands.into_iter().map(Into::into).collect();
        self
    }

    /// Groups the PAN while the user types.
    pub fn enable_pan_formatting(mut self) -> Self {
        self.enable_pan_formatting = true;
        self
    }

    /// Sets the listener. Required.
    pub fn listener(mut self, listener: Rc<dyn CardValidationListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Sets the clock expiry dates are judged against. Defaults to the
    /// system clock.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Resumes a session detached from an earlier controller.
    pub fn session(mut self, session: CardValidationSession) -> Self {
        self.session = Some(session);
        self
    }

    /// Builds the configuration.
    ///
    /// Fails with [`Error::MissingCollaborator`] if no listener was set.
    pub fn build(self) -> Result<CardValidationConfig> {
        let listener = self
            .listener
            .ok_or(Error::MissingCollaborator("validation listener"))?;
        Ok(CardValidationConfig {
            accepted_brands: self.accepted_brands,
            enable_pan_formatting: self.enable_pan_formatting,
            listener,
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock)),
            session: self.session,
        })
    }
}

/// Runtime options for a form that only collects a CVC.
pub struct CvcValidationConfig {
    listener: Rc<dyn CardValidationListener>,
    session: Option<CardValidationSession>,
}

impl CvcValidationConfig {
    /// Starts building a configuration.
    pub fn builder() -> CvcValidationConfigBuilder {
        CvcValidationConfigBuilder::default()
    }
}

impl fmt::Debug for CvcValidationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CvcValidationConfig")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CvcValidationConfig`].
#[derive(Default)]
pub struct CvcValidationConfigBuilder {
    listener: Option<Rc<dyn CardValidationListener>>,
    session: Option<CardValidationSession>,
}

impl CvcValidationConfigBuilder {
    /// Sets the listener. Required.
    pub fn listener(mut self, listener: Rc<dyn CardValidationListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Resumes a session detached from an earlier controller.
    pub fn session(mut self, session: CardValidationSession) -> Self {
        self.session = Some(session);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Result<CvcValidationConfig> {
        let listener = self
            .listener
            .ok_or(Error::MissingCollaborator("validation listener"))?;
        Ok(CvcValidationConfig {
            listener,
            session: self.session,
        })
    }
}

/// Per-form state mutated on every edit.
struct ControllerState {
    config: Arc<CardConfiguration>,
    brand: Option<Arc<CardBrand>>,
    texts: BTreeMap<FieldId, String>,
    store: ValidationStateStore,
    formatter: PanFormatter,
    pan_validator: PanValidator,
    cvc_validator: CvcValidator,
    expiry_validator: ExpiryDateValidator<Box<dyn Clock>>,
    last_pan_check: Option<PanCheck>,
    outbox: Vec<ValidationEvent>,
}

impl ControllerState {
    fn text(&self, field: FieldId) -> &str {
        self.texts.get(&field).map(String::as_str).unwrap_or("")
    }

    fn set_text(&mut self, field: FieldId, text: String) {
        if let Some(mut old) = self.texts.insert(field, text) {
            old.zeroize();
        }
    }

    fn ensure_tracked(&self, field: FieldId) -> Result<()> {
        if self.store.session().tracks(field) {
            Ok(())
        } else {
            Err(Error::UntrackedField(field))
        }
    }

    fn text_changed(&mut self, field: FieldId, text: &str, caret: usize) -> Result<FieldText> {
        self.ensure_tracked(field)?;
        let input = FieldText::new(text, caret);
        match field {
            FieldId::Pan => self.pan_changed(&input),
            FieldId::ExpiryDate => self.expiry_changed(&input),
            FieldId::Cvc => self.cvc_changed(&input),
        }
    }

    fn pan_changed(&mut self, input: &FieldText) -> Result<FieldText> {
        let filtered = DigitFilter::digits_and_spaces().apply(input);
        let previous_len = self.text(FieldId::Pan).chars().count();
        let inserting = filtered.len() > previous_len;

        let edited = if self.formatter.is_enabled() {
            self.delete_digit_before_deleted_space(filtered)
        } else {
            filtered
        };

        let brand = detect_brand(&self.config, edited.text());
        let clamped = LengthFilter::new(max_pan_length(brand.as_deref())).apply(&edited);
        let formatted = self.formatter.format(clamped.text(), brand.as_deref());

        let caret = if self.formatter.is_enabled() {
            let digits_before_caret = clamped
                .text()
                .chars()
                .take(clamped.caret())
                .filter(char::is_ascii_digit)
                .count();
            caret_after_digits(&formatted, digits_before_caret, inserting)
        } else {
            clamped.caret()
        };

        if brand != self.brand {
            self.brand_changed(brand)?;
        }
        self.set_text(FieldId::Pan, formatted.clone());
        self.validate_pan()?;

        Ok(FieldText::new(formatted, caret))
    }

    /// Deleting a formatting space also deletes the digit before it;
    /// otherwise the formatter would put the space straight back.
    fn delete_digit_before_deleted_space(&self, edited: FieldText) -> FieldText {
        let previous: Vec<char> = self.text(FieldId::Pan).chars().collect();
        let current: Vec<char> = edited.text().chars().collect();
        if current.len() + 1 != previous.len() {
            return edited;
        }

        let removed = previous
            .iter()
            .zip(&current)
            .position(|(before, after)| before != after)
            .unwrap_or(current.len());
        let deleted_space = previous[removed] == ' '
            && previous[..removed] == current[..removed]
            && previous[removed + 1..] == current[removed..];
        if !deleted_space || removed == 0 {
            return edited;
        }

        trace!("pan formatting space deleted at {}", removed);
        let mut text = String::with_capacity(edited.text().len());
        text.extend(current[..removed - 1].iter());
        text.extend(current[removed..].iter());
        FieldText::new(text, removed - 1)
    }

    fn expiry_changed(&mut self, input: &FieldText) -> Result<FieldText> {
        let filtered = SeparatorFilter::new(SEPARATOR).apply(input);

        let committed =
            if ExpiryDateSanitiser::is_separator_deletion(self.text(FieldId::ExpiryDate), filtered.text()) {
                filtered
            } else {
                let sanitised = ExpiryDateSanitiser::sanitise(filtered.text());
                if sanitised == filtered.text() {
                    filtered
                } else {
                    FieldText::at_end(sanitised)
                }
            };

        self.set_text(FieldId::ExpiryDate, committed.text().to_string());
        self.validate_expiry()?;
        Ok(committed)
    }

    fn cvc_changed(&mut self, input: &FieldText) -> Result<FieldText> {
        let clamped = FilterChain::new()
            .with(DigitFilter::digits())
            .with(LengthFilter::for_rule(self.cvc_validator.rule(), DEFAULT_MAX_CVC_LENGTH))
            .apply(input);

        self.set_text(FieldId::Cvc, clamped.text().to_string());
        self.validate_cvc()?;
        Ok(clamped)
    }

    fn brand_changed(&mut self, brand: Option<Arc<CardBrand>>) -> Result<()> {
        debug!(
            "card brand changed: {} -> {}",
            brand_name(self.brand.as_deref()),
            brand_name(brand.as_deref())
        );
        self.brand = brand;
        self.outbox
            .push(ValidationEvent::BrandChanged(self.brand.clone()));
        self.update_cvc_rule()?;
        Ok(())
    }

    /// Swaps the CVC rule for the current brand and re-validates a
    /// non-blank CVC against it.
    fn update_cvc_rule(&mut self) -> Result<()> {
        let rule = RuleResolver::new(&self.config)
            .resolve(FieldId::Cvc, self.brand.as_deref())
            .clone();
        self.cvc_validator.update_rule(rule);

        if self.store.session().tracks(FieldId::Cvc) && !self.text(FieldId::Cvc).trim().is_empty() {
            self.validate_cvc()?;
        }
        Ok(())
    }

    fn validate_pan(&mut self) -> Result<()> {
        let brand = self.brand.as_deref();
        let rule = RuleResolver::new(&self.config).resolve(FieldId::Pan, brand);
        let check = self
            .pan_validator
            .check(self.text(FieldId::Pan), rule, brand);
        debug!(
            "pan validated: {} digits, brand {}, {}",
            self.text(FieldId::Pan).chars().filter(char::is_ascii_digit).count(),
            brand_name(brand),
            check
        );

        self.last_pan_check = Some(check);
        self.store
            .handle_result(FieldId::Pan, check.is_valid(), &mut self.outbox)
    }

    fn validate_expiry(&mut self) -> Result<()> {
        let is_valid = self
            .expiry_validator
            .validate(self.text(FieldId::ExpiryDate));
        debug!("expiry date validated: {}", is_valid);
        self.store
            .handle_result(FieldId::ExpiryDate, is_valid, &mut self.outbox)
    }

    fn validate_cvc(&mut self) -> Result<()> {
        let is_valid = self.cvc_validator.validate(self.text(FieldId::Cvc));
        debug!(
            "cvc validated: {} digits, {}",
            self.text(FieldId::Cvc).len(),
            is_valid
        );
        self.store
            .handle_result(FieldId::Cvc, is_valid, &mut self.outbox)
    }

    /// Re-resolves every rule against `config` and re-validates non-blank
    /// fields. Field text is left alone.
    fn reload(&mut self, config: Arc<CardConfiguration>) -> Result<()> {
        self.config = config;

        let tracks_pan = self.store.session().tracks(FieldId::Pan);
        let brand = if tracks_pan {
            detect_brand(&self.config, self.text(FieldId::Pan))
        } else {
            None
        };
        if brand != self.brand {
            self.brand_changed(brand)?;
        } else {
            self.update_cvc_rule()?;
        }

        if tracks_pan && !self.text(FieldId::Pan).trim().is_empty() {
            self.validate_pan()?;
        }
        if self.store.session().tracks(FieldId::ExpiryDate)
            && !self.text(FieldId::ExpiryDate).trim().is_empty()
        {
            self.validate_expiry()?;
        }
        Ok(())
    }
}

impl Drop for ControllerState {
    fn drop(&mut self) {
        for text in self.texts.values_mut() {
            text.zeroize();
        }
    }
}

fn brand_name(brand: Option<&CardBrand>) -> &str {
    brand.map(CardBrand::name).unwrap_or("none")
}

struct ControllerShared {
    state: RefCell<ControllerState>,
    listener: Rc<dyn CardValidationListener>,
    pending_config: RefCell<Option<Arc<CardConfiguration>>>,
}

impl ControllerShared {
    /// Runs `op` on the state, then delivers the events it produced and
    /// applies a configuration that arrived meanwhile.
    fn run<R>(&self, op: impl FnOnce(&mut ControllerState) -> R) -> R {
        let (result, events) = {
            let mut state = self.state.borrow_mut();
            let result = op(&mut *state);
            (result, std::mem::take(&mut state.outbox))
        };
        self.deliver(events);

        let pending = self.pending_config.borrow_mut().take();
        if let Some(config) = pending {
            self.apply_configuration(config);
        }
        result
    }

    fn deliver(&self, events: Vec<ValidationEvent>) {
        for event in &events {
            dispatch(self.listener.as_ref(), event);
        }
    }

    fn apply_configuration(&self, config: Arc<CardConfiguration>) {
        let outcome = self.run(|state| state.reload(config));
        if let Err(e) = outcome {
            // Reload only touches tracked fields.
            debug!("configuration reload skipped a field: {}", e);
        }
    }
}

impl ConfigurationObserver for ControllerShared {
    fn configuration_changed(&self, config: &Arc<CardConfiguration>) {
        // Busy when user code run mid-operation, such as a clock, loads
        // the catalog.
        if self.state.try_borrow_mut().is_err() {
            trace!("controller busy, configuration reload queued");
            *self.pending_config.borrow_mut() = Some(Arc::clone(config));
            return;
        }
        self.apply_configuration(Arc::clone(config));
    }
}

/// Orchestrates validation for one card form.
///
/// Cheap to clone; clones drive the same form. The catalog subscription
/// ends when the last clone is dropped.
pub struct FieldController {
    shared: Rc<ControllerShared>,
    attachment: Rc<Attachment>,
}

/// Catalog subscription released when the last controller clone drops.
struct Attachment {
    catalog: BrandCatalog,
    subscription: SubscriptionId,
}

impl Drop for Attachment {
    fn drop(&mut self) {
        self.catalog.unsubscribe(self.subscription);
    }
}

impl FieldController {
    /// Creates a controller for a card form.
    pub fn new(config: CardValidationConfig, catalog: &BrandCatalog) -> Self {
        let session = config.session.unwrap_or_else(CardValidationSession::card);
        let formatter = PanFormatter::new(config.enable_pan_formatting);
        Self::attach(
            session,
            formatter,
            PanValidator::new(config.accepted_brands),
            config.clock,
            config.listener,
            catalog,
        )
    }

    /// Creates a controller for a CVC-only form.
    pub fn for_cvc(config: CvcValidationConfig, catalog: &BrandCatalog) -> Self {
        let session = config.session.unwrap_or_else(CardValidationSession::cvc_only);
        Self::attach(
            session,
            PanFormatter::new(false),
            PanValidator::default(),
            Box::new(SystemClock),
            config.listener,
            catalog,
        )
    }

    fn attach(
        session: CardValidationSession,
        formatter: PanFormatter,
        pan_validator: PanValidator,
        clock: Box<dyn Clock>,
        listener: Rc<dyn CardValidationListener>,
        catalog: &BrandCatalog,
    ) -> Self {
        let config = catalog.current();
        let cvc_validator = CvcValidator::new(
            RuleResolver::new(&config)
                .resolve(FieldId::Cvc, None)
                .clone(),
        );

        let shared = Rc::new(ControllerShared {
            state: RefCell::new(ControllerState {
                config,
                brand: None,
                texts: BTreeMap::new(),
                store: ValidationStateStore::new(session),
                formatter,
                pan_validator,
                cvc_validator,
                expiry_validator: ExpiryDateValidator::new(clock),
                last_pan_check: None,
                outbox: Vec::new(),
            }),
            listener,
            pending_config: RefCell::new(None),
        });

        let observer: Rc<dyn ConfigurationObserver> = shared.clone();
        let subscription = catalog.subscribe(Rc::downgrade(&observer));
        debug!("field controller attached as subscription {:?}", subscription);

        Self {
            shared,
            attachment: Rc::new(Attachment {
                catalog: catalog.clone(),
                subscription,
            }),
        }
    }

    /// Handles an edit of `field`. `caret` is in characters.
    ///
    /// Returns the text and caret the host must display.
    pub fn on_text_changed(&self, field: FieldId, text: &str, caret: usize) -> Result<FieldText> {
        self.shared
            .run(|state| state.text_changed(field, text, caret))
    }

    /// Handles a focus change of `field`.
    ///
    /// Losing focus reports a field that was never reported, so tabbing
    /// through a blank field marks it invalid.
    pub fn on_focus_changed(&self, field: FieldId, has_focus: bool) -> Result<()> {
        self.shared.run(|state| {
            state.ensure_tracked(field)?;
            if has_focus {
                return Ok(());
            }
            let ControllerState { store, outbox, .. } = state;
            store.handle_focus_lost(field, outbox)
        })
    }

    /// The form went to the background.
    ///
    /// Every field will be re-reported, and reports are held back until
    /// [`on_became_active`](Self::on_became_active).
    pub fn on_became_inactive(&self) {
        self.shared.run(|state| state.store.on_became_inactive());
    }

    /// The form is visible again; held-back reports are delivered.
    pub fn on_became_active(&self) {
        let outcome = self.shared.run(|state| {
            let ControllerState { store, outbox, .. } = state;
            store.on_became_active(outbox)
        });
        if let Err(e) = outcome {
            debug!("deferred report dropped: {}", e);
        }
    }

    /// Returns the detected brand.
    pub fn brand(&self) -> Option<Arc<CardBrand>> {
        self.shared.state.borrow().brand.clone()
    }

    /// Returns the committed text of `field`, with the caret at the end.
    pub fn text(&self, field: FieldId) -> Result<FieldText> {
        let state = self.shared.state.borrow();
        state.ensure_tracked(field)?;
        Ok(FieldText::at_end(state.text(field)))
    }

    /// Returns the outcome of the last PAN validation.
    pub fn pan_check(&self) -> Option<PanCheck> {
        self.shared.state.borrow().last_pan_check
    }

    /// Returns true if every tracked field is valid.
    pub fn all_valid(&self) -> bool {
        self.shared.state.borrow().store.session().all_valid()
    }

    /// Returns a copy of the session state.
    pub fn session(&self) -> CardValidationSession {
        self.shared.state.borrow().store.session().clone()
    }

    /// Detaches from the catalog and returns the session, for a controller
    /// built for a recreated form.
    ///
    /// Remaining clones keep the form state but no longer see configuration
    /// reloads.
    pub fn into_session(self) -> CardValidationSession {
        self.attachment
            .catalog
            .unsubscribe(self.attachment.subscription);
        self.session()
    }
}

impl Clone for FieldController {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
            attachment: Rc::clone(&self.attachment),
        }
    }
}

impl fmt::Debug for FieldController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("FieldController")
            .field("brand", &brand_name(state.brand.as_deref()))
            .field("session", state.store.session())
            .field("subscription", &self.attachment.subscription)
            .finish()
    }
}
