//! The active card configuration and its subscribers.
//!
//! [`BrandCatalog`] is a cheap, cloneable, single-threaded handle. Exactly one
//! [`CardConfiguration`] is active at any time; [`BrandCatalog::load`]
//! replaces it wholesale and synchronously notifies every live subscriber so
//! already-attached controllers re-validate against the new rules.
//!
//! Remote fetches complete out of band and may arrive late. Each fetch takes a
//! [`FetchTicket`] when it starts; a completion is ignored when a newer ticket
//! (or a direct `load`) has been applied since.
//!
//! # Example
//!
//! ```
//! use cardfield::catalog::BrandCatalog;
//! use cardfield::config::CardConfiguration;
//!
//! let catalog = BrandCatalog::new();
//! let slow = catalog.begin_fetch();
//! let fast = catalog.begin_fetch();
//!
//! assert!(catalog.complete_fetch(fast, CardConfiguration::rules_only()));
//! // The older fetch finished last: ignored.
//! assert!(!catalog.complete_fetch(slow, CardConfiguration::default()));
//! assert!(catalog.current().brands().is_empty());
//! ```

use crate::config::CardConfiguration;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Receives configuration replacement events from a [`BrandCatalog`].
pub trait ConfigurationObserver {
    /// Called synchronously after `config` became the active configuration.
    fn configuration_changed(&self, config: &Arc<CardConfiguration>);
}

/// Identifies one subscription so it can be removed deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Issued when a configuration fetch starts; ordered by issue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[must_use = "a fetch ticket must be handed back to complete_fetch"]
pub struct FetchTicket(u64);

struct CatalogState {
    active: Arc<CardConfiguration>,
    /// Last ticket number handed out.
    issued: u64,
    /// Ticket number of the configuration currently applied.
    applied: u64,
}

struct CatalogInner {
    state: RefCell<CatalogState>,
    observers: RefCell<Vec<(SubscriptionId, Weak<dyn ConfigurationObserver>)>>,
    next_subscription: Cell<u64>,
}

/// Shared handle to the active card configuration.
#[derive(Clone)]
pub struct BrandCatalog {
    inner: Rc<CatalogInner>,
}

impl BrandCatalog {
    /// Creates a catalog holding the built-in configuration.
    pub fn new() -> Self {
        Self::with_configuration(CardConfiguration::default())
    }

    /// Creates a catalog holding `config`.
    pub fn with_configuration(config: CardConfiguration) -> Self {
        Self {
            inner: Rc::new(CatalogInner {
                state: RefCell::new(CatalogState {
                    active: Arc::new(config),
                    issued: 0,
                    applied: 0,
                }),
                observers: RefCell::new(Vec::new()),
                next_subscription: Cell::new(0),
            }),
        }
    }

    /// Returns the active configuration.
    pub fn current(&self) -> Arc<CardConfiguration> {
        Arc::clone(&self.inner.state.borrow().active)
    }

    /// Replaces the active configuration and notifies subscribers.
    ///
    /// A direct load supersedes every fetch started before it.
    pub fn load(&self, config: CardConfiguration) {
        let config = Arc::new(config);
        {
            let mut state = self.inner.state.borrow_mut();
            state.issued += 1;
            state.applied = state.issued;
            state.active = Arc::clone(&config);
        }
        info!("card configuration loaded: {} brands", config.brands().len());
        self.notify(&config);
    }

    /// Starts a configuration fetch.
    pub fn begin_fetch(&self) -> FetchTicket {
        let mut state = self.inner.state.borrow_mut();
        state.issued += 1;
        trace!("configuration fetch {} started", state.issued);
        FetchTicket(state.issued)
    }

    /// Completes a fetch started with [`begin_fetch`](Self::begin_fetch).
    ///
    /// Returns `false`, leaving the active configuration untouched, when a
    /// newer fetch or load has already been applied.
    pub fn complete_fetch(&self, ticket: FetchTicket, config: CardConfiguration) -> bool {
        let config = Arc::new(config);
        {
            let mut state = self.inner.state.borrow_mut();
            if ticket.0 < state.applied {
                debug!(
                    "ignoring configuration fetch {}: fetch {} already applied",
                    ticket.0, state.applied
                );
                return false;
            }
            state.applied = ticket.0;
            state.active = Arc::clone(&config);
        }
        info!(
            "card configuration fetch {} applied: {} brands",
            ticket.0,
            config.brands().len()
        );
        self.notify(&config);
        true
    }

    /// Registers `observer` for configuration replacement events.
    ///
    /// The catalog only keeps a weak reference; a dropped observer is pruned
    /// on the next notification.
    pub fn subscribe(&self, observer: Weak<dyn ConfigurationObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_subscription.get());
        self.inner.next_subscription.set(id.0 + 1);
        self.inner.observers.borrow_mut().push((id, observer));
        trace!("configuration subscription {} added", id.0);
        id
    }

    /// Removes a subscription. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner
            .observers
            .borrow_mut()
            .retain(|(existing, _)| *existing != id);
        trace!("configuration subscription {} removed", id.0);
    }

    /// Returns the number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .observers
            .borrow()
            .iter()
            .filter(|(_, observer)| observer.strong_count() > 0)
            .count()
    }

    fn notify(&self, config: &Arc<CardConfiguration>) {
        // Observers may subscribe or unsubscribe while being notified, so
        // work on a snapshot.
        let observers: Vec<Rc<dyn ConfigurationObserver>> = {
            let mut list = self.inner.observers.borrow_mut();
            list.retain(|(_, observer)| observer.strong_count() > 0);
            list.iter().filter_map(|(_, observer)| observer.upgrade()).collect()
        };

        for observer in observers {
            // A nested load has already notified everyone of a newer one.
            if !Arc::ptr_eq(config, &self.inner.state.borrow().active) {
                trace!("configuration superseded during notification");
                return;
            }
            observer.configuration_changed(config);
        }
    }
}

impl Default for BrandCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BrandCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("BrandCatalog")
            .field("brands", &state.active.brands().len())
            .field("applied", &state.applied)
            .field("subscribers", &self.inner.observers.borrow().len())
            .finish()
    }
}
