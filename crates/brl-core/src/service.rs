use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use brl_fabric::{
    BroadcastSink, Clock, DispatchReport, Dispatcher, MonotonicClock, NotificationFilter,
    NotificationSink, NotificationStream, Outbox, PendingDelivery,
};
use brl_ledger::Journal;
use brl_types::{AccountId, BookId, BookListing, Bookcoin, Rental, Timestamp, TxId};

use crate::config::LedgerConfig;
use crate::error::{ConfigError, RentalError, Result};
use crate::registry::{RentReceipt, RentTerms};
use crate::replay::{ReplayEngine, ReplayReport};
use crate::state::LedgerState;

/// The rental ledger: one serialized state machine plus its boundary
/// collaborators.
///
/// Mutations take the state write lock and either commit completely or
/// change nothing. Queries take the read lock and see a fully committed
/// snapshot. Notifications are dispatched after commit, under the
/// dispatcher lock acquired before the state lock is released, so sinks
/// observe them in commit order. Delivery is at-least-once: a notification a
/// sink rejects is retried before anything newer reaches that sink.
///
/// Callers are identified by an [`AccountId`] already authenticated by the
/// identity provider; the ledger does not authenticate.
pub struct RentalLedger {
    terms: RentTerms,
    genesis: Vec<(AccountId, Bookcoin)>,
    clock: MonotonicClock,
    state: RwLock<LedgerState>,
    dispatcher: Mutex<Dispatcher>,
    broadcast: Arc<BroadcastSink>,
}

impl RentalLedger {
    /// Create a ledger funded with the configured genesis allocations.
    pub fn new(config: &LedgerConfig, clock: impl Clock + 'static) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let terms = config.rent_terms()?;
        let genesis = config.genesis_balances()?;
        let state = LedgerState::genesis(&genesis)
            .map_err(|e| ConfigError::Invalid(format!("genesis allocations: {e}")))?;
        let broadcast = Arc::new(BroadcastSink::new());
        let mut dispatcher = Dispatcher::new();
        dispatcher.add_sink(broadcast.clone());

        info!(
            platform = %terms.platform,
            funded_accounts = genesis.len(),
            fee_percent = terms.network_fee_percent,
            "rental ledger started"
        );

        Ok(Self {
            terms,
            genesis,
            clock: MonotonicClock::new(clock),
            state: RwLock::new(state),
            dispatcher: Mutex::new(dispatcher),
            broadcast,
        })
    }

    /// Register an additional notification sink.
    pub fn add_sink(&self, sink: Arc<dyn NotificationSink>) {
        self.lock_dispatcher().add_sink(sink);
    }

    /// Subscribe to notifications matching `filter`. The returned queue is
    /// unbounded, so a slow reader never loses notifications.
    pub fn subscribe(&self, filter: NotificationFilter) -> Result<NotificationStream> {
        self.broadcast
            .subscribe(filter)
            .map_err(|_| RentalError::LockPoisoned)
    }

    pub fn platform_account(&self) -> &AccountId {
        &self.terms.platform
    }

    pub fn terms(&self) -> &RentTerms {
        &self.terms
    }

    // ---- Mutations ----

    /// Publish a new listing. Any caller may publish any unused book id.
    pub fn publish(
        &self,
        caller: &AccountId,
        book: &BookId,
        title: &str,
        content: &str,
        price: Bookcoin,
    ) -> Result<BookListing> {
        let mut state = self.write_state()?;
        let now = self.clock.now();
        let tx_id = TxId::new();
        let mut outbox = Outbox::new();

        let listing = state.publish(tx_id, now, caller, book, title, content, price, &mut outbox)?;
        info!(tx = %tx_id.short_id(), book = %book, price = %price, "book published");

        self.dispatch_after(state, outbox);
        Ok(listing)
    }

    /// Rent `book` for `days` days on behalf of `renter`.
    pub fn rent(&self, renter: &AccountId, book: &BookId, days: u64) -> Result<RentReceipt> {
        let mut state = self.write_state()?;
        let now = self.clock.now();
        let tx_id = TxId::new();
        let mut outbox = Outbox::new();

        let receipt = state.rent(tx_id, now, renter, book, days, &self.terms, &mut outbox)?;
        info!(
            tx = %tx_id.short_id(),
            book = %book,
            renter = %renter,
            price = %receipt.price,
            until = %receipt.rental.end,
            "book rented"
        );

        self.dispatch_after(state, outbox);
        Ok(receipt)
    }

    // ---- Access control ----

    /// Permanent read permission: `reader` has ever rented `book`.
    pub fn can_read(&self, reader: &AccountId, book: &BookId) -> Result<bool> {
        Ok(self.read_state()?.access().can_read(reader, book))
    }

    /// Time-bounded permission: `reader`'s current rental is `book` and it
    /// has not expired.
    pub fn is_rental_active(&self, reader: &AccountId, book: &BookId) -> Result<bool> {
        let state = self.read_state()?;
        let now = self.clock.now();
        Ok(state.access().is_rental_active(reader, book, now))
    }

    // ---- Queries ----

    pub fn list_catalog(&self) -> Result<Vec<BookId>> {
        let state = self.read_state()?;
        Ok(state.queries(&self.terms.platform).list_catalog())
    }

    pub fn list_available_for(&self, reader: &AccountId) -> Result<Vec<BookId>> {
        let state = self.read_state()?;
        let now = self.clock.now();
        Ok(state
            .queries(&self.terms.platform)
            .list_available_for(reader, now))
    }

    /// Rental history of the book `caller` most recently rented.
    pub fn rental_history_of(&self, caller: &AccountId) -> Result<Vec<Rental>> {
        let state = self.read_state()?;
        let mut outbox = Outbox::new();
        let history = state
            .queries(&self.terms.platform)
            .rental_history_of(caller, &mut outbox);
        self.dispatch_after(state, outbox);
        Ok(history)
    }

    pub fn platform_balance(&self) -> Result<Bookcoin> {
        let state = self.read_state()?;
        let mut outbox = Outbox::new();
        let balance = state
            .queries(&self.terms.platform)
            .platform_balance(&mut outbox);
        self.dispatch_after(state, outbox);
        Ok(balance)
    }

    /// The calling account's own balance.
    pub fn check_balance(&self, caller: &AccountId) -> Result<Bookcoin> {
        let state = self.read_state()?;
        let mut outbox = Outbox::new();
        let balance = state
            .queries(&self.terms.platform)
            .check_balance(caller, &mut outbox);
        self.dispatch_after(state, outbox);
        Ok(balance)
    }

    pub fn listing(&self, book: &BookId) -> Result<Option<BookListing>> {
        let state = self.read_state()?;
        Ok(state.queries(&self.terms.platform).listing(book).cloned())
    }

    pub fn active_rental_of(&self, reader: &AccountId) -> Result<Option<BookId>> {
        let state = self.read_state()?;
        Ok(state
            .queries(&self.terms.platform)
            .active_rental_of(reader)
            .cloned())
    }

    pub fn rentals_of(&self, book: &BookId) -> Result<Vec<Rental>> {
        let state = self.read_state()?;
        Ok(state.queries(&self.terms.platform).rentals_of(book).to_vec())
    }

    // ---- Delivery ----

    /// Deliveries a sink has rejected and that are still waiting for it.
    pub fn undelivered(&self) -> Vec<PendingDelivery> {
        self.lock_dispatcher().backlog().to_vec()
    }

    /// Retry rejected deliveries now; returns how many were accepted.
    pub fn redeliver(&self) -> usize {
        self.lock_dispatcher().redeliver()
    }

    // ---- Journal ----

    /// Copy of the commit journal.
    pub fn journal(&self) -> Result<Journal> {
        Ok(self.read_state()?.journal().clone())
    }

    /// Copy of the full committed state.
    pub fn snapshot(&self) -> Result<LedgerState> {
        Ok(self.read_state()?.clone())
    }

    /// Replay the journal from genesis and compare with the live state.
    pub fn verify_replay(&self) -> Result<ReplayReport> {
        let state = self.read_state()?;
        ReplayEngine::verify(&state, &self.genesis, &self.terms)
    }

    /// Last clock reading used by the ledger.
    pub fn last_seen_time(&self) -> Timestamp {
        self.clock.last()
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, LedgerState>> {
        self.state.read().map_err(|_| RentalError::LockPoisoned)
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, LedgerState>> {
        self.state.write().map_err(|_| RentalError::LockPoisoned)
    }

    fn lock_dispatcher(&self) -> MutexGuard<'_, Dispatcher> {
        self.dispatcher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Hand the outbox to every sink once the state guard is released.
    ///
    /// The dispatcher lock is taken while `guard` is still held, so dispatch
    /// order matches commit order. Rejected deliveries are kept for retry and
    /// reported through [`undelivered`](Self::undelivered).
    fn dispatch_after<G>(&self, guard: G, outbox: Outbox) -> DispatchReport {
        if outbox.is_empty() {
            return DispatchReport::default();
        }
        let mut dispatcher = self.lock_dispatcher();
        drop(guard);

        let report = dispatcher.dispatch(outbox);
        if report.deferred > 0 {
            warn!(
                deferred = report.deferred,
                pending = dispatcher.backlog().len(),
                "notifications awaiting redelivery"
            );
        }
        debug!(count = report.notifications.len(), "notifications dispatched");
        report
    }
}

impl std::fmt::Debug for RentalLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RentalLedger")
            .field("platform", &self.terms.platform)
            .field("genesis_accounts", &self.genesis.len())
            .finish_non_exhaustive()
    }
}
