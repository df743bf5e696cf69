use tracing::debug;

use brl_fabric::{Notification, Outbox};
use brl_ledger::BalanceReader;
use brl_types::{AccountId, BookId, BookListing, Bookcoin, Rental, Timestamp};

use crate::state::LedgerState;

/// Read-only projections over one committed [`LedgerState`].
///
/// Reporting queries push their notifications into the caller's outbox;
/// nothing else is mutated.
#[derive(Clone, Copy, Debug)]
pub struct QueryService<'a> {
    state: &'a LedgerState,
    platform: &'a AccountId,
}

impl<'a> QueryService<'a> {
    pub fn new(state: &'a LedgerState, platform: &'a AccountId) -> Self {
        Self { state, platform }
    }

    /// Every published book, in publish order.
    pub fn list_catalog(&self) -> Vec<BookId> {
        self.state.catalog.published_ids().to_vec()
    }

    /// Books available to `reader` at `now`.
    ///
    /// Every published book is available. The reader's pointer book is also
    /// added when its latest rental is unexpired; since listings are never
    /// retracted that book is always already listed, so the second branch
    /// never changes the result.
    pub fn list_available_for(&self, reader: &AccountId, now: Timestamp) -> Vec<BookId> {
        let mut available = self.list_catalog();

        if let Some(book) = self.state.registry.active_book_of(reader) {
            let unexpired = self
                .state
                .registry
                .rentals_of(book)
                .last()
                .is_some_and(|r| !r.is_expired_at(now));
            if unexpired && !available.contains(book) {
                available.push(book.clone());
            }
        }
        available
    }

    /// Rental history of the book `caller` most recently rented, covering
    /// every renter of that book, in append order.
    ///
    /// Queues one `RentalHistoryReported` per record. Empty when `caller`
    /// has never rented.
    pub fn rental_history_of(&self, caller: &AccountId, outbox: &mut Outbox) -> Vec<Rental> {
        let Some(book) = self.state.registry.active_book_of(caller) else {
            return Vec::new();
        };
        let history = self.state.registry.rentals_of(book).to_vec();
        for rental in &history {
            outbox.push(Notification::RentalHistoryReported {
                renter: rental.renter.clone(),
                book: book.clone(),
                start: rental.start,
                end: rental.end,
            });
        }
        debug!(caller = %caller, book = %book, records = history.len(), "rental history reported");
        history
    }

    /// Balance of the platform account. Queues a `BalanceReported`.
    pub fn platform_balance(&self, outbox: &mut Outbox) -> Bookcoin {
        self.report_balance(self.platform, outbox)
    }

    /// Balance of the calling account. Queues a `BalanceReported`.
    pub fn check_balance(&self, caller: &AccountId, outbox: &mut Outbox) -> Bookcoin {
        self.report_balance(caller, outbox)
    }

    pub fn listing(&self, book: &BookId) -> Option<&'a BookListing> {
        self.state.catalog.listing(book)
    }

    pub fn active_rental_of(&self, reader: &AccountId) -> Option<&'a BookId> {
        self.state.registry.active_book_of(reader)
    }

    pub fn rentals_of(&self, book: &BookId) -> &'a [Rental] {
        self.state.registry.rentals_of(book)
    }

    fn report_balance(&self, account: &AccountId, outbox: &mut Outbox) -> Bookcoin {
        let balance = self.state.balances.balance(account);
        outbox.push(Notification::BalanceReported {
            account: account.clone(),
            balance,
        });
        balance
    }
}
