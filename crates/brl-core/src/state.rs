use brl_fabric::Outbox;
use brl_ledger::{BalanceSheet, Journal, Operation, Posting};
use brl_types::{AccountId, BookId, BookListing, Bookcoin, Timestamp, TxId};

use crate::access::AccessControl;
use crate::catalog::Catalog;
use crate::error::Result;
use crate::query::QueryService;
use crate::registry::{RentReceipt, RentRequest, RentTerms, RentalRegistry};

/// The single global ledger state.
///
/// Every mutation is a transition of this one value. Methods taking
/// `&mut self` either apply completely or return an error with the state
/// untouched and nothing queued in the outbox.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerState {
    pub(crate) balances: BalanceSheet,
    pub(crate) catalog: Catalog,
    pub(crate) registry: RentalRegistry,
    pub(crate) journal: Journal,
}

impl LedgerState {
    /// Build the initial state from externally funded balances.
    pub fn genesis(allocations: &[(AccountId, Bookcoin)]) -> Result<Self> {
        let postings: Vec<Posting> = allocations
            .iter()
            .map(|(account, amount)| Posting::credit(account, *amount))
            .collect();
        let mut balances = BalanceSheet::new();
        balances.apply(&postings)?;
        Ok(Self {
            balances,
            ..Default::default()
        })
    }

    /// Publish a listing on behalf of `caller` and journal it.
    #[allow(clippy::too_many_arguments)]
    pub fn publish(
        &mut self,
        tx_id: TxId,
        at: Timestamp,
        caller: &AccountId,
        book: &BookId,
        title: &str,
        content: &str,
        price: Bookcoin,
        outbox: &mut Outbox,
    ) -> Result<BookListing> {
        self.catalog.check_publish(book)?;
        let entry = self.journal.seal(
            tx_id,
            at,
            caller,
            Operation::Publish {
                book: book.clone(),
                title: title.to_string(),
                content: content.to_string(),
                price,
            },
        )?;

        let listing = self.catalog.publish(book, title, content, price, outbox)?;
        self.journal.commit(entry);
        Ok(listing)
    }

    /// Rent `book` for `days` on behalf of `renter` and journal it.
    #[allow(clippy::too_many_arguments)]
    pub fn rent(
        &mut self,
        tx_id: TxId,
        at: Timestamp,
        renter: &AccountId,
        book: &BookId,
        days: u64,
        terms: &RentTerms,
        outbox: &mut Outbox,
    ) -> Result<RentReceipt> {
        let request = RentRequest {
            book: book.clone(),
            days,
            renter: renter.clone(),
        };
        let plan = self
            .registry
            .plan_rent(&self.catalog, &self.balances, &request, at, terms)?;
        let entry = self.journal.seal(
            tx_id,
            at,
            renter,
            Operation::Rent {
                book: book.clone(),
                days,
            },
        )?;

        let receipt = self
            .registry
            .commit_rent(plan, &mut self.balances, outbox)?;
        self.journal.commit(entry);
        Ok(receipt)
    }

    pub fn balances(&self) -> &BalanceSheet {
        &self.balances
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn registry(&self) -> &RentalRegistry {
        &self.registry
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn access(&self) -> AccessControl<'_> {
        AccessControl::new(&self.registry)
    }

    pub fn queries<'a>(&'a self, platform: &'a AccountId) -> QueryService<'a> {
        QueryService::new(self, platform)
    }
}
