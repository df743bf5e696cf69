use std::collections::HashMap;

use brl_fabric::{Notification, Outbox};
use brl_ledger::{BalanceReader, BalanceSheet, Posting};
use brl_types::{AccountId, BookId, Bookcoin, Rental, Timestamp, TypeError};
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::{RentalError, Result};

/// Economic parameters of the rent transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentTerms {
    /// Recipient of both the author amount and the network fee.
    pub platform: AccountId,
    pub day_length_secs: u64,
    pub network_fee_percent: u8,
}

/// A rent request from an authenticated renter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RentRequest {
    pub book: BookId,
    pub days: u64,
    pub renter: AccountId,
}

/// A fully validated rent, ready to commit.
///
/// Produced by [`RentalRegistry::plan_rent`], which performs every check
/// without touching state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RentPlan {
    pub book: BookId,
    pub rental: Rental,
    pub price: Bookcoin,
    pub author_amount: Bookcoin,
    pub network_fee: Bookcoin,
    pub recipient: AccountId,
    pub postings: Vec<Posting>,
}

/// Outcome of a committed rent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentReceipt {
    pub book: BookId,
    pub rental: Rental,
    pub price: Bookcoin,
    pub author_amount: Bookcoin,
    pub network_fee: Bookcoin,
    pub recipient: AccountId,
}

/// Append-only rental history per book plus the per-reader active-rental
/// pointer.
///
/// The pointer holds the most recently rented book of each reader. It is
/// overwritten on every successful rent and never checked against expiry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RentalRegistry {
    rentals: HashMap<BookId, Vec<Rental>>,
    active: HashMap<AccountId, BookId>,
}

impl RentalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a rent request against current state and compute its effects.
    ///
    /// Checks, in order: a positive period, `BookNotFound`,
    /// `InsufficientFunds`, `AlreadyRented` (the reader's pointer already
    /// names this book, whether or not that rental has expired), then
    /// overflow of the rental end time.
    pub fn plan_rent(
        &self,
        catalog: &Catalog,
        balances: &impl BalanceReader,
        request: &RentRequest,
        now: Timestamp,
        terms: &RentTerms,
    ) -> Result<RentPlan> {
        let RentRequest { book, days, renter } = request;

        if *days == 0 {
            return Err(RentalError::InvalidRentalPeriod { days: *days });
        }

        let listing = catalog
            .listing(book)
            .filter(|l| l.published)
            .ok_or_else(|| RentalError::BookNotFound { book: book.clone() })?;
        let price = listing.rental_price;

        let balance = balances.balance(renter);
        if balance < price {
            return Err(RentalError::InsufficientFunds {
                account: renter.clone(),
                balance,
                required: price,
            });
        }

        if self.active.get(renter) == Some(book) {
            return Err(RentalError::AlreadyRented {
                reader: renter.clone(),
                book: book.clone(),
            });
        }

        let end = now
            .checked_add_days(*days, terms.day_length_secs)
            .map_err(overflow)?;
        let rental = Rental::new(renter.clone(), now, end)
            .map_err(|_| RentalError::InvalidRentalPeriod { days: *days })?;

        let (author_amount, network_fee) = price.split_fee(terms.network_fee_percent);
        let postings = vec![
            Posting::debit(renter, price),
            Posting::credit(&terms.platform, author_amount),
            Posting::credit(&terms.platform, network_fee),
        ];

        Ok(RentPlan {
            book: book.clone(),
            rental,
            price,
            author_amount,
            network_fee,
            recipient: terms.platform.clone(),
            postings,
        })
    }

    /// Commit a planned rent: move the funds, record the rental, repoint the
    /// reader, and queue `RentalCreated` followed by the two
    /// `PaymentRecorded` notifications.
    ///
    /// The balance postings are the only fallible step and run first, so a
    /// failure leaves the registry and the balances untouched.
    pub fn commit_rent(
        &mut self,
        plan: RentPlan,
        balances: &mut BalanceSheet,
        outbox: &mut Outbox,
    ) -> Result<RentReceipt> {
        balances.apply(&plan.postings)?;

        let RentPlan {
            book,
            rental,
            price,
            author_amount,
            network_fee,
            recipient,
            ..
        } = plan;
        let renter = rental.renter.clone();

        self.rentals.entry(book.clone()).or_default().push(rental.clone());
        self.active.insert(renter.clone(), book.clone());

        outbox.push(Notification::RentalCreated {
            book: book.clone(),
            renter: renter.clone(),
            start: rental.start,
            end: rental.end,
        });
        for amount in [author_amount, network_fee] {
            outbox.push(Notification::PaymentRecorded {
                book: book.clone(),
                renter: renter.clone(),
                recipient: recipient.clone(),
                amount,
            });
        }

        Ok(RentReceipt {
            book,
            rental,
            price,
            author_amount,
            network_fee,
            recipient,
        })
    }

    /// Plan and commit in one step.
    pub fn rent(
        &mut self,
        catalog: &Catalog,
        balances: &mut BalanceSheet,
        request: &RentRequest,
        now: Timestamp,
        terms: &RentTerms,
        outbox: &mut Outbox,
    ) -> Result<RentReceipt> {
        let plan = self.plan_rent(catalog, &*balances, request, now, terms)?;
        self.commit_rent(plan, balances, outbox)
    }

    /// Every rental of `book`, in append order.
    pub fn rentals_of(&self, book: &BookId) -> &[Rental] {
        self.rentals.get(book).map(Vec::as_slice).unwrap_or_default()
    }

    /// The book most recently rented by `reader`, expired or not.
    pub fn active_book_of(&self, reader: &AccountId) -> Option<&BookId> {
        self.active.get(reader)
    }

    /// Total number of rental records across all books.
    pub fn rental_count(&self) -> usize {
        self.rentals.values().map(Vec::len).sum()
    }
}

fn overflow(err: TypeError) -> RentalError {
    RentalError::ArithmeticOverflow {
        context: err.to_string(),
    }
}
