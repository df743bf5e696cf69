//! Read permissions derived from rental history.
//!
//! Two deliberately different notions of "rented" exist side by side:
//!
//! - [`AccessControl::can_read`] is a permanent grant: any rental record of
//!   the book naming the reader, expired or not.
//! - [`AccessControl::is_rental_active`] is the time-bounded notion: the
//!   reader's active-rental pointer names the book and the reader's latest
//!   rental of it covers `now`.

use brl_types::{AccountId, BookId, Timestamp};

use crate::registry::RentalRegistry;

/// Pure reader over the rental registry.
#[derive(Clone, Copy, Debug)]
pub struct AccessControl<'a> {
    registry: &'a RentalRegistry,
}

impl<'a> AccessControl<'a> {
    pub fn new(registry: &'a RentalRegistry) -> Self {
        Self { registry }
    }

    /// `true` iff `reader` appears as renter in any rental of `book`.
    pub fn can_read(&self, reader: &AccountId, book: &BookId) -> bool {
        self.registry
            .rentals_of(book)
            .iter()
            .any(|r| &r.renter == reader)
    }

    /// `true` iff `reader`'s pointer names `book` and the reader's most
    /// recent rental of it is active at `now`.
    pub fn is_rental_active(&self, reader: &AccountId, book: &BookId, now: Timestamp) -> bool {
        if self.registry.active_book_of(reader) != Some(book) {
            return false;
        }
        self.registry
            .rentals_of(book)
            .iter()
            .rev()
            .find(|r| &r.renter == reader)
            .is_some_and(|r| r.is_active_at(now))
    }
}

#[cfg(test)]
mod tests {
    use brl_fabric::Outbox;
    use brl_ledger::{BalanceSheet, BalanceWriter};
    use brl_types::Bookcoin;

    use super::*;
    use crate::catalog::Catalog;
    use crate::registry::{RentRequest, RentTerms};

    const DAY: u64 = 86_400;

    fn setup() -> (Catalog, BalanceSheet, RentalRegistry, RentTerms) {
        let mut catalog = Catalog::new();
        let mut outbox = Outbox::new();
        for label in ["b1", "b2"] {
            catalog
                .publish(&BookId::from_label(label), label, "", Bookcoin::new(10), &mut outbox)
                .unwrap();
        }
        let mut balances = BalanceSheet::new();
        balances
            .credit(&AccountId::from_label("r1"), Bookcoin::new(1_000))
            .unwrap();
        let terms = RentTerms {
            platform: AccountId::from_label("platform"),
            day_length_secs: DAY,
            network_fee_percent: 3,
        };
        (catalog, balances, RentalRegistry::new(), terms)
    }

    fn rent(
        (catalog, balances, registry, terms): &mut (Catalog, BalanceSheet, RentalRegistry, RentTerms),
        book: &str,
        now: u64,
    ) {
        let request = RentRequest {
            book: BookId::from_label(book),
            days: 1,
            renter: AccountId::from_label("r1"),
        };
        registry
            .rent(catalog, balances, &request, Timestamp::from_secs(now), terms, &mut Outbox::new())
            .unwrap();
    }

    #[test]
    fn never_rented_cannot_read() {
        let (_, _, registry, _) = setup();
        let access = AccessControl::new(&registry);
        assert!(!access.can_read(&AccountId::from_label("r1"), &BookId::from_label("b1")));
    }

    #[test]
    fn read_grant_is_permanent() {
        let mut world = setup();
        rent(&mut world, "b1", 0);
        rent(&mut world, "b2", 10);

        let access = AccessControl::new(&world.2);
        let r1 = AccountId::from_label("r1");
        assert!(access.can_read(&r1, &BookId::from_label("b1")));
        assert!(access.can_read(&r1, &BookId::from_label("b2")));
        assert!(!access.can_read(&AccountId::from_label("r2"), &BookId::from_label("b1")));
    }

    #[test]
    fn active_predicate_tracks_window_and_pointer() {
        let mut world = setup();
        rent(&mut world, "b1", 0);
        let r1 = AccountId::from_label("r1");
        let b1 = BookId::from_label("b1");

        {
            let access = AccessControl::new(&world.2);
            assert!(access.is_rental_active(&r1, &b1, Timestamp::from_secs(DAY - 1)));
            assert!(!access.is_rental_active(&r1, &b1, Timestamp::from_secs(DAY)));
            // Expired, but the permanent grant remains.
            assert!(access.can_read(&r1, &b1));
        }

        rent(&mut world, "b2", 10);
        let access = AccessControl::new(&world.2);
        // Still inside the b1 window, but the pointer moved to b2.
        assert!(!access.is_rental_active(&r1, &b1, Timestamp::from_secs(20)));
        assert!(access.is_rental_active(&r1, &BookId::from_label("b2"), Timestamp::from_secs(20)));
    }
}
