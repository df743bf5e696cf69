use std::collections::HashMap;

use brl_fabric::{Notification, Outbox};
use brl_types::{BookId, BookListing, Bookcoin};

use crate::error::{RentalError, Result};

/// Write-once book listings plus the index of published ids.
///
/// There is no update or unpublish operation: once a listing exists it is
/// immutable and its id stays in the index forever. Any caller may publish
/// any unused book id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    listings: HashMap<BookId, BookListing>,
    published: Vec<BookId>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with `AlreadyPublished` if `book` already has a listing.
    pub fn check_publish(&self, book: &BookId) -> Result<()> {
        if self.is_published(book) {
            return Err(RentalError::AlreadyPublished { book: book.clone() });
        }
        Ok(())
    }

    /// Store a new listing, index it, and queue its publish notification.
    pub fn publish(
        &mut self,
        book: &BookId,
        title: &str,
        content: &str,
        price: Bookcoin,
        outbox: &mut Outbox,
    ) -> Result<BookListing> {
        self.check_publish(book)?;

        let listing = BookListing::published(title, content, price);
        self.listings.insert(book.clone(), listing.clone());
        self.published.push(book.clone());

        outbox.push(Notification::Publish {
            book: book.clone(),
            title: listing.title.clone(),
            content: listing.content.clone(),
            price,
        });
        Ok(listing)
    }

    pub fn listing(&self, book: &BookId) -> Option<&BookListing> {
        self.listings.get(book)
    }

    pub fn is_published(&self, book: &BookId) -> bool {
        self.listings.get(book).is_some_and(|l| l.published)
    }

    /// Published ids in first-publish order.
    pub fn published_ids(&self) -> &[BookId] {
        &self.published
    }

    pub fn len(&self) -> usize {
        self.published.len()
    }

    pub fn is_empty(&self) -> bool {
        self.published.is_empty()
    }
}
