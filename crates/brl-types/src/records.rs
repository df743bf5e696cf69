use serde::{Deserialize, Serialize};

use crate::amount::Bookcoin;
use crate::error::TypeError;
use crate::identity::AccountId;
use crate::temporal::Timestamp;

/// A write-once catalog entry.
///
/// A listing only exists once it has been published, so `published` is
/// always `true` for a stored listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookListing {
    pub title: String,
    pub content: String,
    pub rental_price: Bookcoin,
    pub published: bool,
}

impl BookListing {
    /// Build the listing stored by a successful publish.
    pub fn published(title: impl Into<String>, content: impl Into<String>, price: Bookcoin) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            rental_price: price,
            published: true,
        }
    }
}

/// A rental grant over the half-open window `[start, end)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rental {
    pub renter: AccountId,
    pub start: Timestamp,
    pub end: Timestamp,
}

impl Rental {
    /// Create a rental, rejecting empty or inverted windows.
    pub fn new(renter: AccountId, start: Timestamp, end: Timestamp) -> Result<Self, TypeError> {
        if end <= start {
            return Err(TypeError::EmptyWindow {
                start: start.as_secs(),
                end: end.as_secs(),
            });
        }
        Ok(Self { renter, start, end })
    }

    /// Returns `true` while `at` lies inside the rental window.
    pub fn is_active_at(&self, at: Timestamp) -> bool {
        self.start <= at && at < self.end
    }

    /// Returns `true` once the window has closed.
    pub fn is_expired_at(&self, at: Timestamp) -> bool {
        at >= self.end
    }
}
