use serde::{Deserialize, Serialize};

use brl_types::{AccountId, BookId, Bookcoin, Timestamp};

/// Classification of notifications, used for subscriber filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    Publish,
    RentalCreated,
    PaymentRecorded,
    BalanceReported,
    RentalHistoryReported,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Publish => "Publish",
            Self::RentalCreated => "RentalCreated",
            Self::PaymentRecorded => "PaymentRecorded",
            Self::BalanceReported => "BalanceReported",
            Self::RentalHistoryReported => "RentalHistoryReported",
        };
        write!(f, "{s}")
    }
}

/// An observable state change or report.
///
/// Field sets are fixed per kind. A successful rent produces exactly one
/// `RentalCreated` followed by two `PaymentRecorded` (author amount, then
/// network fee) with the same recipient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    Publish {
        book: BookId,
        title: String,
        content: String,
        price: Bookcoin,
    },
    RentalCreated {
        book: BookId,
        renter: AccountId,
        start: Timestamp,
        end: Timestamp,
    },
    PaymentRecorded {
        book: BookId,
        renter: AccountId,
        recipient: AccountId,
        amount: Bookcoin,
    },
    BalanceReported {
        account: AccountId,
        balance: Bookcoin,
    },
    RentalHistoryReported {
        renter: AccountId,
        book: BookId,
        start: Timestamp,
        end: Timestamp,
    },
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::Publish { .. } => NotificationKind::Publish,
            Self::RentalCreated { .. } => NotificationKind::RentalCreated,
            Self::PaymentRecorded { .. } => NotificationKind::PaymentRecorded,
            Self::BalanceReported { .. } => NotificationKind::BalanceReported,
            Self::RentalHistoryReported { .. } => NotificationKind::RentalHistoryReported,
        }
    }

    /// The book this notification concerns, if any.
    pub fn book(&self) -> Option<&BookId> {
        match self {
            Self::Publish { book, .. }
            | Self::RentalCreated { book, .. }
            | Self::PaymentRecorded { book, .. }
            | Self::RentalHistoryReported { book, .. } => Some(book),
            Self::BalanceReported { .. } => None,
        }
    }

    /// The account this notification concerns: the renter for rental and
    /// payment notifications, the reported account for balances.
    pub fn account(&self) -> Option<&AccountId> {
        match self {
            Self::RentalCreated { renter, .. }
            | Self::PaymentRecorded { renter, .. }
            | Self::RentalHistoryReported { renter, .. } => Some(renter),
            Self::BalanceReported { account, .. } => Some(account),
            Self::Publish { .. } => None,
        }
    }
}
