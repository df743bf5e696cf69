use std::path::PathBuf;

use brl_ledger::{JournalError, LedgerError};
use brl_types::{AccountId, BookId, Bookcoin};

/// Errors produced by ledger operations.
///
/// Every variant aborts the whole operation; no state changes and no
/// notifications are emitted for a failed operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RentalError {
    #[error("book already published: {book}")]
    AlreadyPublished { book: BookId },

    #[error("book not found: {book}")]
    BookNotFound { book: BookId },

    #[error("insufficient funds in {account}: balance {balance}, required {required}")]
    InsufficientFunds {
        account: AccountId,
        balance: Bookcoin,
        required: Bookcoin,
    },

    #[error("{reader} already holds the active rental of {book}")]
    AlreadyRented { reader: AccountId, book: BookId },

    #[error("arithmetic overflow: {context}")]
    ArithmeticOverflow { context: String },

    #[error("rental period must be at least one day, got {days}")]
    InvalidRentalPeriod { days: u64 },

    #[error("journal error: {0}")]
    Journal(#[from] JournalError),

    #[error("ledger state lock poisoned")]
    LockPoisoned,
}

impl From<LedgerError> for RentalError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds {
                account,
                balance,
                required,
            } => Self::InsufficientFunds {
                account,
                balance,
                required,
            },
            LedgerError::ArithmeticOverflow { account } => Self::ArithmeticOverflow {
                context: format!("credit to {account}"),
            },
        }
    }
}

/// Convenience alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, RentalError>;

/// Errors produced while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}
