//! Balances and the commit journal for the Bookrent Ledger (BRL).
//!
//! This crate provides:
//! - [`BalanceSheet`]: per-account balances with checked debit/credit and
//!   all-or-nothing multi-leg posting
//! - `BalanceReader` / `BalanceWriter` trait boundaries
//! - [`Journal`]: an append-only, hash-chained log of committed operations
//!   with integrity validation and bincode export

pub mod balances;
pub mod error;
pub mod journal;
pub mod traits;

pub use balances::{BalanceSheet, Posting};
pub use error::{JournalError, LedgerError};
pub use journal::{Journal, JournalEntry, Operation};
pub use traits::{BalanceReader, BalanceWriter};
