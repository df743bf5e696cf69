//! Foundation types for the Bookrent Ledger (BRL).
//!
//! This crate provides the identity, temporal, and monetary types shared by
//! every other BRL crate.
//!
//! # Key Types
//!
//! - [`AccountId`]: Identity of a person-like principal (reader, platform)
//! - [`BookId`]: Identity of a published book, never interchangeable with [`AccountId`]
//! - [`Timestamp`]: Whole seconds supplied by the clock boundary
//! - [`Bookcoin`]: Ledger currency amount with checked arithmetic only
//! - [`BookListing`]: Write-once catalog entry
//! - [`Rental`]: A time-bounded rental grant over a half-open window
//! - [`TxId`]: UUID v7 transaction identifier

pub mod amount;
pub mod error;
pub mod identity;
pub mod records;
pub mod temporal;
pub mod tx;

pub use amount::Bookcoin;
pub use error::TypeError;
pub use identity::{AccountId, BookId, IdentityMaterial};
pub use records::{BookListing, Rental};
pub use temporal::Timestamp;
pub use tx::TxId;
