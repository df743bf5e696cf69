//! Core rental logic for the Bookrent Ledger (BRL).
//!
//! A single global [`LedgerState`] holds the balance sheet, the catalog, the
//! rental registry, and the commit journal. [`RentalLedger`] owns that state
//! and serializes every mutation behind one lock:
//!
//! - [`Catalog`]: write-once listings plus the publish-ordered index
//! - [`RentalRegistry`]: per-book rental history, per-reader active-rental
//!   pointer, and the rent transaction
//! - [`AccessControl`]: permanent read grants derived from rental history
//! - [`QueryService`]: read-only projections and reports
//! - [`ReplayEngine`]: deterministic rebuild of state from the journal
//!
//! Notifications produced by a transaction are dispatched to registered
//! sinks only after that transaction commits.

pub mod access;
pub mod catalog;
pub mod config;
pub mod error;
pub mod query;
pub mod registry;
pub mod replay;
pub mod service;
pub mod state;

pub use access::AccessControl;
pub use catalog::Catalog;
pub use config::{GenesisAllocation, LedgerConfig};
pub use error::{ConfigError, RentalError, Result};
pub use query::QueryService;
pub use registry::{RentPlan, RentReceipt, RentRequest, RentTerms, RentalRegistry};
pub use replay::{ReplayEngine, ReplayReport};
pub use service::RentalLedger;
pub use state::LedgerState;

pub use brl_types::{AccountId, BookId, BookListing, Bookcoin, Rental, Timestamp};
