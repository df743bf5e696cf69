use brl_types::{AccountId, Bookcoin};

use crate::error::LedgerError;

/// Read boundary for account balances.
pub trait BalanceReader {
    /// Stored balance, or zero for an account never credited.
    fn balance(&self, account: &AccountId) -> Bookcoin;
}

/// Write boundary for account balances.
///
/// Implementations must use checked arithmetic and leave the balance
/// untouched when an operation fails.
pub trait BalanceWriter: BalanceReader {
    fn debit(&mut self, account: &AccountId, amount: Bookcoin) -> Result<Bookcoin, LedgerError>;

    fn credit(&mut self, account: &AccountId, amount: Bookcoin) -> Result<Bookcoin, LedgerError>;
}
