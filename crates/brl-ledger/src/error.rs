use brl_types::{AccountId, Bookcoin};

/// Errors produced by balance operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient funds in {account}: balance {balance}, required {required}")]
    InsufficientFunds {
        account: AccountId,
        balance: Bookcoin,
        required: Bookcoin,
    },

    #[error("arithmetic overflow crediting {account}")]
    ArithmeticOverflow { account: AccountId },
}

/// Errors produced by the commit journal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JournalError {
    #[error("integrity violation at seq {seq}: {reason}")]
    IntegrityViolation { seq: u64, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}
