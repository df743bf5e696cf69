use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("arithmetic overflow: {0}")]
    Overflow(&'static str),

    #[error("rental window must end after it starts: start={start}, end={end}")]
    EmptyWindow { start: u64, end: u64 },
}
