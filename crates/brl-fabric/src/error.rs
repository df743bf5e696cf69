/// Errors produced by the notification fabric.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FabricError {
    /// A sink's internal lock was poisoned by a panicking holder.
    #[error("sink lock poisoned: {0}")]
    LockPoisoned(&'static str),
}

/// Convenience alias used throughout the fabric crate.
pub type Result<T> = std::result::Result<T, FabricError>;
