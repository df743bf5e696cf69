use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Seconds in one rental day unless configured otherwise.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Integer timestamp in whole seconds.
///
/// Timestamps come from the clock boundary and are non-decreasing across
/// sequential operations. All arithmetic is checked.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a timestamp from whole seconds.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// The zero timestamp (genesis).
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Current wall-clock time in seconds since the UNIX epoch.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self(secs)
    }

    /// Whole seconds since the epoch.
    pub const fn as_secs(&self) -> u64 {
        self.0
    }

    /// Add `secs`, failing instead of wrapping.
    pub fn checked_add_secs(self, secs: u64) -> Result<Self, TypeError> {
        self.0
            .checked_add(secs)
            .map(Self)
            .ok_or(TypeError::Overflow("timestamp"))
    }

    /// The end of a window of `days` days of `day_length` seconds each,
    /// starting at `self`.
    pub fn checked_add_days(self, days: u64, day_length: u64) -> Result<Self, TypeError> {
        let secs = days
            .checked_mul(day_length)
            .ok_or(TypeError::Overflow("rental duration"))?;
        self.checked_add_secs(secs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}
