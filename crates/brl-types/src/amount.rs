use std::fmt;

use serde::{Deserialize, Serialize};

/// Amount of the ledger currency.
///
/// Balances are conceptually unbounded, so the representable range is wide,
/// but every operation is checked: overflow and underflow are reported rather
/// than wrapped.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Bookcoin(u128);

impl Bookcoin {
    /// The zero amount.
    pub const ZERO: Self = Self(0);
    /// The largest representable amount.
    pub const MAX: Self = Self(u128::MAX);

    pub const fn new(amount: u128) -> Self {
        Self(amount)
    }

    pub const fn get(self) -> u128 {
        self.0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// `floor(self * percent / 100)`, exact for every amount.
    ///
    /// Computed as `q * percent + floor(r * percent / 100)` with
    /// `self = 100q + r`, so no intermediate product can overflow while
    /// `percent <= 100`.
    pub fn percent_floor(self, percent: u8) -> Self {
        let percent = u128::from(percent.min(100));
        let quotient = self.0 / 100;
        let remainder = self.0 % 100;
        Self(quotient * percent + remainder * percent / 100)
    }

    /// Split an amount into `(remainder, fee)` where
    /// `fee = floor(self * fee_percent / 100)` and `remainder + fee == self`.
    pub fn split_fee(self, fee_percent: u8) -> (Self, Self) {
        let fee = self.percent_floor(fee_percent);
        (Self(self.0 - fee.0), fee)
    }
}

impl From<u64> for Bookcoin {
    fn from(value: u64) -> Self {
        Self(u128::from(value))
    }
}

impl fmt::Display for Bookcoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BKC", self.0)
    }
}
