use std::path::Path;

use serde::{Deserialize, Serialize};

use brl_types::temporal::SECONDS_PER_DAY;
use brl_types::{AccountId, Bookcoin};

use crate::error::ConfigError;
use crate::registry::RentTerms;

/// Default share of every rental payment recorded as the network fee.
pub const DEFAULT_NETWORK_FEE_PERCENT: u8 = 3;

/// Initial funding for one account, applied when a ledger is constructed.
///
/// This is the only way balances enter the ledger: the core exposes no
/// deposit operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAllocation {
    /// Account label, or `acct:<64 hex chars>` for a raw identity.
    pub account: String,
    pub amount: u64,
}

/// Configuration for a [`RentalLedger`](crate::RentalLedger).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// The account receiving both the author amount and the network fee.
    pub platform_account: String,
    /// Length of one rental day in seconds.
    pub day_length_secs: u64,
    /// Percentage of the rental price recorded as the network fee.
    pub network_fee_percent: u8,
    /// Balances funded by the external funding mechanism at startup.
    pub genesis: Vec<GenesisAllocation>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            platform_account: "platform".into(),
            day_length_secs: SECONDS_PER_DAY,
            network_fee_percent: DEFAULT_NETWORK_FEE_PERCENT,
            genesis: Vec::new(),
        }
    }
}

impl LedgerConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.day_length_secs == 0 {
            return Err(ConfigError::Invalid("day_length_secs must be positive".into()));
        }
        if self.network_fee_percent > 100 {
            return Err(ConfigError::Invalid(format!(
                "network_fee_percent must be at most 100, got {}",
                self.network_fee_percent
            )));
        }
        resolve_account(&self.platform_account)?;
        for allocation in &self.genesis {
            resolve_account(&allocation.account)?;
        }
        Ok(())
    }

    pub fn platform(&self) -> Result<AccountId, ConfigError> {
        resolve_account(&self.platform_account)
    }

    pub fn rent_terms(&self) -> Result<RentTerms, ConfigError> {
        Ok(RentTerms {
            platform: self.platform()?,
            day_length_secs: self.day_length_secs,
            network_fee_percent: self.network_fee_percent,
        })
    }

    /// Resolved genesis allocations, in configuration order.
    pub fn genesis_balances(&self) -> Result<Vec<(AccountId, Bookcoin)>, ConfigError> {
        self.genesis
            .iter()
            .map(|a| Ok((resolve_account(&a.account)?, Bookcoin::from(a.amount))))
            .collect()
    }

    /// Add a genesis allocation.
    pub fn with_allocation(mut self, account: impl Into<String>, amount: u64) -> Self {
        self.genesis.push(GenesisAllocation {
            account: account.into(),
            amount,
        });
        self
    }
}

/// Resolve an account reference: `acct:<hex>` is a raw identity, anything
/// else is a label.
pub fn resolve_account(reference: &str) -> Result<AccountId, ConfigError> {
    if reference.is_empty() {
        return Err(ConfigError::Invalid("account reference is empty".into()));
    }
    if reference.starts_with("acct:") {
        return AccountId::from_hex(reference)
            .map_err(|e| ConfigError::Invalid(format!("account {reference}: {e}")));
    }
    Ok(AccountId::from_label(reference))
}
