use std::collections::BTreeMap;

use brl_types::{AccountId, Bookcoin};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LedgerError;
use crate::traits::{BalanceReader, BalanceWriter};

/// One leg of a multi-leg balance update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Posting {
    Debit { account: AccountId, amount: Bookcoin },
    Credit { account: AccountId, amount: Bookcoin },
}

impl Posting {
    pub fn debit(account: &AccountId, amount: Bookcoin) -> Self {
        Self::Debit {
            account: account.clone(),
            amount,
        }
    }

    pub fn credit(account: &AccountId, amount: Bookcoin) -> Self {
        Self::Credit {
            account: account.clone(),
            amount,
        }
    }

    fn account(&self) -> &AccountId {
        match self {
            Self::Debit { account, .. } | Self::Credit { account, .. } => account,
        }
    }
}

/// Per-account balances in the ledger currency.
///
/// Absent accounts have a zero balance; zero balances are still stored once
/// an account has been touched so that replay produces identical sheets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSheet {
    balances: BTreeMap<AccountId, Bookcoin>,
}

impl BalanceSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a batch of postings in order, all or nothing.
    ///
    /// Every posting is evaluated against a scratch overlay of the touched
    /// accounts. The sheet is only written when every leg succeeds, so an
    /// error leaves all balances exactly as they were.
    pub fn apply(&mut self, postings: &[Posting]) -> Result<(), LedgerError> {
        let mut overlay: BTreeMap<AccountId, Bookcoin> = BTreeMap::new();

        for posting in postings {
            let account = posting.account();
            let current = overlay
                .get(account)
                .copied()
                .unwrap_or_else(|| self.balance(account));
            let next = match posting {
                Posting::Debit { amount, .. } => debit_value(account, current, *amount)?,
                Posting::Credit { amount, .. } => credit_value(account, current, *amount)?,
            };
            overlay.insert(account.clone(), next);
        }

        debug!(legs = postings.len(), accounts = overlay.len(), "postings applied");
        self.balances.extend(overlay);
        Ok(())
    }

    /// Iterate over every stored balance in account order.
    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, &Bookcoin)> {
        self.balances.iter()
    }

    /// Sum of every balance, or `None` if it exceeds the representable range.
    pub fn total(&self) -> Option<Bookcoin> {
        self.balances
            .values()
            .try_fold(Bookcoin::ZERO, |acc, b| acc.checked_add(*b))
    }

    pub fn account_count(&self) -> usize {
        self.balances.len()
    }
}

impl BalanceReader for BalanceSheet {
    fn balance(&self, account: &AccountId) -> Bookcoin {
        self.balances.get(account).copied().unwrap_or_default()
    }
}

impl BalanceWriter for BalanceSheet {
    fn debit(&mut self, account: &AccountId, amount: Bookcoin) -> Result<Bookcoin, LedgerError> {
        let next = debit_value(account, self.balance(account), amount)?;
        self.balances.insert(account.clone(), next);
        Ok(next)
    }

    fn credit(&mut self, account: &AccountId, amount: Bookcoin) -> Result<Bookcoin, LedgerError> {
        let next = credit_value(account, self.balance(account), amount)?;
        self.balances.insert(account.clone(), next);
        Ok(next)
    }
}

fn debit_value(
    account: &AccountId,
    balance: Bookcoin,
    amount: Bookcoin,
) -> Result<Bookcoin, LedgerError> {
    balance
        .checked_sub(amount)
        .ok_or_else(|| LedgerError::InsufficientFunds {
            account: account.clone(),
            balance,
            required: amount,
        })
}

fn credit_value(
    account: &AccountId,
    balance: Bookcoin,
    amount: Bookcoin,
) -> Result<Bookcoin, LedgerError> {
    balance
        .checked_add(amount)
        .ok_or_else(|| LedgerError::ArithmeticOverflow {
            account: account.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn acct(label: &str) -> AccountId {
        AccountId::from_label(label)
    }

    #[test]
    fn unknown_account_has_zero_balance() {
        let sheet = BalanceSheet::new();
        assert_eq!(sheet.balance(&acct("nobody")), Bookcoin::ZERO);
    }

    #[test]
    fn credit_then_debit() {
        let mut sheet = BalanceSheet::new();
        let a = acct("a");
        assert_eq!(sheet.credit(&a, Bookcoin::new(100)).unwrap(), Bookcoin::new(100));
        assert_eq!(sheet.debit(&a, Bookcoin::new(40)).unwrap(), Bookcoin::new(60));
        assert_eq!(sheet.balance(&a), Bookcoin::new(60));
    }

    #[test]
    fn debit_below_zero_is_rejected() {
        let mut sheet = BalanceSheet::new();
        let a = acct("a");
        sheet.credit(&a, Bookcoin::new(50)).unwrap();
        let err = sheet.debit(&a, Bookcoin::new(100)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                account: a.clone(),
                balance: Bookcoin::new(50),
                required: Bookcoin::new(100),
            }
        );
        assert_eq!(sheet.balance(&a), Bookcoin::new(50));
    }

    #[test]
    fn credit_overflow_is_rejected() {
        let mut sheet = BalanceSheet::new();
        let a = acct("a");
        sheet.credit(&a, Bookcoin::MAX).unwrap();
        let err = sheet.credit(&a, Bookcoin::new(1)).unwrap_err();
        assert_eq!(err, LedgerError::ArithmeticOverflow { account: a.clone() });
        assert_eq!(sheet.balance(&a), Bookcoin::MAX);
    }

    #[test]
    fn apply_is_all_or_nothing() {
        let mut sheet = BalanceSheet::new();
        let reader = acct("reader");
        let platform = acct("platform");
        sheet.credit(&reader, Bookcoin::new(100)).unwrap();
        sheet.credit(&platform, Bookcoin::MAX).unwrap();
        let before = sheet.clone();

        let err = sheet
            .apply(&[
                Posting::debit(&reader, Bookcoin::new(100)),
                Posting::credit(&platform, Bookcoin::new(100)),
            ])
            .unwrap_err();

        assert!(matches!(err, LedgerError::ArithmeticOverflow { .. }));
        assert_eq!(sheet, before);
    }

    #[test]
    fn apply_sees_earlier_legs_on_same_account() {
        let mut sheet = BalanceSheet::new();
        let a = acct("a");
        sheet.credit(&a, Bookcoin::new(10)).unwrap();
        sheet
            .apply(&[
                Posting::debit(&a, Bookcoin::new(10)),
                Posting::credit(&a, Bookcoin::new(7)),
                Posting::credit(&a, Bookcoin::new(3)),
            ])
            .unwrap();
        assert_eq!(sheet.balance(&a), Bookcoin::new(10));
    }

    #[test]
    fn total_sums_every_account() {
        let mut sheet = BalanceSheet::new();
        sheet.credit(&acct("a"), Bookcoin::new(3)).unwrap();
        sheet.credit(&acct("b"), Bookcoin::new(4)).unwrap();
        assert_eq!(sheet.total(), Some(Bookcoin::new(7)));
        assert_eq!(sheet.account_count(), 2);
    }

    proptest! {
        #[test]
        fn transfer_conserves_total(start in 0u64..1_000_000, amount in 0u64..2_000_000) {
            let mut sheet = BalanceSheet::new();
            let from = acct("from");
            let to = acct("to");
            sheet.credit(&from, Bookcoin::from(start)).unwrap();
            let result = sheet.apply(&[
                Posting::debit(&from, Bookcoin::from(amount)),
                Posting::credit(&to, Bookcoin::from(amount)),
            ]);
            prop_assert_eq!(result.is_ok(), amount <= start);
            prop_assert_eq!(sheet.total(), Some(Bookcoin::from(start)));
        }
    }
}
