use brl_fabric::Outbox;
use brl_ledger::{Journal, Operation};
use brl_types::{AccountId, Bookcoin};
use tracing::{debug, info};

use crate::error::Result;
use crate::registry::RentTerms;
use crate::state::LedgerState;

/// Result of replaying a journal and comparing it with a live state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayReport {
    pub replayed_entries: u64,
    pub head_hash: Option<[u8; 32]>,
    /// `true` if the replayed state equals the live state exactly.
    pub converged: bool,
}

/// Deterministic replay of the commit journal.
///
/// Entries are re-executed in order against the genesis state using their
/// recorded clock readings and transaction ids, so a faithful journal yields
/// a state (journal included) identical to the one that produced it.
pub struct ReplayEngine;

impl ReplayEngine {
    pub fn rebuild(
        genesis: &[(AccountId, Bookcoin)],
        journal: &Journal,
        terms: &RentTerms,
    ) -> Result<LedgerState> {
        journal.validate()?;

        let mut state = LedgerState::genesis(genesis)?;
        for entry in journal.entries() {
            // Replay re-derives notifications but never re-delivers them.
            let mut outbox = Outbox::new();
            match &entry.operation {
                Operation::Publish {
                    book,
                    title,
                    content,
                    price,
                } => {
                    state.publish(
                        entry.tx_id,
                        entry.at,
                        &entry.caller,
                        book,
                        title,
                        content,
                        *price,
                        &mut outbox,
                    )?;
                }
                Operation::Rent { book, days } => {
                    state.rent(
                        entry.tx_id,
                        entry.at,
                        &entry.caller,
                        book,
                        *days,
                        terms,
                        &mut outbox,
                    )?;
                }
            }
            debug!(seq = entry.seq, op = entry.operation.name(), "replayed entry");
        }
        Ok(state)
    }

    /// Rebuild from `live`'s own journal and compare.
    pub fn verify(
        live: &LedgerState,
        genesis: &[(AccountId, Bookcoin)],
        terms: &RentTerms,
    ) -> Result<ReplayReport> {
        let rebuilt = Self::rebuild(genesis, live.journal(), terms)?;
        let report = ReplayReport {
            replayed_entries: live.journal().len() as u64,
            head_hash: live.journal().head_hash(),
            converged: &rebuilt == live,
        };
        info!(
            entries = report.replayed_entries,
            converged = report.converged,
            "journal replay verified"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use brl_ledger::JournalError;
    use brl_types::{BookId, Timestamp, TxId};

    use super::*;
    use crate::error::RentalError;

    fn terms() -> RentTerms {
        RentTerms {
            platform: AccountId::from_label("platform"),
            day_length_secs: 86_400,
            network_fee_percent: 3,
        }
    }

    fn genesis() -> Vec<(AccountId, Bookcoin)> {
        vec![
            (AccountId::from_label("r1"), Bookcoin::new(300)),
            (AccountId::from_label("r2"), Bookcoin::new(300)),
        ]
    }

    fn live() -> LedgerState {
        let mut state = LedgerState::genesis(&genesis()).unwrap();
        let mut outbox = Outbox::new();
        let author = AccountId::from_label("author");
        for (i, label) in ["b1", "b2"].iter().enumerate() {
            state
                .publish(
                    TxId::new(),
                    Timestamp::from_secs(i as u64),
                    &author,
                    &BookId::from_label(label),
                    label,
                    "text",
                    Bookcoin::new(150),
                    &mut outbox,
                )
                .unwrap();
        }
        for (at, reader, book) in [(10, "r1", "b1"), (20, "r2", "b1"), (30, "r1", "b2")] {
            state
                .rent(
                    TxId::new(),
                    Timestamp::from_secs(at),
                    &AccountId::from_label(reader),
                    &BookId::from_label(book),
                    3,
                    &terms(),
                    &mut outbox,
                )
                .unwrap();
        }
        state
    }

    #[test]
    fn replay_converges_with_live_state() {
        let state = live();
        let report = ReplayEngine::verify(&state, &genesis(), &terms()).unwrap();
        assert!(report.converged);
        assert_eq!(report.replayed_entries, 5);
        assert_eq!(report.head_hash, state.journal().head_hash());
    }

    #[test]
    fn replay_with_different_genesis_diverges() {
        let state = live();
        let richer = vec![
            (AccountId::from_label("r1"), Bookcoin::new(1_000)),
            (AccountId::from_label("r2"), Bookcoin::new(300)),
        ];
        let report = ReplayEngine::verify(&state, &richer, &terms()).unwrap();
        assert!(!report.converged);
    }

    #[test]
    fn replay_fails_when_genesis_cannot_fund_rentals() {
        let state = live();
        let err = ReplayEngine::rebuild(&[], state.journal(), &terms()).unwrap_err();
        assert!(matches!(err, RentalError::InsufficientFunds { .. }));
    }

    #[test]
    fn tampered_journal_is_rejected() {
        let state = live();
        let mut bytes = state.journal().to_bytes().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        let err = Journal::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, JournalError::IntegrityViolation { .. }));
    }
}
