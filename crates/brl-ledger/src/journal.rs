use brl_types::{AccountId, BookId, Bookcoin, Timestamp, TxId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::JournalError;

/// A committed mutation, recorded with enough detail to replay it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Publish {
        book: BookId,
        title: String,
        content: String,
        price: Bookcoin,
    },
    /// The renter is the entry's caller.
    Rent { book: BookId, days: u64 },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Publish { .. } => "publish",
            Self::Rent { .. } => "rent",
        }
    }

    pub fn book(&self) -> &BookId {
        match self {
            Self::Publish { book, .. } | Self::Rent { book, .. } => book,
        }
    }
}

/// One hash-linked journal entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// 1-based position in the journal.
    pub seq: u64,
    pub tx_id: TxId,
    /// Clock reading the operation executed at.
    pub at: Timestamp,
    pub caller: AccountId,
    pub operation: Operation,
    pub prev_hash: Option<[u8; 32]>,
    pub entry_hash: [u8; 32],
}

/// Append-only log of every committed operation, in commit order.
///
/// Only successful operations are journaled; a failed operation leaves no
/// trace. Each entry commits to its predecessor's hash.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the entry that would be appended next, without appending it.
    ///
    /// Sealing is the only fallible journal step, so callers seal before
    /// mutating any other state and [`commit`](Self::commit) afterwards.
    pub fn seal(
        &self,
        tx_id: TxId,
        at: Timestamp,
        caller: &AccountId,
        operation: Operation,
    ) -> Result<JournalEntry, JournalError> {
        let mut entry = JournalEntry {
            seq: self.entries.len() as u64 + 1,
            tx_id,
            at,
            caller: caller.clone(),
            operation,
            prev_hash: self.head_hash(),
            entry_hash: [0; 32],
        };
        entry.entry_hash = compute_entry_hash(&entry)?;
        Ok(entry)
    }

    /// Append an entry produced by [`seal`](Self::seal) on this journal with
    /// no commit in between. [`validate`](Self::validate) rejects any other
    /// entry.
    pub fn commit(&mut self, entry: JournalEntry) {
        debug!(
            seq = entry.seq,
            op = entry.operation.name(),
            tx = %entry.tx_id.short_id(),
            "journal commit"
        );
        self.entries.push(entry);
    }

    /// Seal and commit in one step.
    pub fn append(
        &mut self,
        tx_id: TxId,
        at: Timestamp,
        caller: &AccountId,
        operation: Operation,
    ) -> Result<&JournalEntry, JournalError> {
        let entry = self.seal(tx_id, at, caller, operation)?;
        self.commit(entry);
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hash of the most recent entry, if any.
    pub fn head_hash(&self) -> Option<[u8; 32]> {
        self.entries.last().map(|e| e.entry_hash)
    }

    /// Validate sequence numbering, hash links, entry hashes, and clock
    /// monotonicity across the whole journal.
    pub fn validate(&self) -> Result<(), JournalError> {
        let mut prev: Option<&JournalEntry> = None;
        for (index, entry) in self.entries.iter().enumerate() {
            let expected_seq = index as u64 + 1;
            if entry.seq != expected_seq {
                return Err(JournalError::IntegrityViolation {
                    seq: entry.seq,
                    reason: format!("expected seq {expected_seq}, found {}", entry.seq),
                });
            }

            if entry.prev_hash != prev.map(|p| p.entry_hash) {
                return Err(JournalError::IntegrityViolation {
                    seq: entry.seq,
                    reason: "previous hash link mismatch".into(),
                });
            }

            if compute_entry_hash(entry)? != entry.entry_hash {
                return Err(JournalError::IntegrityViolation {
                    seq: entry.seq,
                    reason: "entry hash mismatch".into(),
                });
            }

            if let Some(p) = prev {
                if entry.at < p.at {
                    return Err(JournalError::IntegrityViolation {
                        seq: entry.seq,
                        reason: format!("clock went backwards: {} after {}", entry.at, p.at),
                    });
                }
            }
            prev = Some(entry);
        }
        Ok(())
    }

    /// Export the journal as bincode bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, JournalError> {
        bincode::serialize(self).map_err(|e| JournalError::Serialization(e.to_string()))
    }

    /// Import a journal from bincode bytes, validating it before returning.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, JournalError> {
        let journal: Self =
            bincode::deserialize(bytes).map_err(|e| JournalError::Serialization(e.to_string()))?;
        journal.validate()?;
        Ok(journal)
    }
}

fn compute_entry_hash(entry: &JournalEntry) -> Result<[u8; 32], JournalError> {
    let mut canonical = entry.clone();
    canonical.entry_hash = [0; 32];

    let encoded = serde_json::to_vec(&canonical)
        .map_err(|e| JournalError::Serialization(e.to_string()))?;

    let mut hasher = blake3::Hasher::new();
    hasher.update(b"brl-journal-v1:");
    hasher.update(&encoded);
    Ok(*hasher.finalize().as_bytes())
}
