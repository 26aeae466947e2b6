//! Hash-chained transition journal
//!
//! Each session records every attempted transition, accepted or rejected.
//! Entries are chained with SHA-256 so a persisted journal can be checked
//! for tampering or truncation in the middle.

use crate::stage::{Stage, WorkflowEvent};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Journal integrity errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JournalError {
    /// Chain or content hash mismatch at `seq`
    #[error("journal integrity violation at entry {seq}")]
    IntegrityViolation { seq: u64 },

    /// Exported text could not be decoded
    #[error("malformed journal: {0}")]
    Malformed(String),
}

/// One recorded transition attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub seq: u64,
    pub event: WorkflowEvent,
    pub from: Stage,
    /// Stage after the attempt (equal to `from` when rejected)
    pub to: Stage,
    /// `"ok"` or the rejection message
    pub outcome: String,
    #[serde(with = "hex_bytes")]
    pub prev_hash: [u8; 32],
    #[serde(with = "hex_bytes")]
    pub hash: [u8; 32],
}

impl JournalEntry {
    #[inline]
    #[must_use]
    pub fn accepted(&self) -> bool {
        self.outcome == "ok"
    }

    /// Short hex form of this entry's hash
    #[must_use]
    pub fn short_hash(&self) -> String {
        hex::encode(&self.hash[..8])
    }
}

/// Append-only transition journal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    /// Append an attempt, chaining it onto the previous entry
    pub fn record(
        &mut self,
        event: WorkflowEvent,
        from: Stage,
        to: Stage,
        outcome: impl Into<String>,
    ) -> &JournalEntry {
        let prev_hash = self.entries.last().map_or([0u8; 32], |e| e.hash);
        let mut entry = JournalEntry {
            seq: self.entries.len() as u64,
            event,
            from,
            to,
            outcome: outcome.into(),
            prev_hash,
            hash: [0u8; 32],
        };
        entry.hash = compute_hash(&entry);
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hash of the most recent entry; all zeros when empty
    #[must_use]
    pub fn head(&self) -> [u8; 32] {
        self.entries.last().map_or([0u8; 32], |e| e.hash)
    }

    /// Export as JSON
    ///
    /// # Errors
    /// [`JournalError::Malformed`] if encoding fails
    pub fn to_json(&self) -> Result<String, JournalError> {
        serde_json::to_string_pretty(self).map_err(|e| JournalError::Malformed(e.to_string()))
    }

    /// Import a JSON export, verifying the chain before returning it
    ///
    /// # Errors
    /// [`JournalError::Malformed`] for undecodable text,
    /// [`JournalError::IntegrityViolation`] for a broken chain
    pub fn from_json(text: &str) -> Result<Self, JournalError> {
        let journal: Self =
            serde_json::from_str(text).map_err(|e| JournalError::Malformed(e.to_string()))?;
        journal.verify_integrity()?;
        Ok(journal)
    }

    /// Walk the chain and recompute every hash
    ///
    /// # Errors
    /// [`JournalError::IntegrityViolation`] at the first broken entry
    pub fn verify_integrity(&self) -> Result<(), JournalError> {
        let mut prev = [0u8; 32];
        for (i, e) in self.entries.iter().enumerate() {
            if e.seq != i as u64 || e.prev_hash != prev || e.hash != compute_hash(e) {
                return Err(JournalError::IntegrityViolation { seq: i as u64 });
            }
            prev = e.hash;
        }
        Ok(())
    }
}

fn compute_hash(entry: &JournalEntry) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(entry.seq.to_le_bytes());
    hasher.update(entry.event.to_string().as_bytes());
    hasher.update([0]);
    hasher.update(entry.from.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(entry.to.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(entry.outcome.as_bytes());
    hasher.update([0]);
    hasher.update(entry.prev_hash);
    hasher.finalize().into()
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let text = String::deserialize(d)?;
        let raw = hex::decode(&text).map_err(serde::de::Error::custom)?;
        raw.try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}
