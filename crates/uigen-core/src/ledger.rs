//! Append-only version history for generated components.
//!
//! Every completed generate/improve cycle appends one entry; restoring
//! an older entry only moves the current pointer. Entries are never
//! mutated or removed, so a restore can always be undone by selecting
//! a newer id.

use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    /// Millisecond timestamp, bumped on collision so ids stay unique
    /// and ordered even within one millisecond.
    pub id: String,
    pub code: String,
    pub created_at_ms: u64,
}

#[derive(Debug, Default)]
pub struct VersionLedger {
    versions: Vec<Version>,
    current: Option<usize>,
    last_issued_ms: u64,
}

impl VersionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new version and make it current.
    pub fn append(&mut self, code: impl Into<String>) -> &Version {
        let mut stamp = now_ms();
        if stamp <= self.last_issued_ms {
            stamp = self.last_issued_ms + 1;
        }
        self.last_issued_ms = stamp;
        self.versions.push(Version {
            id: stamp.to_string(),
            code: code.into(),
            created_at_ms: stamp,
        });
        let index = self.versions.len() - 1;
        self.current = Some(index);
        &self.versions[index]
    }

    /// Move the current pointer to `id` and return that version's code.
    pub fn select(&mut self, id: &str) -> Result<&str, LedgerError> {
        let index = self
            .versions
            .iter()
            .position(|v| v.id == id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;
        self.current = Some(index);
        Ok(&self.versions[index].code)
    }

    pub fn current(&self) -> Option<&Version> {
        self.current.and_then(|i| self.versions.get(i))
    }

    /// 1-based position of the current pointer, for "version N of M"
    /// display.
    pub fn current_position(&self) -> Option<usize> {
        self.current.map(|i| i + 1)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Version> {
        self.versions.iter()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_makes_the_new_version_current() {
        let mut ledger = VersionLedger::new();
        let id = ledger.append("one").id.clone();
        assert_eq!(ledger.current().map(|v| v.id.clone()), Some(id));
        assert_eq!(ledger.current_position(), Some(1));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn rapid_appends_get_distinct_ordered_ids() {
        let mut ledger = VersionLedger::new();
        let a = ledger.append("a").id.clone();
        let b = ledger.append("b").id.clone();
        let c = ledger.append("c").id.clone();
        assert!(a < b || a.len() < b.len());
        assert_ne!(a, b);
        assert_ne!(b, c);
    }

    #[test]
    fn select_moves_the_pointer_without_removing_entries() {
        let mut ledger = VersionLedger::new();
        let first = ledger.append("v1").id.clone();
        ledger.append("v2");
        assert_eq!(ledger.current_position(), Some(2));

        let code = ledger.select(&first).unwrap().to_string();
        assert_eq!(code, "v1");
        assert_eq!(ledger.current_position(), Some(1));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn selecting_an_unknown_id_is_not_found() {
        let mut ledger = VersionLedger::new();
        ledger.append("v1");
        assert_eq!(
            ledger.select("nope"),
            Err(LedgerError::NotFound("nope".to_string()))
        );
        // A failed select leaves the pointer alone.
        assert_eq!(ledger.current_position(), Some(1));
    }
}
