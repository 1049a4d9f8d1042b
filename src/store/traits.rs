//! `SenderLedger` trait — the processed-senders key set.
//!
//! An address present in the ledger has already received its one automated
//! reply. Implementations are append-only.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::LedgerError;

/// Backend-agnostic set of already-answered sender addresses.
#[async_trait]
pub trait SenderLedger: Send + Sync {
    /// Whether `address` has already been answered.
    async fn contains(&self, address: &str) -> Result<bool, LedgerError>;

    /// Record `address` as answered. Adding an existing address is a no-op.
    async fn add(&self, address: &str) -> Result<(), LedgerError>;
}

/// Canonical ledger key: trimmed and lowercased.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// In-memory ledger (tests, dry runs).
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: Mutex<HashSet<String>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with known senders.
    pub fn with_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = entries
            .into_iter()
            .map(|s| normalize_address(s.as_ref()))
            .collect();
        Self {
            entries: Mutex::new(set),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SenderLedger for MemoryLedger {
    async fn contains(&self, address: &str) -> Result<bool, LedgerError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| LedgerError::Query(format!("ledger lock poisoned: {e}")))?;
        Ok(guard.contains(&normalize_address(address)))
    }

    async fn add(&self, address: &str) -> Result<(), LedgerError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| LedgerError::Query(format!("ledger lock poisoned: {e}")))?;
        guard.insert(normalize_address(address));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_address("  Alice@Example.COM\n"), "alice@example.com");
    }

    #[tokio::test]
    async fn memory_ledger_add_then_contains() {
        let ledger = MemoryLedger::new();
        assert!(!ledger.contains("alice@example.com").await.unwrap());
        ledger.add("alice@example.com").await.unwrap();
        assert!(ledger.contains("alice@example.com").await.unwrap());
        assert!(ledger.contains("ALICE@example.com ").await.unwrap());
    }

    #[tokio::test]
    async fn memory_ledger_add_is_idempotent() {
        let ledger = MemoryLedger::with_entries(["bob@example.com"]);
        ledger.add("bob@example.com").await.unwrap();
        assert_eq!(ledger.len(), 1);
    }
}
