//! Newline-delimited file ledger.
//!
//! The whole file is read on every lookup and appended on every insert. A
//! missing file is an empty ledger.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::LedgerError;
use crate::store::traits::{SenderLedger, normalize_address};

/// File-backed ledger, one address per line.
pub struct FileLedger {
    path: PathBuf,
}

impl FileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Result<Vec<String>, LedgerError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content
                .lines()
                .map(normalize_address)
                .filter(|l| !l.is_empty())
                .collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl SenderLedger for FileLedger {
    async fn contains(&self, address: &str) -> Result<bool, LedgerError> {
        let needle = normalize_address(address);
        Ok(self.read_entries().await?.iter().any(|e| *e == needle))
    }

    async fn add(&self, address: &str) -> Result<(), LedgerError> {
        if self.contains(address).await? {
            return Ok(());
        }
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{}\n", normalize_address(address)).as_bytes())
            .await?;
        file.flush().await?;
        debug!(path = %self.path.display(), "Appended sender to ledger");
        Ok(())
    }
}
