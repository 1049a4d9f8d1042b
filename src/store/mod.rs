//! Persistence layer — the processed-senders ledger and its backends.

pub mod file;
pub mod libsql_backend;
pub mod traits;

use std::sync::Arc;

pub use file::FileLedger;
pub use libsql_backend::LibSqlLedger;
pub use traits::{MemoryLedger, SenderLedger};

use crate::config::{LedgerBackend, LedgerConfig};
use crate::error::LedgerError;

/// Open the ledger backend named by `config`.
pub async fn open_ledger(config: &LedgerConfig) -> Result<Arc<dyn SenderLedger>, LedgerError> {
    match config.backend {
        LedgerBackend::File => Ok(Arc::new(FileLedger::new(&config.path))),
        LedgerBackend::LibSql => Ok(Arc::new(LibSqlLedger::new_local(&config.path).await?)),
    }
}
