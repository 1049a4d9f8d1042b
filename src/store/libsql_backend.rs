//! libSQL ledger — embedded-store implementation of `SenderLedger`.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;

use crate::error::LedgerError;
use crate::store::traits::{SenderLedger, normalize_address};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS processed_senders (
        address TEXT PRIMARY KEY,
        replied_at TEXT NOT NULL
    );
"#;

/// libSQL-backed ledger.
///
/// Stores a single connection that is reused for all operations.
pub struct LibSqlLedger {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlLedger {
    /// Open (or create) a local database file.
    pub async fn new_local(path: &Path) -> Result<Self, LedgerError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                LedgerError::Open(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| LedgerError::Open(format!("Failed to open libSQL database: {e}")))?;

        let ledger = Self::from_database(db).await?;
        info!(path = %path.display(), "Ledger database opened");
        Ok(ledger)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, LedgerError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| LedgerError::Open(format!("Failed to create in-memory database: {e}")))?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, LedgerError> {
        let conn = db
            .connect()
            .map_err(|e| LedgerError::Open(format!("Failed to create connection: {e}")))?;
        conn.execute_batch(SCHEMA)
            .await
            .map_err(|e| LedgerError::Open(format!("Failed to initialize schema: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }
}

#[async_trait]
impl SenderLedger for LibSqlLedger {
    async fn contains(&self, address: &str) -> Result<bool, LedgerError> {
        let mut rows = self
            .conn
            .query(
                "SELECT 1 FROM processed_senders WHERE address = ?1",
                params![normalize_address(address)],
            )
            .await
            .map_err(|e| LedgerError::Query(format!("contains: {e}")))?;

        match rows.next().await {
            Ok(Some(_)) => Ok(true),
            Ok(None) => Ok(false),
            Err(e) => Err(LedgerError::Query(format!("contains: {e}"))),
        }
    }

    async fn add(&self, address: &str) -> Result<(), LedgerError> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO processed_senders (address, replied_at) VALUES (?1, ?2)",
                params![normalize_address(address), Utc::now().to_rfc3339()],
            )
            .await
            .map_err(|e| LedgerError::Query(format!("add: {e}")))?;
        Ok(())
    }
}
