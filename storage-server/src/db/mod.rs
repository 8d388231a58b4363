//! redb-based storage layer
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `records` | `record_id` | `StorageRecord` (JSON) | Storage records |
//! | `external_index` | `external_id` | `record_id` | CRM order dedup index |
//! | `sequence_counter` | `"seq"` | `u64` | Record number allocator |
//! | `users` | `username` | `UserAccount` (JSON) | Login accounts |
//! | `settings` | key | JSON | Form schema, receipt template |
//!
//! # Concurrency
//!
//! redb allows a single write transaction at a time. Every mutation
//! (sequence allocation, insert, status transition) runs inside one write
//! transaction, so check-then-write sequences are atomic.

mod records;
mod settings;
mod users;

pub use records::{BatchInsert, NewRecord};
pub use users::UserAccount;

use redb::{Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use shared::error::{AppError, ErrorCode};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// key = record_id, value = JSON-serialized StorageRecord
pub(crate) const RECORDS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

/// key = CRM order id, value = record_id
pub(crate) const EXTERNAL_INDEX_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("external_index");

/// key = "seq", value = last allocated sequence number
pub(crate) const SEQUENCE_TABLE: TableDefinition<&str, u64> =
    TableDefinition::new("sequence_counter");

/// key = username, value = JSON-serialized UserAccount
pub(crate) const USERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// key = setting name, value = JSON
pub(crate) const SETTINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("settings");

pub(crate) const SEQUENCE_KEY: &str = "seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    UserExists(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// redb 错误分类
///
/// 先按枚举变体精确匹配，redb 底层错误再通过字符串匹配分类。
pub fn classify_storage_error(e: &StorageError) -> ErrorCode {
    match e {
        StorageError::Serialization(_) => return ErrorCode::InternalError,
        StorageError::RecordNotFound(_) => return ErrorCode::RecordNotFound,
        StorageError::UserNotFound(_) => return ErrorCode::UserNotFound,
        StorageError::UserExists(_) => return ErrorCode::UsernameExists,
        _ => {}
    }

    let err_str = e.to_string().to_lowercase();

    // 磁盘空间不足
    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return ErrorCode::StorageFull;
    }

    // 内存不足
    if err_str.contains("out of memory") || err_str.contains("cannot allocate") {
        return ErrorCode::OutOfMemory;
    }

    // 数据损坏
    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return ErrorCode::StorageCorrupted;
    }

    // 默认：系统繁忙
    ErrorCode::SystemBusy
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        let code = classify_storage_error(&e);
        match &e {
            StorageError::RecordNotFound(id) => AppError::record_not_found(id.clone()),
            StorageError::UserNotFound(name) | StorageError::UserExists(name) => {
                AppError::with_message(code, e.to_string()).with_detail("username", name.clone())
            }
            _ => {
                tracing::error!(error = %e, code = %code, "Storage operation failed");
                AppError::new(code)
            }
        }
    }
}

/// Record store backed by redb
///
/// Cheap to clone; every clone shares the same database handle.
#[derive(Clone)]
pub struct RecordStore {
    db: Arc<Database>,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore").finish_non_exhaustive()
    }
}

impl RecordStore {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate` by default: a record is on
    /// disk as soon as the call that created it returns.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::initialize(db)
    }

    /// Open an in-memory database (tests, ephemeral runs)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::initialize(db)
    }

    fn initialize(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let records = write_txn.open_table(RECORDS_TABLE)?;
            let _ = write_txn.open_table(EXTERNAL_INDEX_TABLE)?;
            let _ = write_txn.open_table(USERS_TABLE)?;
            let _ = write_txn.open_table(SETTINGS_TABLE)?;

            // Counter never lags behind stored records
            let mut max_sequence = 0u64;
            for entry in records.iter()? {
                let (_key, value) = entry?;
                let record: shared::models::StorageRecord = serde_json::from_slice(value.value())?;
                max_sequence = max_sequence.max(record.sequence_number);
            }

            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            let current = seq_table.get(SEQUENCE_KEY)?.map(|guard| guard.value());
            match current {
                Some(value) if value >= max_sequence => {}
                _ => {
                    seq_table.insert(SEQUENCE_KEY, max_sequence)?;
                }
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub(crate) fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Begin a read transaction
    pub(crate) fn begin_read(&self) -> StorageResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    /// Liveness check for the health endpoint
    pub fn ping(&self) -> StorageResult<()> {
        let txn = self.begin_read()?;
        let _ = txn.open_table(SEQUENCE_TABLE)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_variants() {
        assert_eq!(
            classify_storage_error(&StorageError::RecordNotFound("x".into())),
            ErrorCode::RecordNotFound
        );
        assert_eq!(
            classify_storage_error(&StorageError::UserExists("admin".into())),
            ErrorCode::UsernameExists
        );
    }

    #[test]
    fn test_storage_error_into_app_error() {
        let err: AppError = StorageError::RecordNotFound("r-1".into()).into();
        assert_eq!(err.code, ErrorCode::RecordNotFound);
        assert_eq!(err.http_status(), http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_open_file_backed_database_twice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.redb");

        {
            let store = RecordStore::open(&path).unwrap();
            store.ping().unwrap();
        }

        let store = RecordStore::open(&path).unwrap();
        assert_eq!(store.current_sequence().unwrap(), 0);
    }
}
