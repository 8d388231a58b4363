//! Record table operations and the sequence allocator

use redb::{ReadableTable, ReadableTableMetadata, WriteTransaction};
use shared::models::{ExternalRef, RecordFields, RecordStatus, StorageRecord};
use std::collections::HashSet;

use super::{
    EXTERNAL_INDEX_TABLE, RECORDS_TABLE, RecordStore, SEQUENCE_KEY, SEQUENCE_TABLE, StorageError,
    StorageResult,
};

/// A record before it has been given a sequence number
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub record_id: String,
    pub status: RecordStatus,
    pub fields: RecordFields,
    pub created_at: i64,
    pub created_by: String,
    pub external_ref: Option<ExternalRef>,
}

impl NewRecord {
    pub fn external_id(&self) -> Option<&str> {
        self.external_ref.as_ref().map(|r| r.external_id.as_str())
    }

    fn into_record(self, sequence_number: u64) -> StorageRecord {
        // Direct intake is taken into storage at creation
        let (stored_at, stored_by) = match self.status {
            RecordStatus::InStorage => (Some(self.created_at), Some(self.created_by.clone())),
            _ => (None, None),
        };
        StorageRecord {
            record_id: self.record_id,
            sequence_number,
            status: self.status,
            fields: self.fields,
            created_at: self.created_at,
            created_by: self.created_by,
            stored_at,
            stored_by,
            released_at: None,
            released_by: None,
            external_ref: self.external_ref,
        }
    }
}

/// Result of [`RecordStore::insert_batch`]
#[derive(Debug, Default)]
pub struct BatchInsert {
    /// Inserted records in input order
    pub inserted: Vec<StorageRecord>,
    /// Inputs skipped because their external id was already known
    pub duplicates: usize,
}

impl RecordStore {
    // ========== Sequence Operations ==========

    /// Last allocated sequence number (0 for an empty store)
    pub fn current_sequence(&self) -> StorageResult<u64> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    /// Number the next created record would receive
    ///
    /// Read-only peek; allocation happens inside the inserting transaction.
    pub fn next_sequence(&self) -> StorageResult<u64> {
        Ok(self.current_sequence()? + 1)
    }

    /// Reserve `count` numbers and return the base; the caller assigns
    /// `base + 1 ..= base + count` by position
    fn reserve_sequences(txn: &WriteTransaction, count: u64) -> StorageResult<u64> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        let base = table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0);
        if count > 0 {
            table.insert(SEQUENCE_KEY, base + count)?;
        }
        Ok(base)
    }

    // ========== Record Operations ==========

    fn put_record(txn: &WriteTransaction, record: &StorageRecord) -> StorageResult<()> {
        let mut table = txn.open_table(RECORDS_TABLE)?;
        let value = serde_json::to_vec(record)?;
        table.insert(record.record_id.as_str(), value.as_slice())?;
        Ok(())
    }

    fn load_record_txn(txn: &WriteTransaction, record_id: &str) -> StorageResult<StorageRecord> {
        let table = txn.open_table(RECORDS_TABLE)?;
        let bytes = table
            .get(record_id)?
            .map(|guard| guard.value().to_vec())
            .ok_or_else(|| StorageError::RecordNotFound(record_id.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Insert a locally created record with the next sequence number
    ///
    /// Records carrying an external reference go through
    /// [`RecordStore::insert_batch`], which deduplicates them.
    pub fn insert_record(&self, new: NewRecord) -> StorageResult<StorageRecord> {
        let txn = self.begin_write()?;
        let base = Self::reserve_sequences(&txn, 1)?;
        let record = new.into_record(base + 1);
        Self::put_record(&txn, &record)?;
        txn.commit()?;
        Ok(record)
    }

    /// Insert many records in one transaction
    ///
    /// Inputs whose external id is already stored, or repeats an earlier
    /// input of the same batch, are skipped. One sequence range is reserved
    /// for the survivors and assigned by position.
    pub fn insert_batch(&self, batch: Vec<NewRecord>) -> StorageResult<BatchInsert> {
        if batch.is_empty() {
            return Ok(BatchInsert::default());
        }

        let txn = self.begin_write()?;
        let mut result = BatchInsert::default();
        {
            let mut index = txn.open_table(EXTERNAL_INDEX_TABLE)?;

            let mut seen: HashSet<String> = HashSet::new();
            let mut accepted = Vec::with_capacity(batch.len());
            for new in batch {
                if let Some(external_id) = new.external_id() {
                    if index.get(external_id)?.is_some() || !seen.insert(external_id.to_string())
                    {
                        result.duplicates += 1;
                        continue;
                    }
                }
                accepted.push(new);
            }

            let base = Self::reserve_sequences(&txn, accepted.len() as u64)?;
            for (offset, new) in accepted.into_iter().enumerate() {
                let record = new.into_record(base + 1 + offset as u64);
                Self::put_record(&txn, &record)?;
                if let Some(external) = &record.external_ref {
                    index.insert(external.external_id.as_str(), record.record_id.as_str())?;
                }
                result.inserted.push(record);
            }
        }
        txn.commit()?;
        Ok(result)
    }

    /// Overwrite `external_ref.status` of known records with the CRM's
    /// current value, in one transaction
    ///
    /// Unknown external ids are ignored. Local status and push bookkeeping
    /// are untouched. Returns how many records changed.
    pub fn refresh_external_statuses(&self, statuses: &[(String, String)]) -> StorageResult<usize> {
        if statuses.is_empty() {
            return Ok(0);
        }

        let txn = self.begin_write()?;
        let mut changed = 0;
        {
            let index = txn.open_table(EXTERNAL_INDEX_TABLE)?;
            let mut table = txn.open_table(RECORDS_TABLE)?;

            for (external_id, status) in statuses {
                let Some(record_id) = index
                    .get(external_id.as_str())?
                    .map(|guard| guard.value().to_string())
                else {
                    continue;
                };
                let Some(bytes) = table
                    .get(record_id.as_str())?
                    .map(|guard| guard.value().to_vec())
                else {
                    continue;
                };

                let mut record: StorageRecord = serde_json::from_slice(&bytes)?;
                let Some(external) = record.external_ref.as_mut() else {
                    continue;
                };
                if external.status == *status {
                    continue;
                }
                external.status = status.clone();
                let value = serde_json::to_vec(&record)?;
                table.insert(record_id.as_str(), value.as_slice())?;
                changed += 1;
            }
        }
        txn.commit()?;
        Ok(changed)
    }

    /// Get a record by id
    pub fn get_record(&self, record_id: &str) -> StorageResult<Option<StorageRecord>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(RECORDS_TABLE)?;

        match table.get(record_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All records, newest (highest sequence number) first
    pub fn list_records(&self) -> StorageResult<Vec<StorageRecord>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(RECORDS_TABLE)?;

        let mut records = Vec::new();
        for entry in table.iter()? {
            let (_key, value) = entry?;
            let record: StorageRecord = serde_json::from_slice(value.value())?;
            records.push(record);
        }

        records.sort_by(|a, b| b.sequence_number.cmp(&a.sequence_number));
        Ok(records)
    }

    pub fn record_count(&self) -> StorageResult<u64> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(RECORDS_TABLE)?;
        Ok(table.len()?)
    }

    /// Is this CRM order already mirrored?
    pub fn contains_external_id(&self, external_id: &str) -> StorageResult<bool> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(EXTERNAL_INDEX_TABLE)?;
        Ok(index.get(external_id)?.is_some())
    }

    pub fn find_by_external_id(&self, external_id: &str) -> StorageResult<Option<StorageRecord>> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(EXTERNAL_INDEX_TABLE)?;
        let record_id = match index.get(external_id)? {
            Some(guard) => guard.value().to_string(),
            None => return Ok(None),
        };

        let table = read_txn.open_table(RECORDS_TABLE)?;
        match table.get(record_id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Load, modify and write back one record in a single write transaction
    ///
    /// If `f` fails the transaction is dropped and the stored record is
    /// left untouched.
    pub fn update_record<T, E, F>(&self, record_id: &str, f: F) -> Result<(StorageRecord, T), E>
    where
        F: FnOnce(&mut StorageRecord) -> Result<T, E>,
        E: From<StorageError>,
    {
        let txn = self.begin_write()?;
        let mut record = Self::load_record_txn(&txn, record_id)?;
        let out = f(&mut record)?;
        Self::put_record(&txn, &record)?;
        txn.commit().map_err(StorageError::from)?;
        Ok((record, out))
    }

    /// Delete records by id, returns how many existed
    pub fn delete_records(&self, record_ids: &[String]) -> StorageResult<usize> {
        let txn = self.begin_write()?;
        let mut deleted = 0;
        {
            let mut table = txn.open_table(RECORDS_TABLE)?;
            let mut index = txn.open_table(EXTERNAL_INDEX_TABLE)?;

            for record_id in record_ids {
                let removed = table
                    .remove(record_id.as_str())?
                    .map(|guard| guard.value().to_vec());
                let Some(bytes) = removed else {
                    continue;
                };
                deleted += 1;

                let record: StorageRecord = serde_json::from_slice(&bytes)?;
                if let Some(external) = &record.external_ref {
                    index.remove(external.external_id.as_str())?;
                }
            }
        }
        txn.commit()?;
        Ok(deleted)
    }
}
