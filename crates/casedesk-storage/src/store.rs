//! Record persistence.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use casedesk_fs::atomic_write_json;
use casedesk_model::CaseRecord;

use crate::error::StoreError;
use crate::observer::CaseObserver;

/// Read access the folder and import code needs from wherever records live.
pub trait CaseRecordStore {
    fn get_record(&self, case_id: &str) -> Option<&CaseRecord>;

    /// All records in insertion order.
    fn records(&self) -> &[CaseRecord];

    fn case_ids(&self) -> BTreeSet<&str> {
        self.records().iter().map(|r| r.case_id.as_str()).collect()
    }
}

/// Records kept as one pretty-printed JSON array, rewritten atomically on every change.
///
/// Case ids are unique across the whole store.
pub struct JsonRecordStore {
    path: PathBuf,
    records: Vec<CaseRecord>,
    observers: Vec<Arc<dyn CaseObserver>>,
}

impl std::fmt::Debug for JsonRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRecordStore")
            .field("path", &self.path)
            .field("records", &self.records.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl CaseRecordStore for JsonRecordStore {
    fn get_record(&self, case_id: &str) -> Option<&CaseRecord> {
        let case_id = case_id.trim();
        self.records.iter().find(|r| r.case_id == case_id)
    }

    fn records(&self) -> &[CaseRecord] {
        &self.records
    }
}

impl JsonRecordStore {
    /// Open the store at `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        Ok(Self {
            path,
            records,
            observers: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn subscribe(&mut self, observer: Arc<dyn CaseObserver>) {
        self.observers.push(observer);
    }

    pub fn add(&mut self, record: CaseRecord) -> Result<&CaseRecord, StoreError> {
        self.check_new_id(&record)?;
        self.records.push(record);
        if let Err(err) = self.save() {
            self.records.pop();
            return Err(err);
        }
        let index = self.records.len() - 1;
        Ok(&self.records[index])
    }

    /// Add several records with a single write. Nothing is added if any record is rejected.
    pub fn add_batch(&mut self, records: Vec<CaseRecord>) -> Result<usize, StoreError> {
        let mut batch_ids = BTreeSet::new();
        for record in &records {
            self.check_new_id(record)?;
            if !batch_ids.insert(record.case_id.as_str()) {
                return Err(StoreError::DuplicateCaseId {
                    case_id: record.case_id.clone(),
                });
            }
        }

        let count = records.len();
        let before = self.records.len();
        self.records.extend(records);
        if let Err(err) = self.save() {
            self.records.truncate(before);
            return Err(err);
        }
        Ok(count)
    }

    /// Replace the record with the same case id. `created_at` is kept, `updated_at` refreshed.
    ///
    /// Changing the case id goes through [`JsonRecordStore::change_case_id`] instead.
    pub fn update(&mut self, mut record: CaseRecord) -> Result<(), StoreError> {
        let index = self.index_of(&record.case_id)?;
        record.created_at = self.records[index].created_at;
        record.touch();
        let previous = std::mem::replace(&mut self.records[index], record);
        if let Err(err) = self.save() {
            self.records[index] = previous;
            return Err(err);
        }
        Ok(())
    }

    /// Give a record a new case id.
    ///
    /// Observers run first (folder rename); if one fails nothing changes. If persisting fails
    /// afterwards, observers are asked to apply the reverse change.
    pub fn change_case_id(
        &mut self,
        old_case_id: &str,
        new_case_id: &str,
    ) -> Result<CaseRecord, StoreError> {
        let new_case_id = new_case_id.trim();
        if new_case_id.is_empty() {
            return Err(StoreError::MissingCaseId);
        }
        let index = self.index_of(old_case_id)?;
        if self.records[index].case_id == new_case_id {
            return Ok(self.records[index].clone());
        }
        if self.get_record(new_case_id).is_some() {
            return Err(StoreError::DuplicateCaseId {
                case_id: new_case_id.to_string(),
            });
        }

        let current = self.records[index].clone();
        let old = current.identity();
        let mut updated = current.clone().with_case_id(new_case_id);
        updated.touch();
        let new = updated.identity();

        for observer in &self.observers {
            observer
                .on_identity_changed(&current, &old, &new)
                .map_err(StoreError::Observer)?;
        }

        self.records[index] = updated.clone();
        if let Err(err) = self.save() {
            self.records[index] = current;
            for observer in &self.observers {
                if let Err(revert) = observer.on_identity_changed(&updated, &new, &old) {
                    log::error!(
                        "could not revert case id change {} -> {}: {revert}",
                        old.case_id,
                        new.case_id
                    );
                }
            }
            return Err(err);
        }
        log::info!("case id changed {} -> {}", old.case_id, new.case_id);
        Ok(updated)
    }

    /// Remove a record after every observer accepted the deletion.
    ///
    /// Observers learn about the removal through [`CaseObserver::on_case_deleted`] only after it
    /// has been written, so a failed write leaves both the record and its folder in place.
    pub fn delete(&mut self, case_id: &str) -> Result<CaseRecord, StoreError> {
        let index = self.index_of(case_id)?;
        for observer in &self.observers {
            observer
                .before_case_deleted(&self.records[index])
                .map_err(StoreError::Observer)?;
        }
        let removed = self.records.remove(index);
        if let Err(err) = self.save() {
            self.records.insert(index, removed);
            return Err(err);
        }
        for observer in &self.observers {
            if let Err(err) = observer.on_case_deleted(&removed) {
                log::error!("case {} deleted, but cleanup failed: {err}", removed.case_id);
            }
        }
        log::info!("deleted case {}", removed.case_id);
        Ok(removed)
    }

    fn index_of(&self, case_id: &str) -> Result<usize, StoreError> {
        let case_id = case_id.trim();
        self.records
            .iter()
            .position(|r| r.case_id == case_id)
            .ok_or_else(|| StoreError::NotFound {
                case_id: case_id.to_string(),
            })
    }

    fn check_new_id(&self, record: &CaseRecord) -> Result<(), StoreError> {
        if !record.has_case_id() {
            return Err(StoreError::MissingCaseId);
        }
        if self.get_record(&record.case_id).is_some() {
            return Err(StoreError::DuplicateCaseId {
                case_id: record.case_id.clone(),
            });
        }
        Ok(())
    }

    fn save(&self) -> Result<(), StoreError> {
        atomic_write_json(&self.path, &self.records).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }
}
