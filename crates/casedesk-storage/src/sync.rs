use casedesk_fs::{CreatedFolder, FolderError, FolderLifecycleManager};
use casedesk_model::{CaseIdentity, CaseRecord};

use crate::observer::{CaseObserver, ObserverError};

/// Keeps case folders in step with the record store.
#[derive(Debug, Clone)]
pub struct FolderSync {
    manager: FolderLifecycleManager,
}

impl FolderSync {
    pub fn new(manager: FolderLifecycleManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &FolderLifecycleManager {
        &self.manager
    }

    /// Create the case folder (if needed) plus one folder per recorded progress stage.
    pub fn sync_record(&self, record: &CaseRecord) -> Result<CreatedFolder, FolderError> {
        let created = self.manager.create(record)?;
        for (stage, _) in record.stages_chronological() {
            self.manager.ensure_stage_folder(record, stage)?;
        }
        Ok(created)
    }
}

impl CaseObserver for FolderSync {
    fn on_identity_changed(
        &self,
        record: &CaseRecord,
        old: &CaseIdentity,
        new: &CaseIdentity,
    ) -> Result<(), ObserverError> {
        if old.case_id == new.case_id {
            return Ok(());
        }
        match self.manager.rename(record, &old.case_id, &new.case_id) {
            Ok(_) => Ok(()),
            // A case without a folder has nothing to move.
            Err(FolderError::NotFound { .. }) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn before_case_deleted(&self, record: &CaseRecord) -> Result<(), ObserverError> {
        self.manager.delete_case(record, false)?;
        Ok(())
    }

    fn on_case_deleted(&self, record: &CaseRecord) -> Result<(), ObserverError> {
        self.manager.delete_case(record, true)?;
        Ok(())
    }
}
