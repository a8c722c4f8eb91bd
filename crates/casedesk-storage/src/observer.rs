use casedesk_model::{CaseIdentity, CaseRecord};

pub type ObserverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Hooks run by the record store around a change.
///
/// An error from a hook that runs before persisting vetoes the change: the store leaves its
/// records untouched and returns [`crate::StoreError::Observer`].
pub trait CaseObserver: Send + Sync {
    /// `record` still carries the `old` identity.
    fn on_identity_changed(
        &self,
        record: &CaseRecord,
        old: &CaseIdentity,
        new: &CaseIdentity,
    ) -> Result<(), ObserverError> {
        let _ = (record, old, new);
        Ok(())
    }

    /// Runs before the removal is persisted; an error vetoes it.
    fn before_case_deleted(&self, record: &CaseRecord) -> Result<(), ObserverError> {
        let _ = record;
        Ok(())
    }

    /// Runs once the removal is persisted. Errors are logged; the record stays deleted.
    fn on_case_deleted(&self, record: &CaseRecord) -> Result<(), ObserverError> {
        let _ = record;
        Ok(())
    }
}
