//! Per-case serialization of folder operations.
//!
//! Operations on the same case (create, rename, delete, stage edits) must not interleave; on
//! different cases they run freely. A guard may cover several keys (a rename holds both the old
//! and the new identity) and acquires them all at once, so two renames crossing each other cannot
//! deadlock.

use std::collections::BTreeSet;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use casedesk_model::CaseIdentity;

/// Lock key: case type plus case id, or plus client while no id is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaseKey {
    pub case_type: String,
    pub key: String,
}

impl CaseKey {
    pub fn new(case_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            case_type: case_type.into(),
            key: key.into(),
        }
    }

    pub fn of(identity: &CaseIdentity) -> Self {
        let key = if identity.case_id.is_empty() {
            &identity.client
        } else {
            &identity.case_id
        };
        Self::new(identity.case_type.clone(), key.clone())
    }
}

#[derive(Debug, Default)]
pub struct CaseLocks {
    held: Mutex<BTreeSet<CaseKey>>,
    released: Condvar,
}

impl CaseLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self, key: CaseKey) -> CaseGuard<'_> {
        self.lock_all([key])
    }

    /// Block until every key is free, then hold them all.
    pub fn lock_all(&self, keys: impl IntoIterator<Item = CaseKey>) -> CaseGuard<'_> {
        let keys: BTreeSet<CaseKey> = keys.into_iter().collect();
        let mut held = self.held();
        while keys.iter().any(|key| held.contains(key)) {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        held.extend(keys.iter().cloned());
        CaseGuard { locks: self, keys }
    }

    pub fn is_locked(&self, key: &CaseKey) -> bool {
        self.held().contains(key)
    }

    fn held(&self) -> MutexGuard<'_, BTreeSet<CaseKey>> {
        // The set stays consistent even if a holder panicked.
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases its keys on drop.
#[derive(Debug)]
pub struct CaseGuard<'a> {
    locks: &'a CaseLocks,
    keys: BTreeSet<CaseKey>,
}

impl CaseGuard<'_> {
    pub fn keys(&self) -> impl Iterator<Item = &CaseKey> + '_ {
        self.keys.iter()
    }
}

impl Drop for CaseGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.locks.held();
        for key in &self.keys {
            held.remove(key);
        }
        drop(held);
        self.locks.released.notify_all();
    }
}
