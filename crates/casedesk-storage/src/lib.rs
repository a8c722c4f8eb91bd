//! Persistence of case records and the glue between records and case folders.
//!
//! [`JsonRecordStore`] owns the record list and notifies [`CaseObserver`]s before identity
//! changes take effect, and around deletions; [`FolderSync`] is the observer that keeps case folders in
//! step. [`import_workbook`] runs a spreadsheet through analysis, id assignment, persistence and
//! folder creation.

mod error;
mod id;
mod import;
mod observer;
mod store;
mod sync;

pub use error::StoreError;
pub use id::{roc_year, CaseIdGenerator};
pub use import::{import_workbook, ImportSummary};
pub use observer::{CaseObserver, ObserverError};
pub use store::{CaseRecordStore, JsonRecordStore};
pub use sync::FolderSync;
