use std::path::PathBuf;

use casedesk_model::RecordError;
use casedesk_sheet::WorkbookError;
use thiserror::Error;

use crate::observer::ObserverError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read record store {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("record store {path} is not valid JSON")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write record store {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("case id `{case_id}` is already used by another record")]
    DuplicateCaseId { case_id: String },
    #[error("no record with case id `{case_id}`")]
    NotFound { case_id: String },
    #[error("record has no case id")]
    MissingCaseId,
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Workbook(#[from] WorkbookError),
    #[error("case observer rejected the change")]
    Observer(#[source] ObserverError),
}
