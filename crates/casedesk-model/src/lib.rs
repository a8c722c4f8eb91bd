//! `casedesk-model` defines the value types shared by the spreadsheet analyzer and the
//! case-folder synchronizer.
//!
//! The crate is intentionally free of I/O (other than loading a configuration file) so it can
//! be reused by:
//! - the heuristic sheet analyzer (`casedesk-sheet`)
//! - the folder lifecycle layer (`casedesk-fs`)
//! - the record store and importer (`casedesk-storage`)

mod clean;
pub mod config;
mod dictionary;
mod record;
mod serde_defaults;

pub use clean::{clean_text, is_null_token, normalize_label};
pub use config::{
    AnalyzerConfig, CaseTypeEntry, CasedeskConfig, ConfigError, DictionaryConfig, FolderConfig,
};
pub use dictionary::{CanonicalField, FieldDictionary, UNKNOWN_CASE_TYPE};
pub use record::{CaseIdentity, CaseRecord, RecordError, DEFAULT_PROGRESS};
