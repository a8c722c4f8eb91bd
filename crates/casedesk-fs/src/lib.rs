//! Case folder management on the local filesystem.
//!
//! Every case gets one leaf folder under a per-case-type bucket directory:
//!
//! ```text
//! <base_dir>/<bucket>/<case_id>_<client>/
//!     .case.json        ownership marker
//!     <info_dir>/
//!     <progress_dir>/<stage>/...
//!     <documents_dir>/
//! ```
//!
//! [`FolderPathResolver`] computes and looks up folder paths without mutating anything;
//! [`FolderLifecycleManager`] creates, renames and deletes them, serialized per case through
//! [`CaseLocks`].

mod atomic;
mod error;
mod lifecycle;
mod locks;
mod marker;
mod resolver;
mod sanitize;
mod usage;

pub use atomic::atomic_write_json;
pub use error::{FolderError, FolderOp};
pub use lifecycle::{
    CaseDeletion, CreatedFolder, FolderLifecycleManager, FolderState, Migration, StageRemoval,
};
pub use locks::{CaseGuard, CaseKey, CaseLocks};
pub use marker::{read_marker, write_marker, Ownership, MARKER_FILE_NAME};
pub use resolver::{FolderPathResolver, MatchKind, NamingScheme, ResolvedFolder};
pub use sanitize::{folder_name, sanitize, FALLBACK_NAME, MIN_NAME_LEN, RESERVED_CHARS};
pub use usage::{folder_usage, FolderUsage};
