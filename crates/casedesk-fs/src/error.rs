use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// The filesystem step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderOp {
    CreateDir,
    ReadDir,
    Rename,
    Remove,
    WriteMarker,
    ReadMarker,
}

impl fmt::Display for FolderOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FolderOp::CreateDir => "create directory",
            FolderOp::ReadDir => "read directory",
            FolderOp::Rename => "rename",
            FolderOp::Remove => "remove",
            FolderOp::WriteMarker => "write case marker in",
            FolderOp::ReadMarker => "read case marker in",
        })
    }
}

#[derive(Debug, Error)]
pub enum FolderError {
    #[error("failed to {op} {path}")]
    Io {
        op: FolderOp,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no bucket directory configured for case type `{case_type}`")]
    UnknownCaseType { case_type: String },
    #[error("no folder exists for case `{case_id}` ({client})")]
    NotFound { case_id: String, client: String },
    #[error("{path} already exists")]
    TargetExists { path: PathBuf },
    #[error("{path} matches the case only by client name and carries no case marker")]
    UnverifiedMatch { path: PathBuf },
    #[error("no free folder name next to {path} after {attempts} attempts")]
    CollisionLimit { path: PathBuf, attempts: u32 },
    #[error("stage name must not be empty")]
    EmptyStageName,
    #[error("case id must not be empty")]
    EmptyCaseId,
}

impl FolderError {
    pub(crate) fn io(op: FolderOp, path: &Path) -> impl FnOnce(io::Error) -> FolderError + '_ {
        move |source| FolderError::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    /// The path the failing operation was attempted on, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            FolderError::Io { path, .. }
            | FolderError::TargetExists { path }
            | FolderError::UnverifiedMatch { path }
            | FolderError::CollisionLimit { path, .. } => Some(path),
            _ => None,
        }
    }
}
