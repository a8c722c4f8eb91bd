//! The `.case.json` ownership marker.
//!
//! A folder whose marker names another case is never returned by resolution and never reused by
//! creation; that is how "same derived name, different case" collisions are told apart from the
//! case's own folder.

use std::fs;
use std::io;
use std::path::Path;

use casedesk_model::CaseIdentity;

use crate::atomic::atomic_write_json;
use crate::error::{FolderError, FolderOp};

pub const MARKER_FILE_NAME: &str = ".case.json";

/// How a folder on disk relates to a case identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// No marker (legacy or hand-made folder), or an unreadable one.
    Unmarked,
    Owned,
    Foreign,
}

impl Ownership {
    pub fn of(dir: &Path, identity: &CaseIdentity) -> Result<Ownership, FolderError> {
        Ok(match read_marker(dir)? {
            None => Ownership::Unmarked,
            Some(marker) if same_case(&marker, identity) => Ownership::Owned,
            Some(_) => Ownership::Foreign,
        })
    }
}

/// Case ids decide when both sides have one; otherwise the client does.
fn same_case(marker: &CaseIdentity, identity: &CaseIdentity) -> bool {
    if marker.case_type != identity.case_type {
        return false;
    }
    if !marker.case_id.is_empty() && !identity.case_id.is_empty() {
        marker.case_id == identity.case_id
    } else {
        marker.client == identity.client
    }
}

pub fn read_marker(dir: &Path) -> Result<Option<CaseIdentity>, FolderError> {
    let path = dir.join(MARKER_FILE_NAME);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(FolderError::io(FolderOp::ReadMarker, dir)(err)),
    };
    match serde_json::from_slice(&bytes) {
        Ok(identity) => Ok(Some(identity)),
        Err(err) => {
            log::warn!("ignoring unreadable case marker {}: {err}", path.display());
            Ok(None)
        }
    }
}

pub fn write_marker(dir: &Path, identity: &CaseIdentity) -> Result<(), FolderError> {
    atomic_write_json(dir.join(MARKER_FILE_NAME), identity)
        .map_err(FolderError::io(FolderOp::WriteMarker, dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(case_id: &str, client: &str) -> CaseIdentity {
        CaseIdentity {
            case_type: "civil".to_string(),
            case_id: case_id.to_string(),
            client: client.to_string(),
        }
    }

    #[test]
    fn ownership_follows_marker_contents() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let dir = tmp.path();
        assert_eq!(
            Ownership::of(dir, &identity("113001", "張三")).expect("ownership"),
            Ownership::Unmarked
        );

        write_marker(dir, &identity("113001", "張三")).expect("write marker");
        let check = |id: &str, client: &str| Ownership::of(dir, &identity(id, client)).expect("ownership");
        assert_eq!(check("113001", "張三"), Ownership::Owned);
        // Client edits do not orphan the folder while the id is stable.
        assert_eq!(check("113001", "張三豐"), Ownership::Owned);
        assert_eq!(check("113002", "張三"), Ownership::Foreign);
        // Without an id on one side, the client decides.
        assert_eq!(check("", "張三"), Ownership::Owned);
        assert_eq!(check("", "李四"), Ownership::Foreign);
    }

    #[test]
    fn corrupt_marker_reads_as_unmarked() {
        let tmp = tempfile::tempdir().expect("temp dir");
        std::fs::write(tmp.path().join(MARKER_FILE_NAME), b"{not json").expect("write");
        assert_eq!(read_marker(tmp.path()).expect("read"), None);
    }
}
