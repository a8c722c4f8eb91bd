use std::io;
use std::path::Path;

use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{FolderError, FolderOp};
use crate::marker::MARKER_FILE_NAME;

/// What a case folder holds, excluding its ownership marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FolderUsage {
    pub file_count: u64,
    pub dir_count: u64,
    pub total_bytes: u64,
}

impl FolderUsage {
    pub fn is_empty(&self) -> bool {
        self.file_count == 0
    }
}

/// Walk everything below `root` (not following symlinks).
pub fn folder_usage(root: &Path) -> Result<FolderUsage, FolderError> {
    let mut usage = FolderUsage::default();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(root).to_path_buf();
            FolderError::Io {
                op: FolderOp::ReadDir,
                path,
                source: io::Error::from(err),
            }
        })?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            usage.dir_count += 1;
        } else if entry.depth() == 1 && entry.file_name() == MARKER_FILE_NAME {
            continue;
        } else {
            usage.file_count += 1;
            usage.total_bytes += entry
                .metadata()
                .map(|meta| meta.len())
                .unwrap_or_default();
        }
    }
    Ok(usage)
}
