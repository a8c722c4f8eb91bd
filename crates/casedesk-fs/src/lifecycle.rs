//! Case folder lifecycle: `absent -> skeleton created -> populated`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use casedesk_model::{CaseIdentity, CaseRecord, FolderConfig};
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{FolderError, FolderOp};
use crate::locks::{CaseKey, CaseLocks};
use crate::marker::{write_marker, Ownership};
use crate::resolver::{FolderPathResolver, ResolvedFolder};
use crate::usage::{folder_usage, FolderUsage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderState {
    Absent,
    /// Folder exists but holds no files.
    SkeletonCreated,
    Populated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedFolder {
    pub path: PathBuf,
    /// `false` when an existing folder was reused.
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StageRemoval {
    NothingToDelete,
    Removed { path: PathBuf, usage: FolderUsage },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CaseDeletion {
    NotFound,
    /// Nothing was removed; `usage` is what a confirmed call would delete.
    NeedsConfirmation { path: PathBuf, usage: FolderUsage },
    Deleted { path: PathBuf, usage: FolderUsage },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Migration {
    NotFound,
    AlreadyCurrent { path: PathBuf },
    Moved { from: PathBuf, to: PathBuf },
}

/// Creates, renames and deletes case folders.
///
/// Every operation holds the case's lock from [`CaseLocks`] for its whole duration; the lock
/// table can be shared between managers with [`FolderLifecycleManager::with_locks`].
#[derive(Debug, Clone)]
pub struct FolderLifecycleManager {
    resolver: FolderPathResolver,
    locks: Arc<CaseLocks>,
}

impl FolderLifecycleManager {
    pub fn new(config: FolderConfig) -> Self {
        Self::with_locks(config, Arc::new(CaseLocks::new()))
    }

    pub fn with_locks(config: FolderConfig, locks: Arc<CaseLocks>) -> Self {
        Self {
            resolver: FolderPathResolver::new(config),
            locks,
        }
    }

    pub fn resolver(&self) -> &FolderPathResolver {
        &self.resolver
    }

    pub fn locks(&self) -> &Arc<CaseLocks> {
        &self.locks
    }

    /// Return the case folder, creating it with its fixed sub-folders if it does not exist.
    ///
    /// A derived name taken by another case's folder gets a `_1`, `_2`, ... suffix, up to
    /// `max_collision_attempts` tries. Unverified fuzzy matches are never adopted.
    pub fn create(&self, record: &CaseRecord) -> Result<CreatedFolder, FolderError> {
        let identity = record.identity();
        let _guard = self.locks.lock(CaseKey::of(&identity));

        if let Some(existing) = self.find_own(&identity)? {
            self.create_skeleton(&existing.path)?;
            return Ok(CreatedFolder {
                path: existing.path,
                created: false,
            });
        }

        let bucket = self.resolver.bucket_dir(&identity.case_type)?;
        fs::create_dir_all(&bucket).map_err(FolderError::io(FolderOp::CreateDir, &bucket))?;

        let base_name = self.resolver.folder_name(&identity);
        let attempts = self.resolver.config().max_collision_attempts;
        for attempt in 0..=attempts {
            let name = if attempt == 0 {
                base_name.clone()
            } else {
                format!("{base_name}_{attempt}")
            };
            let path = bucket.join(&name);
            match fs::create_dir(&path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    log::warn!(
                        "folder name {} is taken by another case, trying a suffix",
                        path.display()
                    );
                    continue;
                }
                Err(err) => return Err(FolderError::io(FolderOp::CreateDir, &path)(err)),
            }

            if let Err(err) = write_marker(&path, &identity).and_then(|()| self.create_skeleton(&path)) {
                let _ = fs::remove_dir_all(&path);
                return Err(err);
            }
            log::info!("created case folder {}", path.display());
            return Ok(CreatedFolder {
                path,
                created: true,
            });
        }

        Err(FolderError::CollisionLimit {
            path: bucket.join(base_name),
            attempts,
        })
    }

    /// Create `progress/<stage>` for the case. Idempotent.
    pub fn ensure_stage_folder(
        &self,
        record: &CaseRecord,
        stage: &str,
    ) -> Result<PathBuf, FolderError> {
        if stage.trim().is_empty() {
            return Err(FolderError::EmptyStageName);
        }
        let identity = record.identity();
        let _guard = self.locks.lock(CaseKey::of(&identity));
        let case_dir = self.require_folder(&identity)?.path;
        let stage_dir = self.resolver.stage_dir(&case_dir, stage);
        fs::create_dir_all(&stage_dir).map_err(FolderError::io(FolderOp::CreateDir, &stage_dir))?;
        log::debug!("stage folder ready: {}", stage_dir.display());
        Ok(stage_dir)
    }

    /// Remove `progress/<stage>` and everything in it.
    pub fn delete_stage_folder(
        &self,
        record: &CaseRecord,
        stage: &str,
    ) -> Result<StageRemoval, FolderError> {
        if stage.trim().is_empty() {
            return Err(FolderError::EmptyStageName);
        }
        let identity = record.identity();
        let _guard = self.locks.lock(CaseKey::of(&identity));
        let Some(case_dir) = self.find_own(&identity)? else {
            return Ok(StageRemoval::NothingToDelete);
        };
        let stage_dir = self.resolver.stage_dir(&case_dir.path, stage);
        if !stage_dir.is_dir() {
            return Ok(StageRemoval::NothingToDelete);
        }

        let usage = folder_usage(&stage_dir)?;
        if !usage.is_empty() {
            log::warn!(
                "deleting stage folder {} with {} file(s), {} byte(s)",
                stage_dir.display(),
                usage.file_count,
                usage.total_bytes
            );
        }
        fs::remove_dir_all(&stage_dir).map_err(FolderError::io(FolderOp::Remove, &stage_dir))?;
        Ok(StageRemoval::Removed {
            path: stage_dir,
            usage,
        })
    }

    /// Move the folder of `record` from `old_case_id` to `new_case_id`.
    ///
    /// Sub-folders whose names contain the old id are renamed too. Fails without touching
    /// anything if the new canonical path exists; a failure midway is rolled back.
    pub fn rename(
        &self,
        record: &CaseRecord,
        old_case_id: &str,
        new_case_id: &str,
    ) -> Result<PathBuf, FolderError> {
        let (old_case_id, new_case_id) = (old_case_id.trim(), new_case_id.trim());
        if new_case_id.is_empty() {
            return Err(FolderError::EmptyCaseId);
        }
        let old = CaseIdentity {
            case_id: old_case_id.to_string(),
            ..record.identity()
        };
        let new = CaseIdentity {
            case_id: new_case_id.to_string(),
            ..record.identity()
        };
        let _guard = self
            .locks
            .lock_all([CaseKey::of(&old), CaseKey::of(&new)]);

        let source = self.require_folder(&old)?.path;
        let target = self.resolver.derive_identity(&new)?;
        if source == target {
            write_marker(&target, &new)?;
            return Ok(target);
        }
        if target.exists() {
            return Err(FolderError::TargetExists { path: target });
        }

        let mut moves = RenameLog::default();
        moves.rename(&source, &target)?;
        if let Err(err) = finish_rename(&mut moves, &target, &old, &new) {
            moves.roll_back();
            return Err(err);
        }

        log::info!("renamed case folder {} -> {}", source.display(), target.display());
        Ok(target)
    }

    /// Move a folder found under an older naming scheme (or by fuzzy scan) to its canonical
    /// name and mark it as owned.
    ///
    /// An unverified fuzzy match is refused with [`FolderError::UnverifiedMatch`].
    pub fn migrate(&self, record: &CaseRecord) -> Result<Migration, FolderError> {
        let identity = record.identity();
        let _guard = self.locks.lock(CaseKey::of(&identity));
        let Some(found) = self.resolver.resolve_identity(&identity)? else {
            return Ok(Migration::NotFound);
        };
        if !found.verified {
            return Err(FolderError::UnverifiedMatch { path: found.path });
        }
        if found.is_current() {
            if Ownership::of(&found.path, &identity)? == Ownership::Unmarked {
                write_marker(&found.path, &identity)?;
            }
            return Ok(Migration::AlreadyCurrent { path: found.path });
        }

        let target = self.resolver.derive_identity(&identity)?;
        if target.exists() {
            return Err(FolderError::TargetExists { path: target });
        }
        let mut moves = RenameLog::default();
        moves.rename(&found.path, &target)?;
        if let Err(err) = write_marker(&target, &identity) {
            moves.roll_back();
            return Err(err);
        }
        log::info!(
            "migrated {:?} folder {} -> {}",
            found.match_kind,
            found.path.display(),
            target.display()
        );
        Ok(Migration::Moved {
            from: found.path,
            to: target,
        })
    }

    /// Delete the whole case folder. Unconfirmed calls only report what would be removed.
    ///
    /// An unverified fuzzy match counts as no folder.
    pub fn delete_case(
        &self,
        record: &CaseRecord,
        confirmed: bool,
    ) -> Result<CaseDeletion, FolderError> {
        let identity = record.identity();
        let _guard = self.locks.lock(CaseKey::of(&identity));
        let Some(found) = self.find_own(&identity)? else {
            return Ok(CaseDeletion::NotFound);
        };
        let usage = folder_usage(&found.path)?;
        if !confirmed {
            return Ok(CaseDeletion::NeedsConfirmation {
                path: found.path,
                usage,
            });
        }

        fs::remove_dir_all(&found.path).map_err(FolderError::io(FolderOp::Remove, &found.path))?;
        log::info!(
            "deleted case folder {} ({} file(s), {} byte(s))",
            found.path.display(),
            usage.file_count,
            usage.total_bytes
        );
        Ok(CaseDeletion::Deleted {
            path: found.path,
            usage,
        })
    }

    pub fn state(&self, record: &CaseRecord) -> Result<FolderState, FolderError> {
        Ok(match self.usage(record)? {
            None => FolderState::Absent,
            Some((_, usage)) if usage.is_empty() => FolderState::SkeletonCreated,
            Some(_) => FolderState::Populated,
        })
    }

    pub fn usage(
        &self,
        record: &CaseRecord,
    ) -> Result<Option<(ResolvedFolder, FolderUsage)>, FolderError> {
        let Some(found) = self.find_own(&record.identity())? else {
            return Ok(None);
        };
        let usage = folder_usage(&found.path)?;
        Ok(Some((found, usage)))
    }

    /// The case's own folder: a resolution hit, unless it is an unverified fuzzy match.
    fn find_own(&self, identity: &CaseIdentity) -> Result<Option<ResolvedFolder>, FolderError> {
        Ok(match self.resolver.resolve_identity(identity)? {
            Some(found) if !found.verified => {
                log::warn!(
                    "not treating {} as the folder of case `{}` ({}): name matches the client only",
                    found.path.display(),
                    identity.case_id,
                    identity.client
                );
                None
            }
            found => found,
        })
    }

    fn require_folder(&self, identity: &CaseIdentity) -> Result<ResolvedFolder, FolderError> {
        self.find_own(identity)?
            .ok_or_else(|| FolderError::NotFound {
                case_id: identity.case_id.clone(),
                client: identity.client.clone(),
            })
    }

    fn create_skeleton(&self, case_dir: &Path) -> Result<(), FolderError> {
        for dir in [
            self.resolver.info_dir(case_dir),
            self.resolver.progress_dir(case_dir),
            self.resolver.documents_dir(case_dir),
        ] {
            fs::create_dir_all(&dir).map_err(FolderError::io(FolderOp::CreateDir, &dir))?;
        }
        Ok(())
    }
}

/// Directory renames performed so far, undone in reverse on failure.
#[derive(Debug, Default)]
struct RenameLog {
    done: Vec<(PathBuf, PathBuf)>,
}

impl RenameLog {
    fn rename(&mut self, from: &Path, to: &Path) -> Result<(), FolderError> {
        fs::rename(from, to).map_err(FolderError::io(FolderOp::Rename, from))?;
        self.done.push((from.to_path_buf(), to.to_path_buf()));
        Ok(())
    }

    fn roll_back(self) {
        for (from, to) in self.done.into_iter().rev() {
            if let Err(err) = fs::rename(&to, &from) {
                log::error!(
                    "could not roll back rename {} -> {}: {err}",
                    from.display(),
                    to.display()
                );
            }
        }
    }
}

/// Rename id-bearing sub-folders of the moved case folder, then re-mark it.
fn finish_rename(
    moves: &mut RenameLog,
    case_dir: &Path,
    old: &CaseIdentity,
    new: &CaseIdentity,
) -> Result<(), FolderError> {
    if !old.case_id.is_empty() {
        for (from, to) in inner_renames(case_dir, &old.case_id, &new.case_id)? {
            moves.rename(&from, &to)?;
        }
    }
    write_marker(case_dir, new)
}

/// Sub-directories of `root` whose names embed `old_id`, deepest first, with their new paths.
fn inner_renames(
    root: &Path,
    old_id: &str,
    new_id: &str,
) -> Result<Vec<(PathBuf, PathBuf)>, FolderError> {
    let mut renames = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).contents_first(true) {
        let entry = entry.map_err(|err| FolderError::Io {
            op: FolderOp::ReadDir,
            path: err.path().unwrap_or(root).to_path_buf(),
            source: io::Error::from(err),
        })?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if name.contains(old_id) {
            let renamed = name.replace(old_id, new_id);
            renames.push((entry.path().to_path_buf(), entry.path().with_file_name(renamed)));
        }
    }
    Ok(renames)
}
