//! Case folder path derivation and lookup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use casedesk_model::{CaseIdentity, CaseRecord, FolderConfig};
use serde::Serialize;

use crate::error::{FolderError, FolderOp};
use crate::marker::Ownership;
use crate::sanitize::{folder_name, sanitize};

/// Folder naming conventions, newest first.
///
/// Lookup tries them in [`NamingScheme::LOOKUP_ORDER`]; new folders always use the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingScheme {
    /// `<case_id>_<client>`.
    CaseIdPrefixed,
    /// `<client>`, used before case ids were part of folder names.
    ClientOnly,
}

impl NamingScheme {
    pub const LOOKUP_ORDER: [NamingScheme; 2] =
        [NamingScheme::CaseIdPrefixed, NamingScheme::ClientOnly];

    pub fn folder_name(self, identity: &CaseIdentity, max_len: usize) -> String {
        match self {
            NamingScheme::CaseIdPrefixed => {
                folder_name(&identity.case_id, &identity.client, max_len)
            }
            NamingScheme::ClientOnly => sanitize(&identity.client, max_len),
        }
    }
}

/// How a resolved folder was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// The derived name.
    Canonical,
    /// The derived name plus a collision suffix (`_1`, `_2`, ...), owned by this case.
    Suffixed,
    /// An older naming scheme.
    Legacy,
    /// A bucket entry whose name contains the case id or client.
    Fuzzy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFolder {
    pub path: PathBuf,
    pub match_kind: MatchKind,
    /// `false` for a fuzzy hit on an unmarked folder whose name lacks the case id as a separate
    /// token, e.g. `張三豐` for client `張三`. Lifecycle operations treat such folders as absent.
    pub verified: bool,
}

impl ResolvedFolder {
    /// Whether the folder sits at a name the current naming scheme would produce.
    pub fn is_current(&self) -> bool {
        matches!(self.match_kind, MatchKind::Canonical | MatchKind::Suffixed)
    }
}

#[derive(Debug, Clone)]
pub struct FolderPathResolver {
    config: FolderConfig,
}

impl FolderPathResolver {
    pub fn new(config: FolderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FolderConfig {
        &self.config
    }

    pub fn bucket_dir(&self, case_type: &str) -> Result<PathBuf, FolderError> {
        let bucket = self
            .config
            .buckets
            .get(case_type)
            .ok_or_else(|| FolderError::UnknownCaseType {
                case_type: case_type.to_string(),
            })?;
        Ok(self
            .config
            .base_dir
            .join(sanitize(bucket, self.config.max_name_len)))
    }

    pub fn folder_name(&self, identity: &CaseIdentity) -> String {
        NamingScheme::CaseIdPrefixed.folder_name(identity, self.config.max_name_len)
    }

    /// Canonical folder path for `record`. Pure: never touches the filesystem.
    pub fn derive(&self, record: &CaseRecord) -> Result<PathBuf, FolderError> {
        self.derive_identity(&record.identity())
    }

    pub fn derive_identity(&self, identity: &CaseIdentity) -> Result<PathBuf, FolderError> {
        Ok(self
            .bucket_dir(&identity.case_type)?
            .join(self.folder_name(identity)))
    }

    /// Find the existing folder of `record`, or `None` if it has not been created yet.
    pub fn resolve(&self, record: &CaseRecord) -> Result<Option<ResolvedFolder>, FolderError> {
        self.resolve_identity(&record.identity())
    }

    /// Lookup order, first hit wins:
    /// 1. the derived name, unless its marker names another case
    /// 2. the derived name with a collision suffix, if its marker names this case
    /// 3. older naming schemes, unless their marker names another case
    /// 4. any bucket entry whose name contains the case id or client (case-insensitive),
    ///    unless its marker names another case; verified hits win over unverified ones
    pub fn resolve_identity(
        &self,
        identity: &CaseIdentity,
    ) -> Result<Option<ResolvedFolder>, FolderError> {
        let bucket = self.bucket_dir(&identity.case_type)?;
        let canonical_name = self.folder_name(identity);
        let canonical = bucket.join(&canonical_name);
        if canonical.is_dir() && Ownership::of(&canonical, identity)? != Ownership::Foreign {
            return Ok(Some(found(canonical, MatchKind::Canonical)));
        }

        let entries = bucket_entries(&bucket)?;
        for path in suffixed_candidates(&entries, &canonical_name) {
            if Ownership::of(&path, identity)? == Ownership::Owned {
                return Ok(Some(found(path, MatchKind::Suffixed)));
            }
        }

        for scheme in &NamingScheme::LOOKUP_ORDER[1..] {
            let name = scheme.folder_name(identity, self.config.max_name_len);
            if name == canonical_name {
                continue;
            }
            let path = bucket.join(name);
            if path.is_dir() && Ownership::of(&path, identity)? != Ownership::Foreign {
                log::debug!("resolved {} through {scheme:?} naming", path.display());
                return Ok(Some(found(path, MatchKind::Legacy)));
            }
        }

        let (id_needle, client_needle) = fuzzy_needles(identity, self.config.max_name_len);
        let mut unverified = None;
        for (name, path) in &entries {
            let name = name.to_lowercase();
            let id_hit = id_needle.as_deref().filter(|id| name.contains(id));
            if id_hit.is_none() && !name.contains(client_needle.as_str()) {
                continue;
            }
            let verified = match Ownership::of(path, identity)? {
                Ownership::Foreign => continue,
                Ownership::Owned => true,
                Ownership::Unmarked => id_hit.is_some_and(|id| contains_token(&name, id)),
            };
            if verified {
                log::debug!("resolved {} by fuzzy folder scan", path.display());
                return Ok(Some(found(path.clone(), MatchKind::Fuzzy)));
            }
            unverified.get_or_insert_with(|| path.clone());
        }
        if let Some(path) = unverified {
            log::debug!("unverified fuzzy match {}", path.display());
            return Ok(Some(ResolvedFolder {
                path,
                match_kind: MatchKind::Fuzzy,
                verified: false,
            }));
        }
        Ok(None)
    }

    pub fn info_dir(&self, case_dir: &Path) -> PathBuf {
        case_dir.join(&self.config.info_dir)
    }

    pub fn progress_dir(&self, case_dir: &Path) -> PathBuf {
        case_dir.join(&self.config.progress_dir)
    }

    pub fn documents_dir(&self, case_dir: &Path) -> PathBuf {
        case_dir.join(&self.config.documents_dir)
    }

    pub fn stage_dir(&self, case_dir: &Path, stage: &str) -> PathBuf {
        self.progress_dir(case_dir)
            .join(sanitize(stage, self.config.max_name_len))
    }
}

fn found(path: PathBuf, match_kind: MatchKind) -> ResolvedFolder {
    ResolvedFolder {
        path,
        match_kind,
        verified: true,
    }
}

/// Sub-directories of `bucket` sorted by name, hidden entries skipped. A missing bucket is empty.
fn bucket_entries(bucket: &Path) -> Result<Vec<(String, PathBuf)>, FolderError> {
    let read_dir = match fs::read_dir(bucket) {
        Ok(read_dir) => read_dir,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(FolderError::io(FolderOp::ReadDir, bucket)(err)),
    };

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(FolderError::io(FolderOp::ReadDir, bucket))?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name.starts_with('.') || !entry.path().is_dir() {
            continue;
        }
        entries.push((name, entry.path()));
    }
    entries.sort();
    Ok(entries)
}

/// `<base>_<n>` entries in ascending `n`.
fn suffixed_candidates(entries: &[(String, PathBuf)], base: &str) -> Vec<PathBuf> {
    let prefix = format!("{base}_");
    let mut numbered: Vec<(u32, &PathBuf)> = entries
        .iter()
        .filter_map(|(name, path)| {
            let n = name.strip_prefix(&prefix)?.parse::<u32>().ok()?;
            Some((n, path))
        })
        .collect();
    numbered.sort();
    numbered.into_iter().map(|(_, path)| path.clone()).collect()
}

/// Lower-cased sanitized case id (if any) and client.
fn fuzzy_needles(identity: &CaseIdentity, max_len: usize) -> (Option<String>, String) {
    let id = (!identity.case_id.trim().is_empty())
        .then(|| sanitize(&identity.case_id, max_len).to_lowercase());
    (id, sanitize(&identity.client, max_len).to_lowercase())
}

/// Whether `needle` occurs in `haystack` with no ASCII letter or digit directly on either side.
fn contains_token(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(|c| c.is_ascii_alphanumeric())
            && !after.is_some_and(|c| c.is_ascii_alphanumeric())
    })
}
