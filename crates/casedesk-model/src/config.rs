//! Runtime configuration.
//!
//! Configuration is a single JSON document; every key is optional and falls back to the
//! built-in defaults, so an empty object (`{}`) is a valid configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dictionary::{CanonicalField, FieldDictionary};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown canonical field `{name}` in dictionary extension")]
    UnknownField { name: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CasedeskConfig {
    pub analyzer: AnalyzerConfig,
    pub dictionary: DictionaryConfig,
    pub folders: FolderConfig,
}

impl CasedeskConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Like [`CasedeskConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// The built-in dictionary extended with the configured keywords and case types.
    pub fn field_dictionary(&self) -> Result<FieldDictionary, ConfigError> {
        self.dictionary.build()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Number of leading rows considered when looking for the header row.
    pub max_header_scan_rows: usize,
    /// Minimum keyword score a row needs to be accepted as the header.
    pub header_min_score: u32,
    /// Joins the values of merged source columns.
    pub merge_separator: String,
    /// Fields that may be assembled from several columns.
    pub merge_fields: Vec<CanonicalField>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_header_scan_rows: 15,
            header_min_score: 2,
            merge_separator: "-".to_string(),
            merge_fields: vec![CanonicalField::CaseNumber],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryConfig {
    /// Canonical field name -> additional keywords.
    pub extra_field_keywords: BTreeMap<String, Vec<String>>,
    /// Additional case types (or extra keywords for existing ones). Applied in list order.
    pub extra_case_types: Vec<CaseTypeEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseTypeEntry {
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl DictionaryConfig {
    pub fn build(&self) -> Result<FieldDictionary, ConfigError> {
        let mut dict = FieldDictionary::builtin();
        for (name, keywords) in &self.extra_field_keywords {
            let field = CanonicalField::from_name(name)
                .ok_or_else(|| ConfigError::UnknownField { name: name.clone() })?;
            for keyword in keywords {
                dict.insert_field_keyword(field, keyword);
            }
        }
        for entry in &self.extra_case_types {
            dict.insert_case_type(&entry.name, entry.keywords.iter().map(String::as_str));
        }
        Ok(dict)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderConfig {
    /// Root of the case folder tree.
    pub base_dir: PathBuf,
    /// Case type -> bucket directory name under `base_dir`.
    pub buckets: BTreeMap<String, String>,
    pub info_dir: String,
    pub progress_dir: String,
    pub documents_dir: String,
    /// Maximum folder name length in characters.
    pub max_name_len: usize,
    /// Numeric suffixes tried before giving up on a name collision.
    pub max_collision_attempts: u32,
}

impl Default for FolderConfig {
    fn default() -> Self {
        let buckets = [
            ("civil", "civil_cases"),
            ("criminal", "criminal_cases"),
            ("administrative", "administrative_cases"),
            ("family", "family_cases"),
        ]
        .into_iter()
        .map(|(case_type, dir)| (case_type.to_string(), dir.to_string()))
        .collect();

        Self {
            base_dir: PathBuf::from("case_data"),
            buckets,
            info_dir: "案件資訊".to_string(),
            progress_dir: "進度追蹤".to_string(),
            documents_dir: "相關文件".to_string(),
            max_name_len: 100,
            max_collision_attempts: 100,
        }
    }
}

impl FolderConfig {
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }
}
