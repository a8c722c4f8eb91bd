use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clean::clean_text;
use crate::dictionary::CanonicalField;

/// Progress value of a record with no dated stage.
pub const DEFAULT_PROGRESS: &str = "pending";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("a case record requires a non-empty client")]
    MissingClient,
    #[error("stage name must not be empty")]
    EmptyStageName,
}

/// The identity fields a case folder is derived from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CaseIdentity {
    pub case_type: String,
    pub case_id: String,
    pub client: String,
}

/// One canonical case record.
///
/// `case_id` is empty until the record store assigns one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    #[serde(default)]
    pub case_id: String,
    pub case_type: String,
    pub client: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub court: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lawyer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_affairs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opposing_party: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division: Option<String>,
    #[serde(default = "crate::serde_defaults::default_progress")]
    pub progress: String,
    /// Stage name -> date (`YYYY-MM-DD` by convention, kept as typed).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub progress_stages: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub progress_notes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub progress_times: BTreeMap<String, String>,
    #[serde(default = "crate::serde_defaults::now_utc")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "crate::serde_defaults::now_utc")]
    pub updated_at: DateTime<Utc>,
}

impl CaseRecord {
    /// Create a record with an unassigned case id.
    pub fn new(case_type: impl Into<String>, client: &str) -> Result<Self, RecordError> {
        let client = clean_text(client).ok_or(RecordError::MissingClient)?;
        let now = Utc::now();
        Ok(Self {
            case_id: String::new(),
            case_type: case_type.into(),
            client,
            case_reason: None,
            case_number: None,
            court: None,
            lawyer: None,
            legal_affairs: None,
            opposing_party: None,
            division: None,
            progress: DEFAULT_PROGRESS.to_string(),
            progress_stages: BTreeMap::new(),
            progress_notes: BTreeMap::new(),
            progress_times: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_case_id(mut self, case_id: impl Into<String>) -> Self {
        self.case_id = case_id.into();
        self
    }

    pub fn has_case_id(&self) -> bool {
        !self.case_id.trim().is_empty()
    }

    pub fn identity(&self) -> CaseIdentity {
        CaseIdentity {
            case_type: self.case_type.clone(),
            case_id: self.case_id.clone(),
            client: self.client.clone(),
        }
    }

    pub fn field(&self, field: CanonicalField) -> Option<&str> {
        match field {
            CanonicalField::Client => Some(self.client.as_str()),
            CanonicalField::CaseId => Some(self.case_id.as_str()).filter(|id| !id.is_empty()),
            CanonicalField::CaseReason => self.case_reason.as_deref(),
            CanonicalField::CaseNumber => self.case_number.as_deref(),
            CanonicalField::Court => self.court.as_deref(),
            CanonicalField::Lawyer => self.lawyer.as_deref(),
            CanonicalField::LegalAffairs => self.legal_affairs.as_deref(),
            CanonicalField::OpposingParty => self.opposing_party.as_deref(),
            CanonicalField::Division => self.division.as_deref(),
        }
    }

    /// Set an already-cleaned optional field.
    ///
    /// Setting `client` to `None` is rejected; the mandatory field cannot become absent.
    pub fn set_field(
        &mut self,
        field: CanonicalField,
        value: Option<String>,
    ) -> Result<(), RecordError> {
        match field {
            CanonicalField::Client => {
                self.client = value
                    .filter(|v| !v.trim().is_empty())
                    .ok_or(RecordError::MissingClient)?;
            }
            CanonicalField::CaseId => self.case_id = value.unwrap_or_default(),
            CanonicalField::CaseReason => self.case_reason = value,
            CanonicalField::CaseNumber => self.case_number = value,
            CanonicalField::Court => self.court = value,
            CanonicalField::Lawyer => self.lawyer = value,
            CanonicalField::LegalAffairs => self.legal_affairs = value,
            CanonicalField::OpposingParty => self.opposing_party = value,
            CanonicalField::Division => self.division = value,
        }
        Ok(())
    }

    /// Record (or overwrite) a progress stage.
    pub fn set_stage(
        &mut self,
        stage: &str,
        date: &str,
        note: Option<&str>,
        time: Option<&str>,
    ) -> Result<(), RecordError> {
        let stage = clean_text(stage).ok_or(RecordError::EmptyStageName)?;
        self.progress_stages
            .insert(stage.clone(), date.trim().to_string());
        match note.and_then(clean_text) {
            Some(note) => self.progress_notes.insert(stage.clone(), note),
            None => self.progress_notes.remove(&stage),
        };
        match time.and_then(clean_text) {
            Some(time) => self.progress_times.insert(stage, time),
            None => self.progress_times.remove(&stage),
        };
        self.refresh_progress();
        Ok(())
    }

    /// Remove a stage and its note/time. Returns `false` if the stage was not recorded.
    pub fn remove_stage(&mut self, stage: &str) -> bool {
        let stage = stage.trim();
        let removed = self.progress_stages.remove(stage).is_some();
        self.progress_notes.remove(stage);
        self.progress_times.remove(stage);
        if removed {
            self.refresh_progress();
        }
        removed
    }

    /// Stages ordered by (date, time, name).
    pub fn stages_chronological(&self) -> Vec<(&str, &str)> {
        let mut stages: Vec<_> = self
            .progress_stages
            .iter()
            .map(|(name, date)| (name.as_str(), date.as_str()))
            .collect();
        stages.sort_by(|a, b| {
            let time_a = self.progress_times.get(a.0).map(String::as_str);
            let time_b = self.progress_times.get(b.0).map(String::as_str);
            (a.1, time_a, a.0).cmp(&(b.1, time_b, b.0))
        });
        stages
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn refresh_progress(&mut self) {
        self.progress = self
            .stages_chronological()
            .last()
            .map(|(name, _)| name.to_string())
            .unwrap_or_else(|| DEFAULT_PROGRESS.to_string());
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_defaults_to_pending_without_case_id() {
        let record = CaseRecord::new("civil", " 張三 ").expect("record");
        assert_eq!(record.client, "張三");
        assert_eq!(record.progress, DEFAULT_PROGRESS);
        assert!(!record.has_case_id());
        assert_eq!(record.field(CanonicalField::CaseId), None);
    }

    #[test]
    fn rejects_blank_client() {
        assert_eq!(
            CaseRecord::new("civil", "nan").unwrap_err(),
            RecordError::MissingClient
        );
        let mut record = CaseRecord::new("civil", "張三").expect("record");
        assert_eq!(
            record.set_field(CanonicalField::Client, None),
            Err(RecordError::MissingClient)
        );
        assert_eq!(record.client, "張三");
    }

    #[test]
    fn progress_follows_latest_dated_stage() {
        let mut record = CaseRecord::new("civil", "張三").expect("record");
        record
            .set_stage("開庭", "2024-05-02", Some("第一次"), Some("09:30"))
            .expect("stage");
        record
            .set_stage("起訴", "2024-03-01", None, None)
            .expect("stage");
        assert_eq!(record.progress, "開庭");
        assert_eq!(
            record.stages_chronological(),
            vec![("起訴", "2024-03-01"), ("開庭", "2024-05-02")]
        );

        assert!(record.remove_stage("開庭"));
        assert_eq!(record.progress, "起訴");
        assert!(record.progress_notes.is_empty());
        assert!(record.progress_times.is_empty());

        assert!(!record.remove_stage("開庭"));
        assert!(record.remove_stage("起訴"));
        assert_eq!(record.progress, DEFAULT_PROGRESS);
    }

    #[test]
    fn empty_stage_name_is_rejected() {
        let mut record = CaseRecord::new("civil", "張三").expect("record");
        assert_eq!(
            record.set_stage(" \n", "2024-01-01", None, None),
            Err(RecordError::EmptyStageName)
        );
    }
}
