use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clean::normalize_label;

/// Case type assigned to sheets that match no case-type keyword.
pub const UNKNOWN_CASE_TYPE: &str = "unknown";

/// A fixed output attribute of a [`crate::CaseRecord`].
///
/// The declaration order is significant: the column mapper iterates fields in this order, so the
/// mapping of an ambiguous header row is deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Client,
    CaseId,
    CaseReason,
    CaseNumber,
    Court,
    Lawyer,
    LegalAffairs,
    OpposingParty,
    Division,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 9] = [
        CanonicalField::Client,
        CanonicalField::CaseId,
        CanonicalField::CaseReason,
        CanonicalField::CaseNumber,
        CanonicalField::Court,
        CanonicalField::Lawyer,
        CanonicalField::LegalAffairs,
        CanonicalField::OpposingParty,
        CanonicalField::Division,
    ];

    /// Rows without this field are not case records.
    pub const MANDATORY: CanonicalField = CanonicalField::Client;

    pub const fn as_str(self) -> &'static str {
        match self {
            CanonicalField::Client => "client",
            CanonicalField::CaseId => "case_id",
            CanonicalField::CaseReason => "case_reason",
            CanonicalField::CaseNumber => "case_number",
            CanonicalField::Court => "court",
            CanonicalField::Lawyer => "lawyer",
            CanonicalField::LegalAffairs => "legal_affairs",
            CanonicalField::OpposingParty => "opposing_party",
            CanonicalField::Division => "division",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const BUILTIN_FIELD_KEYWORDS: &[(CanonicalField, &[&str])] = &[
    (
        CanonicalField::Client,
        &["當事人", "委任人", "委託人", "客戶", "客戶名稱", "姓名", "client"],
    ),
    (
        CanonicalField::CaseId,
        &["案件編號", "編號", "案件id", "case id", "case_id"],
    ),
    (CanonicalField::CaseReason, &["案由", "事由", "case reason"]),
    (
        CanonicalField::CaseNumber,
        &["案號", "機關", "字號", "case number", "case no"],
    ),
    (CanonicalField::Court, &["法院", "管轄法院", "court"]),
    (
        CanonicalField::Lawyer,
        &["律師", "承辦律師", "委任律師", "lawyer", "attorney"],
    ),
    (
        CanonicalField::LegalAffairs,
        &["法務", "法務人員", "助理", "legal affairs", "paralegal"],
    ),
    (
        CanonicalField::OpposingParty,
        &["對造", "對造當事人", "相對人", "對方", "opposing party"],
    ),
    (CanonicalField::Division, &["股別", "承辦股", "division"]),
];

const BUILTIN_CASE_TYPES: &[(&str, &[&str])] = &[
    ("civil", &["民事", "civil"]),
    ("criminal", &["刑事", "criminal"]),
    ("administrative", &["行政", "administrative"]),
    ("family", &["家事", "family"]),
];

/// Static keyword table consulted by the sheet analyzer.
///
/// Keywords are stored normalized (see [`normalize_label`]) so matching never re-normalizes the
/// dictionary side. The table is immutable once analysis starts; extensions happen by insertion
/// before it is handed to the analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDictionary {
    fields: Vec<(CanonicalField, Vec<String>)>,
    case_types: Vec<(String, Vec<String>)>,
}

impl Default for FieldDictionary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FieldDictionary {
    /// An empty dictionary (every field present, no keywords, no case types).
    pub fn empty() -> Self {
        Self {
            fields: CanonicalField::ALL
                .into_iter()
                .map(|field| (field, Vec::new()))
                .collect(),
            case_types: Vec::new(),
        }
    }

    /// The built-in Chinese/English keyword table.
    pub fn builtin() -> Self {
        let mut dict = Self::empty();
        for (field, keywords) in BUILTIN_FIELD_KEYWORDS {
            for keyword in *keywords {
                dict.insert_field_keyword(*field, keyword);
            }
        }
        for (case_type, keywords) in BUILTIN_CASE_TYPES {
            dict.insert_case_type(case_type, keywords.iter().copied());
        }
        dict
    }

    /// Fields in declared order with their normalized keywords.
    pub fn fields(&self) -> impl Iterator<Item = (CanonicalField, &[String])> + '_ {
        self.fields
            .iter()
            .map(|(field, keywords)| (*field, keywords.as_slice()))
    }

    pub fn keywords(&self, field: CanonicalField) -> &[String] {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, keywords)| keywords.as_slice())
            .unwrap_or(&[])
    }

    /// Every field keyword, in field order then keyword order.
    pub fn all_field_keywords(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields
            .iter()
            .flat_map(|(_, keywords)| keywords.iter().map(String::as_str))
    }

    /// Case types in declared order with their normalized keywords.
    pub fn case_types(&self) -> impl Iterator<Item = (&str, &[String])> + '_ {
        self.case_types
            .iter()
            .map(|(name, keywords)| (name.as_str(), keywords.as_slice()))
    }

    pub fn has_case_type(&self, name: &str) -> bool {
        self.case_types.iter().any(|(existing, _)| existing == name)
    }

    /// Add a keyword to `field`. Empty and duplicate keywords are ignored.
    pub fn insert_field_keyword(&mut self, field: CanonicalField, keyword: &str) {
        let normalized = normalize_label(keyword);
        if normalized.is_empty() {
            return;
        }
        if let Some((_, keywords)) = self.fields.iter_mut().find(|(f, _)| *f == field) {
            if !keywords.contains(&normalized) {
                keywords.push(normalized);
            }
        }
    }

    /// Add a case type (appended after the existing ones) or extend an existing one.
    pub fn insert_case_type<'a>(
        &mut self,
        name: &str,
        keywords: impl IntoIterator<Item = &'a str>,
    ) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        let index = match self.case_types.iter().position(|(n, _)| n == name) {
            Some(index) => index,
            None => {
                self.case_types.push((name.to_string(), Vec::new()));
                self.case_types.len() - 1
            }
        };
        let entry = &mut self.case_types[index].1;
        for keyword in keywords {
            let normalized = normalize_label(keyword);
            if !normalized.is_empty() && !entry.contains(&normalized) {
                entry.push(normalized);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_iterates_fields_in_declared_order() {
        let dict = FieldDictionary::builtin();
        let order: Vec<_> = dict.fields().map(|(field, _)| field).collect();
        assert_eq!(order, CanonicalField::ALL.to_vec());
        assert!(dict
            .keywords(CanonicalField::CaseNumber)
            .contains(&"機關".to_string()));
    }

    #[test]
    fn keywords_are_normalized_and_deduplicated() {
        let mut dict = FieldDictionary::empty();
        dict.insert_field_keyword(CanonicalField::Court, "Court Name");
        dict.insert_field_keyword(CanonicalField::Court, "court name");
        dict.insert_field_keyword(CanonicalField::Court, "   ");
        assert_eq!(dict.keywords(CanonicalField::Court), ["courtname"]);
    }

    #[test]
    fn inserting_existing_case_type_extends_it_in_place() {
        let mut dict = FieldDictionary::builtin();
        dict.insert_case_type("labor", ["勞動", "勞資"]);
        dict.insert_case_type("civil", ["民訴"]);
        let names: Vec<_> = dict.case_types().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            ["civil", "criminal", "administrative", "family", "labor"]
        );
        let civil = dict.case_types().next().expect("civil").1;
        assert!(civil.contains(&"民訴".to_string()));
    }

    #[test]
    fn field_names_round_trip() {
        for field in CanonicalField::ALL {
            assert_eq!(CanonicalField::from_name(field.as_str()), Some(field));
        }
        assert_eq!(CanonicalField::from_name("nope"), None);
    }
}
