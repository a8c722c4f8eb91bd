use casedesk_model::{normalize_label, FieldDictionary, UNKNOWN_CASE_TYPE};
use serde::Serialize;

/// Where a sheet's case type came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifiedBy {
    SheetName,
    ColumnLabels,
    Unclassified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub case_type: String,
    pub classified_by: ClassifiedBy,
}

impl Classification {
    pub fn is_unknown(&self) -> bool {
        self.classified_by == ClassifiedBy::Unclassified
    }
}

#[derive(Debug, Clone)]
pub struct SheetClassifier<'a> {
    dictionary: &'a FieldDictionary,
}

impl<'a> SheetClassifier<'a> {
    pub fn new(dictionary: &'a FieldDictionary) -> Self {
        Self { dictionary }
    }

    /// Classify by sheet name first, then by the concatenated column labels.
    pub fn classify(&self, sheet_name: &str, column_labels: &[String]) -> Classification {
        if let Some(case_type) = self.match_text(&normalize_label(sheet_name)) {
            return Classification {
                case_type,
                classified_by: ClassifiedBy::SheetName,
            };
        }

        let blob: String = column_labels.iter().map(|l| normalize_label(l)).collect();
        if let Some(case_type) = self.match_text(&blob) {
            return Classification {
                case_type,
                classified_by: ClassifiedBy::ColumnLabels,
            };
        }

        Classification {
            case_type: UNKNOWN_CASE_TYPE.to_string(),
            classified_by: ClassifiedBy::Unclassified,
        }
    }

    /// First case type (in declared order) with a keyword contained in `text`.
    fn match_text(&self, text: &str) -> Option<String> {
        if text.is_empty() {
            return None;
        }
        self.dictionary
            .case_types()
            .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k.as_str())))
            .map(|(name, _)| name.to_string())
    }
}
