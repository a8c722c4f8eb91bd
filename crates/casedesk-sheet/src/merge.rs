//! Multi-column field merging.
//!
//! Forms often split one logical value across several columns (for example the agency and the
//! docket number of a case number). For merge-eligible fields every matching column is kept and
//! the non-empty values are joined at extraction time.

use casedesk_model::{normalize_label, CanonicalField, FieldDictionary};
use serde::Serialize;

use crate::mapper::{keyword_score, ColumnMapping, MappedColumn, SUBSTRING_MATCH_SCORE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergePlan {
    pub field: CanonicalField,
    pub needs_merge: bool,
    /// Matching columns in header order.
    pub source_columns: Vec<MappedColumn>,
    pub separator: String,
}

impl MergePlan {
    /// Join the non-empty values in source column order. All-empty yields `None`.
    pub fn merge_values<I, S>(&self, values: I) -> Option<String>
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        join_non_empty(values, &self.separator)
    }
}

pub fn join_non_empty<I, S>(values: I, separator: &str) -> Option<String>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let parts: Vec<String> = values
        .into_iter()
        .flatten()
        .map(|v| v.as_ref().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(separator))
    }
}

#[derive(Debug, Clone)]
pub struct FieldMerger<'a> {
    dictionary: &'a FieldDictionary,
    separator: &'a str,
}

impl<'a> FieldMerger<'a> {
    pub fn new(dictionary: &'a FieldDictionary, separator: &'a str) -> Self {
        Self {
            dictionary,
            separator,
        }
    }

    /// Collect every column whose label matches `field` (exactly or by substring) and that the
    /// mapper did not assign to a different field.
    pub fn plan(
        &self,
        field: CanonicalField,
        header_labels: &[String],
        mapping: &ColumnMapping,
    ) -> MergePlan {
        let keywords = self.dictionary.keywords(field);
        let source_columns: Vec<MappedColumn> = header_labels
            .iter()
            .enumerate()
            .filter(|(index, _)| {
                mapping
                    .field_for_column(*index)
                    .map_or(true, |owner| owner == field)
            })
            .filter(|(_, label)| {
                let normalized = normalize_label(label);
                keywords
                    .iter()
                    .any(|k| keyword_score(k, &normalized) >= SUBSTRING_MATCH_SCORE)
            })
            .map(|(index, label)| MappedColumn {
                index,
                label: label.clone(),
            })
            .collect();

        let needs_merge = source_columns.len() > 1;
        if needs_merge {
            log::debug!(
                "{field} merges {} columns: {:?}",
                source_columns.len(),
                source_columns.iter().map(|c| &c.label).collect::<Vec<_>>()
            );
        }

        MergePlan {
            field,
            needs_merge,
            source_columns,
            separator: self.separator.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::ColumnFieldMapper;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn agency_and_docket_columns_merge() {
        let dict = FieldDictionary::builtin();
        let header = labels(&["當事人", "機關", "案號"]);
        let mapping = ColumnFieldMapper::new(&dict).map(&header);
        let plan = FieldMerger::new(&dict, "-").plan(CanonicalField::CaseNumber, &header, &mapping);

        assert!(plan.needs_merge);
        let indices: Vec<_> = plan.source_columns.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(
            plan.merge_values([Some("台北地院"), Some("113訴字1號")]),
            Some("台北地院-113訴字1號".to_string())
        );
    }

    #[test]
    fn single_column_does_not_merge() {
        let dict = FieldDictionary::builtin();
        let header = labels(&["當事人", "案號"]);
        let mapping = ColumnFieldMapper::new(&dict).map(&header);
        let plan = FieldMerger::new(&dict, "-").plan(CanonicalField::CaseNumber, &header, &mapping);
        assert!(!plan.needs_merge);
        assert_eq!(plan.source_columns.len(), 1);
    }

    #[test]
    fn columns_owned_by_other_fields_are_excluded() {
        let dict = FieldDictionary::builtin();
        // "法院案號" contains both a court and a case-number keyword; with an exact court column
        // present it stays with case_number, and the court column is never merged in.
        let header = labels(&["法院", "法院案號", "案號"]);
        let mapping = ColumnFieldMapper::new(&dict).map(&header);
        let plan = FieldMerger::new(&dict, "/").plan(CanonicalField::CaseNumber, &header, &mapping);
        let indices: Vec<_> = plan.source_columns.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(plan.separator, "/");
    }

    #[test]
    fn empty_sources_merge_to_none() {
        assert_eq!(join_non_empty([None::<&str>, Some("")], "-"), None);
        assert_eq!(
            join_non_empty([None, Some("113訴字1號")], "-"),
            Some("113訴字1號".to_string())
        );
    }
}
