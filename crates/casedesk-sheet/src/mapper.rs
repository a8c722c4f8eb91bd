//! Column to canonical field assignment.

use std::collections::{BTreeMap, BTreeSet};

use casedesk_model::{normalize_label, CanonicalField, FieldDictionary};
use serde::Serialize;

/// Column label equals a keyword.
pub const EXACT_MATCH_SCORE: u32 = 100;
/// Keyword appears inside the column label.
pub const SUBSTRING_MATCH_SCORE: u32 = 10;
/// Keyword and label share at least half of the shorter string's distinct characters.
///
/// Must stay below [`SUBSTRING_MATCH_SCORE`].
pub const FUZZY_MATCH_BONUS: u32 = 2;

/// A header column chosen for a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedColumn {
    pub index: usize,
    pub label: String,
}

/// Partial function from canonical field to header column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnMapping {
    columns: BTreeMap<CanonicalField, MappedColumn>,
}

impl ColumnMapping {
    pub fn get(&self, field: CanonicalField) -> Option<&MappedColumn> {
        self.columns.get(&field)
    }

    pub fn insert(&mut self, field: CanonicalField, column: MappedColumn) {
        self.columns.insert(field, column);
    }

    pub fn is_mapped(&self, field: CanonicalField) -> bool {
        self.columns.contains_key(&field)
    }

    /// Mapped fields in declared field order.
    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, &MappedColumn)> + '_ {
        self.columns.iter().map(|(field, column)| (*field, column))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The field a column index is assigned to, if any.
    pub fn field_for_column(&self, index: usize) -> Option<CanonicalField> {
        self.columns
            .iter()
            .find(|(_, column)| column.index == index)
            .map(|(field, _)| *field)
    }
}

/// How strongly one keyword matches one normalized label.
pub fn keyword_score(keyword: &str, normalized_label: &str) -> u32 {
    if keyword.is_empty() || normalized_label.is_empty() {
        return 0;
    }
    if normalized_label == keyword {
        EXACT_MATCH_SCORE
    } else if normalized_label.contains(keyword) {
        SUBSTRING_MATCH_SCORE
    } else if shares_half_of_distinct_chars(keyword, normalized_label) {
        FUZZY_MATCH_BONUS
    } else {
        0
    }
}

/// Best single-keyword score of `label` against a keyword set.
pub fn best_keyword_score(keywords: &[String], normalized_label: &str) -> u32 {
    keywords
        .iter()
        .map(|keyword| keyword_score(keyword, normalized_label))
        .max()
        .unwrap_or(0)
}

fn shares_half_of_distinct_chars(a: &str, b: &str) -> bool {
    let a: BTreeSet<char> = a.chars().collect();
    let b: BTreeSet<char> = b.chars().collect();
    let shorter = a.len().min(b.len());
    let shared = a.intersection(&b).count();
    // A single shared character is too weak a signal to name a column.
    shared >= 2 && shared * 2 >= shorter
}

#[derive(Debug, Clone)]
pub struct ColumnFieldMapper<'a> {
    dictionary: &'a FieldDictionary,
}

impl<'a> ColumnFieldMapper<'a> {
    pub fn new(dictionary: &'a FieldDictionary) -> Self {
        Self { dictionary }
    }

    /// Greedily assign each field (in dictionary order) its best-scoring unused column.
    ///
    /// Ties go to the leftmost column. Fields with no positive score stay unmapped. A column
    /// whose label is exactly a keyword of a field that is still unmapped is held for that field,
    /// so an earlier field cannot take it through a weaker substring or fuzzy match. Fuzzy
    /// matches only count for labels that no field recognizes by exact or substring match.
    pub fn map(&self, header_labels: &[String]) -> ColumnMapping {
        let normalized: Vec<String> = header_labels.iter().map(|l| normalize_label(l)).collect();
        let exact_owners: Vec<Vec<CanonicalField>> = normalized
            .iter()
            .map(|label| {
                self.dictionary
                    .fields()
                    .filter(|(_, keywords)| keywords.iter().any(|k| k == label))
                    .map(|(field, _)| field)
                    .collect()
            })
            .collect();
        let recognized: Vec<bool> = normalized
            .iter()
            .map(|label| {
                self.dictionary
                    .all_field_keywords()
                    .any(|k| keyword_score(k, label) >= SUBSTRING_MATCH_SCORE)
            })
            .collect();
        let mut consumed = BTreeSet::new();
        let mut mapping = ColumnMapping::default();

        for (field, keywords) in self.dictionary.fields() {
            let mut best: Option<(usize, u32)> = None;
            for (index, label) in normalized.iter().enumerate() {
                if consumed.contains(&index) {
                    continue;
                }
                let owners = &exact_owners[index];
                let held_for_other = !owners.contains(&field)
                    && owners.iter().any(|owner| !mapping.is_mapped(*owner));
                if held_for_other {
                    continue;
                }
                let mut score = best_keyword_score(keywords, label);
                if score == FUZZY_MATCH_BONUS && recognized[index] {
                    score = 0;
                }
                if score > 0 && best.map_or(true, |(_, s)| score > s) {
                    best = Some((index, score));
                }
            }

            if let Some((index, score)) = best {
                log::debug!(
                    "mapped {field} to column {index} ({:?}) with score {score}",
                    header_labels[index]
                );
                consumed.insert(index);
                mapping.insert(
                    field,
                    MappedColumn {
                        index,
                        label: header_labels[index].clone(),
                    },
                );
            }
        }

        mapping
    }
}
