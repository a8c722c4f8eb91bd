//! Header row detection.
//!
//! Users put titles, dates and blank lines above the real header, so the header row is scored
//! rather than assumed to be row 1.

use casedesk_model::{normalize_label, FieldDictionary};

use crate::grid::SheetGrid;

/// Score for a cell that equals a dictionary keyword.
pub const HEADER_EXACT_HIT: u32 = 10;
/// Score for each keyword found inside a cell.
pub const HEADER_SUBSTRING_HIT: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderMatch {
    pub row_index: usize,
    pub score: u32,
}

#[derive(Debug, Clone)]
pub struct HeaderRowDetector<'a> {
    dictionary: &'a FieldDictionary,
    max_rows_to_scan: usize,
    min_score: u32,
}

impl<'a> HeaderRowDetector<'a> {
    pub fn new(dictionary: &'a FieldDictionary, max_rows_to_scan: usize, min_score: u32) -> Self {
        Self {
            dictionary,
            max_rows_to_scan,
            min_score,
        }
    }

    /// Pick the best-scoring row among the first `max_rows_to_scan` rows.
    ///
    /// Ties go to the lowest row index. Returns `None` when no row reaches the minimum score.
    pub fn detect(&self, sheet: &SheetGrid) -> Option<HeaderMatch> {
        let mut best: Option<HeaderMatch> = None;
        for (row_index, _) in sheet.rows.iter().enumerate().take(self.max_rows_to_scan) {
            let labels = header_labels(sheet, row_index);
            let score = self.score_row(&labels);
            if score == 0 {
                continue;
            }
            if best.map_or(true, |b| score > b.score) {
                best = Some(HeaderMatch { row_index, score });
            }
        }

        best.filter(|b| b.score >= self.min_score)
    }

    /// Sum of keyword hits over every non-empty cell of the row.
    pub fn score_row(&self, labels: &[String]) -> u32 {
        labels
            .iter()
            .map(|label| normalize_label(label))
            .filter(|label| !label.is_empty())
            .map(|label| self.score_cell(&label))
            .sum()
    }

    fn score_cell(&self, normalized: &str) -> u32 {
        self.dictionary
            .all_field_keywords()
            .map(|keyword| {
                if normalized == keyword {
                    HEADER_EXACT_HIT
                } else if normalized.contains(keyword) {
                    HEADER_SUBSTRING_HIT
                } else {
                    0
                }
            })
            .sum()
    }
}

/// Cleaned cell texts of `row`, one entry per column (empty string for blank cells).
pub fn header_labels(sheet: &SheetGrid, row: usize) -> Vec<String> {
    sheet
        .rows
        .get(row)
        .map(|cells| {
            cells
                .iter()
                .map(|cell| cell.cleaned().unwrap_or_default())
                .collect()
        })
        .unwrap_or_default()
}
