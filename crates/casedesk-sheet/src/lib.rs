//! Heuristic structure detection for loosely structured case spreadsheets.
//!
//! Different users produce sheets with titles above the header, renamed or split columns and a
//! case category implied only by the sheet name. This crate:
//! - loads a workbook into dense grids ([`read_workbook`])
//! - finds the header row by keyword scoring ([`HeaderRowDetector`])
//! - maps header columns to canonical fields ([`ColumnFieldMapper`])
//! - classifies each sheet's case type ([`SheetClassifier`])
//! - plans multi-column merges ([`FieldMerger`])
//! - turns data rows into [`casedesk_model::CaseRecord`]s ([`RecordExtractor`])
//!
//! [`SpreadsheetAnalyzer`] runs all of the above per sheet. Nothing in this crate writes to disk.

mod analyzer;
mod classifier;
mod extract;
mod grid;
mod header;
mod mapper;
mod merge;
mod report;
mod workbook;

pub use analyzer::{SheetAnalysis, SheetStatus, SpreadsheetAnalyzer, WorkbookAnalysis};
pub use classifier::{Classification, ClassifiedBy, SheetClassifier};
pub use extract::{RecordExtractor, SheetExtraction, WorkbookExtraction};
pub use grid::{CellValue, SheetGrid, Workbook};
pub use header::{header_labels, HeaderMatch, HeaderRowDetector, HEADER_EXACT_HIT, HEADER_SUBSTRING_HIT};
pub use mapper::{
    best_keyword_score, keyword_score, ColumnFieldMapper, ColumnMapping, MappedColumn,
    EXACT_MATCH_SCORE, FUZZY_MATCH_BONUS, SUBSTRING_MATCH_SCORE,
};
pub use merge::{join_non_empty, FieldMerger, MergePlan};
pub use report::render_report;
pub use workbook::{read_workbook, WorkbookError};
