//! Per-workbook orchestration of header detection, mapping, classification and merging.

use std::collections::BTreeMap;
use std::path::Path;

use casedesk_model::{
    AnalyzerConfig, CanonicalField, CasedeskConfig, ConfigError, FieldDictionary,
};
use serde::Serialize;

use crate::classifier::{ClassifiedBy, SheetClassifier};
use crate::extract::{RecordExtractor, WorkbookExtraction};
use crate::grid::{SheetGrid, Workbook};
use crate::header::{header_labels, HeaderRowDetector};
use crate::mapper::{ColumnFieldMapper, ColumnMapping};
use crate::merge::{FieldMerger, MergePlan};
use crate::report::render_report;
use crate::workbook::{read_workbook, WorkbookError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetStatus {
    Processable,
    Empty,
    NoHeaderRow,
    MissingMandatoryField,
    UnknownCaseType,
}

impl SheetStatus {
    /// Human-readable reason a sheet is excluded from extraction.
    pub fn skip_reason(self) -> Option<&'static str> {
        match self {
            SheetStatus::Processable => None,
            SheetStatus::Empty => Some("sheet is empty"),
            SheetStatus::NoHeaderRow => Some("no header row found"),
            SheetStatus::MissingMandatoryField => Some("no client column found"),
            SheetStatus::UnknownCaseType => Some("case type could not be determined"),
        }
    }
}

/// Structure detected for one sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetAnalysis {
    pub sheet_name: String,
    pub status: SheetStatus,
    /// 0-based worksheet row of the header.
    pub header_row: Option<usize>,
    pub header_score: u32,
    pub header_labels: Vec<String>,
    pub column_mapping: ColumnMapping,
    pub merge_info: Vec<MergePlan>,
    pub case_type: String,
    pub classified_by: ClassifiedBy,
    pub total_rows: usize,
    pub total_columns: usize,
    /// Non-blank rows below the header.
    pub total_data_rows: usize,
    /// `true` iff the client column is mapped.
    pub has_mandatory_field: bool,
}

impl SheetAnalysis {
    pub fn is_processable(&self) -> bool {
        self.status == SheetStatus::Processable
    }

    pub fn merge_plan(&self, field: CanonicalField) -> Option<&MergePlan> {
        self.merge_info.iter().find(|plan| plan.field == field)
    }
}

/// Result of analyzing every sheet of a workbook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkbookAnalysis {
    /// At least one sheet has a mapped client column.
    pub success: bool,
    pub report: String,
    /// Per-sheet analyses in workbook order.
    pub sheets: Vec<SheetAnalysis>,
    /// Case type -> sheet names, in workbook order.
    pub categorized_sheets: BTreeMap<String, Vec<String>>,
    pub processable_sheet_count: usize,
}

impl WorkbookAnalysis {
    pub fn sheet(&self, name: &str) -> Option<&SheetAnalysis> {
        self.sheets.iter().find(|sheet| sheet.sheet_name == name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpreadsheetAnalyzer {
    dictionary: FieldDictionary,
    config: AnalyzerConfig,
}

impl SpreadsheetAnalyzer {
    pub fn new(dictionary: FieldDictionary, config: AnalyzerConfig) -> Self {
        Self { dictionary, config }
    }

    pub fn from_config(config: &CasedeskConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.field_dictionary()?, config.analyzer.clone()))
    }

    pub fn dictionary(&self) -> &FieldDictionary {
        &self.dictionary
    }

    /// Load the workbook at `path` and analyze it.
    ///
    /// Only an unreadable workbook is an error; unprocessable sheets are reported in the
    /// returned analysis.
    pub fn analyze_path(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<(Workbook, WorkbookAnalysis), WorkbookError> {
        let workbook = read_workbook(path)?;
        let analysis = self.analyze(&workbook);
        Ok((workbook, analysis))
    }

    pub fn analyze(&self, workbook: &Workbook) -> WorkbookAnalysis {
        let sheets: Vec<SheetAnalysis> = workbook
            .sheets
            .iter()
            .map(|sheet| self.analyze_sheet(sheet))
            .collect();

        let mut categorized_sheets: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for sheet in &sheets {
            categorized_sheets
                .entry(sheet.case_type.clone())
                .or_default()
                .push(sheet.sheet_name.clone());
        }

        let success = sheets.iter().any(|sheet| sheet.has_mandatory_field);
        let processable_sheet_count = sheets.iter().filter(|s| s.is_processable()).count();

        let mut analysis = WorkbookAnalysis {
            success,
            report: String::new(),
            sheets,
            categorized_sheets,
            processable_sheet_count,
        };
        analysis.report = render_report(&analysis);
        analysis
    }

    pub fn analyze_sheet(&self, sheet: &SheetGrid) -> SheetAnalysis {
        let classifier = SheetClassifier::new(&self.dictionary);
        let total_rows = sheet.row_count();
        let total_columns = sheet.column_count();

        let detector = HeaderRowDetector::new(
            &self.dictionary,
            self.config.max_header_scan_rows,
            self.config.header_min_score,
        );
        let Some(header) = detector.detect(sheet) else {
            let classification = classifier.classify(&sheet.name, &[]);
            let status = if (0..total_rows).all(|row| sheet.is_row_blank(row)) {
                SheetStatus::Empty
            } else {
                SheetStatus::NoHeaderRow
            };
            log::warn!(
                "skipping sheet `{}`: {}",
                sheet.name,
                status.skip_reason().unwrap_or_default()
            );
            return SheetAnalysis {
                sheet_name: sheet.name.clone(),
                status,
                header_row: None,
                header_score: 0,
                header_labels: Vec::new(),
                column_mapping: ColumnMapping::default(),
                merge_info: Vec::new(),
                case_type: classification.case_type,
                classified_by: classification.classified_by,
                total_rows,
                total_columns,
                total_data_rows: 0,
                has_mandatory_field: false,
            };
        };

        let labels = header_labels(sheet, header.row_index);
        let column_mapping = ColumnFieldMapper::new(&self.dictionary).map(&labels);
        let classification = classifier.classify(&sheet.name, &labels);
        let merger = FieldMerger::new(&self.dictionary, &self.config.merge_separator);
        let merge_info: Vec<MergePlan> = self
            .config
            .merge_fields
            .iter()
            .map(|field| merger.plan(*field, &labels, &column_mapping))
            .collect();

        let total_data_rows = (header.row_index + 1..total_rows)
            .filter(|row| !sheet.is_row_blank(*row))
            .count();
        let has_mandatory_field = column_mapping.is_mapped(CanonicalField::MANDATORY);

        let status = if !has_mandatory_field {
            SheetStatus::MissingMandatoryField
        } else if classification.is_unknown() {
            SheetStatus::UnknownCaseType
        } else {
            SheetStatus::Processable
        };
        match status.skip_reason() {
            Some(reason) => log::warn!("skipping sheet `{}`: {reason}", sheet.name),
            None => log::debug!(
                "sheet `{}`: header row {}, case type {}, {} data rows",
                sheet.name,
                header.row_index,
                classification.case_type,
                total_data_rows
            ),
        }

        SheetAnalysis {
            sheet_name: sheet.name.clone(),
            status,
            header_row: Some(header.row_index),
            header_score: header.score,
            header_labels: labels,
            column_mapping,
            merge_info,
            case_type: classification.case_type,
            classified_by: classification.classified_by,
            total_rows,
            total_columns,
            total_data_rows,
            has_mandatory_field,
        }
    }

    /// Extract records from every processable sheet, in workbook then row order.
    pub fn extract(&self, workbook: &Workbook, analysis: &WorkbookAnalysis) -> WorkbookExtraction {
        let sheets = analysis
            .sheets
            .iter()
            .filter(|sheet_analysis| sheet_analysis.is_processable())
            .filter_map(|sheet_analysis| {
                let sheet = workbook.sheet(&sheet_analysis.sheet_name)?;
                Some(RecordExtractor::extract(sheet, sheet_analysis))
            })
            .collect();
        WorkbookExtraction { sheets }
    }
}
