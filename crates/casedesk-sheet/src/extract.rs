use std::collections::BTreeMap;

use casedesk_model::{CanonicalField, CaseRecord};

use crate::analyzer::SheetAnalysis;
use crate::grid::{CellValue, SheetGrid};

/// Records extracted from one sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetExtraction {
    pub sheet_name: String,
    pub case_type: String,
    pub records: Vec<CaseRecord>,
    /// Non-blank data rows dropped because the client cell was empty.
    pub skipped_rows: usize,
}

/// Records extracted from a workbook, sheets in workbook order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkbookExtraction {
    pub sheets: Vec<SheetExtraction>,
}

impl WorkbookExtraction {
    /// All records in workbook order, rows in file order.
    pub fn records(&self) -> impl Iterator<Item = &CaseRecord> + '_ {
        self.sheets.iter().flat_map(|sheet| sheet.records.iter())
    }

    pub fn into_records(self) -> Vec<CaseRecord> {
        self.sheets
            .into_iter()
            .flat_map(|sheet| sheet.records)
            .collect()
    }

    /// Case type -> records, each group keeping workbook/row order.
    pub fn grouped_by_case_type(&self) -> BTreeMap<&str, Vec<&CaseRecord>> {
        let mut groups: BTreeMap<&str, Vec<&CaseRecord>> = BTreeMap::new();
        for sheet in &self.sheets {
            groups
                .entry(sheet.case_type.as_str())
                .or_default()
                .extend(sheet.records.iter());
        }
        groups
    }

    pub fn records_extracted(&self) -> usize {
        self.sheets.iter().map(|sheet| sheet.records.len()).sum()
    }

    pub fn rows_skipped(&self) -> usize {
        self.sheets.iter().map(|sheet| sheet.skipped_rows).sum()
    }
}

pub struct RecordExtractor;

impl RecordExtractor {
    /// Walk the data rows below the header and build one record per row with a client.
    ///
    /// Returns no records for sheets that are not processable.
    pub fn extract(sheet: &SheetGrid, analysis: &SheetAnalysis) -> SheetExtraction {
        let mut out = SheetExtraction {
            sheet_name: sheet.name.clone(),
            case_type: analysis.case_type.clone(),
            records: Vec::new(),
            skipped_rows: 0,
        };
        let (true, Some(header_row)) = (analysis.is_processable(), analysis.header_row) else {
            return out;
        };

        for row_index in header_row + 1..sheet.row_count() {
            if sheet.is_row_blank(row_index) {
                continue;
            }
            match Self::extract_row(&sheet.rows[row_index], analysis) {
                Some(record) => out.records.push(record),
                None => out.skipped_rows += 1,
            }
        }

        log::debug!(
            "sheet `{}`: extracted {} records, skipped {} rows without client",
            sheet.name,
            out.records.len(),
            out.skipped_rows
        );
        out
    }

    /// Build a record from one row; `None` when the client cell is blank.
    pub fn extract_row(row: &[CellValue], analysis: &SheetAnalysis) -> Option<CaseRecord> {
        let client = Self::field_value(row, analysis, CanonicalField::MANDATORY)?;
        let mut record = CaseRecord::new(analysis.case_type.clone(), &client).ok()?;

        for field in CanonicalField::ALL {
            if field != CanonicalField::MANDATORY {
                record
                    .set_field(field, Self::field_value(row, analysis, field))
                    .ok()?;
            }
        }
        Some(record)
    }

    fn field_value(row: &[CellValue], analysis: &SheetAnalysis, field: CanonicalField) -> Option<String> {
        if let Some(plan) = analysis.merge_plan(field).filter(|plan| plan.needs_merge) {
            return plan.merge_values(
                plan.source_columns
                    .iter()
                    .map(|column| cell_at(row, column.index).cleaned()),
            );
        }
        let column = analysis.column_mapping.get(field)?;
        cell_at(row, column.index).cleaned()
    }
}

fn cell_at(row: &[CellValue], index: usize) -> &CellValue {
    row.get(index).unwrap_or(&CellValue::Empty)
}
