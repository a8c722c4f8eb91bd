use std::fmt::Write as _;

use crate::analyzer::{SheetAnalysis, WorkbookAnalysis};
use crate::classifier::ClassifiedBy;

/// Render the user-facing analysis summary.
///
/// The output depends only on the analysis, so identical workbooks produce identical reports.
pub fn render_report(analysis: &WorkbookAnalysis) -> String {
    let mut out = String::new();
    let data_rows: usize = analysis
        .sheets
        .iter()
        .filter(|sheet| sheet.is_processable())
        .map(|sheet| sheet.total_data_rows)
        .sum();

    let _ = writeln!(
        out,
        "Workbook analysis: {} sheet(s), {} processable, {} data row(s) to import",
        analysis.sheets.len(),
        analysis.processable_sheet_count,
        data_rows
    );

    if !analysis.categorized_sheets.is_empty() {
        let _ = writeln!(out, "Case types:");
        for (case_type, names) in &analysis.categorized_sheets {
            let _ = writeln!(
                out,
                "  {case_type}: {} sheet(s) ({})",
                names.len(),
                names.join(", ")
            );
        }
    }

    if !analysis.sheets.is_empty() {
        let _ = writeln!(out, "Sheets:");
        for (position, sheet) in analysis.sheets.iter().enumerate() {
            write_sheet(&mut out, position + 1, sheet);
        }
    }

    if analysis.success {
        let _ = write!(
            out,
            "Result: {} sheet(s) ready to import",
            analysis.processable_sheet_count
        );
    } else {
        let _ = write!(out, "Result: nothing to import, no sheet has a client column");
    }
    out
}

fn write_sheet(out: &mut String, position: usize, sheet: &SheetAnalysis) {
    let classified = match sheet.classified_by {
        ClassifiedBy::SheetName => "from sheet name",
        ClassifiedBy::ColumnLabels => "from column labels",
        ClassifiedBy::Unclassified => "unclassified",
    };
    let _ = write!(
        out,
        "  [{position}] {}: {} ({classified}), {} row(s) x {} column(s)",
        sheet.sheet_name, sheet.case_type, sheet.total_rows, sheet.total_columns
    );
    if let Some(header_row) = sheet.header_row {
        let _ = write!(
            out,
            ", header at row {}, {} data row(s)",
            header_row + 1,
            sheet.total_data_rows
        );
    }
    match sheet.status.skip_reason() {
        Some(reason) => {
            let _ = writeln!(out, ", skipped: {reason}");
        }
        None => {
            let _ = writeln!(out);
        }
    }

    if sheet.column_mapping.is_empty() {
        return;
    }
    let fields: Vec<String> = sheet
        .column_mapping
        .iter()
        .map(|(field, column)| match sheet.merge_plan(field) {
            Some(plan) if plan.needs_merge => {
                let labels: Vec<&str> = plan
                    .source_columns
                    .iter()
                    .map(|c| c.label.as_str())
                    .collect();
                format!(
                    "{field}={} (merged with {:?})",
                    labels.join("+"),
                    plan.separator
                )
            }
            _ => format!("{field}={}", column.label),
        })
        .collect();
    let _ = writeln!(out, "      fields: {}", fields.join(", "));
}
