use casedesk_model::{AnalyzerConfig, CanonicalField, FieldDictionary, UNKNOWN_CASE_TYPE};
use casedesk_sheet::{
    CellValue, RecordExtractor, SheetGrid, SheetStatus, SpreadsheetAnalyzer, Workbook,
};
use pretty_assertions::assert_eq;

fn analyzer() -> SpreadsheetAnalyzer {
    SpreadsheetAnalyzer::new(FieldDictionary::builtin(), AnalyzerConfig::default())
}

fn civil_sheet() -> SheetGrid {
    SheetGrid::from_text_rows(
        "民事案件",
        [
            vec!["113年度委任案件", "", "", "", ""],
            vec!["當事人", "案由", "機關", "案號", "對造"],
            vec!["  張三\r\n ", "損害賠償", "台北地院", "113訴字1號", "李四"],
            vec!["", "", "", "", ""],
            vec!["nan", "清償債務", "新北地院", "113訴字9號", ""],
            vec!["王五", "", "", "", "none"],
        ],
    )
}

#[test]
fn merges_agency_and_docket_into_case_number() {
    let analyzer = analyzer();
    let workbook = Workbook::from_sheets(vec![civil_sheet()]);
    let analysis = analyzer.analyze(&workbook);

    let sheet = analysis.sheet("民事案件").expect("sheet analysis");
    assert_eq!(sheet.status, SheetStatus::Processable);
    assert_eq!(sheet.header_row, Some(1));
    assert_eq!(sheet.case_type, "civil");
    assert!(sheet.has_mandatory_field);
    assert_eq!(sheet.total_data_rows, 3);

    let plan = sheet
        .merge_plan(CanonicalField::CaseNumber)
        .expect("case number plan");
    assert!(plan.needs_merge);
    assert_eq!(plan.separator, "-");

    let extraction = analyzer.extract(&workbook, &analysis);
    assert_eq!(extraction.records_extracted(), 2);
    assert_eq!(extraction.rows_skipped(), 1);

    let records: Vec<_> = extraction.records().collect();
    assert_eq!(records[0].client, "張三");
    assert_eq!(records[0].case_type, "civil");
    assert_eq!(records[0].case_reason.as_deref(), Some("損害賠償"));
    assert_eq!(
        records[0].case_number.as_deref(),
        Some("台北地院-113訴字1號")
    );
    assert_eq!(records[0].opposing_party.as_deref(), Some("李四"));
    assert_eq!(records[0].progress, "pending");
    assert!(!records[0].has_case_id());

    // Absent tokens become `None`, never the literal string.
    assert_eq!(records[1].client, "王五");
    assert_eq!(records[1].case_number, None);
    assert_eq!(records[1].opposing_party, None);
}

#[test]
fn unprocessable_sheets_do_not_abort_the_workbook() {
    let notes = SheetGrid::from_text_rows("備註", [vec!["請於週五前回報"], vec!["謝謝"]]);
    let no_client = SheetGrid::from_text_rows(
        "刑事",
        [vec!["案號", "法院"], vec!["113訴字1號", "台北地院"]],
    );
    let unknown = SheetGrid::from_text_rows(
        "工作表1",
        [vec!["當事人", "案號"], vec!["趙六", "113訴字2號"]],
    );
    let empty = SheetGrid::new("空白", vec![vec![CellValue::Empty]]);

    let analyzer = analyzer();
    let workbook = Workbook::from_sheets(vec![notes, civil_sheet(), no_client, unknown, empty]);
    let analysis = analyzer.analyze(&workbook);

    let statuses: Vec<_> = analysis.sheets.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![
            SheetStatus::NoHeaderRow,
            SheetStatus::Processable,
            SheetStatus::MissingMandatoryField,
            SheetStatus::UnknownCaseType,
            SheetStatus::Empty,
        ]
    );
    assert!(analysis.success);
    assert_eq!(analysis.processable_sheet_count, 1);

    // Unknown sheets stay in the analysis and the categorization, but yield no records.
    assert_eq!(
        analysis.categorized_sheets.get(UNKNOWN_CASE_TYPE),
        Some(&vec![
            "備註".to_string(),
            "工作表1".to_string(),
            "空白".to_string()
        ])
    );
    let unknown_analysis = analysis.sheet("工作表1").expect("unknown sheet");
    assert!(unknown_analysis.has_mandatory_field);
    let extracted = RecordExtractor::extract(
        workbook.sheet("工作表1").expect("sheet"),
        unknown_analysis,
    );
    assert!(extracted.records.is_empty());

    let extraction = analyzer.extract(&workbook, &analysis);
    assert_eq!(extraction.sheets.len(), 1);
    assert!(analysis.report.contains("no header row found"));
    assert!(analysis.report.contains("no client column found"));
    assert!(analysis.report.contains("case type could not be determined"));
}

#[test]
fn success_requires_a_client_column_somewhere() {
    let analyzer = analyzer();
    let workbook = Workbook::from_sheets(vec![SheetGrid::from_text_rows(
        "民事",
        [vec!["案號", "法院"], vec!["113訴字1號", "台北地院"]],
    )]);
    let analysis = analyzer.analyze(&workbook);
    assert!(!analysis.success);
    assert_eq!(analysis.processable_sheet_count, 0);
    assert!(analysis.report.ends_with("nothing to import, no sheet has a client column"));
}

#[test]
fn report_and_record_order_are_reproducible() {
    let analyzer = analyzer();
    let second = SheetGrid::from_text_rows(
        "刑事案件",
        [vec!["委任人", "案號"], vec!["甲", "1"], vec!["乙", "2"]],
    );
    let workbook = Workbook::from_sheets(vec![civil_sheet(), second]);

    let first_run = analyzer.analyze(&workbook);
    let second_run = analyzer.analyze(&workbook);
    assert_eq!(first_run.report, second_run.report);

    let clients: Vec<String> = analyzer
        .extract(&workbook, &first_run)
        .records()
        .map(|r| r.client.clone())
        .collect();
    assert_eq!(clients, vec!["張三", "王五", "甲", "乙"]);

    let extraction = analyzer.extract(&workbook, &first_run);
    let groups = extraction.grouped_by_case_type();
    assert_eq!(groups.get("civil").map(Vec::len), Some(2));
    assert_eq!(groups.get("criminal").map(Vec::len), Some(2));
}

#[test]
fn numeric_and_date_cells_keep_their_precision() {
    let analyzer = analyzer();
    let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("date");
    let sheet = SheetGrid::new(
        "家事",
        vec![
            vec![
                CellValue::text("案件編號"),
                CellValue::text("當事人"),
                CellValue::text("案由"),
                CellValue::text("股別"),
            ],
            vec![
                CellValue::Number(113001.0),
                CellValue::text("陳七"),
                CellValue::DateTime(date),
                CellValue::Number(12.5),
            ],
        ],
    );
    let workbook = Workbook::from_sheets(vec![sheet]);
    let analysis = analyzer.analyze(&workbook);
    let records = analyzer.extract(&workbook, &analysis).into_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].case_id, "113001");
    assert_eq!(records[0].case_reason.as_deref(), Some("2024-03-01"));
    assert_eq!(records[0].division.as_deref(), Some("12.5"));
}
