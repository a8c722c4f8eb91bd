use std::path::Path;

use casedesk_sheet::{read_workbook, SheetStatus, SpreadsheetAnalyzer, WorkbookError};
use pretty_assertions::assert_eq;
use rust_xlsxwriter::Workbook;

fn write_fixture(path: &Path) {
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("民事案件").expect("sheet name");
        sheet.write_string(0, 0, "民事案件清冊").expect("write");
        let header = ["案件編號", "當事人", "機關", "案號", "承辦律師"];
        for (col, label) in header.iter().enumerate() {
            sheet.write_string(2, col as u16, *label).expect("write");
        }
        sheet.write_number(3, 0, 113001.0).expect("write");
        sheet.write_string(3, 1, "張三").expect("write");
        sheet.write_string(3, 2, "台北地院").expect("write");
        sheet.write_string(3, 3, "113訴字1號").expect("write");
        sheet.write_string(3, 4, "王律師").expect("write");
        sheet.write_string(5, 2, "士林地院").expect("write");
        sheet.write_string(6, 1, "李四").expect("write");
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("備註").expect("sheet name");
        sheet.write_string(0, 0, "本表僅供內部使用").expect("write");
    }
    workbook.save(path).expect("save fixture");
}

#[test]
fn analyzes_xlsx_written_by_another_tool() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let path = tmp.path().join("cases.xlsx");
    write_fixture(&path);

    let analyzer = SpreadsheetAnalyzer::default();
    let (workbook, analysis) = analyzer.analyze_path(&path).expect("analyze");

    assert_eq!(workbook.sheets.len(), 2);
    assert!(analysis.success);
    let civil = analysis.sheet("民事案件").expect("civil sheet");
    assert_eq!(civil.status, SheetStatus::Processable);
    assert_eq!(civil.header_row, Some(2));
    assert_eq!(civil.total_data_rows, 3);
    assert_eq!(
        analysis.sheet("備註").map(|s| s.status),
        Some(SheetStatus::NoHeaderRow)
    );

    let extraction = analyzer.extract(&workbook, &analysis);
    assert_eq!(extraction.rows_skipped(), 1);
    let records = extraction.into_records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].case_id, "113001");
    assert_eq!(records[0].case_number.as_deref(), Some("台北地院-113訴字1號"));
    assert_eq!(records[0].lawyer.as_deref(), Some("王律師"));
    assert_eq!(records[1].client, "李四");
    assert_eq!(records[1].case_number, None);
}

#[test]
fn reads_csv_as_single_sheet() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let path = tmp.path().join("刑事委任.csv");
    std::fs::write(
        &path,
        "\u{feff}委任人,案由,法院\n張三,詐欺,\"台北\r\n地院\"\n,,\n",
    )
    .expect("write csv");

    let analyzer = SpreadsheetAnalyzer::default();
    let (workbook, analysis) = analyzer.analyze_path(&path).expect("analyze");
    assert_eq!(workbook.sheets[0].name, "刑事委任");
    assert_eq!(analysis.sheets[0].case_type, "criminal");

    let records = analyzer.extract(&workbook, &analysis).into_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].court.as_deref(), Some("台北 地院"));
}

#[test]
fn unreadable_workbook_is_an_error() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let path = tmp.path().join("broken.xlsx");
    std::fs::write(&path, b"not a zip archive").expect("write");
    assert!(matches!(
        read_workbook(&path),
        Err(WorkbookError::Open { .. })
    ));
}
