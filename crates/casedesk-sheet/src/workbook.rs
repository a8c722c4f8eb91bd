//! Workbook loading.
//!
//! Spreadsheet formats go through `calamine`; `.csv` files are read as a single sheet named
//! after the file stem. Either way the result is a [`Workbook`] of dense [`SheetGrid`]s.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use thiserror::Error;

use crate::grid::{CellValue, SheetGrid, Workbook};

#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("failed to open workbook {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },
    #[error("failed to read sheet `{sheet}` of {path}")]
    Sheet {
        path: PathBuf,
        sheet: String,
        #[source]
        source: calamine::Error,
    },
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse csv {path}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Load every sheet of the workbook at `path`, in workbook order.
pub fn read_workbook(path: impl AsRef<Path>) -> Result<Workbook, WorkbookError> {
    let path = path.as_ref();
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    let sheets = if is_csv {
        vec![read_csv_sheet(path)?]
    } else {
        read_calamine_sheets(path)?
    };

    Ok(Workbook {
        source: Some(path.to_path_buf()),
        sheets,
    })
}

fn read_calamine_sheets(path: &Path) -> Result<Vec<SheetGrid>, WorkbookError> {
    let mut workbook = open_workbook_auto(path).map_err(|source| WorkbookError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let sheet_names = workbook.sheet_names().to_owned();
    let mut sheets = Vec::with_capacity(sheet_names.len());
    for sheet_name in sheet_names {
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|source| WorkbookError::Sheet {
                path: path.to_path_buf(),
                sheet: sheet_name.clone(),
                source,
            })?;

        // NOTE: calamine ranges start at the first used cell. Pad so indices stay absolute
        // worksheet coordinates (the header row index is reported to users).
        let (row_offset, col_offset) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));

        let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); row_offset];
        for source_row in range.rows() {
            let mut row = Vec::with_capacity(col_offset + source_row.len());
            row.resize(col_offset, CellValue::Empty);
            row.extend(source_row.iter().map(convert_value));
            rows.push(row);
        }

        log::debug!(
            "read sheet `{sheet_name}`: {} rows from {}",
            rows.len(),
            path.display()
        );
        sheets.push(SheetGrid::new(sheet_name, rows));
    }
    Ok(sheets)
}

fn convert_value(value: &Data) -> CellValue {
    match value {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => CellValue::DateTime(datetime),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Error(format!("{e:?}")),
    }
}

fn read_csv_sheet(path: &Path) -> Result<SheetGrid, WorkbookError> {
    let bytes = std::fs::read(path).map_err(|source| WorkbookError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = decode_text(&bytes);

    let mut reader = csv::ReaderBuilder::new()
        // Header rows are detected heuristically, never assumed.
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| WorkbookError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::text(field)
                    }
                })
                .collect(),
        );
    }

    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Sheet1".to_string());
    Ok(SheetGrid::new(name, rows))
}

/// Decode CSV bytes as UTF-8 (dropping a BOM), falling back to Big5 for legacy exports.
fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (decoded, _, had_errors) = encoding_rs::BIG5.decode(bytes);
            if had_errors {
                log::warn!("csv input is neither valid UTF-8 nor Big5; replaced invalid bytes");
            }
            decoded.into_owned()
        }
    }
}
