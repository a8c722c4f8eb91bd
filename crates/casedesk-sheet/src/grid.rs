use std::path::PathBuf;

use casedesk_model::clean_text;
use chrono::{NaiveDateTime, Timelike as _};

/// A single cell value as read from the source workbook.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    /// Spreadsheet error cells (`#N/A`, `#REF!`, ...). Never produce a field value.
    Error(String),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    /// The cell rendered as an unclean string, or `None` for empty/error cells.
    ///
    /// Numbers keep full precision: integral values drop the fractional part (`113.0` ->
    /// `"113"`), everything else uses the shortest representation that round-trips.
    pub fn raw_text(&self) -> Option<String> {
        match self {
            CellValue::Empty | CellValue::Error(_) => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Int(i) => Some(i.to_string()),
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::Bool(true) => Some("TRUE".to_string()),
            CellValue::Bool(false) => Some("FALSE".to_string()),
            CellValue::DateTime(dt) => Some(format_datetime(dt)),
        }
    }

    /// The cell after the record cleaning rules (see [`clean_text`]).
    pub fn cleaned(&self) -> Option<String> {
        self.raw_text().as_deref().and_then(clean_text)
    }

    pub fn is_blank(&self) -> bool {
        self.cleaned().is_none()
    }
}

fn format_number(n: f64) -> String {
    // Integral floats up to 2^53 are exact; print them like integers so ids such as `113001`
    // typed into a numeric cell survive unchanged.
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn format_datetime(dt: &NaiveDateTime) -> String {
    let time = dt.time();
    if time.hour() == 0 && time.minute() == 0 && time.second() == 0 {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// One worksheet as a dense grid of rows, in file order.
///
/// Row and column indices are absolute (0-based) worksheet coordinates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetGrid {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetGrid {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Convenience constructor for text-only grids (tests, CSV input).
    pub fn from_text_rows<R, C>(name: impl Into<String>, rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| {
                        let cell = cell.as_ref();
                        if cell.is_empty() {
                            CellValue::Empty
                        } else {
                            CellValue::text(cell)
                        }
                    })
                    .collect()
            })
            .collect();
        Self::new(name, rows)
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&CellValue::Empty)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_row_blank(&self, row: usize) -> bool {
        self.rows
            .get(row)
            .map_or(true, |cells| cells.iter().all(CellValue::is_blank))
    }
}

/// All sheets of one workbook, in workbook order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    pub source: Option<PathBuf>,
    pub sheets: Vec<SheetGrid>,
}

impl Workbook {
    pub fn from_sheets(sheets: Vec<SheetGrid>) -> Self {
        Self {
            source: None,
            sheets,
        }
    }

    pub fn sheet(&self, name: &str) -> Option<&SheetGrid> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }
}
