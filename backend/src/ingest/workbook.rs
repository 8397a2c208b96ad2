//! Access to the legacy `.xls` spreadsheets of the individual schedule.
//!
//! The parser only ever needs "the text of cell (row, col)", so sheets are
//! exposed through the small [`CellGrid`] trait. Out-of-range cells read as
//! empty strings.

use calamine::{Data, Range, Reader, Xls, XlsOptions};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::error::{ParseError, WorkbookError};

/// Windows-1251, the code page the schedule office saves its files in.
pub const CYRILLIC_CODEPAGE: u16 = 1251;

/// Read-only grid of cell texts.
pub trait CellGrid {
    /// Text of the cell at zero-based `(row, col)`; empty when absent.
    fn cell(&self, row: usize, col: usize) -> String;

    /// Number of rows, counted from row 0.
    fn row_count(&self) -> usize;
}

impl CellGrid for Range<Data> {
    fn cell(&self, row: usize, col: usize) -> String {
        let (Ok(row), Ok(col)) = (u32::try_from(row), u32::try_from(col)) else {
            return String::new();
        };
        self.get_value((row, col)).map(cell_text).unwrap_or_default()
    }

    fn row_count(&self) -> usize {
        self.end().map(|(row, _)| row as usize + 1).unwrap_or(0)
    }
}

/// Cell text as the office tools display it: whole numbers without a fraction.
fn cell_text(value: &Data) -> String {
    match value {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

/// Every `.xls` file under `root`, recursively, in path order.
///
/// # Errors
/// * [`ParseError::Discovery`] if the directory walk fails
/// * [`ParseError::NoInputFiles`] if no spreadsheet is found
pub fn discover_workbooks(root: &Path) -> Result<Vec<PathBuf>, ParseError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|source| ParseError::Discovery {
            root: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && has_xls_extension(entry.path()) {
            files.push(entry.into_path());
        }
    }

    if files.is_empty() {
        return Err(ParseError::NoInputFiles(root.to_path_buf()));
    }

    files.sort();
    Ok(files)
}

fn has_xls_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xls"))
}

/// First worksheet of the workbook at `path`, or `None` if it has no sheets.
pub fn open_first_sheet(path: &Path) -> Result<Option<Range<Data>>, WorkbookError> {
    let file = File::open(path).map_err(|source| WorkbookError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut options = XlsOptions::default();
    options.force_codepage = Some(CYRILLIC_CODEPAGE);

    let read_error = |source| WorkbookError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut workbook = Xls::new_with_options(BufReader::new(file), options).map_err(read_error)?;

    workbook.worksheet_range_at(0).transpose().map_err(read_error)
}

#[cfg(test)]
impl CellGrid for Vec<Vec<String>> {
    fn cell(&self, row: usize, col: usize) -> String {
        self.get(row)
            .and_then(|cells| cells.get(col))
            .cloned()
            .unwrap_or_default()
    }

    fn row_count(&self) -> usize {
        self.len()
    }
}
