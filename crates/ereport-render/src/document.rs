use std::path::Path;

use crate::cell::CellRef;
use crate::error::Result;

/// Value stored in a cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
}

/// The subset of cell formatting the renderer reads and writes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellStyle {
    pub horizontal: Option<HorizontalAlign>,
    /// Excel number format code, e.g. `0.00`.
    pub number_format: Option<String>,
    pub bold: bool,
    pub italic: bool,
    /// Font color as `0xRRGGBB`.
    pub font_color: Option<u32>,
    /// Solid fill color as `0xRRGGBB`.
    pub fill_color: Option<u32>,
}

/// Operations the report renderer needs from a spreadsheet.
///
/// Sheets are addressed by name, cells by [`CellRef`].
pub trait SpreadsheetDocument {
    fn open(path: &Path) -> Result<Self>
    where
        Self: Sized;

    /// Sheet names in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    /// Copy every cell, style and column width of `source` into a new sheet
    /// named `target`, appended after the existing sheets.
    fn clone_sheet(&mut self, source: &str, target: &str) -> Result<()>;

    /// First cell (row-major) whose text equals `text`.
    fn find_text(&self, sheet: &str, text: &str) -> Result<Option<CellRef>>;

    fn cell_value(&self, sheet: &str, cell: CellRef) -> Result<CellValue>;

    /// Replace the value of a cell, keeping its style.
    fn set_cell(&mut self, sheet: &str, cell: CellRef, value: CellValue) -> Result<()>;

    fn cell_style(&self, sheet: &str, cell: CellRef) -> Result<Option<CellStyle>>;

    fn set_cell_style(&mut self, sheet: &str, cell: CellRef, style: CellStyle) -> Result<()>;

    /// Insert a copy of `row` directly below it, shifting later rows down.
    fn duplicate_row(&mut self, sheet: &str, row: u32) -> Result<()>;

    fn set_column_width(&mut self, sheet: &str, column: u32, width: f64) -> Result<()>;

    fn delete_sheet(&mut self, sheet: &str) -> Result<()>;

    fn save(&self, path: &Path) -> Result<()>;
}
