use std::collections::BTreeMap;
use std::path::Path;

use crate::cell::CellRef;
use crate::document::{CellStyle, CellValue, SpreadsheetDocument};
use crate::error::{RenderError, Result};
use crate::xlsx;

pub(crate) const MAX_SHEET_NAME_CHARS: usize = 31;
pub(crate) const FORBIDDEN_SHEET_NAME_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub style: Option<CellStyle>,
}

/// One worksheet: sparse rows of sparse cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    rows: BTreeMap<u32, BTreeMap<u32, Cell>>,
    column_widths: BTreeMap<u32, f64>,
}

impl Sheet {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rows: BTreeMap::new(),
            column_widths: BTreeMap::new(),
        }
    }

    pub fn cell(&self, cell: CellRef) -> Option<&Cell> {
        self.rows.get(&cell.row)?.get(&cell.column)
    }

    pub fn value(&self, cell: CellRef) -> CellValue {
        self.cell(cell).map(|c| c.value.clone()).unwrap_or_default()
    }

    pub fn put(&mut self, cell: CellRef, value: CellValue) {
        self.cell_mut(cell).value = value;
    }

    pub fn set_style(&mut self, cell: CellRef, style: CellStyle) {
        self.cell_mut(cell).style = Some(style);
    }

    pub fn set_column_width(&mut self, column: u32, width: f64) {
        self.column_widths.insert(column, width);
    }

    pub fn column_width(&self, column: u32) -> Option<f64> {
        self.column_widths.get(&column).copied()
    }

    pub fn column_widths(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.column_widths.iter().map(|(c, w)| (*c, *w))
    }

    /// Highest row index holding a cell, if any.
    pub fn last_row(&self) -> Option<u32> {
        self.rows.keys().next_back().copied()
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (CellRef, &Cell)> + '_ {
        self.rows.iter().flat_map(|(row, cells)| {
            cells
                .iter()
                .map(move |(column, cell)| (CellRef::new(*column, *row), cell))
        })
    }

    fn cell_mut(&mut self, cell: CellRef) -> &mut Cell {
        self.rows
            .entry(cell.row)
            .or_default()
            .entry(cell.column)
            .or_default()
    }

    fn duplicate_row(&mut self, row: u32) {
        let tail = self.rows.split_off(&(row + 1));
        let copy = self.rows.get(&row).cloned();
        for (index, cells) in tail {
            self.rows.insert(index + 1, cells);
        }
        if let Some(copy) = copy {
            self.rows.insert(row + 1, copy);
        }
    }
}

/// In-memory workbook.
///
/// Loaded from `.xlsx` with calamine (cell values only) and saved with
/// rust_xlsxwriter, so everything in between is plain data and can be
/// exercised in tests without touching the filesystem.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sheet(&mut self, name: &str) -> Result<&mut Sheet> {
        validate_sheet_name(name)?;
        if self.position(name).is_some() {
            return Err(RenderError::SheetExists(name.to_string()));
        }
        self.sheets.push(Sheet::new(name));
        let last = self.sheets.len() - 1;
        Ok(&mut self.sheets[last])
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.position(name).map(|i| &self.sheets[i])
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    fn sheet_ref(&self, name: &str) -> Result<&Sheet> {
        self.sheet(name)
            .ok_or_else(|| RenderError::SheetNotFound(name.to_string()))
    }

    fn sheet_mut(&mut self, name: &str) -> Result<&mut Sheet> {
        match self.position(name) {
            Some(i) => Ok(&mut self.sheets[i]),
            None => Err(RenderError::SheetNotFound(name.to_string())),
        }
    }

    /// Sheet names are compared case-insensitively, as spreadsheet apps do.
    fn position(&self, name: &str) -> Option<usize> {
        self.sheets
            .iter()
            .position(|s| s.name.to_lowercase() == name.to_lowercase())
    }
}

impl SpreadsheetDocument for Workbook {
    fn open(path: &Path) -> Result<Self> {
        xlsx::read_workbook(path)
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn clone_sheet(&mut self, source: &str, target: &str) -> Result<()> {
        let mut copy = self.sheet_ref(source)?.clone();
        copy.name = target.to_string();
        self.add_sheet(target)?;
        let last = self.sheets.len() - 1;
        self.sheets[last] = copy;
        Ok(())
    }

    fn find_text(&self, sheet: &str, text: &str) -> Result<Option<CellRef>> {
        Ok(self
            .sheet_ref(sheet)?
            .cells()
            .find(|(_, cell)| cell.value.as_text() == Some(text))
            .map(|(cell, _)| cell))
    }

    fn cell_value(&self, sheet: &str, cell: CellRef) -> Result<CellValue> {
        Ok(self.sheet_ref(sheet)?.value(cell))
    }

    fn set_cell(&mut self, sheet: &str, cell: CellRef, value: CellValue) -> Result<()> {
        self.sheet_mut(sheet)?.put(cell, value);
        Ok(())
    }

    fn cell_style(&self, sheet: &str, cell: CellRef) -> Result<Option<CellStyle>> {
        Ok(self
            .sheet_ref(sheet)?
            .cell(cell)
            .and_then(|c| c.style.clone()))
    }

    fn set_cell_style(&mut self, sheet: &str, cell: CellRef, style: CellStyle) -> Result<()> {
        self.sheet_mut(sheet)?.set_style(cell, style);
        Ok(())
    }

    fn duplicate_row(&mut self, sheet: &str, row: u32) -> Result<()> {
        self.sheet_mut(sheet)?.duplicate_row(row);
        Ok(())
    }

    fn set_column_width(&mut self, sheet: &str, column: u32, width: f64) -> Result<()> {
        self.sheet_mut(sheet)?.column_widths.insert(column, width);
        Ok(())
    }

    fn delete_sheet(&mut self, sheet: &str) -> Result<()> {
        match self.position(sheet) {
            Some(i) => {
                self.sheets.remove(i);
                Ok(())
            }
            None => Err(RenderError::SheetNotFound(sheet.to_string())),
        }
    }

    fn save(&self, path: &Path) -> Result<()> {
        xlsx::write_workbook(self, path)
    }
}

fn validate_sheet_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name.chars().count() > MAX_SHEET_NAME_CHARS
        || name.contains(FORBIDDEN_SHEET_NAME_CHARS)
        || name.starts_with('\'')
        || name.ends_with('\'');
    if invalid {
        return Err(RenderError::InvalidSheetName(name.to_string()));
    }
    Ok(())
}
