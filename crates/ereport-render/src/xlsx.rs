//! `.xlsx` file I/O for [`Workbook`].

use std::path::{Path, PathBuf};

use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::{Color, Format, FormatAlign};
use tracing::debug;

use crate::cell::CellRef;
use crate::document::{CellStyle, CellValue, HorizontalAlign};
use crate::error::{RenderError, Result};
use crate::styles::read_styles;
use crate::workbook::Workbook;

/// Highest column index an xlsx worksheet can address (`XFD`).
const MAX_COLUMN: u32 = 16_383;

/// Read every sheet's cell values, cell styles and column widths.
///
/// calamine reads the values; the style parts it skips come from
/// [`read_styles`].
pub fn read_workbook(path: &Path) -> Result<Workbook> {
    let mut source: Xlsx<_> = open_workbook(path)?;
    let mut styles = read_styles(path)?;
    let mut workbook = Workbook::new();

    for name in source.sheet_names() {
        let range = source.worksheet_range(&name)?;
        let (first_row, first_column) = range.start().unwrap_or((0, 0));
        let sheet = workbook.add_sheet(&name)?;

        for (row, column, data) in range.used_cells() {
            let value = match data {
                Data::Empty => continue,
                Data::String(s) => CellValue::Text(s.clone()),
                Data::Float(f) => CellValue::Number(*f),
                Data::Int(i) => CellValue::Number(*i as f64),
                Data::Bool(b) => CellValue::Bool(*b),
                other => CellValue::Text(other.to_string()),
            };
            let cell = CellRef::new(first_column + column as u32, first_row + row as u32 + 1);
            sheet.put(cell, value);
        }

        if let Some(found) = styles.remove(&name) {
            for (cell, style) in found.cells {
                sheet.set_style(cell, style);
            }
            for (column, width) in found.column_widths {
                sheet.set_column_width(column, width);
            }
        }
    }

    debug!(path = %path.display(), sheets = workbook.sheets().len(), "workbook loaded");
    Ok(workbook)
}

/// Write `workbook` to `path`.
///
/// The file is written next to its destination and renamed into place, so a
/// failed save never leaves a truncated report behind.
pub fn write_workbook(workbook: &Workbook, path: &Path) -> Result<()> {
    let mut out = rust_xlsxwriter::Workbook::new();

    for sheet in workbook.sheets() {
        let worksheet = out.add_worksheet();
        worksheet.set_name(sheet.name.as_str())?;

        for (cell, content) in sheet.cells() {
            let row = cell.row - 1;
            let column = column_number(cell.column)?;
            let format = content.style.as_ref().map_or_else(Format::new, to_format);
            match &content.value {
                CellValue::Text(s) => {
                    worksheet.write_string_with_format(row, column, s.as_str(), &format)?
                }
                CellValue::Number(n) => {
                    worksheet.write_number_with_format(row, column, *n, &format)?
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean_with_format(row, column, *b, &format)?
                }
                CellValue::Empty => worksheet.write_blank(row, column, &format)?,
            };
        }

        for (column, width) in sheet.column_widths() {
            worksheet.set_column_width(column_number(column)?, width)?;
        }
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let staging = staging_path(path);
    if let Err(e) = out.save(&staging) {
        let _ = std::fs::remove_file(&staging);
        return Err(e.into());
    }
    std::fs::rename(&staging, path)?;

    debug!(path = %path.display(), "workbook saved");
    Ok(())
}

fn column_number(column: u32) -> Result<u16> {
    if column > MAX_COLUMN {
        return Err(RenderError::ColumnOutOfRange(column));
    }
    u16::try_from(column).map_err(|_| RenderError::ColumnOutOfRange(column))
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

fn to_format(style: &CellStyle) -> Format {
    let mut format = Format::new();
    if let Some(align) = style.horizontal {
        format = format.set_align(match align {
            HorizontalAlign::Left => FormatAlign::Left,
            HorizontalAlign::Center => FormatAlign::Center,
            HorizontalAlign::Right => FormatAlign::Right,
        });
    }
    if let Some(number_format) = &style.number_format {
        format = format.set_num_format(number_format);
    }
    if style.bold {
        format = format.set_bold();
    }
    if style.italic {
        format = format.set_italic();
    }
    if let Some(color) = style.font_color {
        format = format.set_font_color(Color::RGB(color));
    }
    if let Some(color) = style.fill_color {
        format = format.set_background_color(Color::RGB(color));
    }
    format
}
