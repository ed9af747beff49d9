use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use ereport_core::{ResultSet, Scalar};
use tracing::{debug, info, warn};

use crate::cell::CellRef;
use crate::document::{CellStyle, CellValue, HorizontalAlign, SpreadsheetDocument};
use crate::error::{RenderError, Result};
use crate::value::{classify, content_width, Classified, NULL_TEXT};
use crate::workbook::{Workbook, FORBIDDEN_SHEET_NAME_CHARS, MAX_SHEET_NAME_CHARS};

pub const TITLE_PLACEHOLDER: &str = "{{title}}";
pub const DATE_PLACEHOLDER: &str = "{{date}}";
pub const HEADERS_PLACEHOLDER: &str = "{{headers}}";
pub const ROWS_PLACEHOLDER: &str = "{{rows}}";

/// Data rows rendered per sheet. Rows past this are dropped.
pub const MAX_RENDERED_ROWS: usize = 500;

/// Written into the first rows cell when a result set is empty.
pub const NO_DATA: &str = "No data";

/// Generation timestamp shown at `{{date}}`, e.g. `Mon Jan 2 15:04:05`.
pub const GENERATED_AT_FORMAT: &str = "%a %b %-d %H:%M:%S";

const HEADER_WIDTH_FACTOR: f64 = 1.4;
const HEADER_WIDTH_PADDING: f64 = 2.0;
const COLUMN_WIDTH_PADDING: f64 = 1.5;

/// Used when a title has no usable characters left.
const FALLBACK_SHEET_NAME: &str = "Sheet";

const NUMBER_FORMAT: &str = "0.00";
const DATE_FORMAT: &str = "yyyy/mm/dd";

/// Renders result sets into copies of a template workbook.
///
/// The template's first sheet is cloned once per result set, its placeholders
/// filled in, and removed before saving.
#[derive(Debug, Clone)]
pub struct ReportRenderer {
    template_path: PathBuf,
}

impl ReportRenderer {
    pub fn new(template_path: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
        }
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    /// Render `result_sets` into a new workbook at `output`, stamped with the
    /// local time.
    pub fn render(&self, result_sets: &[ResultSet], output: &Path) -> Result<()> {
        self.render_at(result_sets, output, Local::now().naive_local())
    }

    pub fn render_at(
        &self,
        result_sets: &[ResultSet],
        output: &Path,
        generated_at: NaiveDateTime,
    ) -> Result<()> {
        let mut doc = Workbook::open(&self.template_path)?;
        render_document(&mut doc, result_sets, generated_at)?;
        doc.save(output)?;
        info!(
            output = %output.display(),
            sheets = result_sets.len(),
            "report rendered"
        );
        Ok(())
    }
}

/// Fill `doc` with one sheet per result set, in order, then delete the
/// template sheet. Nothing is saved.
pub fn render_document<D: SpreadsheetDocument>(
    doc: &mut D,
    result_sets: &[ResultSet],
    generated_at: NaiveDateTime,
) -> Result<()> {
    if result_sets.is_empty() {
        return Err(RenderError::NothingToRender);
    }
    let template = doc
        .sheet_names()
        .into_iter()
        .next()
        .ok_or(RenderError::EmptyTemplate)?;
    let date_text = generated_at.format(GENERATED_AT_FORMAT).to_string();

    for set in result_sets {
        let name = sheet_name(&set.title, &doc.sheet_names());
        let sheet = name.as_str();
        if sheet != set.title {
            debug!(title = %set.title, sheet, "panel title adjusted for sheet name");
        }
        debug!(sheet, rows = set.rows.len(), "creating sheet");

        doc.clone_sheet(&template, sheet)?;

        let title = locate(doc, sheet, TITLE_PLACEHOLDER)?;
        doc.set_cell(sheet, title, CellValue::Text(set.title.clone()))?;
        let date = locate(doc, sheet, DATE_PLACEHOLDER)?;
        doc.set_cell(sheet, date, CellValue::Text(date_text.clone()))?;

        write_headers(doc, sheet, &set.columns)?;
        write_rows(doc, sheet, &set.columns, &set.rows)?;
        set_column_widths(doc, sheet, &set.columns, &set.rows)?;
    }

    doc.delete_sheet(&template)?;
    Ok(())
}

/// A sheet name for `title` that spreadsheet apps accept and that is not in
/// `taken` (case-insensitively). Forbidden characters become `_`, the name is
/// cut to 31 characters and a repeated name gets a ` (2)`, ` (3)`... suffix.
pub fn sheet_name(title: &str, taken: &[String]) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| if FORBIDDEN_SHEET_NAME_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'').trim();
    let base = if cleaned.is_empty() {
        FALLBACK_SHEET_NAME
    } else {
        cleaned
    };

    let is_taken = |name: &str| taken.iter().any(|t| t.to_lowercase() == name.to_lowercase());
    let first = truncate_chars(base, MAX_SHEET_NAME_CHARS)
        .trim_end_matches('\'')
        .to_string();
    if !is_taken(&first) {
        return first;
    }
    (2..)
        .map(|n| {
            let suffix = format!(" ({n})");
            let stem = truncate_chars(base, MAX_SHEET_NAME_CHARS - suffix.chars().count());
            format!("{}{suffix}", stem.trim_end_matches('\''))
        })
        .find(|name| !is_taken(name))
        .unwrap_or(first)
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn locate<D: SpreadsheetDocument>(doc: &D, sheet: &str, placeholder: &str) -> Result<CellRef> {
    doc.find_text(sheet, placeholder)?
        .ok_or_else(|| RenderError::PlaceholderNotFound {
            sheet: sheet.to_string(),
            placeholder: placeholder.to_string(),
        })
}

/// Headers start in column A of the placeholder row and take the style of
/// that row's first cell.
fn write_headers<D: SpreadsheetDocument>(doc: &mut D, sheet: &str, columns: &[String]) -> Result<()> {
    let placeholder = locate(doc, sheet, HEADERS_PLACEHOLDER)?;
    let row = placeholder.row;
    let style = doc.cell_style(sheet, CellRef::new(0, row))?;
    doc.set_cell(sheet, placeholder, CellValue::Empty)?;

    if columns.is_empty() {
        return doc.set_cell(sheet, CellRef::new(0, row), CellValue::Text(String::new()));
    }
    for (index, column) in columns.iter().enumerate() {
        let cell = CellRef::new(index as u32, row);
        write_value(doc, sheet, cell, &Scalar::Text(column.clone()), style.as_ref())?;
    }
    Ok(())
}

fn write_rows<D: SpreadsheetDocument>(
    doc: &mut D,
    sheet: &str,
    columns: &[String],
    rows: &[Vec<Scalar>],
) -> Result<()> {
    let first_row = locate(doc, sheet, ROWS_PLACEHOLDER)?.row;
    let style = doc.cell_style(sheet, CellRef::new(0, first_row))?;

    if rows.is_empty() {
        doc.set_cell(sheet, CellRef::new(0, first_row), CellValue::from(NO_DATA))?;
        return clear_placeholders(doc, sheet, ROWS_PLACEHOLDER);
    }

    let rendered = rows.len().min(MAX_RENDERED_ROWS);
    if rendered < rows.len() {
        warn!(
            sheet,
            rows = rows.len(),
            limit = MAX_RENDERED_ROWS,
            "result set truncated"
        );
    }
    let mismatched = rows[..rendered]
        .iter()
        .filter(|row| !columns.is_empty() && row.len() != columns.len())
        .count();
    if mismatched > 0 {
        warn!(
            sheet,
            mismatched,
            columns = columns.len(),
            "row length differs from column count"
        );
    }

    for _ in 0..rendered {
        doc.duplicate_row(sheet, first_row)?;
    }

    for (offset, row) in rows[..rendered].iter().enumerate() {
        let row_index = first_row + offset as u32;
        for (column, value) in row.iter().take(row_width(columns, row)).enumerate() {
            let cell = CellRef::new(column as u32, row_index);
            write_value(doc, sheet, cell, value, style.as_ref())?;
        }
    }

    // The last copy of the placeholder row stays unused.
    clear_placeholders(doc, sheet, ROWS_PLACEHOLDER)
}

fn clear_placeholders<D: SpreadsheetDocument>(doc: &mut D, sheet: &str, placeholder: &str) -> Result<()> {
    while let Some(cell) = doc.find_text(sheet, placeholder)? {
        doc.set_cell(sheet, cell, CellValue::Empty)?;
    }
    Ok(())
}

/// Cells written for `row`: never more than there are columns, when columns
/// are known.
fn row_width(columns: &[String], row: &[Scalar]) -> usize {
    if columns.is_empty() {
        row.len()
    } else {
        row.len().min(columns.len())
    }
}

fn write_value<D: SpreadsheetDocument>(
    doc: &mut D,
    sheet: &str,
    cell: CellRef,
    value: &Scalar,
    base_style: Option<&CellStyle>,
) -> Result<()> {
    let (content, style) = match classify(value) {
        Classified::Date(text) => {
            let mut style = base_style.cloned().unwrap_or_default();
            style.horizontal = Some(HorizontalAlign::Right);
            style.number_format = Some(DATE_FORMAT.to_string());
            (CellValue::Text(text), Some(style))
        }
        Classified::Number(n) => {
            let mut style = base_style.cloned().unwrap_or_default();
            style.number_format = Some(NUMBER_FORMAT.to_string());
            (CellValue::Number(n), Some(style))
        }
        Classified::Bool(b) => (CellValue::Bool(b), base_style.cloned()),
        Classified::Text(text) => (CellValue::Text(text), base_style.cloned()),
        Classified::Null => (CellValue::from(NULL_TEXT), base_style.cloned()),
    };
    if let Some(style) = style {
        doc.set_cell_style(sheet, cell, style)?;
    }
    doc.set_cell(sheet, cell, content)
}

/// Size each column to its widest content. Headers are weighted for their
/// larger font. Empty result sets keep the template's widths.
fn set_column_widths<D: SpreadsheetDocument>(
    doc: &mut D,
    sheet: &str,
    columns: &[String],
    rows: &[Vec<Scalar>],
) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut widths: Vec<f64> = columns
        .iter()
        .map(|c| HEADER_WIDTH_FACTOR * (HEADER_WIDTH_PADDING + c.chars().count() as f64))
        .collect();

    for row in rows.iter().take(MAX_RENDERED_ROWS) {
        for (column, value) in row.iter().take(row_width(columns, row)).enumerate() {
            let Some(width) = content_width(value) else {
                continue;
            };
            if column >= widths.len() {
                widths.resize(column + 1, 0.0);
            }
            widths[column] = widths[column].max(width);
        }
    }

    for (column, width) in widths.into_iter().enumerate() {
        doc.set_column_width(sheet, column as u32, COLUMN_WIDTH_PADDING + width)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 7)
            .unwrap()
            .and_hms_opt(9, 5, 3)
            .unwrap()
    }

    fn template() -> Workbook {
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet("templateSheet").unwrap();
        sheet.put(CellRef::new(0, 1), CellValue::from(TITLE_PLACEHOLDER));
        sheet.put(CellRef::new(2, 1), CellValue::from(DATE_PLACEHOLDER));
        sheet.put(CellRef::new(0, 3), CellValue::from(HEADERS_PLACEHOLDER));
        sheet.set_style(
            CellRef::new(0, 3),
            CellStyle {
                bold: true,
                ..CellStyle::default()
            },
        );
        sheet.put(CellRef::new(0, 4), CellValue::from(ROWS_PLACEHOLDER));
        sheet.set_style(
            CellRef::new(0, 4),
            CellStyle {
                horizontal: Some(HorizontalAlign::Center),
                ..CellStyle::default()
            },
        );
        sheet.put(CellRef::new(0, 6), CellValue::from("footer"));
        wb
    }

    fn result_set(title: &str, columns: &[&str], rows: Vec<Vec<Scalar>>) -> ResultSet {
        ResultSet::new(title, columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    fn render(wb: &mut Workbook, sets: &[ResultSet]) -> Result<()> {
        render_document(wb, sets, generated_at())
    }

    #[test]
    fn fills_title_date_and_headers() {
        let mut wb = template();
        let set = result_set("Stock", &["item", "qty"], vec![vec!["tea".into(), 3.0.into()]]);
        render(&mut wb, &[set]).unwrap();

        let sheet = wb.sheet("Stock").unwrap();
        assert_eq!(sheet.value(CellRef::new(0, 1)), CellValue::from("Stock"));
        assert_eq!(
            sheet.value(CellRef::new(2, 1)),
            CellValue::from("Sun Jan 7 09:05:03")
        );
        assert_eq!(sheet.value(CellRef::new(0, 3)), CellValue::from("item"));
        assert_eq!(sheet.value(CellRef::new(1, 3)), CellValue::from("qty"));
        let header_style = sheet.cell(CellRef::new(1, 3)).unwrap().style.clone();
        assert!(header_style.unwrap().bold);
    }

    #[test]
    fn empty_result_set_writes_no_data() {
        let mut wb = template();
        render(&mut wb, &[result_set("Empty", &["a"], vec![])]).unwrap();

        let sheet = wb.sheet("Empty").unwrap();
        assert_eq!(sheet.value(CellRef::new(0, 4)), CellValue::from(NO_DATA));
        assert_eq!(sheet.value(CellRef::new(0, 5)), CellValue::Empty);
        assert_eq!(sheet.value(CellRef::new(0, 6)), CellValue::from("footer"));
        assert_eq!(sheet.column_width(0), None);
    }

    #[test]
    fn rows_are_capped() {
        let rows = (0..1200).map(|i| vec![Scalar::Number(i as f64)]).collect();
        let mut wb = template();
        render(&mut wb, &[result_set("Big", &["n"], rows)]).unwrap();

        let sheet = wb.sheet("Big").unwrap();
        assert_eq!(sheet.value(CellRef::new(0, 4)), CellValue::Number(0.0));
        assert_eq!(sheet.value(CellRef::new(0, 503)), CellValue::Number(499.0));
        assert_eq!(sheet.value(CellRef::new(0, 504)), CellValue::Empty);
        assert_eq!(sheet.value(CellRef::new(0, 505)), CellValue::Empty);
        assert_eq!(sheet.value(CellRef::new(0, 506)), CellValue::from("footer"));
        assert_eq!(sheet.last_row(), Some(506));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.xlsx");
        wb.save(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn values_are_written_by_type() {
        let row = vec![
            Scalar::Number(1_614_834_367_000.0),
            Scalar::Text("2021-03-04T05:06:07Z".into()),
            Scalar::Bool(true),
            Scalar::Text("abc".into()),
            Scalar::Number(2.5),
            Scalar::Null,
        ];
        let mut wb = template();
        render(
            &mut wb,
            &[result_set("Types", &["a", "b", "c", "d", "e", "f"], vec![row])],
        )
        .unwrap();

        let sheet = wb.sheet("Types").unwrap();
        let style = |column| sheet.cell(CellRef::new(column, 4)).unwrap().style.clone().unwrap();

        assert_eq!(sheet.value(CellRef::new(0, 4)), CellValue::from("2021/03/04"));
        assert_eq!(style(0).horizontal, Some(HorizontalAlign::Right));
        assert_eq!(style(0).number_format.as_deref(), Some(DATE_FORMAT));
        assert_eq!(sheet.value(CellRef::new(1, 4)), CellValue::from("2021/03/04"));
        assert_eq!(sheet.value(CellRef::new(2, 4)), CellValue::Bool(true));
        assert_eq!(sheet.value(CellRef::new(3, 4)), CellValue::from("abc"));
        assert_eq!(style(3).horizontal, Some(HorizontalAlign::Center));
        assert_eq!(sheet.value(CellRef::new(4, 4)), CellValue::Number(2.5));
        assert_eq!(style(4).number_format.as_deref(), Some(NUMBER_FORMAT));
        assert_eq!(style(4).horizontal, Some(HorizontalAlign::Center));
        assert_eq!(sheet.value(CellRef::new(5, 4)), CellValue::from("\n"));
    }

    #[test]
    fn missing_placeholder_is_template_error() {
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet("templateSheet").unwrap();
        sheet.put(CellRef::new(0, 1), CellValue::from(TITLE_PLACEHOLDER));
        let err = render(&mut wb, &[result_set("X", &["a"], vec![])]).unwrap_err();
        assert!(matches!(
            &err,
            RenderError::PlaceholderNotFound { placeholder, .. } if placeholder == DATE_PLACEHOLDER
        ));
        assert_eq!(err.code(), "TEMPLATE_ERROR");
    }

    #[test]
    fn duplicate_titles_get_numbered_sheets() {
        let mut wb = template();
        let sets = [
            result_set("Same", &["a"], vec![]),
            result_set("same", &["a"], vec![]),
            result_set("Same", &["a"], vec![]),
        ];
        render(&mut wb, &sets).unwrap();
        assert_eq!(
            wb.sheet_names(),
            vec!["Same".to_string(), "same (2)".to_string(), "Same (3)".to_string()]
        );
        let sheet = wb.sheet("same (2)").unwrap();
        assert_eq!(sheet.value(CellRef::new(0, 1)), CellValue::from("same"));
    }

    #[test]
    fn long_and_forbidden_titles_still_render() {
        let long = "Monthly stock on hand by facility 2024";
        let mut wb = template();
        let sets = [
            result_set(long, &["a"], vec![]),
            result_set("Stock in/out", &["a"], vec![]),
            result_set("[*?]", &["a"], vec![]),
            result_set("templateSheet", &["a"], vec![]),
        ];
        render(&mut wb, &sets).unwrap();

        assert_eq!(
            wb.sheet_names(),
            vec![
                "Monthly stock on hand by facili".to_string(),
                "Stock in_out".to_string(),
                "____".to_string(),
                "templateSheet (2)".to_string(),
            ]
        );
        // The full title still goes into the sheet body.
        let sheet = wb.sheet("Monthly stock on hand by facili").unwrap();
        assert_eq!(sheet.value(CellRef::new(0, 1)), CellValue::from(long));
        let sheet = wb.sheet("Stock in_out").unwrap();
        assert_eq!(sheet.value(CellRef::new(0, 1)), CellValue::from("Stock in/out"));
    }

    #[test]
    fn sheet_names_fit_with_suffix() {
        let long = "x".repeat(40);
        let taken = vec!["x".repeat(31)];
        let name = sheet_name(&long, &taken);
        assert_eq!(name, format!("{} (2)", "x".repeat(27)));
        assert_eq!(name.chars().count(), 31);
        assert_eq!(sheet_name("  'quoted'  ", &[]), "quoted");
        assert_eq!(sheet_name("", &[]), "Sheet");
        assert_eq!(sheet_name("Sheet", &["sheet".to_string()]), "Sheet (2)");
    }

    #[test]
    fn nothing_to_render() {
        let mut wb = template();
        assert!(matches!(
            render(&mut wb, &[]),
            Err(RenderError::NothingToRender)
        ));
        assert_eq!(wb.sheet_names(), vec!["templateSheet".to_string()]);
    }

    #[test]
    fn template_sheet_is_removed_and_order_kept() {
        let mut wb = template();
        let sets = [
            result_set("Second", &["a"], vec![]),
            result_set("First", &["a"], vec![]),
        ];
        render(&mut wb, &sets).unwrap();
        assert_eq!(
            wb.sheet_names(),
            vec!["Second".to_string(), "First".to_string()]
        );
    }

    #[test]
    fn columns_fit_widest_content() {
        let mut wb = template();
        let rows = vec![
            vec![Scalar::Text("abcdefghijklmnopqrstu".into()), Scalar::Number(12.5)],
            vec![Scalar::Null, Scalar::Bool(false)],
        ];
        render(&mut wb, &[result_set("W", &["name", "amount"], rows)]).unwrap();

        let sheet = wb.sheet("W").unwrap();
        // 21 characters beat the weighted header 1.4 * (2 + 4).
        assert_eq!(sheet.column_width(0), Some(22.5));
        // Weighted header 1.4 * (2 + 6) beats "12.5" + 3.
        let amount = sheet.column_width(1).unwrap();
        assert!((amount - 12.7).abs() < 1e-9, "width: {amount}");
    }

    #[test]
    fn mismatched_rows_are_truncated_to_columns() {
        let mut wb = template();
        let rows = vec![
            vec![1.0.into(), 2.0.into(), 3.0.into()],
            vec![4.0.into()],
        ];
        render(&mut wb, &[result_set("M", &["a", "b"], rows)]).unwrap();

        let sheet = wb.sheet("M").unwrap();
        assert_eq!(sheet.value(CellRef::new(1, 4)), CellValue::Number(2.0));
        assert_eq!(sheet.value(CellRef::new(2, 4)), CellValue::Empty);
        assert_eq!(sheet.value(CellRef::new(0, 5)), CellValue::Number(4.0));
        assert_eq!(sheet.value(CellRef::new(1, 5)), CellValue::Empty);
        assert_eq!(sheet.column_width(2), None);
    }

    #[test]
    fn empty_columns_blank_the_header_row() {
        let mut wb = template();
        render(&mut wb, &[result_set("C", &[], vec![vec!["x".into()]])]).unwrap();

        let sheet = wb.sheet("C").unwrap();
        assert_eq!(sheet.value(CellRef::new(0, 3)), CellValue::from(""));
        assert_eq!(sheet.value(CellRef::new(0, 4)), CellValue::from("x"));
    }

    #[test]
    fn renders_template_file_to_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("template.xlsx");
        template().save(&template_path).unwrap();

        let output = dir.path().join("out").join("Weekly stock.xlsx");
        let renderer = ReportRenderer::new(&template_path);
        let set = result_set("Stock", &["item", "qty"], vec![vec!["tea".into(), 3.0.into()]]);
        renderer.render(&[set], &output).unwrap();

        let reopened = Workbook::open(&output).unwrap();
        assert_eq!(reopened.sheet_names(), vec!["Stock".to_string()]);
        let sheet = reopened.sheet("Stock").unwrap();
        assert_eq!(sheet.value(CellRef::new(0, 1)), CellValue::from("Stock"));
        assert_eq!(sheet.value(CellRef::new(0, 4)), CellValue::from("tea"));
        assert_eq!(sheet.value(CellRef::new(1, 4)), CellValue::Number(3.0));
        assert_eq!(sheet.value(CellRef::new(0, 6)), CellValue::from("footer"));
    }

    #[test]
    fn template_file_styles_reach_the_report() {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("template.xlsx");
        let mut wb = template();
        wb.set_cell_style(
            "templateSheet",
            CellRef::new(0, 1),
            CellStyle {
                bold: true,
                font_color: Some(0xC00000),
                ..CellStyle::default()
            },
        )
        .unwrap();
        wb.set_column_width("templateSheet", 5, 30.0).unwrap();
        wb.save(&template_path).unwrap();

        let output = dir.path().join("styled.xlsx");
        let set = result_set("Stock", &["item", "qty"], vec![vec!["tea".into(), 3.0.into()]]);
        ReportRenderer::new(&template_path).render(&[set], &output).unwrap();

        let reopened = Workbook::open(&output).unwrap();
        let style = |cell| reopened.cell_style("Stock", cell).unwrap().unwrap_or_default();
        assert!(style(CellRef::new(0, 3)).bold);
        assert!(style(CellRef::new(1, 3)).bold);
        assert_eq!(style(CellRef::new(0, 4)).horizontal, Some(HorizontalAlign::Center));
        assert_eq!(style(CellRef::new(0, 1)).font_color, Some(0xC00000));
        let sheet = reopened.sheet("Stock").unwrap();
        assert_eq!(sheet.value(CellRef::new(0, 3)), CellValue::from("item"));
        assert_eq!(sheet.column_width(5), Some(30.0));
    }

    #[test]
    fn missing_template_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = ReportRenderer::new(dir.path().join("nope.xlsx"));
        let err = renderer
            .render(&[result_set("X", &["a"], vec![])], &dir.path().join("x.xlsx"))
            .unwrap_err();
        assert_eq!(err.code(), "IO_ERROR");
    }
}
