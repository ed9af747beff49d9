//! Cell formatting from the parts of an `.xlsx` package calamine does not
//! read: `xl/styles.xml`, the `s` attribute of worksheet cells and the
//! `<cols>` widths.

use std::collections::HashMap;
use std::fmt::Display;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::cell::CellRef;
use crate::document::{CellStyle, HorizontalAlign};
use crate::error::{RenderError, Result};

const STYLES_PART: &str = "xl/styles.xml";
const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";

/// Column ranges reaching past this (whole-row formats use `max="16384"`)
/// are clamped.
const MAX_STYLED_COLUMNS: u32 = 1024;

/// Excel's default font: 7 pixel digits plus 5 pixels of cell padding.
const DIGIT_PIXELS: f64 = 7.0;
const PADDING_PIXELS: f64 = 5.0;

/// Styled cells and column widths of one worksheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetStyles {
    pub cells: Vec<(CellRef, CellStyle)>,
    /// Zero-based column and width in characters, as shown by Excel.
    pub column_widths: Vec<(u32, f64)>,
}

/// Styles of every worksheet in the package at `path`, keyed by sheet name.
/// Cells with the default style are left out.
pub fn read_styles(path: &Path) -> Result<HashMap<String, SheetStyles>> {
    let mut archive = ZipArchive::new(File::open(path)?).map_err(style_error)?;

    let formats = match read_part(&mut archive, STYLES_PART)? {
        Some(xml) => parse_cell_formats(&xml)?,
        None => Vec::new(),
    };
    let sheets = match read_part(&mut archive, WORKBOOK_PART)? {
        Some(xml) => parse_sheet_ids(&xml)?,
        None => Vec::new(),
    };
    let targets = match read_part(&mut archive, WORKBOOK_RELS_PART)? {
        Some(xml) => parse_relationships(&xml)?,
        None => HashMap::new(),
    };

    let mut styles = HashMap::new();
    for (name, id) in sheets {
        let Some(target) = targets.get(&id) else {
            continue;
        };
        if let Some(xml) = read_part(&mut archive, &part_path(target))? {
            styles.insert(name, parse_sheet(&xml, &formats)?);
        }
    }
    Ok(styles)
}

fn read_part(archive: &mut ZipArchive<File>, name: &str) -> Result<Option<String>> {
    match archive.by_name(name) {
        Ok(mut part) => {
            let mut xml = String::new();
            part.read_to_string(&mut xml)?;
            Ok(Some(xml))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(style_error(e)),
    }
}

/// Relationship targets are relative to `xl/` unless absolute.
fn part_path(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    }
}

fn style_error(e: impl Display) -> RenderError {
    RenderError::Styles(e.to_string())
}

enum Tag<'a, 'b> {
    Open(&'a BytesStart<'b>),
    Close(&'a [u8]),
}

/// Feed every element open and close to `visit`. Self-closing elements
/// produce both.
fn walk(xml: &str, mut visit: impl FnMut(Tag<'_, '_>)) -> Result<()> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().map_err(style_error)? {
            Event::Start(e) => visit(Tag::Open(&e)),
            Event::Empty(e) => {
                visit(Tag::Open(&e));
                visit(Tag::Close(e.local_name().as_ref()));
            }
            Event::End(e) => visit(Tag::Close(e.local_name().as_ref())),
            Event::Eof => return Ok(()),
            _ => {}
        }
    }
}

fn attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .map(|a| match a.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&a.value).into_owned(),
        })
}

fn attr_parsed<T: std::str::FromStr>(e: &BytesStart<'_>, name: &[u8]) -> Option<T> {
    attr(e, name)?.parse().ok()
}

/// `<b/>` and `<b val="1"/>` are on, `<b val="0"/>` is off.
fn flag(e: &BytesStart<'_>) -> bool {
    attr(e, b"val").map_or(true, |v| v != "0" && v != "false")
}

/// `rgb="FFRRGGBB"` as `0xRRGGBB`. Theme and indexed colors are ignored.
fn rgb(e: &BytesStart<'_>) -> Option<u32> {
    let value = attr(e, b"rgb")?;
    let hex = value.get(value.len().checked_sub(6)?..)?;
    u32::from_str_radix(hex, 16).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Fonts,
    Fills,
    CellFormats,
}

#[derive(Debug, Default)]
struct Font {
    bold: bool,
    italic: bool,
    color: Option<u32>,
}

#[derive(Debug, Default)]
struct Fill {
    solid: bool,
    color: Option<u32>,
}

#[derive(Debug, Default)]
struct CellFormat {
    number_format_id: u32,
    font_id: usize,
    fill_id: usize,
    horizontal: Option<HorizontalAlign>,
}

/// The `cellXfs` table of `styles.xml`: index `i` is the style of cells
/// carrying `s="i"`.
fn parse_cell_formats(xml: &str) -> Result<Vec<CellStyle>> {
    let mut number_formats: HashMap<u32, String> = HashMap::new();
    let mut fonts: Vec<Font> = Vec::new();
    let mut fills: Vec<Fill> = Vec::new();
    let mut formats: Vec<CellFormat> = Vec::new();
    let mut section = None;

    walk(xml, |tag| match tag {
        Tag::Open(e) => match (e.local_name().as_ref(), section) {
            (b"numFmt", _) => {
                if let (Some(id), Some(code)) = (attr_parsed(e, b"numFmtId"), attr(e, b"formatCode")) {
                    number_formats.insert(id, code);
                }
            }
            (b"fonts", _) => section = Some(Section::Fonts),
            (b"fills", _) => section = Some(Section::Fills),
            (b"cellXfs", _) => section = Some(Section::CellFormats),
            (b"font", Some(Section::Fonts)) => fonts.push(Font::default()),
            (b"b", Some(Section::Fonts)) => {
                if let Some(font) = fonts.last_mut() {
                    font.bold = flag(e);
                }
            }
            (b"i", Some(Section::Fonts)) => {
                if let Some(font) = fonts.last_mut() {
                    font.italic = flag(e);
                }
            }
            (b"color", Some(Section::Fonts)) => {
                if let Some(font) = fonts.last_mut() {
                    font.color = rgb(e);
                }
            }
            (b"fill", Some(Section::Fills)) => fills.push(Fill::default()),
            (b"patternFill", Some(Section::Fills)) => {
                if let Some(fill) = fills.last_mut() {
                    fill.solid = attr(e, b"patternType").as_deref() == Some("solid");
                }
            }
            (b"fgColor", Some(Section::Fills)) => {
                if let Some(fill) = fills.last_mut() {
                    fill.color = rgb(e);
                }
            }
            (b"xf", Some(Section::CellFormats)) => formats.push(CellFormat {
                number_format_id: attr_parsed(e, b"numFmtId").unwrap_or(0),
                font_id: attr_parsed(e, b"fontId").unwrap_or(0),
                fill_id: attr_parsed(e, b"fillId").unwrap_or(0),
                horizontal: None,
            }),
            (b"alignment", Some(Section::CellFormats)) => {
                if let Some(format) = formats.last_mut() {
                    format.horizontal = attr(e, b"horizontal").and_then(|h| match h.as_str() {
                        "left" => Some(HorizontalAlign::Left),
                        "center" | "centerContinuous" => Some(HorizontalAlign::Center),
                        "right" => Some(HorizontalAlign::Right),
                        _ => None,
                    });
                }
            }
            _ => {}
        },
        Tag::Close(name) => {
            if matches!(name, b"fonts" | b"fills" | b"cellXfs") {
                section = None;
            }
        }
    })?;

    Ok(formats
        .iter()
        .map(|format| {
            let font = fonts.get(format.font_id);
            let fill = fills.get(format.fill_id).filter(|fill| fill.solid);
            CellStyle {
                horizontal: format.horizontal,
                number_format: number_formats
                    .get(&format.number_format_id)
                    .cloned()
                    .or_else(|| builtin_number_format(format.number_format_id).map(str::to_string)),
                bold: font.is_some_and(|f| f.bold),
                italic: font.is_some_and(|f| f.italic),
                font_color: font.and_then(|f| f.color),
                fill_color: fill.and_then(|f| f.color),
            }
        })
        .collect())
}

/// Number formats Excel knows by id without listing them in `numFmts`.
fn builtin_number_format(id: u32) -> Option<&'static str> {
    let code = match id {
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        14 => "mm-dd-yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        49 => "@",
        _ => return None,
    };
    Some(code)
}

/// `(sheet name, relationship id)` in workbook order.
fn parse_sheet_ids(xml: &str) -> Result<Vec<(String, String)>> {
    let mut sheets = Vec::new();
    walk(xml, |tag| {
        if let Tag::Open(e) = tag {
            if e.local_name().as_ref() == b"sheet" {
                if let (Some(name), Some(id)) = (attr(e, b"name"), attr(e, b"id")) {
                    sheets.push((name, id));
                }
            }
        }
    })?;
    Ok(sheets)
}

fn parse_relationships(xml: &str) -> Result<HashMap<String, String>> {
    let mut targets = HashMap::new();
    walk(xml, |tag| {
        if let Tag::Open(e) = tag {
            if e.local_name().as_ref() == b"Relationship" {
                if let (Some(id), Some(target)) = (attr(e, b"Id"), attr(e, b"Target")) {
                    targets.insert(id, target);
                }
            }
        }
    })?;
    Ok(targets)
}

fn parse_sheet(xml: &str, formats: &[CellStyle]) -> Result<SheetStyles> {
    let mut styles = SheetStyles::default();
    walk(xml, |tag| {
        let Tag::Open(e) = tag else {
            return;
        };
        match e.local_name().as_ref() {
            b"col" => {
                let (Some(min), Some(max), Some(width)) = (
                    attr_parsed::<u32>(e, b"min"),
                    attr_parsed::<u32>(e, b"max"),
                    attr_parsed::<f64>(e, b"width"),
                ) else {
                    return;
                };
                for column in min.max(1)..=max.min(MAX_STYLED_COLUMNS) {
                    styles.column_widths.push((column - 1, displayed_width(width)));
                }
            }
            b"c" => {
                let Some(cell) = attr(e, b"r").and_then(|r| CellRef::parse(&r)) else {
                    return;
                };
                let style = attr_parsed::<usize>(e, b"s").and_then(|index| formats.get(index));
                if let Some(style) = style.filter(|style| **style != CellStyle::default()) {
                    styles.cells.push((cell, style.clone()));
                }
            }
            _ => {}
        }
    })?;
    Ok(styles)
}

/// Stored widths include the cell padding; strip it to get the width Excel
/// shows and rust_xlsxwriter takes.
fn displayed_width(stored: f64) -> f64 {
    let pixels = stored * DIGIT_PIXELS;
    let width = if pixels >= DIGIT_PIXELS + PADDING_PIXELS {
        (pixels - PADDING_PIXELS) / DIGIT_PIXELS
    } else {
        pixels / (DIGIT_PIXELS + PADDING_PIXELS)
    };
    (width * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy/mm/dd"/></numFmts>
  <fonts count="3">
    <font><sz val="11"/><color theme="1"/><name val="Calibri"/></font>
    <font><b/><sz val="11"/><color rgb="FFFF0000"/><name val="Calibri"/></font>
    <font><b val="0"/><i/><sz val="11"/></font>
  </fonts>
  <fills count="3">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FFFFFF00"/><bgColor indexed="64"/></patternFill></fill>
  </fills>
  <cellStyleXfs count="1"><xf numFmtId="0" fontId="1" fillId="2"/></cellStyleXfs>
  <cellXfs count="4">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="0" fontId="1" fillId="2" borderId="0" xfId="0" applyFont="1" applyFill="1"/>
    <xf numFmtId="164" fontId="2" fillId="1" borderId="0" xfId="0" applyAlignment="1"><alignment horizontal="right"/></xf>
    <xf numFmtId="2" fontId="0" fillId="0" borderId="0" xfId="0"><alignment horizontal="center" vertical="top"/></xf>
  </cellXfs>
  <dxfs count="1"><dxf><font><b/></font></dxf></dxfs>
</styleSheet>"#;

    #[test]
    fn cell_formats_map_fonts_fills_and_number_formats() {
        let formats = parse_cell_formats(STYLES).unwrap();
        assert_eq!(formats.len(), 4);
        assert_eq!(formats[0], CellStyle::default());
        assert_eq!(
            formats[1],
            CellStyle {
                bold: true,
                font_color: Some(0xFF0000),
                fill_color: Some(0xFFFF00),
                ..CellStyle::default()
            }
        );
        assert_eq!(
            formats[2],
            CellStyle {
                horizontal: Some(HorizontalAlign::Right),
                number_format: Some("yyyy/mm/dd".into()),
                italic: true,
                ..CellStyle::default()
            }
        );
        assert_eq!(
            formats[3],
            CellStyle {
                horizontal: Some(HorizontalAlign::Center),
                number_format: Some("0.00".into()),
                ..CellStyle::default()
            }
        );
    }

    #[test]
    fn sheet_cells_and_columns() {
        let formats = parse_cell_formats(STYLES).unwrap();
        let xml = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <cols><col min="2" max="3" width="30.7109375" customWidth="1"/><col min="5" max="16384" width="9.140625"/></cols>
  <sheetData>
    <row r="1"><c r="A1" s="1" t="s"><v>0</v></c><c r="B1"><v>1</v></c><c r="C1" s="0"/></row>
    <row r="4"><c r="D4" s="3"/><c r="E4" s="99"/></row>
  </sheetData>
</worksheet>"#;
        let styles = parse_sheet(xml, &formats).unwrap();

        assert_eq!(
            styles.cells,
            vec![
                (CellRef::new(0, 1), formats[1].clone()),
                (CellRef::new(3, 4), formats[3].clone()),
            ]
        );
        assert_eq!(&styles.column_widths[..2], &[(1, 30.0), (2, 30.0)]);
        assert_eq!(styles.column_widths[2], (4, 8.43));
        assert_eq!(styles.column_widths.len(), 2 + (MAX_STYLED_COLUMNS as usize - 4));
    }

    #[test]
    fn sheet_parts_resolve_through_relationships() {
        let workbook = r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets><sheet name="Report" sheetId="1" r:id="rId1"/><sheet name="Other &amp; co" sheetId="2" r:id="rId2"/></sheets>
</workbook>"#;
        let rels = r#"<Relationships>
  <Relationship Id="rId1" Type="worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="worksheet" Target="/xl/worksheets/sheet2.xml"/>
</Relationships>"#;
        let sheets = parse_sheet_ids(workbook).unwrap();
        assert_eq!(
            sheets,
            vec![
                ("Report".to_string(), "rId1".to_string()),
                ("Other & co".to_string(), "rId2".to_string()),
            ]
        );
        let targets = parse_relationships(rels).unwrap();
        assert_eq!(part_path(&targets["rId1"]), "xl/worksheets/sheet1.xml");
        assert_eq!(part_path(&targets["rId2"]), "xl/worksheets/sheet2.xml");
    }
}
