//! Placeholder-driven spreadsheet reports.
//!
//! A template workbook carries four placeholder strings, `{{title}}`,
//! `{{date}}`, `{{headers}}` and `{{rows}}`. [`ReportRenderer`] copies the
//! template sheet once per [`ResultSet`](ereport_core::ResultSet), fills the
//! placeholders, sizes the columns and saves the result.
//!
//! Rendering goes through the [`SpreadsheetDocument`] trait; [`Workbook`] is
//! the in-memory implementation backed by `.xlsx` files.

pub mod cell;
pub mod document;
pub mod error;
pub mod renderer;
mod styles;
pub mod value;
pub mod workbook;
mod xlsx;

pub use cell::{column_index, column_letters, CellRef};
pub use document::{CellStyle, CellValue, HorizontalAlign, SpreadsheetDocument};
pub use error::{RenderError, Result};
pub use renderer::{render_document, sheet_name, ReportRenderer, MAX_RENDERED_ROWS};
pub use workbook::{Sheet, Workbook};
