use thiserror::Error;

/// Errors raised while rendering a report workbook.
///
/// Variants fall in two classes: template problems (the workbook does not have
/// the expected shape) and I/O problems (the workbook cannot be read or written).
#[derive(Debug, Error)]
pub enum RenderError {
    /// A required placeholder string is missing from a sheet.
    #[error("Could not find cell reference for: {sheet} - {placeholder}")]
    PlaceholderNotFound { sheet: String, placeholder: String },

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Sheet already exists: {0}")]
    SheetExists(String),

    #[error("Invalid sheet name: {0:?}")]
    InvalidSheetName(String),

    #[error("Template workbook has no sheets")]
    EmptyTemplate,

    #[error("No result sets to render")]
    NothingToRender,

    #[error("Column index out of range: {0}")]
    ColumnOutOfRange(u32),

    #[error("Failed to read workbook: {0}")]
    Read(#[from] calamine::XlsxError),

    #[error("Failed to read workbook styles: {0}")]
    Styles(String),

    #[error("Failed to write workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    /// Short error code string used in structured log fields.
    pub fn code(&self) -> &'static str {
        if self.is_template_error() {
            "TEMPLATE_ERROR"
        } else {
            "IO_ERROR"
        }
    }

    pub fn is_template_error(&self) -> bool {
        matches!(
            self,
            RenderError::PlaceholderNotFound { .. }
                | RenderError::SheetNotFound(_)
                | RenderError::SheetExists(_)
                | RenderError::InvalidSheetName(_)
                | RenderError::EmptyTemplate
                | RenderError::NothingToRender
                | RenderError::ColumnOutOfRange(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
