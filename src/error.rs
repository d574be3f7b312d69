use thiserror::Error;

/// Errors raised while reading or writing spreadsheets.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("Unsupported file extension: .{extension} (expected .csv or .xlsx)")]
    UnsupportedFormat { extension: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel error: {0}")]
    Xlsx(#[from] calamine::XlsxError),

    #[error("Workbook contains no worksheet")]
    EmptyWorkbook,

    #[error("Excel export failed: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    #[error("Dataset of {rows} rows x {columns} columns does not fit in a worksheet")]
    ExportTooLarge { rows: usize, columns: usize },
}

/// Errors raised by the column-annotation pipeline.
#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("Threshold {0} is outside [0.0, 1.0]")]
    InvalidThreshold(f32),

    #[error("New column name is empty")]
    EmptyColumnName,

    #[error("Column '{column}' already exists; choose a different name")]
    ColumnCollision { column: String },

    #[error("The selected column '{column}' was not found in the dataset")]
    MissingColumn { column: String },

    #[error("Inference failed for '{column}' at row {row} after {attempts} attempt(s): {message}")]
    Inference {
        column: String,
        row: usize,
        attempts: u32,
        message: String,
    },

    #[error("Processing cancelled")]
    Cancelled,
}
