use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rust_xlsxwriter::{Format, Workbook};

use super::model::{CellValue, Dataset};
use crate::error::SheetError;

/// File name offered for the annotated workbook.
pub const DOWNLOAD_FILE_NAME: &str = "extracted_data.xlsx";

const MAX_ROWS: usize = 1_048_576;
const MAX_COLUMNS: usize = 16_384;

/// Serialise the dataset to an in-memory `.xlsx` workbook: one sheet, a bold
/// header row in column order, no index column.
pub fn to_xlsx_bytes(dataset: &Dataset) -> Result<Vec<u8>, SheetError> {
    // +1 for the header row
    if dataset.len() + 1 > MAX_ROWS || dataset.column_names.len() > MAX_COLUMNS {
        return Err(SheetError::ExportTooLarge {
            rows: dataset.len(),
            columns: dataset.column_names.len(),
        });
    }

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let header = Format::new().set_bold();

    for (c, name) in dataset.column_names.iter().enumerate() {
        sheet.write_string_with_format(0, c as u16, name, &header)?;
    }

    for (r, row) in dataset.rows.iter().enumerate() {
        let r = (r + 1) as u32;
        for (c, name) in dataset.column_names.iter().enumerate() {
            let c = c as u16;
            match row.get(name) {
                CellValue::String(s) | CellValue::Date(s) => {
                    sheet.write_string(r, c, s)?;
                }
                CellValue::Integer(i) => {
                    sheet.write_number(r, c, *i as f64)?;
                }
                // Excel has no NaN or infinity; keep their text.
                CellValue::Float(f) if !f.is_finite() => {
                    sheet.write_string(r, c, f.to_string())?;
                }
                CellValue::Float(f) => {
                    sheet.write_number(r, c, *f)?;
                }
                CellValue::Bool(b) => {
                    sheet.write_boolean(r, c, *b)?;
                }
                CellValue::Null => {}
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Write the workbook to disk.
pub fn save_xlsx(dataset: &Dataset, path: &Path) -> Result<(), SheetError> {
    let bytes = to_xlsx_bytes(dataset)?;
    std::fs::write(path, bytes)?;
    log::info!("Saved {} rows to {}", dataset.len(), path.display());
    Ok(())
}

/// Base64 data URI for a downloadable byte buffer.
pub fn data_uri(bytes: &[u8]) -> String {
    format!("data:application/octet-stream;base64,{}", STANDARD.encode(bytes))
}
