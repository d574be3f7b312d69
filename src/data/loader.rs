use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_from_rs, Data, DataType, Reader, Xlsx};
use sha2::{Digest, Sha256};

use super::model::{CellValue, Dataset};
use crate::error::SheetError;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a dataset from a file on disk.  Dispatch by extension.
#[cfg(test)]
pub fn load_file(path: &Path) -> Result<Dataset, SheetError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let bytes = std::fs::read(path)?;
    load_bytes(&name, &bytes)
}

/// Parse an uploaded byte stream.  The format is taken from the file name.
///
/// Supported formats:
/// * `.csv`  – header row, one record per line
/// * `.xlsx` – first worksheet, first row is the header
pub fn load_bytes(file_name: &str, bytes: &[u8]) -> Result<Dataset, SheetError> {
    let dataset = match extension_of(file_name).as_str() {
        "csv" => load_csv(bytes)?,
        "xlsx" => load_xlsx(bytes)?,
        other => {
            return Err(SheetError::UnsupportedFormat {
                extension: other.to_string(),
            })
        }
    };
    log::info!(
        "Parsed {file_name}: {} rows, columns {:?}",
        dataset.len(),
        dataset.column_names
    );
    Ok(dataset)
}

fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// File cache
// ---------------------------------------------------------------------------

/// Parsed datasets keyed by a hash of the file content, so opening the same
/// file again does not re-parse it.
#[derive(Default)]
pub struct FileCache {
    entries: HashMap<String, Dataset>,
}

impl FileCache {
    /// Return a copy of the cached parse, parsing on a miss.  Callers mutate
    /// their copy; the cached entry stays as it was read from disk.
    pub fn get_or_load(&mut self, file_name: &str, bytes: &[u8]) -> Result<Dataset, SheetError> {
        let key = cache_key(file_name, bytes);
        if let Some(ds) = self.entries.get(&key) {
            log::debug!("File cache hit for {file_name}");
            return Ok(ds.clone());
        }
        let dataset = load_bytes(file_name, bytes)?;
        self.entries.insert(key, dataset.clone());
        Ok(dataset)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn cache_key(file_name: &str, bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(extension_of(file_name).as_bytes());
    hasher.update([0u8]);
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Records may be ragged: missing trailing cells become `Null`.
fn load_csv(bytes: &[u8]) -> Result<Dataset, SheetError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let headers = dedupe_headers(headers);

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        records.push(record.iter().map(guess_cell_type).collect());
    }

    Ok(Dataset::from_records(headers, records))
}

fn guess_cell_type(s: &str) -> CellValue {
    if s.is_empty() {
        return CellValue::Null;
    }
    if is_plain_decimal(s) {
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::Float(f);
        }
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    CellValue::String(s.to_string())
}

/// `-12`, `3.5`, `+.5`, `7.`: an optional sign and ASCII digits with at most
/// one decimal point. `f64::from_str` also takes `nan`, `inf` and exponents,
/// which are ordinary words or codes in a text column.
fn is_plain_decimal(s: &str) -> bool {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    let (int, frac) = digits.split_once('.').unwrap_or((digits, ""));
    !(int.is_empty() && frac.is_empty())
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// XLSX loader
// ---------------------------------------------------------------------------

fn load_xlsx(bytes: &[u8]) -> Result<Dataset, SheetError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SheetError::EmptyWorkbook)??;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Dataset::default());
    };

    let headers: Vec<String> = header_row
        .iter()
        .enumerate()
        .map(|(idx, cell)| match cell {
            Data::Empty => format!("Unnamed: {idx}"),
            other => other.to_string(),
        })
        .collect();
    let headers = dedupe_headers(headers);

    let records = rows
        .map(|row| row.iter().map(xlsx_cell_value).collect())
        .collect();

    Ok(Dataset::from_records(headers, records))
}

fn xlsx_cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Null,
        Data::String(s) if s.is_empty() => CellValue::Null,
        Data::String(s) => CellValue::String(s.clone()),
        Data::Int(i) => CellValue::Integer(*i),
        // Excel stores every number as a double.
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => CellValue::Integer(*f as i64),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(_) => cell
            .as_datetime()
            .map(|dt| CellValue::Date(dt.to_string()))
            .unwrap_or_else(|| CellValue::String(cell.to_string())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Date(s.clone()),
        Data::Error(e) => CellValue::String(format!("{e:?}")),
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Make header names unique: the second `name` becomes `name.1`, the third
/// `name.2`, and so on.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<String> = Vec::with_capacity(headers.len());
    for h in headers {
        let mut name = h.clone();
        while out.contains(&name) {
            let n = seen.entry(h.clone()).or_insert(0);
            *n += 1;
            name = format!("{h}.{n}");
        }
        out.push(name);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_types_are_inferred() {
        let csv = b"comment,score,flag,empty\nBarack Obama visited Paris,3,true,\nhi,2.5,false,x\n";
        let ds = load_bytes("data.csv", csv).unwrap();
        assert_eq!(ds.column_names, vec!["comment", "score", "flag", "empty"]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.cell(0, "score"), Some(&CellValue::Integer(3)));
        assert_eq!(ds.cell(1, "score"), Some(&CellValue::Float(2.5)));
        assert_eq!(ds.cell(0, "flag"), Some(&CellValue::Bool(true)));
        assert_eq!(ds.cell(0, "empty"), Some(&CellValue::Null));
    }

    #[test]
    fn number_like_words_stay_text() {
        let ds = load_bytes("c.csv", b"name,comment\nNan,Infinity\nAda,1e3\ninf,-0.5\n").unwrap();
        assert_eq!(ds.cell(0, "name"), Some(&CellValue::from("Nan")));
        assert_eq!(ds.cell(0, "comment"), Some(&CellValue::from("Infinity")));
        assert_eq!(ds.cell(1, "comment"), Some(&CellValue::from("1e3")));
        assert_eq!(ds.cell(2, "name"), Some(&CellValue::from("inf")));
        assert_eq!(ds.cell(2, "comment"), Some(&CellValue::Float(-0.5)));
        assert_eq!(ds.cell(1, "comment").map(CellValue::as_text).as_deref(), Some("1e3"));
    }

    #[test]
    fn plain_decimals() {
        for s in ["0", "-12", "+3", "3.5", ".5", "7.", "-0.25"] {
            assert!(is_plain_decimal(s), "{s}");
        }
        for s in ["", ".", "-", "1e3", "NaN", "inf", "1.2.3", "1 000", "0x10", "１２"] {
            assert!(!is_plain_decimal(s), "{s}");
        }
    }

    #[test]
    fn ragged_csv_rows_are_padded() {
        let ds = load_bytes("data.CSV", b"a,b\n1\n").unwrap();
        assert_eq!(ds.cell(0, "b"), Some(&CellValue::Null));
    }

    #[test]
    fn duplicate_headers_are_renamed() {
        let ds = load_bytes("dup.csv", b"a,a,a\n1,2,3\n").unwrap();
        assert_eq!(ds.column_names, vec!["a", "a.1", "a.2"]);
        assert_eq!(ds.cell(0, "a.2"), Some(&CellValue::Integer(3)));
    }

    #[test]
    fn other_extensions_are_rejected() {
        let err = load_bytes("data.json", b"[]").unwrap_err();
        assert!(matches!(err, SheetError::UnsupportedFormat { ref extension } if extension == "json"));
        assert!(load_bytes("no_extension", b"a\n1\n").is_err());
    }

    #[test]
    fn garbage_xlsx_is_an_error() {
        assert!(load_bytes("broken.xlsx", b"not a zip").is_err());
    }

    #[test]
    fn cache_returns_pristine_copy_without_reparsing() {
        let mut cache = FileCache::default();
        let bytes = b"comment\nhello\n";
        let mut first = cache.get_or_load("a.csv", bytes).unwrap();
        first.set_cell(0, "entities", "Unknown".into());

        let second = cache.get_or_load("renamed.csv", bytes).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(second.column_names, vec!["comment"]);

        cache.get_or_load("a.csv", b"comment\nother\n").unwrap();
        assert_eq!(cache.len(), 2);
    }
}
