use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// CellValue – a single cell of the table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common spreadsheet dtypes.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// ISO-8601 date string kept as text for simplicity.
    Date(String),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{d}"),
            CellValue::Null => Ok(()),
        }
    }
}

impl CellValue {
    #[cfg(test)]
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Text handed to the entity predictor. Numbers and booleans are rendered
    /// with `Display`; `Null` becomes the empty string.
    pub fn as_text(&self) -> String {
        self.to_string()
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

// ---------------------------------------------------------------------------
// Row – one record of the table
// ---------------------------------------------------------------------------

/// A single row: column_name → value. Missing columns read as `Null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub cells: BTreeMap<String, CellValue>,
}

static NULL: CellValue = CellValue::Null;

impl Row {
    pub fn get(&self, column: &str) -> &CellValue {
        self.cells.get(column).unwrap_or(&NULL)
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full parsed table with its ordered column list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    /// All rows, in file order.
    pub rows: Vec<Row>,
    /// Ordered, unique column names (file order, then columns added later).
    pub column_names: Vec<String>,
}

impl Dataset {
    /// Build a dataset from a header and row values in header order.
    /// Short rows are padded with `Null`; surplus values are dropped.
    pub fn from_records(column_names: Vec<String>, records: Vec<Vec<CellValue>>) -> Self {
        let rows = records
            .into_iter()
            .map(|values| {
                let mut cells = BTreeMap::new();
                let mut values = values.into_iter();
                for col in &column_names {
                    cells.insert(col.clone(), values.next().unwrap_or(CellValue::Null));
                }
                Row { cells }
            })
            .collect();
        Dataset { rows, column_names }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        self.rows.get(row).map(|r| r.get(column))
    }

    /// Write a value in place. An unknown column is appended to the column
    /// order; an existing one is overwritten for this row only.
    pub fn set_cell(&mut self, row: usize, column: &str, value: CellValue) {
        if !self.has_column(column) {
            self.column_names.push(column.to_string());
        }
        if let Some(r) = self.rows.get_mut(row) {
            r.cells.insert(column.to_string(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::from_records(
            vec!["comment".into(), "id".into()],
            vec![
                vec!["hello".into(), CellValue::Integer(1)],
                vec!["world".into()],
            ],
        )
    }

    #[test]
    fn short_records_are_padded_with_null() {
        let ds = sample();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.cell(1, "id"), Some(&CellValue::Null));
    }

    #[test]
    fn set_cell_appends_new_column_once() {
        let mut ds = sample();
        ds.set_cell(0, "entities", "Paris".into());
        ds.set_cell(1, "entities", "Unknown".into());
        assert_eq!(ds.column_names, vec!["comment", "id", "entities"]);
        assert_eq!(ds.cell(1, "entities"), Some(&CellValue::from("Unknown")));
    }

    #[test]
    fn new_column_reads_null_on_untouched_rows() {
        let mut ds = sample();
        ds.set_cell(0, "entities", "Paris".into());
        assert!(ds.cell(1, "entities").is_some_and(CellValue::is_null));
    }

    #[test]
    fn null_renders_as_empty_text() {
        assert_eq!(CellValue::Null.as_text(), "");
        assert_eq!(CellValue::Float(2.5).as_text(), "2.5");
    }
}
