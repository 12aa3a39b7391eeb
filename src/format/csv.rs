//! CSV ingestion.
//!
//! Reads files whose first row is the header row, and converts each data
//! row into a flat record using the mapping table's `issueColumnName`
//! entries. Rows may be shorter or longer than the header row.

use crate::error::{BridgeError, Result};
use crate::mapping::{FieldMapping, MappingTable};
use crate::model::{FieldValue, FlatRecord};
use crate::util::is_blank;
use std::fs;
use std::path::Path;
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Header row plus data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Parse CSV text.
    ///
    /// # Errors
    ///
    /// Returns `CsvParse` if a record cannot be decoded.
    pub fn parse(text: &str) -> Result<Self> {
        Self::from_bytes(text.as_bytes())
    }

    /// Parse raw CSV bytes. A leading UTF-8 byte order mark is ignored.
    ///
    /// # Errors
    ///
    /// Returns `CsvParse` with the offending line for records that are not
    /// valid UTF-8.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(data);

        let headers = reader
            .headers()
            .map_err(|err| csv_error(&err, 1))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|err| csv_error(&err, index + 2))?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self { headers, rows })
    }

    /// Read and parse a CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn read(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        let table = Self::from_bytes(&data)?;
        debug!(path = %path.display(), columns = table.headers.len(), rows = table.rows.len(), "Read CSV");
        Ok(table)
    }

    /// Column indices whose header matches `name` case-insensitively.
    fn matching_columns<'a>(&'a self, name: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.headers
            .iter()
            .enumerate()
            .filter(move |(_, header)| header.trim().eq_ignore_ascii_case(name.trim()))
            .map(|(index, _)| index)
    }

    /// Convert every data row into a flat record.
    #[must_use]
    pub fn to_records(&self, table: &MappingTable) -> Vec<FlatRecord> {
        self.rows.iter().map(|row| self.row_to_record(row, table)).collect()
    }

    fn row_to_record(&self, row: &[String], table: &MappingTable) -> FlatRecord {
        let mut record = FlatRecord::new();
        for mapping in table {
            let Some(column) = mapping.column_name.as_deref() else {
                continue;
            };
            if let Some(value) = self.cell_value(row, column, mapping) {
                record.insert(mapping.key.clone(), value);
            }
        }
        record
    }

    fn cell_value(&self, row: &[String], column: &str, mapping: &FieldMapping) -> Option<FieldValue> {
        let cell = |index: usize| row.get(index).map_or("", String::as_str);

        if mapping.data_type.is_list() || mapping.issue_link.is_some() {
            let items: Vec<String> = self
                .matching_columns(column)
                .map(cell)
                .filter(|raw| !is_blank(raw))
                .map(|raw| mapping.data_type.coerce(raw))
                .collect();
            return (!items.is_empty()).then_some(FieldValue::List(items));
        }

        let index = self.matching_columns(column).next()?;
        let text = mapping.data_type.coerce(cell(index));
        (!is_blank(&text)).then_some(FieldValue::Text(text))
    }
}

fn csv_error(err: &csv::Error, fallback_line: usize) -> BridgeError {
    let line = err
        .position()
        .and_then(|position| usize::try_from(position.line()).ok())
        .unwrap_or(fallback_line);
    BridgeError::CsvParse {
        line,
        reason: err.to_string(),
    }
}
