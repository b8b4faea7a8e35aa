//! CSV flight log decoding.
//!
//! A log export is a header line naming every field followed by one numeric row per
//! logged instant. Decoding produces the header, the rows as `f64`, and a lookup from
//! field name to column.
use crate::ReplayError;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Lookup from field name to column position
pub type ColumnIndex = HashMap<String, usize>;

/// A decoded log: ordered header names and numeric rows
#[derive(Debug, Clone, Default)]
pub struct DecodedLog {
    /// Field names in column order
    pub header: Vec<String>,
    /// One entry per data row, in file order
    pub rows: Vec<Vec<f64>>,
}

impl DecodedLog {
    /// Decodes a CSV log file
    /// # Arguments
    /// * `path` - Path to the CSV export
    /// # Errors
    /// * `CsvError` if the file cannot be opened or a record is not valid CSV
    /// * `MalformedNumeric` if a cell is not a number
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ReplayError> {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path.as_ref())?;
        let log = Self::decode(reader)?;
        log::info!(
            "Decoded {} rows with {} fields from {}",
            log.rows.len(),
            log.header.len(),
            path.as_ref().display()
        );
        Ok(log)
    }
    /// Decodes CSV text from any reader
    /// # Arguments
    /// * `reader` - Source of the CSV text, header line first
    /// # Errors
    /// * `CsvError` if a record is not valid CSV
    /// * `MalformedNumeric` if a cell is not a number
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ReplayError> {
        Self::decode(
            csv::ReaderBuilder::new()
                .trim(csv::Trim::All)
                .flexible(true)
                .from_reader(reader),
        )
    }

    fn decode<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, ReplayError> {
        let header: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
        let rows = reader
            .records()
            .enumerate()
            .map(|(row, record)| {
                record?
                    .iter()
                    .enumerate()
                    .map(|(column, cell)| {
                        cell.parse::<f64>().map_err(|_| ReplayError::MalformedNumeric {
                            row,
                            column: header
                                .get(column)
                                .cloned()
                                .unwrap_or_else(|| format!("#{}", column)),
                            value: cell.to_owned(),
                        })
                    })
                    .collect::<Result<Vec<f64>, ReplayError>>()
            })
            .collect::<Result<Vec<_>, ReplayError>>()?;
        Ok(Self { header, rows })
    }
    /// Builds the field name to column lookup.
    ///
    /// When a name repeats, the last column wins.
    pub fn column_index(&self) -> ColumnIndex {
        self.header
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_header_and_rows() {
        let text = "TIME_StartTime,ATT_Roll,ATT_Pitch\n100,0.1,0.2\n200, -0.5 ,1e-3\n";
        let log = DecodedLog::from_reader(text.as_bytes()).unwrap();
        assert_eq!(log.header, vec!["TIME_StartTime", "ATT_Roll", "ATT_Pitch"]);
        assert_eq!(log.rows, vec![vec![100.0, 0.1, 0.2], vec![200.0, -0.5, 1e-3]]);
        let index = log.column_index();
        assert_eq!(index["ATT_Pitch"], 2);
        assert!(!index.contains_key("LPOS_X"));
    }

    #[test]
    fn reports_malformed_cell_with_location() {
        let text = "t,x\n1,2\n3,abc\n";
        match DecodedLog::from_reader(text.as_bytes()) {
            Err(ReplayError::MalformedNumeric { row, column, value }) => {
                assert_eq!(row, 1);
                assert_eq!(column, "x");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn empty_cell_is_malformed() {
        let text = "t,x\n1,\n";
        assert!(matches!(
            DecodedLog::from_reader(text.as_bytes()),
            Err(ReplayError::MalformedNumeric { row: 0, .. })
        ));
    }

    #[test]
    fn header_only_yields_no_rows() {
        let log = DecodedLog::from_reader("t,x\n".as_bytes()).unwrap();
        assert!(log.rows.is_empty());
        assert_eq!(log.header.len(), 2);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(matches!(
            DecodedLog::from_path("/nonexistent/flight.csv"),
            Err(ReplayError::CsvError(_))
        ));
    }
}
