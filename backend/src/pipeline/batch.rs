use crate::pipeline::error::PipelineError;
use crate::pipeline::schema::{HeaderMode, Schema, LITHO_COLUMN, SERIAL_COLUMN};
use csv::{ReaderBuilder, StringRecord};
use log::debug;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// One uploaded answer-sheet file, header already checked against the schema.
///
/// Rows are kept only until the analyzer has walked them once.
#[derive(Debug)]
pub struct Batch {
    index: HashMap<String, usize>,
    /// `(column, index)` of every non-identity, non-skew schema column, in schema order.
    interest: Vec<(String, usize)>,
    rows: Vec<StringRecord>,
}

/// Borrowed view of one data row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    position: usize,
    batch: &'a Batch,
    record: &'a StringRecord,
}

impl Batch {
    /// Reads the header, validates it, and only then accepts data rows.
    ///
    /// A header mismatch returns before a single row is read.
    pub fn read<R: Read>(
        reader: R,
        schema: &Schema,
        mode: HeaderMode,
    ) -> Result<Batch, PipelineError> {
        let mut csv_reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                if i == 0 {
                    h.trim_start_matches('\u{feff}').to_string()
                } else {
                    h.to_string()
                }
            })
            .collect();
        schema.check(&headers, mode)?;
        debug!(
            "header accepted ({} columns for a {}-column schema, {:?})",
            headers.len(),
            schema.len(),
            mode
        );

        let mut index = HashMap::with_capacity(headers.len());
        for (i, h) in headers.iter().enumerate() {
            index.entry(h.clone()).or_insert(i);
        }

        let interest = schema
            .columns()
            .iter()
            .filter(|c| !Schema::is_excluded(c))
            .filter_map(|c| index.get(c).map(|&i| (c.clone(), i)))
            .collect();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            rows.push(record?);
        }
        debug!("read {} data rows", rows.len());

        Ok(Batch {
            index,
            interest,
            rows,
        })
    }

    pub fn from_path(path: &Path, schema: &Schema, mode: HeaderMode) -> Result<Batch, PipelineError> {
        let file = File::open(path).map_err(|e| PipelineError::io("cannot open upload", path, e))?;
        Batch::read(BufReader::new(file), schema, mode)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn interest_columns(&self) -> &[(String, usize)] {
        &self.interest
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().enumerate().map(move |(i, record)| Row {
            position: i + 1,
            batch: self,
            record,
        })
    }
}

impl<'a> Row<'a> {
    /// 1-based position among data rows.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Cell under `column`, or `""` when the column is absent.
    pub fn get(&self, column: &str) -> &'a str {
        self.batch
            .index
            .get(column)
            .and_then(|&i| self.record.get(i))
            .unwrap_or("")
    }

    pub fn get_index(&self, index: usize) -> &'a str {
        self.record.get(index).unwrap_or("")
    }

    pub fn serial(&self) -> &'a str {
        self.get(SERIAL_COLUMN).trim()
    }

    pub fn litho(&self) -> &'a str {
        self.get(LITHO_COLUMN)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// CSV text with the standard header and one line per `(serial, litho, extra)`.
    ///
    /// `extra` is a list of `(column, value)` pairs filled into otherwise blank cells.
    pub(crate) fn sheet(rows: &[(&str, &str, &[(&str, &str)])]) -> String {
        let columns = Schema::standard().columns();
        let mut out = String::new();
        out.push_str(&csv_line(columns.iter().map(|c| c.as_str())));
        for (serial, litho, extra) in rows {
            let cells = columns.iter().map(|c| {
                if c == SERIAL_COLUMN {
                    *serial
                } else if c == LITHO_COLUMN {
                    *litho
                } else {
                    extra
                        .iter()
                        .find(|(col, _)| col == c)
                        .map(|(_, v)| *v)
                        .unwrap_or("")
                }
            });
            out.push_str(&csv_line(cells));
        }
        out
    }

    /// Sheet with `codes[i]` on serial `i + 1` and no answers filled in.
    pub(crate) fn sheet_of_codes(codes: &[i64]) -> String {
        let serials: Vec<String> = (1..=codes.len()).map(|s| s.to_string()).collect();
        let lithos: Vec<String> = codes.iter().map(|c| c.to_string()).collect();
        let rows: Vec<(&str, &str, &[(&str, &str)])> = serials
            .iter()
            .zip(lithos.iter())
            .map(|(s, l)| (s.as_str(), l.as_str(), &[][..]))
            .collect();
        sheet(&rows)
    }

    fn csv_line<'a>(cells: impl Iterator<Item = &'a str>) -> String {
        let mut line = cells
            .map(|c| {
                if c.contains(',') || c.contains('"') {
                    format!("\"{}\"", c.replace('"', "\"\""))
                } else {
                    c.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(",");
        line.push('\n');
        line
    }

    #[test]
    fn reads_rows_after_valid_header() {
        let text = sheet(&[("1", "1001", &[("Q1", "A")]), ("2", "1002", &[])]);
        let batch = Batch::read(text.as_bytes(), Schema::standard(), HeaderMode::Positional).unwrap();
        assert_eq!(batch.len(), 2);
        let rows: Vec<Row> = batch.rows().collect();
        assert_eq!(rows[0].position(), 1);
        assert_eq!(rows[0].serial(), "1");
        assert_eq!(rows[0].litho(), "1001");
        assert_eq!(rows[0].get("Q1"), "A");
        assert_eq!(rows[1].get("Q1"), "");
        assert_eq!(rows[1].get("NOT A COLUMN"), "");
    }

    #[test]
    fn header_mismatch_stops_before_rows() {
        let mut text = sheet_of_codes(&[1, 2]);
        text = text.replacen("LITHO", "LITH0", 1);
        match Batch::read(text.as_bytes(), Schema::standard(), HeaderMode::Positional) {
            Err(PipelineError::SchemaMismatch { missing }) => {
                assert_eq!(missing, vec!["LITHO".to_string()])
            }
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn ragged_row_is_a_parse_error() {
        let mut text = sheet_of_codes(&[1]);
        text.push_str("2,1002\n");
        assert!(matches!(
            Batch::read(text.as_bytes(), Schema::standard(), HeaderMode::Positional),
            Err(PipelineError::Parse(_))
        ));
    }

    #[test]
    fn empty_upload_is_a_schema_mismatch() {
        match Batch::read(&b""[..], Schema::standard(), HeaderMode::Positional) {
            Err(PipelineError::SchemaMismatch { missing }) => assert_eq!(missing.len(), 169),
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn interest_columns_follow_schema_order_and_skip_identity() {
        let text = sheet_of_codes(&[1]);
        let batch = Batch::read(text.as_bytes(), Schema::standard(), HeaderMode::Positional).unwrap();
        let names: Vec<&str> = batch
            .interest_columns()
            .iter()
            .map(|(c, _)| c.as_str())
            .collect();
        assert_eq!(names.len(), 163);
        assert_eq!(names[0], "BOOKLET SERIES");
        assert_eq!(names[162], "Q160");
    }
}
