//! Answer-sheet header schema and the checks run against an upload's header row.
//!
//! Two layouts are in circulation: the standard 169-column sheet and the older
//! 170-column sheet that carries a `BKN` (booklet number) column after `LITHO`.
//! Both are built once and handed out as `&'static Schema`.

use crate::pipeline::error::PipelineError;
use std::collections::HashSet;
use std::sync::OnceLock;

pub const SERIAL_COLUMN: &str = "Serial No.";
pub const LITHO_COLUMN: &str = "LITHO";
pub const SKEW_COLUMNS: [&str; 4] = ["SKEW1", "SKEW2", "SKEW3", "SKEW4"];

const ANSWER_COLUMNS: usize = 160;
const BOM: char = '\u{feff}';

/// Which sheet layout an installation expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaVariant {
    #[default]
    Standard,
    Booklet,
}

impl SchemaVariant {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "standard" => Some(SchemaVariant::Standard),
            "booklet" | "bkn" => Some(SchemaVariant::Booklet),
            _ => None,
        }
    }
}

/// How an upload's header row is compared with the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderMode {
    /// Column `i` of the upload must equal schema entry `i`.
    #[default]
    Positional,
    /// Every schema entry must appear somewhere in the header.
    Relaxed,
}

impl HeaderMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "positional" => Some(HeaderMode::Positional),
            "relaxed" => Some(HeaderMode::Relaxed),
            _ => None,
        }
    }
}

/// Ordered, immutable list of expected column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<String>,
}

impl Schema {
    pub fn standard() -> &'static Schema {
        static STANDARD: OnceLock<Schema> = OnceLock::new();
        STANDARD.get_or_init(|| Schema::build(&[SERIAL_COLUMN, LITHO_COLUMN]))
    }

    pub fn booklet() -> &'static Schema {
        static BOOKLET: OnceLock<Schema> = OnceLock::new();
        BOOKLET.get_or_init(|| Schema::build(&[SERIAL_COLUMN, LITHO_COLUMN, "BKN"]))
    }

    pub fn for_variant(variant: SchemaVariant) -> &'static Schema {
        match variant {
            SchemaVariant::Standard => Schema::standard(),
            SchemaVariant::Booklet => Schema::booklet(),
        }
    }

    fn build(leading: &[&str]) -> Schema {
        let mut columns: Vec<String> = leading.iter().map(|c| c.to_string()).collect();
        columns.extend(
            ["BOOKLET SERIES", "SUBJECT", "ROLL NO"]
                .iter()
                .map(|c| c.to_string()),
        );
        columns.extend((1..=ANSWER_COLUMNS).map(|q| format!("Q{}", q)));
        columns.extend(SKEW_COLUMNS.iter().map(|c| c.to_string()));
        Schema { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Identity and skew columns never count as cells of interest.
    pub fn is_excluded(column: &str) -> bool {
        column == SERIAL_COLUMN || column == LITHO_COLUMN || SKEW_COLUMNS.contains(&column)
    }

    /// Positional check. Header cells past the end of the schema are ignored.
    pub fn validate(&self, header: &[String]) -> Result<(), PipelineError> {
        let missing: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(i, expected)| {
                header.get(*i).map(|h| normalize(h, *i)) != Some(expected.as_str())
            })
            .map(|(_, expected)| expected.clone())
            .collect();
        into_result(missing)
    }

    /// Set-containment check; column order is not enforced.
    pub fn validate_relaxed(&self, header: &[String]) -> Result<(), PipelineError> {
        let present: HashSet<&str> = header
            .iter()
            .enumerate()
            .map(|(i, h)| normalize(h, i))
            .collect();
        let missing: Vec<String> = self
            .columns
            .iter()
            .filter(|expected| !present.contains(expected.as_str()))
            .cloned()
            .collect();
        into_result(missing)
    }

    pub fn check(&self, header: &[String], mode: HeaderMode) -> Result<(), PipelineError> {
        match mode {
            HeaderMode::Positional => self.validate(header),
            HeaderMode::Relaxed => self.validate_relaxed(header),
        }
    }
}

/// Spreadsheet exports often prefix the first cell with a byte-order mark.
fn normalize(cell: &str, index: usize) -> &str {
    if index == 0 {
        cell.trim_start_matches(BOM)
    } else {
        cell
    }
}

fn into_result(missing: Vec<String>) -> Result<(), PipelineError> {
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::SchemaMismatch { missing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_of(schema: &Schema) -> Vec<String> {
        schema.columns().to_vec()
    }

    fn missing_of(result: Result<(), PipelineError>) -> Vec<String> {
        match result {
            Err(PipelineError::SchemaMismatch { missing }) => missing,
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn layouts_have_expected_widths() {
        assert_eq!(Schema::standard().len(), 169);
        assert_eq!(Schema::booklet().len(), 170);
        assert_eq!(Schema::booklet().columns()[2], "BKN");
        assert_eq!(Schema::standard().columns()[168], "SKEW4");
    }

    #[test]
    fn exact_header_passes() {
        let schema = Schema::standard();
        assert!(schema.validate(&header_of(schema)).is_ok());
    }

    #[test]
    fn bom_on_first_cell_is_tolerated() {
        let schema = Schema::standard();
        let mut header = header_of(schema);
        header[0] = format!("{}{}", BOM, header[0]);
        assert!(schema.validate(&header).is_ok());
    }

    #[test]
    fn altered_column_is_reported() {
        let schema = Schema::standard();
        let mut header = header_of(schema);
        header[10] = "Q6 ".to_string();
        assert_eq!(missing_of(schema.validate(&header)), vec!["Q6".to_string()]);
    }

    #[test]
    fn swapped_columns_report_both_slots() {
        let schema = Schema::standard();
        let mut header = header_of(schema);
        header.swap(5, 6);
        let missing = missing_of(schema.validate(&header));
        assert_eq!(missing, vec!["Q1".to_string(), "Q2".to_string()]);
    }

    #[test]
    fn short_header_reports_the_tail() {
        let schema = Schema::standard();
        let mut header = header_of(schema);
        header.truncate(165);
        let missing = missing_of(schema.validate(&header));
        assert_eq!(missing, SKEW_COLUMNS.to_vec());
    }

    #[test]
    fn trailing_extra_columns_are_ignored() {
        let schema = Schema::standard();
        let mut header = header_of(schema);
        header.push("NOTES".to_string());
        assert!(schema.validate(&header).is_ok());
    }

    #[test]
    fn relaxed_mode_accepts_reordering_but_not_absence() {
        let schema = Schema::standard();
        let mut header = header_of(schema);
        header.swap(5, 6);
        assert!(schema.validate_relaxed(&header).is_ok());

        header.retain(|c| c != "SUBJECT");
        assert_eq!(
            missing_of(schema.check(&header, HeaderMode::Relaxed)),
            vec!["SUBJECT".to_string()]
        );
    }

    #[test]
    fn standard_header_fails_against_booklet_layout() {
        let header = header_of(Schema::standard());
        let missing = missing_of(Schema::booklet().validate(&header));
        assert!(missing.contains(&"BKN".to_string()));
    }

    #[test]
    fn exclusion_set_covers_identity_and_skew() {
        assert!(Schema::is_excluded("Serial No."));
        assert!(Schema::is_excluded("LITHO"));
        assert!(Schema::is_excluded("SKEW3"));
        assert!(!Schema::is_excluded("Q1"));
        assert!(!Schema::is_excluded("ROLL NO"));
    }
}
