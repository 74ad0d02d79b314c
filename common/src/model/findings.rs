use crate::model::range::LithoRange;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A LITHO cell as read from one row.
///
/// Cells that do not parse as an integer are kept as `Invalid` so the report can
/// echo what was actually written on the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LithoCode {
    Numeric(i64),
    Invalid(String),
}

impl LithoCode {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(value) => LithoCode::Numeric(value),
            Err(_) => LithoCode::Invalid(trimmed.to_string()),
        }
    }

    pub fn as_numeric(&self) -> Option<i64> {
        match self {
            LithoCode::Numeric(value) => Some(*value),
            LithoCode::Invalid(_) => None,
        }
    }

    /// An invalid code is never within range, whichever bound is checked.
    pub fn is_within(&self, range: &LithoRange) -> bool {
        match self {
            LithoCode::Numeric(value) => range.contains(*value),
            LithoCode::Invalid(_) => false,
        }
    }
}

impl fmt::Display for LithoCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LithoCode::Numeric(value) => write!(f, "{}", value),
            LithoCode::Invalid(raw) if raw.is_empty() => f.write_str("(blank)"),
            LithoCode::Invalid(raw) => f.write_str(raw),
        }
    }
}

/// A `(serial, code)` pair taken from an observed row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRef {
    pub serial: String,
    pub code: LithoCode,
}

/// An expected `(serial, code)` slot that no observed row filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingEntry {
    pub serial: u64,
    pub code: i64,
}

/// Every row sharing one LITHO code, in the order the rows were read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub code: i64,
    /// 1-based data row positions, ascending.
    pub positions: Vec<usize>,
    pub serials: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellValue {
    pub column: String,
    pub value: String,
}

/// Non-empty answer cells of one row, in schema column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowCells {
    pub serial: String,
    pub code: LithoCode,
    pub cells: Vec<CellValue>,
}

/// Everything the analyzer learned about one batch.
///
/// The four discrepancy collections are independent: a row can show up in
/// more than one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Findings {
    pub total_rows: usize,
    pub expected_count: usize,
    pub count_ok: bool,
    /// `None` when the active policy skipped missing-code detection.
    pub missing: Option<Vec<MissingEntry>>,
    pub duplicates: Vec<DuplicateGroup>,
    pub out_of_range: Vec<RowRef>,
    pub non_empty_cells: Vec<RowCells>,
}

impl Findings {
    pub fn shortfall(&self) -> usize {
        self.expected_count.saturating_sub(self.total_rows)
    }

    pub fn excess(&self) -> usize {
        self.total_rows.saturating_sub(self.expected_count)
    }

    /// Rows involved in a duplicate, first occurrences included.
    pub fn duplicate_rows(&self) -> usize {
        self.duplicates.iter().map(|g| g.positions.len()).sum()
    }
}
