use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Expected LITHO code bounds for one batch.
///
/// `min` and `max` come from the uploaded file name (`1001-6000.csv`), while
/// `expected_count` is a deployment setting and never read from the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LithoRange {
    pub min: i64,
    pub max: i64,
    pub expected_count: usize,
}

impl LithoRange {
    /// Inclusive bound check used for the out-of-range block.
    pub fn contains(&self, code: i64) -> bool {
        code >= self.min && code <= self.max
    }

    /// The codes a complete batch is expected to carry: `min ..= min + expected_count - 1`.
    ///
    /// Position `k` (0-based) of this sequence corresponds to serial `k + 1`.
    pub fn expected_codes(&self) -> RangeInclusive<i64> {
        let span = self.expected_count.saturating_sub(1) as i64;
        self.min..=self.min.saturating_add(span)
    }
}
