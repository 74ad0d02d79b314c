//! Single pass over a batch that collects every discrepancy the report shows.
//!
//! Duplicate, out-of-range and non-empty-cell collection happen row by row; the
//! missing-code list is derived afterwards from the set of codes seen, so no row
//! is visited twice and no expected code triggers a rescan.

use crate::pipeline::batch::{Batch, Row};
use common::model::findings::{
    CellValue, DuplicateGroup, Findings, LithoCode, MissingEntry, RowCells, RowRef,
};
use common::model::range::LithoRange;
use log::debug;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

/// When to list expected codes that no row carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPolicy {
    /// Only when the batch is short of `expected_count`.
    #[default]
    CountGated,
    /// Always, from the difference between expected and observed codes.
    SetDifference,
}

impl MissingPolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "count-gated" | "count_gated" => Some(MissingPolicy::CountGated),
            "set-difference" | "set_difference" => Some(MissingPolicy::SetDifference),
            _ => None,
        }
    }
}

struct FirstSeen {
    position: usize,
    serial: String,
    group: Option<usize>,
}

#[derive(Default)]
struct Accumulator {
    total_rows: usize,
    observed: HashSet<i64>,
    seen: HashMap<i64, FirstSeen>,
    duplicates: Vec<DuplicateGroup>,
    out_of_range: Vec<RowRef>,
    non_empty_cells: Vec<RowCells>,
}

impl Accumulator {
    fn observe(&mut self, row: Row<'_>, range: &LithoRange, interest: &[(String, usize)]) {
        self.total_rows += 1;
        let serial = row.serial().to_string();
        let code = LithoCode::parse(row.litho());

        if let Some(value) = code.as_numeric() {
            self.observed.insert(value);
            self.track_duplicate(value, row.position(), &serial);
        }

        if !code.is_within(range) {
            self.out_of_range.push(RowRef {
                serial: serial.clone(),
                code: code.clone(),
            });
        }

        let cells: Vec<CellValue> = interest
            .iter()
            .filter_map(|(column, index)| {
                let value = row.get_index(*index).trim();
                (!value.is_empty()).then(|| CellValue {
                    column: column.clone(),
                    value: value.to_string(),
                })
            })
            .collect();
        if !cells.is_empty() {
            self.non_empty_cells.push(RowCells {
                serial,
                code,
                cells,
            });
        }
    }

    fn track_duplicate(&mut self, code: i64, position: usize, serial: &str) {
        match self.seen.entry(code) {
            Entry::Vacant(slot) => {
                slot.insert(FirstSeen {
                    position,
                    serial: serial.to_string(),
                    group: None,
                });
            }
            Entry::Occupied(mut slot) => {
                let first = slot.get_mut();
                match first.group {
                    Some(i) => {
                        self.duplicates[i].positions.push(position);
                        self.duplicates[i].serials.push(serial.to_string());
                    }
                    None => {
                        first.group = Some(self.duplicates.len());
                        self.duplicates.push(DuplicateGroup {
                            code,
                            positions: vec![first.position, position],
                            serials: vec![first.serial.clone(), serial.to_string()],
                        });
                    }
                }
            }
        }
    }

    fn finish(mut self, range: &LithoRange, policy: MissingPolicy) -> Findings {
        let expected_count = range.expected_count;
        let count_ok = self.total_rows == expected_count;
        let missing = match policy {
            MissingPolicy::CountGated if self.total_rows < expected_count => {
                Some(missing_codes(range, &self.observed))
            }
            MissingPolicy::CountGated => None,
            MissingPolicy::SetDifference => Some(missing_codes(range, &self.observed)),
        };

        // Groups are opened on the second sighting; report them by first sighting.
        self.duplicates.sort_by_key(|g| g.positions[0]);

        Findings {
            total_rows: self.total_rows,
            expected_count,
            count_ok,
            missing,
            duplicates: self.duplicates,
            out_of_range: self.out_of_range,
            non_empty_cells: self.non_empty_cells,
        }
    }
}

fn missing_codes(range: &LithoRange, observed: &HashSet<i64>) -> Vec<MissingEntry> {
    range
        .expected_codes()
        .enumerate()
        .filter(|(_, code)| !observed.contains(code))
        .map(|(k, code)| MissingEntry {
            serial: k as u64 + 1,
            code,
        })
        .collect()
}

pub fn analyze(batch: &Batch, range: &LithoRange, policy: MissingPolicy) -> Findings {
    let mut acc = Accumulator::default();
    for row in batch.rows() {
        acc.observe(row, range, batch.interest_columns());
    }
    let findings = acc.finish(range, policy);
    debug!(
        "analyzed {} rows: {} duplicate codes over {} rows, {} out of range, {} rows with answers",
        findings.total_rows,
        findings.duplicates.len(),
        findings.duplicate_rows(),
        findings.out_of_range.len(),
        findings.non_empty_cells.len()
    );
    findings
}
