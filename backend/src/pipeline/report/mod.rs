//! Discrepancy report rendering.
//!
//! Both renderings consume the same ordered list of lines built by
//! [`report_lines`], so a text report and a PDF report of the same findings
//! always say the same thing in the same order:
//!
//! 1. header block (file, submitter, timestamp, total rows)
//! 2. count verdict
//! 3. missing / extra block
//! 4. duplicates block
//! 5. out-of-range block
//! 6. non-empty cells block
//!
//! Empty blocks are spelled out (`None` / `NONE`) rather than omitted.
//! Rendering does no I/O; writing the bytes somewhere is the archiver's job.

pub mod pdf;
pub mod text;

use crate::pipeline::error::PipelineError;
use chrono::NaiveDateTime;
use common::model::findings::Findings;
use common::model::report::ReportFormat;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Context printed in the report header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportMeta {
    pub file_name: String,
    pub submitted_by: String,
    pub processed_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub format: ReportFormat,
    pub bytes: Vec<u8>,
}

pub fn render(
    findings: &Findings,
    meta: &ReportMeta,
    format: ReportFormat,
) -> Result<RenderedReport, PipelineError> {
    let lines = report_lines(findings, meta);
    let bytes = match format {
        ReportFormat::Text => text::render(&lines),
        ReportFormat::Pdf => pdf::render(&lines, &meta.file_name)?,
    };
    Ok(RenderedReport { format, bytes })
}

pub fn report_lines(findings: &Findings, meta: &ReportMeta) -> Vec<String> {
    let mut lines = vec![
        format!("File Name: {}", meta.file_name),
        format!("Processed by: {}", meta.submitted_by),
        format!("Processed on: {}", meta.processed_at.format(TIMESTAMP_FORMAT)),
        format!("Total rows: {}", findings.total_rows),
        String::new(),
        format!(
            "Total no of data: {}",
            if findings.count_ok { "OK" } else { "NOT OK" }
        ),
        String::new(),
    ];

    push_missing_block(&mut lines, findings);
    lines.push(String::new());
    push_duplicates_block(&mut lines, findings);
    lines.push(String::new());
    push_out_of_range_block(&mut lines, findings);
    lines.push(String::new());
    push_non_empty_block(&mut lines, findings);
    lines
}

fn push_missing_block(lines: &mut Vec<String>, findings: &Findings) {
    let listed = findings.missing.as_ref().filter(|m| !m.is_empty());
    if findings.count_ok && listed.is_none() {
        lines.push("Missing or extra data: None".to_string());
        return;
    }

    if findings.shortfall() > 0 {
        lines.push(format!("Total missing data: {}", findings.shortfall()));
    }
    if findings.excess() > 0 {
        lines.push(format!("Total extra data: {}", findings.excess()));
    }
    match &findings.missing {
        Some(missing) if !missing.is_empty() => {
            lines.push(format!("Missing data ({}):", missing.len()));
            lines.extend(missing.iter().map(|m| format!("{}, {}", m.serial, m.code)));
        }
        Some(_) => lines.push("Missing data: None".to_string()),
        None => {}
    }
}

fn push_duplicates_block(lines: &mut Vec<String>, findings: &Findings) {
    if findings.duplicates.is_empty() {
        lines.push("Duplicate Lithocode Found (0): None".to_string());
        return;
    }
    lines.push(format!(
        "Duplicate Lithocode Found ({}):",
        findings.duplicates.len()
    ));
    for group in &findings.duplicates {
        let mut parts: Vec<String> = group.positions.iter().map(|p| p.to_string()).collect();
        parts.push(group.code.to_string());
        lines.push(parts.join(" , "));
    }
}

fn push_out_of_range_block(lines: &mut Vec<String>, findings: &Findings) {
    if findings.out_of_range.is_empty() {
        lines.push("Not in range: NONE".to_string());
        return;
    }
    lines.push(format!("Not in range ({}):", findings.out_of_range.len()));
    lines.extend(
        findings
            .out_of_range
            .iter()
            .map(|r| format!("{}, {}", r.serial, r.code)),
    );
}

fn push_non_empty_block(lines: &mut Vec<String>, findings: &Findings) {
    if findings.non_empty_cells.is_empty() {
        lines.push("Non-empty cells: NONE".to_string());
        return;
    }
    lines.push(format!(
        "Non-empty cells ({}):",
        findings.non_empty_cells.len()
    ));
    for row in &findings.non_empty_cells {
        let cells: Vec<String> = row
            .cells
            .iter()
            .map(|c| format!("{}={}", c.column, c.value))
            .collect();
        lines.push(format!("{}, {}: {}", row.serial, row.code, cells.join("; ")));
    }
}
