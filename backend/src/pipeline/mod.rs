//! Validation and reporting pipeline for one uploaded answer-sheet batch.
//!
//! Stages run strictly in order and the first failure halts the run:
//!
//! 1. `batch`: header checked against the schema, then rows parsed
//! 2. `range`: LITHO bounds read from the file name
//! 3. `analyzer`: one pass collecting every discrepancy
//! 4. `report`: text or PDF rendering of the findings
//! 5. `archive`: upload and report moved under `<root>/<stem>-<millis>/`
//!
//! Nothing is written to the archive unless every earlier stage succeeded.
//! Removing the staged upload after a failure is the caller's decision; see
//! [`cleanup::cleanup_upload`].

pub mod analyzer;
pub mod archive;
pub mod batch;
pub mod cleanup;
pub mod error;
pub mod range;
pub mod report;
pub mod schema;

use crate::pipeline::analyzer::MissingPolicy;
use crate::pipeline::batch::Batch;
use crate::pipeline::error::PipelineError;
use crate::pipeline::report::{RenderedReport, ReportMeta};
use crate::pipeline::schema::{HeaderMode, Schema, SchemaVariant};
use chrono::{DateTime, Local};
use common::model::archive::ArchiveEntry;
use common::model::findings::Findings;
use common::model::report::ReportFormat;
use log::{debug, info, trace};
use std::path::PathBuf;

/// Installation-wide knobs, fixed for the lifetime of the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub schema: SchemaVariant,
    pub header_mode: HeaderMode,
    pub missing_policy: MissingPolicy,
    pub expected_count: usize,
    pub report_format: ReportFormat,
    pub archive_root: PathBuf,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings {
            schema: SchemaVariant::default(),
            header_mode: HeaderMode::default(),
            missing_policy: MissingPolicy::default(),
            expected_count: range::DEFAULT_EXPECTED_COUNT,
            report_format: ReportFormat::default(),
            archive_root: PathBuf::from("serializeTempFolder"),
        }
    }
}

/// One staged upload.
#[derive(Debug, Clone)]
pub struct PipelineInput {
    /// Where the upload receiver left the bytes.
    pub upload_path: PathBuf,
    /// Name the client gave the file; the LITHO range is read from it.
    pub file_name: String,
    pub submitted_by: String,
    pub ingested_at: DateTime<Local>,
}

#[derive(Debug)]
pub struct PipelineOutcome {
    pub findings: Findings,
    pub report: RenderedReport,
    pub entry: ArchiveEntry,
}

pub fn run(settings: &PipelineSettings, input: &PipelineInput) -> Result<PipelineOutcome, PipelineError> {
    debug!("processing {} for {}", input.file_name, input.submitted_by);

    let schema = Schema::for_variant(settings.schema);
    let batch = Batch::from_path(&input.upload_path, schema, settings.header_mode)?;
    let litho_range = range::parse_range(&input.file_name, settings.expected_count)?;
    debug!(
        "{} rows against range {}..={} (expecting {})",
        batch.len(),
        litho_range.min,
        litho_range.max,
        litho_range.expected_count
    );

    let findings = analyzer::analyze(&batch, &litho_range, settings.missing_policy);
    drop(batch);
    if log::log_enabled!(log::Level::Trace) {
        trace!("findings: {}", serde_json::to_string(&findings).unwrap_or_default());
    }

    let meta = ReportMeta {
        file_name: input.file_name.clone(),
        submitted_by: input.submitted_by.clone(),
        processed_at: input.ingested_at.naive_local(),
    };
    let report = report::render(&findings, &meta, settings.report_format)?;

    let folder_name = archive::canonical_folder_name(
        range::file_stem(&input.file_name),
        input.ingested_at.timestamp_millis(),
    );
    let entry = archive::archive(&input.upload_path, &report, &settings.archive_root, &folder_name)?;

    info!(
        "processed {}: {} rows (count {}), archived as {}",
        input.file_name,
        findings.total_rows,
        if findings.count_ok { "ok" } else { "not ok" },
        entry.canonical_folder_name
    );
    Ok(PipelineOutcome {
        findings,
        report,
        entry,
    })
}
