use crate::pipeline::error::PipelineError;
use crate::pipeline::report::RenderedReport;
use common::model::archive::ArchiveEntry;
use log::{debug, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// `<stem>-<millis>`; unique unless two uploads share a stem within one millisecond.
pub fn canonical_folder_name(stem: &str, ingested_at_millis: i64) -> String {
    format!("{}-{}", stem, ingested_at_millis)
}

/// Write the report and move the validated upload under `<root>/<folder_name>/`.
///
/// Both files are named after the folder: `<folder_name>.csv` and
/// `<folder_name>.<txt|pdf>`. The report goes first so the upload stays
/// staged if it cannot be written; a failed move takes the report back out.
pub fn archive(
    original: &Path,
    report: &RenderedReport,
    root: &Path,
    folder_name: &str,
) -> Result<ArchiveEntry, PipelineError> {
    let folder = root.join(folder_name);
    fs::create_dir_all(&folder)
        .map_err(|e| PipelineError::io("cannot create archive folder", &folder, e))?;

    let report_file_path = folder.join(format!("{}.{}", folder_name, report.format.extension()));
    if let Err(e) = fs::write(&report_file_path, &report.bytes) {
        discard_folder(&folder);
        return Err(PipelineError::io("cannot write report", &report_file_path, e));
    }

    let original_file_path = folder.join(format!("{}.csv", folder_name));
    if let Err(e) = move_file(original, &original_file_path) {
        if let Err(remove_err) = fs::remove_file(&report_file_path) {
            warn!("cannot remove report {}: {}", report_file_path.display(), remove_err);
        }
        discard_folder(&folder);
        return Err(e);
    }

    debug!("archived into {}", folder.display());
    Ok(ArchiveEntry {
        canonical_folder_name: folder_name.to_string(),
        original_file_path,
        report_file_path,
    })
}

/// Best effort; a folder that is not empty (reused, or holding something we
/// could not remove) is left alone.
fn discard_folder(folder: &Path) {
    if let Err(e) = fs::remove_dir(folder) {
        debug!("leaving archive folder {}: {}", folder.display(), e);
    }
}

/// Rename, falling back to copy + remove when the rename itself is refused
/// (different filesystems, some network mounts).
fn move_file(from: &Path, to: &Path) -> Result<(), PipelineError> {
    if from == to {
        return Ok(());
    }
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(PipelineError::io("staged upload vanished", from, e))
        }
        Err(rename_err) => {
            warn!(
                "rename {} -> {} failed ({}), copying instead",
                from.display(),
                to.display(),
                rename_err
            );
            fs::copy(from, to).map_err(|e| PipelineError::io("cannot copy upload", to, e))?;
            fs::remove_file(from)
                .map_err(|e| PipelineError::io("cannot remove staged upload", from, e))?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::report::ReportFormat;
    use tempfile::tempdir;

    fn report(format: ReportFormat) -> RenderedReport {
        RenderedReport {
            format,
            bytes: b"File Name: 1-10.csv\n".to_vec(),
        }
    }

    #[test]
    fn folder_name_joins_stem_and_millis() {
        assert_eq!(canonical_folder_name("1001-6000", 1760778300123), "1001-6000-1760778300123");
    }

    #[test]
    fn moves_upload_and_writes_report() {
        let dir = tempdir().unwrap();
        let staged = dir.path().join("temp").join("1-10.csv");
        fs::create_dir_all(staged.parent().unwrap()).unwrap();
        fs::write(&staged, "Serial No.,LITHO\n").unwrap();

        let root = dir.path().join("archive");
        let entry = archive(&staged, &report(ReportFormat::Text), &root, "1-10-99").unwrap();

        assert_eq!(entry.canonical_folder_name, "1-10-99");
        assert_eq!(entry.original_file_path, root.join("1-10-99").join("1-10-99.csv"));
        assert_eq!(entry.report_file_path, root.join("1-10-99").join("1-10-99.txt"));
        assert!(!staged.exists());
        assert_eq!(
            fs::read_to_string(&entry.original_file_path).unwrap(),
            "Serial No.,LITHO\n"
        );
        assert_eq!(
            fs::read(&entry.report_file_path).unwrap(),
            b"File Name: 1-10.csv\n".to_vec()
        );
    }

    #[test]
    fn existing_folder_is_reused() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("1-10-5")).unwrap();
        let staged = root.join("up.csv");
        fs::write(&staged, "x").unwrap();

        let entry = archive(&staged, &report(ReportFormat::Pdf), root, "1-10-5").unwrap();
        assert!(entry.report_file_path.ends_with("1-10-5.pdf"));
        assert!(entry.original_file_path.exists());
    }

    #[test]
    fn missing_upload_is_an_io_error_and_leaves_no_folder() {
        let dir = tempdir().unwrap();
        let result = archive(
            &dir.path().join("gone.csv"),
            &report(ReportFormat::Text),
            dir.path(),
            "gone-1",
        );
        let err = result.unwrap_err();
        assert!(matches!(err, PipelineError::Io { context: "staged upload vanished", .. }));
        assert_eq!(err.kind(), "io_error");
        assert!(!dir.path().join("gone-1").exists());
    }

    #[test]
    fn report_write_failure_keeps_upload_staged() {
        let dir = tempdir().unwrap();
        let staged = dir.path().join("temp").join("1-10.csv");
        fs::create_dir_all(staged.parent().unwrap()).unwrap();
        fs::write(&staged, "Serial No.,LITHO\n").unwrap();

        // A directory sitting on the report path makes the write fail.
        let root = dir.path().join("archive");
        let folder = root.join("1-10-7");
        fs::create_dir_all(folder.join("1-10-7.txt")).unwrap();

        let err = archive(&staged, &report(ReportFormat::Text), &root, "1-10-7").unwrap_err();
        assert_eq!(err.kind(), "io_error");
        assert!(staged.exists());
        assert!(!folder.join("1-10-7.csv").exists());
    }
}
