use crate::pipeline::error::CleanupError;
use log::{debug, error, warn};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Fixed retry budget with a fixed pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

/// Remove a staged upload and its staging directory. `temp_file` is `None`
/// when the upload never got as far as writing a file.
///
/// Blocks for up to `attempts * delay`; callers on an async path should run it
/// on a blocking thread. Returns the number of attempts it took. Anything that
/// is already gone counts as removed.
pub fn cleanup_upload(
    temp_file: Option<&Path>,
    staging_dir: &Path,
    policy: RetryPolicy,
) -> Result<u32, CleanupError> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match remove_artifacts(temp_file, staging_dir) {
            Ok(()) => {
                debug!("removed staging dir {} (attempt {})", staging_dir.display(), attempt);
                return Ok(attempt);
            }
            Err((path, source)) => {
                warn!(
                    "cleanup attempt {}/{} for {} failed: {}",
                    attempt,
                    attempts,
                    path.display(),
                    source
                );
                if attempt >= attempts {
                    error!(
                        "giving up on cleanup of {} after {} attempts",
                        path.display(),
                        attempts
                    );
                    return Err(CleanupError {
                        path,
                        attempts,
                        source,
                    });
                }
            }
        }
        thread::sleep(policy.delay);
        attempt += 1;
    }
}

fn remove_artifacts(temp_file: Option<&Path>, staging_dir: &Path) -> Result<(), (PathBuf, io::Error)> {
    if let Some(file) = temp_file {
        ignore_missing(std::fs::remove_file(file)).map_err(|e| (file.to_path_buf(), e))?;
    }
    ignore_missing(std::fs::remove_dir_all(staging_dir))
        .map_err(|e| (staging_dir.to_path_buf(), e))
}

fn ignore_missing(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
