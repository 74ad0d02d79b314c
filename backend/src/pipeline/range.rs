use crate::pipeline::error::PipelineError;
use common::model::range::LithoRange;
use std::path::Path;

/// Rows a complete batch carries unless configured otherwise.
pub const DEFAULT_EXPECTED_COUNT: usize = 5000;

/// File name without directories or extension.
pub fn file_stem(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
}

/// Derive `{min, max}` from names like `1001-6000.csv`.
///
/// Only the first two `-` separated tokens are read; anything after them
/// (`1001-6000-retake.csv`) is ignored.
pub fn parse_range(file_name: &str, expected_count: usize) -> Result<LithoRange, PipelineError> {
    let malformed = || PipelineError::MalformedFilename(file_name.to_string());

    let mut tokens = file_stem(file_name).split('-');
    let min = parse_bound(tokens.next()).ok_or_else(malformed)?;
    let max = parse_bound(tokens.next()).ok_or_else(malformed)?;
    if min > max {
        return Err(malformed());
    }

    Ok(LithoRange {
        min,
        max,
        expected_count,
    })
}

fn parse_bound(token: Option<&str>) -> Option<i64> {
    token.and_then(|t| t.trim().parse::<i64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_bounds_from_plain_name() {
        let range = parse_range("1001-6000.csv", DEFAULT_EXPECTED_COUNT).unwrap();
        assert_eq!(range.min, 1001);
        assert_eq!(range.max, 6000);
        assert_eq!(range.expected_count, 5000);
    }

    #[test]
    fn expected_count_comes_from_caller() {
        let range = parse_range("1-100.csv", 100).unwrap();
        assert_eq!(range.expected_count, 100);
    }

    #[test]
    fn extra_tokens_and_directories_are_ignored() {
        let range = parse_range("uploads/2001-7000-retake.csv", 5000).unwrap();
        assert_eq!((range.min, range.max), (2001, 7000));
    }

    #[test]
    fn rejects_names_without_two_numbers() {
        for name in ["batch.csv", "1001.csv", "abc-6000.csv", "1001-xyz.csv", "-.csv", ""] {
            match parse_range(name, 5000) {
                Err(PipelineError::MalformedFilename(n)) => assert_eq!(n, name),
                other => panic!("{} should be malformed, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn rejects_inverted_bounds() {
        assert!(matches!(
            parse_range("6000-1001.csv", 5000),
            Err(PipelineError::MalformedFilename(_))
        ));
    }

    #[test]
    fn stem_strips_extension_and_directories() {
        assert_eq!(file_stem("a/b/1-100.csv"), "1-100");
        assert_eq!(file_stem("1-100"), "1-100");
    }
}
