use crate::pipeline::analyzer::MissingPolicy;
use crate::pipeline::cleanup::RetryPolicy;
use crate::pipeline::range::DEFAULT_EXPECTED_COUNT;
use crate::pipeline::schema::{HeaderMode, SchemaVariant};
use crate::pipeline::PipelineSettings;
use common::model::report::ReportFormat;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: expected {expected}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Server settings, read from `SERIALIZE_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub work_root: PathBuf,
    pub db_path: PathBuf,
    pub pipeline: PipelineSettings,
    pub cleanup: RetryPolicy,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Loads `.env` when present, then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let work_root = PathBuf::from(
            get("SERIALIZE_WORK_ROOT").unwrap_or_else(|| "serializeTempFolder".to_string()),
        );

        let expected_count: usize = parse_number(&get, "SERIALIZE_EXPECTED_COUNT", DEFAULT_EXPECTED_COUNT)?;
        if expected_count == 0 {
            return Err(ConfigError::Invalid {
                key: "SERIALIZE_EXPECTED_COUNT",
                value: "0".to_string(),
                expected: "a positive row count",
            });
        }

        let pipeline = PipelineSettings {
            schema: parse_named(&get, "SERIALIZE_SCHEMA", SchemaVariant::from_name, "standard or booklet")?,
            header_mode: parse_named(&get, "SERIALIZE_HEADER_MODE", HeaderMode::from_name, "positional or relaxed")?,
            missing_policy: parse_named(
                &get,
                "SERIALIZE_MISSING_POLICY",
                MissingPolicy::from_name,
                "count-gated or set-difference",
            )?,
            expected_count,
            report_format: parse_named(&get, "SERIALIZE_REPORT_FORMAT", ReportFormat::from_name, "text or pdf")?,
            archive_root: work_root.clone(),
        };

        let cleanup = RetryPolicy {
            attempts: parse_number(&get, "SERIALIZE_CLEANUP_RETRIES", 3)?,
            delay: Duration::from_millis(parse_number(&get, "SERIALIZE_CLEANUP_DELAY_MS", 1000)?),
        };
        let max_upload_mb: usize = parse_number(&get, "SERIALIZE_MAX_UPLOAD_MB", 50)?;

        Ok(AppConfig {
            host: get("SERIALIZE_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_number(&get, "SERIALIZE_PORT", 8080)?,
            work_root,
            db_path: PathBuf::from(get("SERIALIZE_DB_PATH").unwrap_or_else(|| "serialize.sqlite".to_string())),
            pipeline,
            cleanup,
            max_upload_bytes: max_upload_mb.saturating_mul(1024 * 1024),
        })
    }

    /// Uploads are staged under `<work_root>/temp/<uuid>/`.
    pub fn staging_root(&self) -> PathBuf {
        self.work_root.join("temp")
    }
}

fn parse_number<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            value: raw,
            expected: "a non-negative integer",
        }),
    }
}

fn parse_named<T, G>(
    get: &G,
    key: &'static str,
    from_name: fn(&str) -> Option<T>,
    expected: &'static str,
) -> Result<T, ConfigError>
where
    T: Default,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(T::default()),
        Some(raw) => from_name(&raw).ok_or(ConfigError::Invalid {
            key,
            value: raw,
            expected,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.work_root, PathBuf::from("serializeTempFolder"));
        assert_eq!(config.staging_root(), PathBuf::from("serializeTempFolder").join("temp"));
        assert_eq!(config.db_path, PathBuf::from("serialize.sqlite"));
        assert_eq!(config.pipeline.expected_count, 5000);
        assert_eq!(config.pipeline.report_format, ReportFormat::Text);
        assert_eq!(config.pipeline.schema, SchemaVariant::Standard);
        assert_eq!(config.pipeline.header_mode, HeaderMode::Positional);
        assert_eq!(config.pipeline.missing_policy, MissingPolicy::CountGated);
        assert_eq!(config.pipeline.archive_root, config.work_root);
        assert_eq!(config.cleanup, RetryPolicy::default());
        assert_eq!(config.max_upload_bytes, 50 * 1024 * 1024);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            ("SERIALIZE_PORT", "9090"),
            ("SERIALIZE_WORK_ROOT", "/srv/serialize"),
            ("SERIALIZE_EXPECTED_COUNT", "250"),
            ("SERIALIZE_REPORT_FORMAT", "PDF"),
            ("SERIALIZE_SCHEMA", "booklet"),
            ("SERIALIZE_HEADER_MODE", "relaxed"),
            ("SERIALIZE_MISSING_POLICY", "set-difference"),
            ("SERIALIZE_CLEANUP_RETRIES", "5"),
            ("SERIALIZE_CLEANUP_DELAY_MS", "20"),
        ])
        .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.pipeline.archive_root, PathBuf::from("/srv/serialize"));
        assert_eq!(config.pipeline.expected_count, 250);
        assert_eq!(config.pipeline.report_format, ReportFormat::Pdf);
        assert_eq!(config.pipeline.schema, SchemaVariant::Booklet);
        assert_eq!(config.pipeline.header_mode, HeaderMode::Relaxed);
        assert_eq!(config.pipeline.missing_policy, MissingPolicy::SetDifference);
        assert_eq!(config.cleanup.attempts, 5);
        assert_eq!(config.cleanup.delay, Duration::from_millis(20));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = config_from(&[("SERIALIZE_PORT", "  ")]).unwrap();
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn bad_values_name_the_key() {
        assert!(matches!(
            config_from(&[("SERIALIZE_PORT", "eighty")]),
            Err(ConfigError::Invalid { key: "SERIALIZE_PORT", .. })
        ));
        assert!(matches!(
            config_from(&[("SERIALIZE_REPORT_FORMAT", "docx")]),
            Err(ConfigError::Invalid { key: "SERIALIZE_REPORT_FORMAT", .. })
        ));
        assert!(matches!(
            config_from(&[("SERIALIZE_EXPECTED_COUNT", "0")]),
            Err(ConfigError::Invalid { key: "SERIALIZE_EXPECTED_COUNT", .. })
        ));
    }
}
