//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [executor] section
    if let Some(section) = ini.section(Some("executor")) {
        let s = SectionReader::new("executor", section);
        if let Some(v) = s.positive("request_capacity")? {
            config.executor.request_capacity = v;
        }
        if let Some(v) = s.positive("response_capacity")? {
            config.executor.response_capacity = v;
        }
        if let Some(v) = s.positive("max_concurrent_tasks")? {
            config.executor.max_concurrent_tasks = v;
        }
        if let Some(secs) = s.parse::<u64>(
            "cancellation_ttl_secs",
            "must be a non-negative integer (seconds, 0 disables)",
        )? {
            config.executor.cancellation_ttl = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(secs) =
            s.parse::<u64>("shutdown_grace_secs", "must be a non-negative integer (seconds)")?
        {
            config.executor.shutdown_grace = Duration::from_secs(secs);
        }
    }

    // [codec] section
    if let Some(section) = ini.section(Some("codec")) {
        let s = SectionReader::new("codec", section);
        if let Some(v) = s.positive("max_pixels")? {
            config.codec.max_pixels = v;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = Some(expand_tilde(v));
            }
        }
        if let Some(v) = section.get("level") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.level = Some(v.to_string());
            }
        }
    }

    Ok(config)
}

/// Typed access to one section's keys.
struct SectionReader<'a> {
    name: &'static str,
    props: &'a Properties,
}

impl<'a> SectionReader<'a> {
    fn new(name: &'static str, props: &'a Properties) -> Self {
        Self { name, props }
    }

    fn parse<T: FromStr>(&self, key: &str, reason: &str) -> Result<Option<T>, ConfigFileError> {
        let Some(raw) = self.props.get(key) else {
            return Ok(None);
        };
        raw.trim()
            .parse()
            .map(Some)
            .map_err(|_| self.invalid(key, raw, reason))
    }

    fn positive<T>(&self, key: &str) -> Result<Option<T>, ConfigFileError>
    where
        T: FromStr + PartialEq + Default,
    {
        const REASON: &str = "must be a positive integer";
        match self.parse::<T>(key, REASON)? {
            Some(v) if v == T::default() => {
                Err(self.invalid(key, self.props.get(key).unwrap_or_default(), REASON))
            }
            other => Ok(other),
        }
    }

    fn invalid(&self, key: &str, value: &str, reason: &str) -> ConfigFileError {
        ConfigFileError::InvalidValue {
            section: self.name.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::*;
    use tempfile::TempDir;

    fn load(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(&config_path, content).unwrap();
        ConfigFile::load_from(&config_path)
    }

    #[test]
    fn test_full_config() {
        let config = load(
            r#"
[executor]
request_capacity = 64
response_capacity = 32
max_concurrent_tasks = 2
cancellation_ttl_secs = 60
shutdown_grace_secs = 1

[codec]
max_pixels = 1000000

[logging]
file = /tmp/pixo.log
level = debug
"#,
        )
        .unwrap();

        assert_eq!(config.executor.request_capacity, 64);
        assert_eq!(config.executor.response_capacity, 32);
        assert_eq!(config.executor.max_concurrent_tasks, 2);
        assert_eq!(config.executor.cancellation_ttl, Some(Duration::from_secs(60)));
        assert_eq!(config.executor.shutdown_grace, Duration::from_secs(1));
        assert_eq!(config.codec.max_pixels, 1_000_000);
        assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/pixo.log")));
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_partial_config() {
        let config = load("[codec]\nmax_pixels = 500\n").unwrap();

        assert_eq!(config.codec.max_pixels, 500);
        assert_eq!(config.executor, ExecutorConfig::default());
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_zero_ttl_disables_pruning() {
        let config = load("[executor]\ncancellation_ttl_secs = 0\n").unwrap();
        assert!(config.executor.cancellation_ttl.is_none());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = load("[executor]\nrequest_capacity = 0\n").unwrap_err();
        match err {
            ConfigFileError::InvalidValue { section, key, value, .. } => {
                assert_eq!(section, "executor");
                assert_eq!(key, "request_capacity");
                assert_eq!(value, "0");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_non_numeric_grace_rejected() {
        let err = load("[executor]\nshutdown_grace_secs = soon\n").unwrap_err();
        assert!(err.to_string().contains("shutdown_grace_secs"));
    }

    #[test]
    fn test_empty_logging_values_ignored() {
        let config = load("[logging]\nfile =\nlevel =  \n").unwrap();
        assert!(config.logging.file.is_none());
        assert!(config.logging.level.is_none());
    }

    #[test]
    fn test_expand_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/logs/pixo.log"), home.join("logs/pixo.log"));
        }
        assert_eq!(expand_tilde("/var/log/pixo.log"), PathBuf::from("/var/log/pixo.log"));
    }
}
