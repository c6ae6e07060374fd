//! Task configuration and where it is loaded from.

use crate::batch::{BatchPolicy, ReportOptions};
use crate::core::error::{Result, ScanError};
use crate::session::{ClamdAddress, SessionConfig};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

/// Property keys read by [`ClamScanConfig::from_source`].
pub mod keys {
    /// Daemon host name.
    pub const HOST: &str = "clamav.service.host";
    /// Daemon TCP port.
    pub const PORT: &str = "clamav.service.port";
    /// Daemon Unix socket; wins over host and port when set.
    pub const SOCKET: &str = "clamav.service.socket";
    /// Timeout in milliseconds.
    pub const TIMEOUT: &str = "clamav.socket.timeout";
    /// Stop a batch at the first infected item.
    pub const FAILFAST: &str = "clamav.scan.failfast";
    /// Bytes per INSTREAM chunk.
    pub const CHUNKSIZE: &str = "clamav.scan.chunksize";
    /// List partial results of aborted batches.
    pub const PARTIAL: &str = "clamav.report.partial";
}

/// Where configuration properties come from.
pub trait ConfigSource {
    /// Returns the raw value of `key`, if set.
    fn get_property(&self, key: &str) -> Option<String>;
}

impl ConfigSource for HashMap<String, String> {
    fn get_property(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl ConfigSource for HashMap<&str, &str> {
    fn get_property(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.to_string())
    }
}

/// Reads properties from environment variables: `clamav.scan.failfast`
/// becomes `CLAMAV_SCAN_FAILFAST`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

impl EnvSource {
    /// Environment variable name for a property key.
    pub fn var_name(key: &str) -> String {
        key.to_ascii_uppercase().replace('.', "_")
    }
}

impl ConfigSource for EnvSource {
    fn get_property(&self, key: &str) -> Option<String> {
        std::env::var(Self::var_name(key)).ok()
    }
}

/// Configuration of the ClamAV curation task.
///
/// # Example
///
/// ```rust
/// use clamstream::task::ClamScanConfig;
/// use clamstream::batch::BatchPolicy;
/// use std::collections::HashMap;
///
/// let props: HashMap<&str, &str> = [
///     ("clamav.service.host", "clamd.internal"),
///     ("clamav.scan.failfast", "false"),
/// ]
/// .into_iter()
/// .collect();
///
/// let config = ClamScanConfig::from_source(&props).unwrap();
/// assert_eq!(config.policy, BatchPolicy::Accumulate);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClamScanConfig {
    /// Daemon connection settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Reaction to infected items.
    #[serde(default)]
    pub policy: BatchPolicy,

    /// Reporting options.
    #[serde(default)]
    pub report: ReportOptions,
}

impl ClamScanConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the session configuration.
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Sets the batch policy.
    pub fn with_policy(mut self, policy: BatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the reporting options.
    pub fn with_report_options(mut self, report: ReportOptions) -> Self {
        self.report = report;
        self
    }

    /// Loads and validates the configuration from `source`. Unset keys keep
    /// their defaults.
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self> {
        let defaults = Self::default();
        let mut session = defaults.session.clone();

        let socket = source
            .get_property(keys::SOCKET)
            .filter(|s| !s.trim().is_empty());
        session.address = match socket {
            Some(path) => ClamdAddress::unix(path.trim()),
            None => {
                let host = source
                    .get_property(keys::HOST)
                    .map(|h| h.trim().to_string())
                    .unwrap_or_else(|| "127.0.0.1".to_string());
                let port = parse_or(source, keys::PORT, 3310u16)?;
                ClamdAddress::tcp(host, port)
            }
        };

        let timeout_ms = parse_or(source, keys::TIMEOUT, session.timeout.as_millis() as u64)?;
        session.timeout = Duration::from_millis(timeout_ms);
        session.chunk_size = parse_or(source, keys::CHUNKSIZE, session.chunk_size)?;

        let fail_fast = parse_bool_or(source, keys::FAILFAST, defaults.policy.is_fail_fast())?;
        let partial = parse_bool_or(
            source,
            keys::PARTIAL,
            defaults.report.include_partial_results,
        )?;

        let config = Self {
            session,
            policy: BatchPolicy::from_fail_fast(fail_fast),
            report: ReportOptions::default().with_partial_results(partial),
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration from `CLAMAV_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_source(&EnvSource)
    }

    /// Checks the configuration.
    pub fn validate(&self) -> Result<()> {
        self.session.validate()
    }
}

fn parse_or<T: FromStr>(source: &dyn ConfigSource, key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match source.get_property(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| {
            ScanError::configuration(format!("invalid value '{}' for {}: {}", raw, key, e))
        }),
    }
}

fn parse_bool_or(source: &dyn ConfigSource, key: &str, default: bool) -> Result<bool> {
    match source.get_property(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(ScanError::configuration(format!(
                "invalid boolean '{}' for {}",
                raw, key
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&'static str, &'static str)]) -> HashMap<&'static str, &'static str> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_defaults_from_empty_source() {
        let config = ClamScanConfig::from_source(&props(&[])).unwrap();
        assert_eq!(config, ClamScanConfig::default());
        assert_eq!(config.session.address, ClamdAddress::tcp("127.0.0.1", 3310));
        assert_eq!(config.session.timeout, Duration::from_millis(120_000));
        assert!(config.policy.is_fail_fast());
        assert!(config.report.include_partial_results);
    }

    #[test]
    fn test_every_key_is_honoured() {
        let config = ClamScanConfig::from_source(&props(&[
            (keys::HOST, "av.example.org"),
            (keys::PORT, "3311"),
            (keys::TIMEOUT, "5000"),
            (keys::FAILFAST, "false"),
            (keys::CHUNKSIZE, "4096"),
            (keys::PARTIAL, "no"),
        ]))
        .unwrap();

        assert_eq!(config.session.address, ClamdAddress::tcp("av.example.org", 3311));
        assert_eq!(config.session.timeout, Duration::from_secs(5));
        assert_eq!(config.session.chunk_size, 4096);
        assert_eq!(config.policy, BatchPolicy::Accumulate);
        assert!(!config.report.include_partial_results);
    }

    #[test]
    fn test_socket_wins_over_host() {
        let config = ClamScanConfig::from_source(&props(&[
            (keys::HOST, "ignored"),
            (keys::SOCKET, "/run/clamav/clamd.ctl"),
        ]))
        .unwrap();
        assert_eq!(config.session.address, ClamdAddress::unix("/run/clamav/clamd.ctl"));
    }

    #[test]
    fn test_rejects_bad_values() {
        for pairs in [
            [(keys::TIMEOUT, "0")],
            [(keys::CHUNKSIZE, "0")],
            [(keys::HOST, " ")],
            [(keys::PORT, "not-a-port")],
            [(keys::FAILFAST, "maybe")],
        ] {
            let err = ClamScanConfig::from_source(&props(&pairs)).unwrap_err();
            assert!(matches!(err, ScanError::Configuration { .. }), "{:?}", pairs);
        }
    }

    #[test]
    fn test_env_var_names() {
        assert_eq!(EnvSource::var_name(keys::HOST), "CLAMAV_SERVICE_HOST");
        assert_eq!(EnvSource::var_name(keys::TIMEOUT), "CLAMAV_SOCKET_TIMEOUT");
        assert_eq!(EnvSource::var_name(keys::PARTIAL), "CLAMAV_REPORT_PARTIAL");
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("CLAMAV_SCAN_CHUNKSIZE", "2048");
        let config = ClamScanConfig::from_env().unwrap();
        std::env::remove_var("CLAMAV_SCAN_CHUNKSIZE");
        assert_eq!(config.session.chunk_size, 2048);
    }
}
