//! Configuration management for the hoststats reporter.
//!
//! Configuration is resolved once at startup: an optional YAML file provides
//! the base values and command-line flags override them. The result is never
//! modified afterwards.

use anyhow::{Context, Result};
use hoststats_common::LogFormat;
use hoststats_telemetry::{DiskPaths, Unit};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::cli::Args;
use crate::hostname::AUTO_HOSTNAME;

/// Default configuration file, read when present and no `--config` is given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/hoststats/hoststats.yaml";

/// Reporting interval of the plain reporter.
pub const DEFAULT_FREQUENCY_SECS: u64 = 5;

/// Reporting interval when the cAdvisor-aware reporter is enabled.
pub const DEFAULT_AGGREGATOR_FREQUENCY_SECS: u64 = 60;

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reporting interval in seconds (variant default when unset)
    pub frequency: Option<u64>,
    /// Report CPU utilization
    pub cpu: bool,
    /// Report one combined CPU figure instead of one per core
    pub combinedcpu: bool,
    /// Report memory
    pub memory: bool,
    /// Report disk
    pub disk: bool,
    /// `all`/`default` or a comma separated list of mounts or devices
    pub diskpaths: String,
    /// Report network
    pub network: bool,
    /// Report network counters per interface
    pub pernic: bool,
    /// Prefix for report lines (plain reporter)
    pub prefix: String,
    /// Key wrapping each report (cAdvisor-aware reporter)
    pub key: String,
    /// Mount point of the host's proc filesystem
    pub procpath: String,
    /// Report bytes instead of gigabytes
    pub asbytes: bool,
    /// Hostname to report, or `auto`
    pub hostname: String,
    /// Orchestrator metadata service base URL
    pub metadataurl: String,
    /// Timeout applied to every HTTP request, in seconds
    pub http_timeout_secs: u64,
    /// cAdvisor sidecar configuration
    pub aggregator: AggregatorConfig,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log format (pretty, or json with the cAdvisor-aware reporter, when unset)
    pub log_format: Option<LogFormat>,
}

/// cAdvisor sidecar configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Enable the cAdvisor-aware reporter
    pub enabled: bool,
    /// cAdvisor base URL
    pub url: String,
    /// cAdvisor API version
    pub api_version: String,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "http://localhost:8080".to_string(),
            api_version: "v1.3".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frequency: None,
            cpu: false,
            combinedcpu: false,
            memory: false,
            disk: false,
            diskpaths: "all".to_string(),
            network: false,
            pernic: false,
            prefix: String::new(),
            key: "host-stats".to_string(),
            procpath: "/proc_host".to_string(),
            asbytes: false,
            hostname: AUTO_HOSTNAME.to_string(),
            metadataurl: "http://rancher-metadata/2015-12-19".to_string(),
            http_timeout_secs: 5,
            aggregator: AggregatorConfig::default(),
            log_level: "info".to_string(),
            log_format: None,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Build the configuration from the file named by `--config` (or the
    /// default file, when present) and the command-line overrides.
    pub fn resolve(args: &Args) -> Result<Self> {
        let base = match &args.config {
            Some(path) => Self::load(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load(DEFAULT_CONFIG_PATH)?,
            None => Self::default(),
        };

        Ok(base.with_cli_overrides(args))
    }

    /// Apply CLI argument overrides to the configuration.
    ///
    /// Switches can only be turned on from the command line.
    pub fn with_cli_overrides(mut self, args: &Args) -> Self {
        if let Some(frequency) = args.frequency {
            self.frequency = Some(frequency);
        }

        self.cpu |= args.cpu;
        self.combinedcpu |= args.combinedcpu;
        self.memory |= args.memory;
        self.disk |= args.disk;
        self.network |= args.network;
        self.pernic |= args.pernic;
        self.asbytes |= args.asbytes;
        self.aggregator.enabled |= args.aggregator;

        let overrides = [
            (&args.diskpaths, &mut self.diskpaths),
            (&args.prefix, &mut self.prefix),
            (&args.key, &mut self.key),
            (&args.procpath, &mut self.procpath),
            (&args.cadvisorurl, &mut self.aggregator.url),
            (&args.cadvisorapi, &mut self.aggregator.api_version),
            (&args.hostname, &mut self.hostname),
            (&args.metadataurl, &mut self.metadataurl),
            (&args.log_level, &mut self.log_level),
        ];
        for (value, field) in overrides {
            if let Some(value) = value {
                *field = value.clone();
            }
        }

        if let Some(timeout) = args.http_timeout {
            self.http_timeout_secs = timeout;
        }

        if let Some(format) = args.log_format {
            self.log_format = Some(format);
        }

        self
    }

    /// Sleep between cycles.
    pub fn interval(&self) -> Duration {
        let default = if self.aggregator.enabled {
            DEFAULT_AGGREGATOR_FREQUENCY_SECS
        } else {
            DEFAULT_FREQUENCY_SECS
        };
        Duration::from_secs(self.frequency.unwrap_or(default))
    }

    /// Timeout for cAdvisor and metadata requests.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Parsed disk selection.
    pub fn disk_paths(&self) -> DiskPaths {
        DiskPaths::parse(&self.diskpaths)
    }

    /// Reporting unit.
    pub fn unit(&self) -> Unit {
        Unit::from_as_bytes(self.asbytes)
    }

    /// Effective log format.
    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or(if self.aggregator.enabled {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        })
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frequency == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "frequency".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        if self.http_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "http_timeout_secs".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "log_level".to_string(),
                message: format!("must be one of: {:?}", valid_levels),
            });
        }

        if self.aggregator.enabled {
            if self.key.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "key".to_string(),
                    message: "must not be empty".to_string(),
                });
            }

            for (field, value) in [
                ("cadvisorurl", &self.aggregator.url),
                ("metadataurl", &self.metadataurl),
            ] {
                url::Url::parse(value).map_err(|e| ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: e.to_string(),
                })?;
            }
        }

        Ok(())
    }

    /// Log the resolved configuration once at startup.
    pub fn log_banner(&self) {
        info!(
            frequency_secs = self.interval().as_secs(),
            cpu = self.cpu,
            per_cpu = !self.combinedcpu,
            memory = self.memory,
            disk = self.disk,
            diskpaths = %self.diskpaths,
            network = self.network,
            pernic = self.pernic,
            procpath = %self.procpath,
            unit = %self.unit(),
            "Host stats reporter configured"
        );

        if self.aggregator.enabled {
            info!(
                key = %self.key,
                cadvisor_url = %self.aggregator.url,
                cadvisor_api = %self.aggregator.api_version,
                hostname = %self.hostname,
                http_timeout_secs = self.http_timeout_secs,
                "cAdvisor-aware reporting enabled"
            );
        } else {
            info!(prefix = %self.prefix, "Plain reporting enabled");
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["hoststats"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.interval(), Duration::from_secs(5));
        assert_eq!(config.unit(), Unit::Gigabytes);
        assert_eq!(config.disk_paths(), DiskPaths::Auto);
        assert_eq!(config.key, "host-stats");
        assert_eq!(config.procpath, "/proc_host");
        assert_eq!(config.aggregator.url, "http://localhost:8080");
        assert_eq!(config.aggregator.api_version, "v1.3");
        assert_eq!(config.log_format(), LogFormat::Pretty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_aggregator_variant_defaults() {
        let config = Config::default().with_cli_overrides(&args(&["--aggregator"]));
        assert_eq!(config.interval(), Duration::from_secs(60));
        assert_eq!(config.log_format(), LogFormat::Json);

        let config = Config::default().with_cli_overrides(&args(&["--aggregator", "-f", "15"]));
        assert_eq!(config.interval(), Duration::from_secs(15));
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let yaml = r#"
frequency: 30
cpu: true
diskpaths: "/data"
prefix: FROMFILE
aggregator:
  url: http://cadvisor:8080
"#;
        let file: Config = serde_yaml::from_str(yaml).unwrap();
        let config = file.with_cli_overrides(&args(&["--memory", "--prefix", "CLI", "--asbytes"]));

        assert_eq!(config.interval(), Duration::from_secs(30));
        assert!(config.cpu);
        assert!(config.memory);
        assert_eq!(config.prefix, "CLI");
        assert_eq!(config.unit(), Unit::Bytes);
        assert_eq!(config.disk_paths(), DiskPaths::Explicit(vec!["/data".to_string()]));
        assert_eq!(config.aggregator.url, "http://cadvisor:8080");
        assert_eq!(config.aggregator.api_version, "v1.3");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.frequency = Some(0);
        assert!(config.validate().is_err());
        config.frequency = Some(5);

        config.http_timeout_secs = 0;
        assert!(config.validate().is_err());
        config.http_timeout_secs = 5;

        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());
        config.log_level = "debug".to_string();

        config.aggregator.enabled = true;
        config.key = "  ".to_string();
        assert!(config.validate().is_err());
        config.key = "host-stats".to_string();

        config.aggregator.url = "not a url".to_string();
        assert!(config.validate().is_err());
        config.aggregator.url = "http://localhost:8080".to_string();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hoststats.yaml");
        std::fs::write(&path, "network: true\npernic: true\nhttp_timeout_secs: 2\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.network && config.pernic);
        assert_eq!(config.http_timeout(), Duration::from_secs(2));

        assert!(Config::load(dir.path().join("missing.yaml")).is_err());

        std::fs::write(&path, "frequency: [not, a, number]\n").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_resolve_with_explicit_missing_file_fails() {
        let args = args(&["--config", "/nonexistent/hoststats.yaml"]);
        assert!(Config::resolve(&args).is_err());
    }
}
