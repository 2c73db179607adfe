//! Command-line argument parsing.
//!
//! Long flag names match the original agent so existing deployments keep
//! working. Every flag can also be set through a `HOSTSTATS_*` variable.

use clap::Parser;
use hoststats_common::LogFormat;

/// hoststats - periodic host metrics reporter
#[derive(Parser, Debug, Clone)]
#[command(name = "hoststats")]
#[command(about = "Periodically log host CPU, memory, disk and network usage")]
#[command(version)]
pub struct Args {
    /// Path to a YAML configuration file
    #[arg(long, env = "HOSTSTATS_CONFIG")]
    pub config: Option<String>,

    /// Update frequency for stats, in seconds (5, or 60 with --aggregator)
    #[arg(short = 'f', long, env = "HOSTSTATS_FREQUENCY")]
    pub frequency: Option<u64>,

    /// Report CPU utilization
    #[arg(short = 'c', long, env = "HOSTSTATS_CPU")]
    pub cpu: bool,

    /// Report CPU as an average across cores instead of per core
    #[arg(long, env = "HOSTSTATS_COMBINEDCPU")]
    pub combinedcpu: bool,

    /// Report memory
    #[arg(short = 'm', long, env = "HOSTSTATS_MEMORY")]
    pub memory: bool,

    /// Report disk
    #[arg(short = 'd', long, env = "HOSTSTATS_DISK")]
    pub disk: bool,

    /// Disk paths (or cAdvisor devices) as a comma separated list, or "all"/"default"
    #[arg(long, env = "HOSTSTATS_DISKPATHS")]
    pub diskpaths: Option<String>,

    /// Report network
    #[arg(short = 'n', long, env = "HOSTSTATS_NETWORK")]
    pub network: bool,

    /// Report network utilization per NIC
    #[arg(long, env = "HOSTSTATS_PERNIC")]
    pub pernic: bool,

    /// Optional prefix for report lines
    #[arg(short = 'p', long, env = "HOSTSTATS_PREFIX")]
    pub prefix: Option<String>,

    /// Top-level key wrapping each report (with --aggregator)
    #[arg(long, env = "HOSTSTATS_KEY")]
    pub key: Option<String>,

    /// Path to the host's mounted /proc directory
    #[arg(long, env = "HOSTSTATS_PROCPATH")]
    pub procpath: Option<String>,

    /// Report usage in bytes instead of gigabytes
    #[arg(long, env = "HOSTSTATS_ASBYTES")]
    pub asbytes: bool,

    /// Enable the cAdvisor-aware reporter (hostname, key, averaged disk usage)
    #[arg(long, env = "HOSTSTATS_AGGREGATOR")]
    pub aggregator: bool,

    /// cAdvisor base URL
    #[arg(long, env = "HOSTSTATS_CADVISORURL")]
    pub cadvisorurl: Option<String>,

    /// cAdvisor API version
    #[arg(long, env = "HOSTSTATS_CADVISORAPI")]
    pub cadvisorapi: Option<String>,

    /// Hostname to report, or "auto" to detect it
    #[arg(long, env = "HOSTSTATS_HOSTNAME")]
    pub hostname: Option<String>,

    /// Orchestrator metadata service base URL used by hostname detection
    #[arg(long, env = "HOSTSTATS_METADATAURL")]
    pub metadataurl: Option<String>,

    /// Timeout for cAdvisor and metadata requests, in seconds
    #[arg(long, env = "HOSTSTATS_HTTP_TIMEOUT")]
    pub http_timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "HOSTSTATS_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log format (json, pretty)
    #[arg(long, env = "HOSTSTATS_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,
}
