//! # hoststats Agent
//!
//! A lightweight sidecar that periodically samples host CPU, memory, disk and
//! network utilization and emits one structured log record per cycle, for
//! downstream log-aggregation pipelines.
//!
//! ## Reporting modes
//! - **Plain**: OS statistics only, each report logged as
//!   `"<prefix> <json>"`.
//! - **cAdvisor-aware** (`--aggregator`): reports are wrapped under a key with
//!   the host's name, and disk usage is averaged over cAdvisor's rolling
//!   window whenever the sidecar answers.

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod error;
pub mod hostname;
pub mod sampler;
pub mod sink;

pub use aggregator::{Aggregator, AggregatorSnapshot, CadvisorClient};
pub use config::Config;
pub use error::{ClientError, ClientResult};
pub use sampler::{Sampler, SamplerOptions};
pub use sink::{Framing, MemorySink, RecordSink, Report, TracingSink};
