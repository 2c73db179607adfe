//! # hoststats Common
//!
//! Shared utilities for the hoststats agent.
//!
//! ## Logging
//!
//! ```no_run
//! use hoststats_common::{init_logging, LogFormat};
//!
//! // Initialize with level and output format
//! init_logging("info", LogFormat::Json).unwrap();
//! ```

pub mod logging;

// Re-export logging functions
pub use logging::{init_logging, init_logging_json, LogFormat};
