//! Hostname resolution, done once at startup.
//!
//! Order: an explicit configured name, then the orchestrator metadata
//! service, then the OS hostname. No orchestrator is the common case, so a
//! failed metadata lookup is only logged at debug level.

use std::time::Duration;
use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};

/// Configured value that requests detection.
pub const AUTO_HOSTNAME: &str = "auto";

/// Resolve the hostname to report.
pub async fn resolve_hostname(configured: &str, metadata_url: &str, timeout: Duration) -> String {
    let configured = configured.trim();
    if !configured.is_empty() && !configured.eq_ignore_ascii_case(AUTO_HOSTNAME) {
        info!(hostname = %configured, source = "config", "Hostname resolved");
        return configured.to_string();
    }

    match fetch_metadata_hostname(metadata_url, timeout).await {
        Ok(hostname) => {
            info!(hostname = %hostname, source = "metadata", "Hostname resolved");
            hostname
        }
        Err(e) => {
            debug!(error = %e, "Metadata service unavailable, using local hostname");
            let hostname = local_hostname();
            info!(hostname = %hostname, source = "local", "Hostname resolved");
            hostname
        }
    }
}

/// `GET {metadata_url}/self/host/hostname`, returning the trimmed body.
pub async fn fetch_metadata_hostname(metadata_url: &str, timeout: Duration) -> ClientResult<String> {
    let url = format!("{}/self/host/hostname", metadata_url.trim_end_matches('/'));

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(ClientError::Build)?;

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|source| ClientError::Request {
            url: url.clone(),
            source,
        })?;

    if !response.status().is_success() {
        return Err(ClientError::Status {
            url,
            status: response.status().as_u16(),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| ClientError::InvalidResponse {
            url: url.clone(),
            reason: e.to_string(),
        })?;

    let hostname = body.trim();
    if hostname.is_empty() {
        return Err(ClientError::InvalidResponse {
            url,
            reason: "empty hostname".to_string(),
        });
    }

    Ok(hostname.to_string())
}

/// Hostname reported by the OS.
pub fn local_hostname() -> String {
    ::hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}
