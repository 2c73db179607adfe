//! cAdvisor sidecar client.
//!
//! Each cycle probes two endpoints: `machine` for the tracked filesystems and
//! `containers` for the rolling window of per-second samples. Both must
//! answer for the cycle to use averaged disk usage.

use async_trait::async_trait;
use hoststats_telemetry::aggregate::{ContainerInfo, MachineInfo};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::trace;

use crate::error::{ClientError, ClientResult};

/// Result of a successful probe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatorSnapshot {
    pub machine: MachineInfo,
    pub containers: ContainerInfo,
}

/// Source of aggregated filesystem statistics.
#[async_trait]
pub trait Aggregator: Send + Sync {
    /// Fetch machine metadata and the current sample window.
    async fn probe(&self) -> ClientResult<AggregatorSnapshot>;
}

/// HTTP client for the cAdvisor REST API.
pub struct CadvisorClient {
    base_url: String,
    api_version: String,
    http_client: reqwest::Client,
}

impl CadvisorClient {
    /// Create a client; every request is bounded by `timeout`.
    pub fn new(base_url: &str, api_version: &str, timeout: Duration) -> ClientResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
            http_client,
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/api/{}/{}", self.base_url, self.api_version, name)
    }

    /// `GET {base}/api/{version}/machine`
    pub async fn machine(&self) -> ClientResult<MachineInfo> {
        self.get_json(self.endpoint("machine")).await
    }

    /// `GET {base}/api/{version}/containers`
    pub async fn containers(&self) -> ClientResult<ContainerInfo> {
        self.get_json(self.endpoint("containers")).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> ClientResult<T> {
        trace!(url = %url, "Querying cAdvisor");

        let response = self
            .http_client
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

        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::InvalidResponse {
                url,
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl Aggregator for CadvisorClient {
    async fn probe(&self) -> ClientResult<AggregatorSnapshot> {
        let machine = self.machine().await?;
        let containers = self.containers().await?;
        Ok(AggregatorSnapshot {
            machine,
            containers,
        })
    }
}
