//! The sampler loop.
//!
//! Each cycle builds a fresh [`SampleRecord`] with the enabled sections,
//! frames it, hands it to the sink, then sleeps for the interval. The only
//! suspension points are the cAdvisor probe (bounded by the HTTP timeout) and
//! the sleep, which also watches the cancellation token.
//!
//! CPU, memory and network failures are not recovered: they end the loop
//! with an error so missing instrumentation is loud. Disk failures are kept
//! per mount, and an unreachable cAdvisor only switches the disk section to
//! direct sampling for that cycle.

use anyhow::{Context, Result};
use hoststats_telemetry::cpu::collect_cpu_section;
use hoststats_telemetry::disk::{
    collect_averaged, collect_direct, resolve_direct_mounts, resolve_sidecar_targets, DiskEntry,
};
use hoststats_telemetry::memory::collect_memory_section;
use hoststats_telemetry::network::collect_network_section;
use hoststats_telemetry::{DiskPaths, HostStats, SampleRecord, Unit};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::aggregator::{Aggregator, AggregatorSnapshot};
use crate::config::Config;
use crate::sink::{Framing, RecordSink, Report};

/// What to sample each cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerOptions {
    pub interval: Duration,
    pub cpu: bool,
    pub per_core: bool,
    pub memory: bool,
    pub disk: bool,
    pub disk_paths: DiskPaths,
    pub network: bool,
    pub per_nic: bool,
    pub unit: Unit,
    pub framing: Framing,
}

impl SamplerOptions {
    pub fn from_config(config: &Config) -> Self {
        let framing = if config.aggregator.enabled {
            Framing::Keyed(config.key.clone())
        } else {
            Framing::Prefix(config.prefix.clone())
        };

        Self {
            interval: config.interval(),
            cpu: config.cpu,
            per_core: !config.combinedcpu,
            memory: config.memory,
            disk: config.disk,
            disk_paths: config.disk_paths(),
            network: config.network,
            per_nic: config.pernic,
            unit: config.unit(),
            framing,
        }
    }
}

/// Open the provider for `procpath` off the async thread.
///
/// The `sysinfo` fallback sleeps while taking its CPU baseline.
pub async fn open_host(procpath: impl Into<PathBuf>) -> Result<Box<dyn HostStats>> {
    let procpath = procpath.into();
    tokio::task::spawn_blocking(move || hoststats_telemetry::detect_host(&procpath))
        .await
        .context("Host statistics provider setup panicked")
}

/// Periodic host stats sampler.
pub struct Sampler<S: RecordSink> {
    options: SamplerOptions,
    host: Box<dyn HostStats>,
    aggregator: Option<Box<dyn Aggregator>>,
    hostname: Option<String>,
    sink: S,
}

impl<S: RecordSink> Sampler<S> {
    /// Create a plain sampler reading only from `host`.
    pub fn new(options: SamplerOptions, host: Box<dyn HostStats>, sink: S) -> Self {
        Self {
            options,
            host,
            aggregator: None,
            hostname: None,
            sink,
        }
    }

    /// Enable cAdvisor-aware sampling with the hostname resolved at startup.
    pub fn with_aggregator(mut self, aggregator: Box<dyn Aggregator>, hostname: String) -> Self {
        self.aggregator = Some(aggregator);
        self.hostname = Some(hostname);
        self
    }

    pub fn options(&self) -> &SamplerOptions {
        &self.options
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Probe cAdvisor. `None` when no aggregator is configured or it failed.
    async fn probe_aggregator(&self) -> Option<AggregatorSnapshot> {
        let aggregator = self.aggregator.as_ref()?;

        let snapshot = match aggregator.probe().await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                debug!(error = %e, "cAdvisor probe failed");
                None
            }
        };

        info!(aggregator_active = snapshot.is_some(), "cAdvisor probe complete");
        snapshot
    }

    fn sample_disk(
        &mut self,
        snapshot: Option<&AggregatorSnapshot>,
    ) -> Result<BTreeMap<String, DiskEntry>> {
        let unit = self.options.unit;

        if self.aggregator.is_none() {
            let mounts = resolve_direct_mounts(self.host.as_mut(), &self.options.disk_paths)
                .context("Failed to discover disk partitions")?;
            return Ok(collect_direct(self.host.as_mut(), &mounts, unit));
        }

        match snapshot {
            Some(snapshot) => {
                let reported = snapshot.machine.devices();
                let targets = resolve_sidecar_targets(&self.options.disk_paths, Some(&reported));
                Ok(collect_averaged(&snapshot.containers.stats, &targets, unit))
            }
            None => {
                let targets = resolve_sidecar_targets(&self.options.disk_paths, None);
                Ok(collect_direct(self.host.as_mut(), &targets, unit))
            }
        }
    }

    /// Build one record with the enabled sections.
    pub async fn sample_once(&mut self) -> Result<SampleRecord> {
        let snapshot = self.probe_aggregator().await;

        let mut record = SampleRecord {
            hostname: self.hostname.clone(),
            ..SampleRecord::default()
        };

        if self.options.cpu {
            record.cpu = Some(
                collect_cpu_section(self.host.as_mut(), self.options.per_core)
                    .context("Failed to sample CPU utilization")?,
            );
        }

        if self.options.memory {
            record.memory = Some(
                collect_memory_section(self.host.as_mut(), self.options.unit)
                    .context("Failed to sample memory")?,
            );
        }

        if self.options.disk {
            record.disk = Some(self.sample_disk(snapshot.as_ref())?);
        }

        if self.options.network {
            record.network = Some(
                collect_network_section(self.host.as_mut(), self.options.per_nic)
                    .context("Failed to sample network counters")?,
            );
        }

        Ok(record)
    }

    /// Sample, frame and emit one report.
    pub async fn run_cycle(&mut self) -> Result<()> {
        let started = Instant::now();

        let record = self.sample_once().await?;
        let report = Report::new(self.options.framing.clone(), record);
        self.sink.emit(&report).context("Failed to emit report")?;

        trace!(duration_ms = started.elapsed().as_millis(), "Sample cycle complete");
        Ok(())
    }

    /// Run cycles until `cancel` fires or a cycle fails.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<()> {
        info!(
            interval_secs = self.options.interval.as_secs(),
            aggregator = self.aggregator.is_some(),
            "Sampler loop started"
        );

        while !cancel.is_cancelled() {
            self.run_cycle().await?;

            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(self.options.interval) => {}
            }
        }

        info!("Sampler loop stopped");
        Ok(())
    }
}
