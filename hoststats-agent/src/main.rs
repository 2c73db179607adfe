//! # hoststats
//!
//! Periodic host-metrics reporter.
//!
//! ## Usage
//! ```bash
//! hoststats --cpu --memory --disk --diskpaths /,/data --network --prefix HOSTSTATS
//! hoststats --aggregator --cpu --disk --cadvisorurl http://cadvisor:8080
//! ```

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use hoststats_agent::cli::Args;
use hoststats_agent::hostname::resolve_hostname;
use hoststats_agent::sampler::open_host;
use hoststats_agent::{CadvisorClient, Config, Sampler, SamplerOptions, TracingSink};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse CLI arguments and resolve configuration before logging is up
    let args = Args::parse();
    let config = Config::resolve(&args)?;
    config.validate()?;

    hoststats_common::init_logging(&config.log_level, config.log_format())?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting hoststats reporter"
    );
    config.log_banner();

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Shutdown signal handler failed");
        }
        shutdown.cancel();
    });

    let host = open_host(&config.procpath).await?;
    let mut sampler = Sampler::new(SamplerOptions::from_config(&config), host, TracingSink::new());

    if config.aggregator.enabled {
        let timeout = config.http_timeout();
        let hostname = resolve_hostname(&config.hostname, &config.metadataurl, timeout).await;
        let client = CadvisorClient::new(
            &config.aggregator.url,
            &config.aggregator.api_version,
            timeout,
        )?;
        sampler = sampler.with_aggregator(Box::new(client), hostname);
    }

    if let Err(e) = sampler.run(&cancel).await {
        error!(error = %e, "Sampler loop failed");
        return Err(e);
    }

    info!("hoststats reporter stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM, SIGINT, or Ctrl+C)
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
