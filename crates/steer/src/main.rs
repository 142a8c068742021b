use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use steer_advisor::{Advisor, AdvisorServer, Config as AdvisorConfig};
use steer_cluster::{ClusterAuth, ClusterClient};
use steer_core::config::{required_parsed, required_var};
use steer_core::{MeasurementsConfig, ProberConfig, RebalancerConfig, ScoringConfig};
use steer_rebalancer::Rebalancer;
use steer_telemetry::{KubeletSummaryClient, MeasurementsClient, ProbeClient};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "steer", about = "Latency-aware placement and rebalancing controller")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the placement advisor (scheduler-extender HTTP service)
    Advisor,
    /// Run the rebalancer (traffic-shift driven eviction loop)
    Rebalancer,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize tracing; LOG_LEVEL drives the filter, defaulting to info
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Advisor => run_advisor().await,
        Commands::Rebalancer => run_rebalancer().await,
    }
}

/// Wait for either SIGINT (ctrl-c) or SIGTERM, returning which one fired.
async fn shutdown_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    }
}

/// Run the placement advisor HTTP service
async fn run_advisor() -> miette::Result<()> {
    info!("Starting latency-aware placement advisor");

    let scoring = ScoringConfig::from_env()?;
    let port: u16 = required_parsed("PORT_EXTENDER")?;

    let auth = ClusterAuth::in_cluster()?;
    let cluster = ClusterClient::new(&auth)?;
    let measurements = MeasurementsClient::new(MeasurementsConfig::from_env()?)?;
    let prober = ProbeClient::new(ProberConfig::from_env()?)?;

    let advisor = Arc::new(Advisor::new(cluster, measurements, prober, scoring));

    let listen_addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let server = AdvisorServer::new(AdvisorConfig { listen_addr }, advisor);

    let token = CancellationToken::new();
    let server_token = token.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run(server_token).await {
            error!("Advisor server error: {}", e);
        }
    });

    let sig = shutdown_signal().await;
    info!("Received {}, shutting down gracefully...", sig);
    token.cancel();

    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), server_handle).await;
    info!("Shutdown complete");

    Ok(())
}

/// Run the rebalancing control loop
async fn run_rebalancer() -> miette::Result<()> {
    info!("Starting adaptive rebalancer");

    let scoring = ScoringConfig::from_env()?;
    let rebalancer_cfg = RebalancerConfig::from_env()?;
    let namespace = required_var("POD_NAMESPACE")?;

    let auth = ClusterAuth::in_cluster()?;
    let cluster = ClusterClient::new(&auth)?;
    let measurements = MeasurementsClient::new(MeasurementsConfig::from_env()?)?;
    let prober = ProbeClient::new(ProberConfig::from_env()?)?;
    let kubelet = KubeletSummaryClient::new(auth.token.clone(), auth.ca_pem.as_deref())?;

    let rebalancer = Rebalancer::new(
        cluster,
        measurements,
        prober,
        kubelet,
        namespace,
        scoring,
        rebalancer_cfg,
    );

    let token = CancellationToken::new();
    let loop_token = token.clone();
    let loop_handle = tokio::spawn(async move {
        if let Err(e) = rebalancer.run(loop_token).await {
            error!("Rebalancer error: {}", e);
        }
    });

    let sig = shutdown_signal().await;
    info!("Received {}, shutting down gracefully...", sig);
    token.cancel();

    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), loop_handle).await;
    info!("Shutdown complete");

    Ok(())
}
