use miette::Diagnostic;
use thiserror::Error;

/// Rebalancer error type
#[derive(Error, Debug, Diagnostic)]
pub enum RebalancerError {
    /// Cluster API error
    #[error(transparent)]
    #[diagnostic(transparent)]
    Cluster(#[from] steer_cluster::ClusterError),

    /// Telemetry error
    #[error(transparent)]
    #[diagnostic(transparent)]
    Telemetry(#[from] steer_telemetry::TelemetryError),
}

/// Result type for rebalancer operations
pub type Result<T> = std::result::Result<T, RebalancerError>;
