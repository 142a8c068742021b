//! Steer Telemetry - clients for the external measurement sources
//!
//! This crate provides:
//! - `MeasurementsClient` - traffic aggregates from the time-series store
//! - `ProbeClient` - per-node score vectors from the probe daemon
//! - `KubeletSummaryClient` - live per-pod usage from a node's kubelet

pub mod error;
pub mod measurements;
pub mod probe;
pub mod summary;

// Re-export commonly used types
pub use error::{Result, TelemetryError};
pub use measurements::MeasurementsClient;
pub use probe::ProbeClient;
pub use summary::{pod_usage, KubeletSummaryClient, Summary};
