//! Steer Rebalancer - shift-triggered eviction loop
//!
//! This crate provides:
//! - The periodic control loop watching the cluster's traffic hotspot
//! - Node ranking with the shared scoring kernel
//! - Idle-pod selection against live kubelet summary data and eviction

pub mod controller;
pub mod error;
pub mod evaluate;
pub mod eviction;

// Re-export commonly used types
pub use controller::Rebalancer;
pub use error::{RebalancerError, Result};
pub use evaluate::{rank_nodes, NodeScore};
pub use eviction::{is_system_pod, select_idle_pod};
