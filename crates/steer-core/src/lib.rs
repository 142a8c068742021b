//! Steer Core - scoring kernel and configuration
//!
//! This crate provides:
//! - The probe score model (`ScoreVector`)
//! - The pure scoring kernel and node-class penalty functions
//! - Environment-driven configuration for scoring and rebalancing

pub mod config;
pub mod error;
pub mod score;

// Re-export commonly used types
pub use config::{
    MeasurementsConfig, ProberConfig, RebalancerConfig, ScoringConfig,
};
pub use error::{ConfigError, Result};
pub use score::{
    apply_cpu_penalty, apply_mem_penalty, clamp_score, score_node, NodeClass, ScoreVector,
};
