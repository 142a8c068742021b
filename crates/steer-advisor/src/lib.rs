//! Steer Advisor - the placement advisor HTTP service
//!
//! This crate provides:
//! - The scored-node cache with temporally persistent winner penalties
//! - The `Advisor` object tying cache, telemetry and cluster access together
//! - The scheduler-extender HTTP surface: filter, prioritize, bind, health

pub mod advisor;
pub mod cache;
pub mod handlers;
pub mod server;
pub mod types;

// Re-export commonly used types
pub use advisor::Advisor;
pub use cache::{CacheSnapshot, PenaltyRecord, ScoredNodeCache};
pub use server::{AdvisorServer, Config};
