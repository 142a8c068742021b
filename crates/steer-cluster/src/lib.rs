//! Steer Cluster - Kubernetes API access
//!
//! This crate provides:
//! - In-cluster credential resolution (service-account token + CA)
//! - A thin typed client for the handful of API calls the controller makes:
//!   list pods by node, resolve a node's address, bind, evict

pub mod auth;
pub mod client;
pub mod error;

// Re-export commonly used types
pub use auth::ClusterAuth;
pub use client::{node_internal_ip, ClusterClient};
pub use error::{ClusterError, Result};
