use crate::config::ScoringConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Per-node score vector reported by the probe daemon.
///
/// All three axes are pre-normalised by the probe so that higher is better
/// (low measured latency maps to a high latency score). Values are clamped
/// into [0, 1] at ingestion; anything non-finite collapses to 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreVector {
    pub hostname: String,
    #[serde(rename = "latencyEwmaScore")]
    pub latency: f64,
    #[serde(rename = "cpuEwmaScore")]
    pub cpu: f64,
    #[serde(rename = "memoryEwmaScore")]
    pub memory: f64,
}

impl ScoreVector {
    pub fn new(hostname: impl Into<String>, latency: f64, cpu: f64, memory: f64) -> Self {
        Self {
            hostname: hostname.into(),
            latency,
            cpu,
            memory,
        }
    }

    /// Clamp all axes into [0, 1], mapping non-finite values to 0
    pub fn clamped(mut self) -> Self {
        self.latency = clamp_unit(self.latency);
        self.cpu = clamp_unit(self.cpu);
        self.memory = clamp_unit(self.memory);
        self
    }
}

fn clamp_unit(v: f64) -> f64 {
    if !v.is_finite() {
        return 0.0;
    }
    v.clamp(0.0, 1.0)
}

/// Node class inferred from the cluster's naming convention.
///
/// The single classification point for penalty selection; swap this for a
/// label-driven rule if the naming convention changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeClass {
    Vm,
    Rpi,
}

impl NodeClass {
    /// Classify a node by name: anything containing "vm" is a VM, the rest
    /// of the fleet is Raspberry Pi hardware.
    pub fn of(node_name: &str) -> Self {
        if node_name.contains("vm") {
            NodeClass::Vm
        } else {
            NodeClass::Rpi
        }
    }
}

/// Score a node for placement (0-100, higher is better).
///
/// Weighted sum of the probe axes plus the node's normalised traffic share;
/// a node absent from `scores` gets 0, a node absent from `traffic_norm`
/// contributes 0 on the traffic axis.
pub fn score_node(
    node_name: &str,
    scores: &HashMap<String, ScoreVector>,
    traffic_norm: &HashMap<String, f64>,
    cfg: &ScoringConfig,
) -> i64 {
    let Some(sv) = scores.get(node_name) else {
        return 0;
    };

    let traffic = traffic_norm.get(node_name).copied().unwrap_or(0.0);

    let weighted = cfg.weight_latency * sv.latency
        + cfg.weight_cpu * sv.cpu
        + cfg.weight_memory * sv.memory
        + cfg.weight_traffic * traffic;

    let score = clamp_score(weighted * 100.0);

    debug!(
        "Node {} score: {} (lat={:.3} cpu={:.3} mem={:.3} traffic={:.3})",
        node_name, score, sv.latency, sv.cpu, sv.memory, traffic
    );

    score
}

/// Subtract the node class' CPU penalty from a CPU score, flooring at 0
pub fn apply_cpu_penalty(node_name: &str, cpu_score: f64, cfg: &ScoringConfig) -> f64 {
    let penalized = cpu_score - cfg.cpu_penalty(NodeClass::of(node_name));
    penalized.max(0.0)
}

/// Subtract the node class' memory penalty from a memory score, flooring at 0
pub fn apply_mem_penalty(node_name: &str, mem_score: f64, cfg: &ScoringConfig) -> f64 {
    let penalized = mem_score - cfg.mem_penalty(NodeClass::of(node_name));
    penalized.max(0.0)
}

/// Clamp a raw weighted score into [0, 100] and round to an integer priority
pub fn clamp_score(s: f64) -> i64 {
    s.clamp(0.0, 100.0).round() as i64
}
