use crate::error::{ConfigError, Result};
use crate::score::NodeClass;
use std::str::FromStr;
use std::time::Duration;

/// Read a required environment variable, failing when unset or empty
pub fn required_var(key: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::missing_var(key)),
    }
}

/// Read and parse a required environment variable
pub fn required_parsed<T: FromStr>(key: &str) -> Result<T> {
    let raw = required_var(key)?;
    raw.parse::<T>()
        .map_err(|_| ConfigError::invalid_value(key, raw))
}

/// Weights, thresholds and penalties driving every placement decision.
///
/// Immutable after load; the advisor and the rebalancer must observe the
/// same instance so both rank nodes identically.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Weight of the latency axis (weights conventionally sum to 1.0)
    pub weight_latency: f64,
    pub weight_cpu: f64,
    pub weight_memory: f64,
    pub weight_traffic: f64,

    /// Filter threshold on the latency score
    pub latency_threshold: f64,
    /// Filter thresholds on the CPU and memory scores; a node is rejected
    /// only when BOTH are below threshold
    pub cpu_threshold: f64,
    pub mem_threshold: f64,

    /// How long a winner's penalised CPU/memory scores survive probe
    /// refreshes. Keep this at least twice the placement burst window,
    /// otherwise penalties vanish before the next refresh observes them.
    pub penalty_ttl: Duration,

    pub vm_penalty_cpu: f64,
    pub rpi_penalty_cpu: f64,
    pub vm_penalty_mem: f64,
    pub rpi_penalty_mem: f64,
}

impl ScoringConfig {
    /// Load from the environment; any missing or non-numeric variable is fatal
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            weight_latency: required_parsed("WEIGHT_LATENCY")?,
            weight_cpu: required_parsed("WEIGHT_CPU")?,
            weight_memory: required_parsed("WEIGHT_MEMORY")?,
            weight_traffic: required_parsed("WEIGHT_TRAFFIC")?,

            latency_threshold: required_parsed("LATENCY_THRESHOLD")?,
            cpu_threshold: required_parsed("CPU_THRESHOLD")?,
            mem_threshold: required_parsed("MEM_THRESHOLD")?,

            penalty_ttl: Duration::from_secs(required_parsed::<u64>("PENALTY_TTL")?),

            vm_penalty_cpu: required_parsed("VM_PENALTY_CPU")?,
            rpi_penalty_cpu: required_parsed("RPI_PENALTY_CPU")?,
            vm_penalty_mem: required_parsed("VM_PENALTY_MEM")?,
            rpi_penalty_mem: required_parsed("RPI_PENALTY_MEM")?,
        })
    }

    /// CPU penalty for a node class
    pub fn cpu_penalty(&self, class: NodeClass) -> f64 {
        match class {
            NodeClass::Vm => self.vm_penalty_cpu,
            NodeClass::Rpi => self.rpi_penalty_cpu,
        }
    }

    /// Memory penalty for a node class
    pub fn mem_penalty(&self, class: NodeClass) -> f64 {
        match class {
            NodeClass::Vm => self.vm_penalty_mem,
            NodeClass::Rpi => self.rpi_penalty_mem,
        }
    }
}

/// Rebalancer cadence and idleness thresholds
#[derive(Debug, Clone)]
pub struct RebalancerConfig {
    /// Interval between evaluation cycles
    pub interval: Duration,
    /// A pod is an eviction candidate only below this CPU usage (millicores)
    pub idle_cpu_millis: f64,
    /// ... and below this working-set size (MiB)
    pub idle_mem_mib: f64,
}

impl RebalancerConfig {
    pub fn from_env() -> Result<Self> {
        let interval_secs: f64 = required_parsed("DESCHED_INTERVAL")?;
        if !interval_secs.is_finite() || interval_secs <= 0.0 {
            return Err(ConfigError::invalid_value(
                "DESCHED_INTERVAL",
                interval_secs.to_string(),
            ));
        }

        Ok(Self {
            interval: Duration::from_secs_f64(interval_secs),
            idle_cpu_millis: required_parsed("IDLECPU_THRESHOLD")?,
            idle_mem_mib: required_parsed("IDLEMEM_THRESHOLD")?,
        })
    }
}

/// Connection settings for the measurements store (InfluxDB 2.x)
#[derive(Debug, Clone)]
pub struct MeasurementsConfig {
    pub host: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
}

impl MeasurementsConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: required_var("INFLUX_HOST")?,
            token: required_var("INFLUX_TOKEN")?,
            org: required_var("INFLUX_ORG")?,
            bucket: required_var("INFLUX_BUCKET")?,
        })
    }
}

/// Location of the probe daemon's score endpoint on each node
#[derive(Debug, Clone)]
pub struct ProberConfig {
    pub endpoint: String,
    pub port: u16,
}

impl ProberConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            endpoint: required_var("PROBER_ENDPOINT")?,
            port: required_parsed("PROBER_PORT")?,
        })
    }
}
