use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use steer_core::{apply_cpu_penalty, apply_mem_penalty, ScoreVector, ScoringConfig};
use tracing::debug;

/// Penalised CPU/memory scores of a recent prioritize winner.
///
/// At most one record per node; the record is consulted on every probe
/// refresh and deleted once `penalty_ttl` has elapsed.
#[derive(Debug, Clone)]
pub struct PenaltyRecord {
    pub cpu: f64,
    pub memory: f64,
    pub applied_at: Instant,
}

/// Point-in-time view of the cache used by the filter and prioritize phases
#[derive(Debug, Clone, Default)]
pub struct CacheSnapshot {
    pub scores: HashMap<String, ScoreVector>,
    pub traffic_norm: HashMap<String, f64>,
}

#[derive(Default)]
struct CacheInner {
    scores: HashMap<String, ScoreVector>,
    penalties: HashMap<String, PenaltyRecord>,
    traffic: HashMap<String, f64>,
    traffic_norm: HashMap<String, f64>,
}

/// Process-wide mapping from node name to its most recent score vector,
/// plus the live penalty records and the cached traffic maps.
///
/// All four maps sit behind one reader/writer lock: a penalty applied by
/// one prioritize call is observable by every subsequent filter and
/// prioritize snapshot. No I/O happens while the lock is held.
pub struct ScoredNodeCache {
    penalty_ttl: Duration,
    inner: RwLock<CacheInner>,
}

impl ScoredNodeCache {
    pub fn new(penalty_ttl: Duration) -> Self {
        Self {
            penalty_ttl,
            inner: RwLock::new(CacheInner::default()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner
            .read()
            .expect("scored-node cache lock poisoned")
            .scores
            .is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .expect("scored-node cache lock poisoned")
            .scores
            .len()
    }

    /// Snapshot the score and normalised-traffic maps under the read lock
    pub fn snapshot(&self) -> CacheSnapshot {
        let inner = self.inner.read().expect("scored-node cache lock poisoned");
        CacheSnapshot {
            scores: inner.scores.clone(),
            traffic_norm: inner.traffic_norm.clone(),
        }
    }

    /// Overlay a probe response onto the cache.
    ///
    /// A node with a live penalty record keeps its penalised CPU and memory
    /// scores instead of taking the fresh probe values; an expired record is
    /// dropped and the fresh values win.
    pub fn upsert_scores(&self, scores: Vec<ScoreVector>) {
        self.upsert_scores_at(scores, Instant::now());
    }

    pub fn upsert_scores_at(&self, scores: Vec<ScoreVector>, now: Instant) {
        let mut inner = self.inner.write().expect("scored-node cache lock poisoned");

        for mut sv in scores {
            if let Some(record) = inner.penalties.get(&sv.hostname) {
                if now.duration_since(record.applied_at) < self.penalty_ttl {
                    debug!(
                        "Keeping penalised cpu/memory for {} (penalty still live)",
                        sv.hostname
                    );
                    sv.cpu = record.cpu;
                    sv.memory = record.memory;
                } else {
                    debug!("Removing expired penalty for {}", sv.hostname);
                    inner.penalties.remove(&sv.hostname);
                }
            }
            inner.scores.insert(sv.hostname.clone(), sv);
        }
    }

    /// Penalise the prioritize winner in place and record the result.
    ///
    /// Returns the (cpu, memory) scores after penalisation, or `None` when
    /// the node is not in the cache (nothing to penalise).
    pub fn apply_penalty(&self, node: &str, cfg: &ScoringConfig) -> Option<(f64, f64)> {
        self.apply_penalty_at(node, cfg, Instant::now())
    }

    pub fn apply_penalty_at(
        &self,
        node: &str,
        cfg: &ScoringConfig,
        now: Instant,
    ) -> Option<(f64, f64)> {
        let mut inner = self.inner.write().expect("scored-node cache lock poisoned");

        let sv = inner.scores.get_mut(node)?;
        sv.cpu = apply_cpu_penalty(node, sv.cpu, cfg);
        sv.memory = apply_mem_penalty(node, sv.memory, cfg);
        let penalised = (sv.cpu, sv.memory);

        inner.penalties.insert(
            node.to_string(),
            PenaltyRecord {
                cpu: penalised.0,
                memory: penalised.1,
                applied_at: now,
            },
        );

        Some(penalised)
    }

    /// Replace both traffic maps in one write-lock acquisition
    pub fn replace_traffic(&self, traffic: HashMap<String, f64>, norm: HashMap<String, f64>) {
        let mut inner = self.inner.write().expect("scored-node cache lock poisoned");
        inner.traffic = traffic;
        inner.traffic_norm = norm;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ScoringConfig {
        ScoringConfig {
            weight_latency: 0.4,
            weight_cpu: 0.3,
            weight_memory: 0.2,
            weight_traffic: 0.1,
            latency_threshold: 0.3,
            cpu_threshold: 0.2,
            mem_threshold: 0.2,
            penalty_ttl: Duration::from_secs(15),
            vm_penalty_cpu: 0.1,
            rpi_penalty_cpu: 0.05,
            vm_penalty_mem: 0.1,
            rpi_penalty_mem: 0.05,
        }
    }

    fn probe_result() -> Vec<ScoreVector> {
        vec![ScoreVector::new("vm-1", 0.9, 0.8, 0.7)]
    }

    #[test]
    fn test_upsert_and_snapshot() {
        let cache = ScoredNodeCache::new(Duration::from_secs(15));
        assert!(cache.is_empty());

        cache.upsert_scores(probe_result());
        assert_eq!(cache.len(), 1);

        let snap = cache.snapshot();
        assert_eq!(snap.scores["vm-1"].cpu, 0.8);
    }

    #[test]
    fn test_penalty_survives_refreshes_within_ttl() {
        let cfg = test_config();
        let cache = ScoredNodeCache::new(cfg.penalty_ttl);
        let t0 = Instant::now();

        cache.upsert_scores_at(probe_result(), t0);
        let (cpu, mem) = cache.apply_penalty_at("vm-1", &cfg, t0).unwrap();
        assert!((cpu - 0.7).abs() < 1e-9);
        assert!((mem - 0.6).abs() < 1e-9);

        // Two refreshes inside the TTL keep reporting the penalised values
        cache.upsert_scores_at(probe_result(), t0 + Duration::from_secs(5));
        cache.upsert_scores_at(probe_result(), t0 + Duration::from_secs(10));

        let snap = cache.snapshot();
        assert!((snap.scores["vm-1"].cpu - 0.7).abs() < 1e-9);
        assert!((snap.scores["vm-1"].memory - 0.6).abs() < 1e-9);
        // Latency is never penalised
        assert_eq!(snap.scores["vm-1"].latency, 0.9);
    }

    #[test]
    fn test_penalty_expires_after_ttl() {
        let cfg = test_config();
        let cache = ScoredNodeCache::new(cfg.penalty_ttl);
        let t0 = Instant::now();

        cache.upsert_scores_at(probe_result(), t0);
        cache.apply_penalty_at("vm-1", &cfg, t0).unwrap();

        // One refresh after the TTL restores the fresh probe values
        cache.upsert_scores_at(probe_result(), t0 + Duration::from_secs(16));

        let snap = cache.snapshot();
        assert_eq!(snap.scores["vm-1"].cpu, 0.8);
        assert_eq!(snap.scores["vm-1"].memory, 0.7);

        // The expired record is gone: another refresh stays fresh
        cache.upsert_scores_at(probe_result(), t0 + Duration::from_secs(17));
        assert_eq!(cache.snapshot().scores["vm-1"].cpu, 0.8);
    }

    #[test]
    fn test_reapplied_penalty_replaces_record() {
        let cfg = test_config();
        let cache = ScoredNodeCache::new(cfg.penalty_ttl);
        let t0 = Instant::now();

        cache.upsert_scores_at(probe_result(), t0);
        cache.apply_penalty_at("vm-1", &cfg, t0).unwrap();
        // Winning twice stacks the penalty and restarts the TTL
        let (cpu, _) = cache
            .apply_penalty_at("vm-1", &cfg, t0 + Duration::from_secs(10))
            .unwrap();
        assert!((cpu - 0.6).abs() < 1e-9);

        // 16s after t0 but only 6s after the second win: still penalised
        cache.upsert_scores_at(probe_result(), t0 + Duration::from_secs(16));
        assert!((cache.snapshot().scores["vm-1"].cpu - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_apply_penalty_unknown_node() {
        let cfg = test_config();
        let cache = ScoredNodeCache::new(cfg.penalty_ttl);
        assert!(cache.apply_penalty("ghost", &cfg).is_none());
    }

    #[test]
    fn test_replace_traffic() {
        let cache = ScoredNodeCache::new(Duration::from_secs(15));

        let mut traffic = HashMap::new();
        traffic.insert("rpi-1".to_string(), 120.0);
        let mut norm = HashMap::new();
        norm.insert("rpi-1".to_string(), 1.0);

        cache.replace_traffic(traffic, norm);
        assert_eq!(cache.snapshot().traffic_norm["rpi-1"], 1.0);
    }
}
