use crate::advisor::Advisor;
use crate::types::{
    ExtenderArgs, ExtenderBindingArgs, ExtenderBindingResult, ExtenderFilterResult, HostPriority,
    NodeList,
};
use axum::extract::State;
use axum::Json;
use k8s_openapi::api::core::v1::{Binding, ObjectReference};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::HashMap;
use std::sync::Arc;
use steer_core::score_node;
use tracing::{debug, error, info, warn};

/// POST /filter
///
/// Threshold check against the cached score vectors. With an empty cache
/// every node passes: rejecting with no data would deadlock placement.
pub async fn filter(
    State(advisor): State<Arc<Advisor>>,
    Json(args): Json<ExtenderArgs>,
) -> Json<ExtenderFilterResult> {
    let pod_name = args.pod.metadata.name.as_deref().unwrap_or("unknown");
    info!(
        "Filter request for pod {} ({} nodes)",
        pod_name,
        args.nodes.items.len()
    );

    advisor.refresh_prober_data().await;

    let snapshot = advisor.cache.snapshot();
    let cfg = &advisor.cfg;

    let mut failed_nodes = HashMap::new();
    let mut passed = Vec::new();

    if snapshot.scores.is_empty() {
        warn!("No prober data available, passing all nodes");
        passed = args.nodes.items;
    } else {
        for node in args.nodes.items {
            let node_name = node.metadata.name.as_deref().unwrap_or("unknown");

            let Some(sv) = snapshot.scores.get(node_name) else {
                debug!("{} rejected: no prober data", node_name);
                failed_nodes.insert(node_name.to_string(), "no prober data".to_string());
                continue;
            };

            if sv.latency < cfg.latency_threshold {
                debug!(
                    "{} rejected: latency={:.3} < {:.2}",
                    node_name, sv.latency, cfg.latency_threshold
                );
                failed_nodes.insert(node_name.to_string(), "latency below threshold".to_string());
                continue;
            }

            // Conjunctive on purpose: a node is only rejected when BOTH
            // resources are depleted
            if sv.cpu < cfg.cpu_threshold && sv.memory < cfg.mem_threshold {
                debug!(
                    "{} rejected: cpu={:.3} < {:.2} and memory={:.3} < {:.2}",
                    node_name, sv.cpu, cfg.cpu_threshold, sv.memory, cfg.mem_threshold
                );
                failed_nodes.insert(
                    node_name.to_string(),
                    "cpu & memory below threshold".to_string(),
                );
                continue;
            }

            debug!(
                "{} passed (lat={:.3} cpu={:.3} mem={:.3})",
                node_name, sv.latency, sv.cpu, sv.memory
            );
            passed.push(node);
        }
    }

    info!(
        "Filter phase completed: {} passed, {} failed",
        passed.len(),
        failed_nodes.len()
    );
    if passed.is_empty() && !failed_nodes.is_empty() {
        warn!("All nodes filtered out, placement may fail for pod {}", pod_name);
    }

    Json(ExtenderFilterResult {
        nodes: NodeList {
            items: passed,
            metadata: Default::default(),
        },
        failed_nodes,
        error: String::new(),
    })
}

/// POST /prioritize
///
/// Refresh caches, score every candidate, then penalise the winner so the
/// next invocation sees its reduced CPU/memory scores. The reply carries
/// the unpenalised scores of this invocation.
pub async fn prioritize(
    State(advisor): State<Arc<Advisor>>,
    Json(args): Json<ExtenderArgs>,
) -> Json<Vec<HostPriority>> {
    let pod_name = args.pod.metadata.name.as_deref().unwrap_or("unknown");
    info!(
        "Prioritize request for pod {} ({} nodes)",
        pod_name,
        args.nodes.items.len()
    );

    advisor.refresh_prober_data().await;
    advisor.refresh_traffic_data().await;

    let snapshot = advisor.cache.snapshot();
    let cfg = &advisor.cfg;

    let mut priorities = Vec::with_capacity(args.nodes.items.len());
    let mut best_node: Option<String> = None;
    let mut best_score: i64 = -1;

    for node in &args.nodes.items {
        let node_name = node.metadata.name.as_deref().unwrap_or("unknown");

        let score = score_node(node_name, &snapshot.scores, &snapshot.traffic_norm, cfg);
        priorities.push(HostPriority {
            host: node_name.to_string(),
            score,
        });

        // Strict comparison: the first of equally scored nodes wins
        if score > best_score {
            best_score = score;
            best_node = Some(node_name.to_string());
        }

        debug!("Node {} scored {}", node_name, score);
    }

    match &best_node {
        Some(best) => {
            info!("Best node for pod {}: {} (score={})", pod_name, best, best_score);
            advisor.penalize_winner(best);
        }
        None => warn!("No valid node selected, skipping penalty"),
    }

    Json(priorities)
}

/// POST /bind
///
/// Bind the pod through the cluster API. Binding errors are in-band: the
/// reply is always HTTP 200 with the error text in the body.
pub async fn bind(
    State(advisor): State<Arc<Advisor>>,
    Json(args): Json<ExtenderBindingArgs>,
) -> Json<ExtenderBindingResult> {
    info!(
        "Bind request: {}/{} -> {}",
        args.pod_namespace, args.pod_name, args.node
    );

    let binding = Binding {
        metadata: ObjectMeta {
            name: Some(args.pod_name.clone()),
            namespace: Some(args.pod_namespace.clone()),
            uid: Some(args.pod_uid.clone()),
            ..Default::default()
        },
        target: ObjectReference {
            kind: Some("Node".to_string()),
            name: Some(args.node.clone()),
            ..Default::default()
        },
    };

    match advisor
        .cluster
        .bind_pod(&args.pod_namespace, &args.pod_name, &binding)
        .await
    {
        Ok(()) => {
            info!("Bound {}/{} to {}", args.pod_namespace, args.pod_name, args.node);
            Json(ExtenderBindingResult::default())
        }
        Err(e) => {
            error!(
                "Failed to bind {}/{} to {}: {}",
                args.pod_namespace, args.pod_name, args.node, e
            );
            Json(ExtenderBindingResult {
                error: e.to_string(),
            })
        }
    }
}

/// GET /health
///
/// Always 200 so the container is not restarted while waiting for the
/// first probe refresh; the body distinguishes warm from warming.
pub async fn health(State(advisor): State<Arc<Advisor>>) -> &'static str {
    if advisor.cache.is_empty() {
        "warming up"
    } else {
        "ok"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::Node;
    use std::time::Duration;
    use steer_cluster::{ClusterAuth, ClusterClient};
    use steer_core::{MeasurementsConfig, ProberConfig, ScoreVector, ScoringConfig};
    use steer_telemetry::{MeasurementsClient, ProbeClient};

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

    /// Advisor wired to unreachable collaborators: refreshes fail fast with
    /// warnings, so handler tests exercise the cached-data paths
    fn test_advisor() -> Arc<Advisor> {
        let cluster =
            ClusterClient::new(&ClusterAuth::from_parts("https://127.0.0.1:1", "tok", None))
                .unwrap();
        let measurements = MeasurementsClient::new(MeasurementsConfig {
            host: "http://127.0.0.1:1".to_string(),
            token: "t".to_string(),
            org: "o".to_string(),
            bucket: "b".to_string(),
        })
        .unwrap();
        let prober = ProbeClient::new(ProberConfig {
            endpoint: "scores".to_string(),
            port: 1,
        })
        .unwrap();

        Arc::new(Advisor::new(cluster, measurements, prober, test_config()))
    }

    fn make_node(name: &str) -> Node {
        Node {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn make_args(nodes: &[&str]) -> ExtenderArgs {
        let pod = serde_json::from_value(serde_json::json!({
            "metadata": {"name": "web-1", "namespace": "default"}
        }))
        .unwrap();
        ExtenderArgs {
            pod,
            nodes: NodeList {
                items: nodes.iter().map(|n| make_node(n)).collect(),
                metadata: Default::default(),
            },
        }
    }

    #[tokio::test]
    async fn test_filter_fails_open_on_empty_cache() {
        let advisor = test_advisor();

        let Json(result) = filter(State(advisor), Json(make_args(&["n1", "n2", "n3"]))).await;

        let names: Vec<_> = result
            .nodes
            .items
            .iter()
            .map(|n| n.metadata.name.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["n1", "n2", "n3"]);
        assert!(result.failed_nodes.is_empty());
    }

    #[tokio::test]
    async fn test_filter_thresholds_and_reasons() {
        let advisor = test_advisor();
        advisor.cache.upsert_scores(vec![
            ScoreVector::new("good", 0.9, 0.8, 0.8),
            ScoreVector::new("laggy", 0.1, 0.8, 0.8),
            ScoreVector::new("depleted", 0.9, 0.1, 0.1),
        ]);

        let Json(result) = filter(
            State(advisor),
            Json(make_args(&["good", "laggy", "depleted", "unknown-node"])),
        )
        .await;

        let names: Vec<_> = result
            .nodes
            .items
            .iter()
            .map(|n| n.metadata.name.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["good"]);
        assert_eq!(result.failed_nodes["laggy"], "latency below threshold");
        assert_eq!(result.failed_nodes["depleted"], "cpu & memory below threshold");
        assert_eq!(result.failed_nodes["unknown-node"], "no prober data");
    }

    #[tokio::test]
    async fn test_filter_cpu_memory_rule_is_conjunctive() {
        let advisor = test_advisor();
        advisor.cache.upsert_scores(vec![
            // cpu below threshold but memory fine: passes
            ScoreVector::new("low-cpu", 0.9, 0.1, 0.8),
            // memory below threshold but cpu fine: passes
            ScoreVector::new("low-mem", 0.9, 0.8, 0.1),
        ]);

        let Json(result) = filter(State(advisor), Json(make_args(&["low-cpu", "low-mem"]))).await;

        assert_eq!(result.nodes.items.len(), 2);
        assert!(result.failed_nodes.is_empty());
    }

    #[tokio::test]
    async fn test_prioritize_scores_and_penalises_winner() {
        let advisor = test_advisor();
        advisor
            .cache
            .upsert_scores(vec![ScoreVector::new("vm-1", 0.9, 0.8, 0.7)]);

        let Json(priorities) = prioritize(State(advisor.clone()), Json(make_args(&["vm-1"]))).await;

        // 0.4*0.9 + 0.3*0.8 + 0.2*0.7 = 0.74 -> 74
        assert_eq!(
            priorities,
            vec![HostPriority {
                host: "vm-1".to_string(),
                score: 74
            }]
        );

        // The winner's cached cpu/memory now carry the VM-class penalty
        let snap = advisor.cache.snapshot();
        assert!((snap.scores["vm-1"].cpu - 0.7).abs() < 1e-9);
        assert!((snap.scores["vm-1"].memory - 0.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_prioritize_emits_zero_scored_candidates() {
        let advisor = test_advisor();
        advisor
            .cache
            .upsert_scores(vec![ScoreVector::new("rpi-1", 0.9, 0.9, 0.9)]);

        let Json(priorities) =
            prioritize(State(advisor), Json(make_args(&["rpi-1", "uncached"]))).await;

        assert_eq!(priorities.len(), 2);
        assert_eq!(priorities[1].host, "uncached");
        assert_eq!(priorities[1].score, 0);
    }

    #[tokio::test]
    async fn test_prioritize_first_seen_wins_ties() {
        let advisor = test_advisor();
        advisor.cache.upsert_scores(vec![
            ScoreVector::new("rpi-1", 0.8, 0.8, 0.8),
            ScoreVector::new("rpi-2", 0.8, 0.8, 0.8),
        ]);

        let Json(_) = prioritize(State(advisor.clone()), Json(make_args(&["rpi-1", "rpi-2"]))).await;

        // Only the first of the tied nodes is penalised
        let snap = advisor.cache.snapshot();
        assert!((snap.scores["rpi-1"].cpu - 0.75).abs() < 1e-9);
        assert_eq!(snap.scores["rpi-2"].cpu, 0.8);
    }

    #[tokio::test]
    async fn test_bind_reports_cluster_error_in_band() {
        let advisor = test_advisor();
        let args = ExtenderBindingArgs {
            pod_name: "web-1".to_string(),
            pod_namespace: "default".to_string(),
            pod_uid: "abc-123".to_string(),
            node: "rpi-2".to_string(),
        };

        // No API server listening: the handler still answers, with the
        // failure in the body
        let Json(result) = bind(State(advisor), Json(args)).await;
        assert!(!result.error.is_empty());
    }

    #[tokio::test]
    async fn test_health_reflects_cache_state() {
        let advisor = test_advisor();
        assert_eq!(health(State(advisor.clone())).await, "warming up");

        advisor
            .cache
            .upsert_scores(vec![ScoreVector::new("rpi-1", 0.9, 0.9, 0.9)]);
        assert_eq!(health(State(advisor)).await, "ok");
    }
}
