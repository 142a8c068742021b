use crate::controller::Rebalancer;
use crate::Result;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::api::policy::v1::Eviction;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{DeleteOptions, ObjectMeta, Preconditions};
use steer_cluster::{node_internal_ip, ClusterError};
use steer_core::RebalancerConfig;
use steer_telemetry::{pod_usage, Summary};
use tracing::{debug, info, warn};

/// Pod name fragments that mark cluster infrastructure
const RESERVED_NAME_FRAGMENTS: [&str; 4] = ["scheduler", "descheduler", "coredns", "metrics"];

/// Infrastructure pods are never eviction candidates: reserved name
/// fragments, or anything managed by a DaemonSet (it would respawn on the
/// same node anyway).
pub fn is_system_pod(pod: &Pod) -> bool {
    let name = pod.metadata.name.as_deref().unwrap_or("");
    if RESERVED_NAME_FRAGMENTS.iter().any(|f| name.contains(f)) {
        return true;
    }

    pod.metadata
        .owner_references
        .as_ref()
        .is_some_and(|refs| refs.iter().any(|r| r.kind == "DaemonSet"))
}

/// Pick the lowest-CPU non-system pod under both idleness thresholds.
///
/// Pods without a summary entry are skipped: without live usage data a pod
/// cannot be proven idle.
pub fn select_idle_pod<'a>(
    pods: &'a [Pod],
    summary: &Summary,
    cfg: &RebalancerConfig,
) -> Option<&'a Pod> {
    let mut min_cpu = f64::INFINITY;
    let mut target = None;

    for pod in pods {
        if is_system_pod(pod) {
            continue;
        }

        let Some(name) = pod.metadata.name.as_deref() else {
            continue;
        };
        let namespace = pod.metadata.namespace.as_deref().unwrap_or("");

        let Some((cpu, mem)) = pod_usage(summary, name, namespace) else {
            continue;
        };

        debug!("Pod {}/{}: cpu={:.2}m memory={:.2}Mi", namespace, name, cpu, mem);

        if cpu < min_cpu && cpu < cfg.idle_cpu_millis && mem < cfg.idle_mem_mib {
            min_cpu = cpu;
            target = Some(pod);
        }
    }

    target
}

impl Rebalancer {
    /// Try to evict one idle pod from `node_name`.
    ///
    /// `Ok(true)` iff the API server accepted an eviction, `Ok(false)` when
    /// the node has no candidate.
    pub(crate) async fn evict_idle_pod(&self, node_name: &str) -> Result<bool> {
        let node = self.cluster.get_node(node_name).await?;
        let node_ip = node_internal_ip(&node)
            .ok_or_else(|| ClusterError::node_address_missing(node_name))?;

        let summary = self.kubelet.fetch(&node_ip).await?;

        let pods = self
            .cluster
            .list_pods_on_node(&self.namespace, node_name)
            .await?;

        let Some(target) = select_idle_pod(&pods, &summary, &self.cfg) else {
            warn!("No idle pod found to evict on node {}", node_name);
            return Ok(false);
        };

        let name = target.metadata.name.clone().unwrap_or_default();
        let namespace = target
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| self.namespace.clone());
        let uid = target.metadata.uid.clone();

        let eviction = Eviction {
            metadata: ObjectMeta {
                name: Some(name.clone()),
                namespace: Some(namespace.clone()),
                uid: uid.clone(),
                ..Default::default()
            },
            delete_options: Some(DeleteOptions {
                grace_period_seconds: Some(30),
                // UID precondition: never evict a pod that was replaced
                // between selection and this request
                preconditions: Some(Preconditions {
                    uid,
                    ..Default::default()
                }),
                ..Default::default()
            }),
        };

        info!("Evicting pod {}/{}", namespace, name);

        self.cluster.evict_pod(&namespace, &name, &eviction).await?;

        Ok(true)
    }
}
