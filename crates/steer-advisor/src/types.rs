use k8s_openapi::api::core::v1::{Node, Pod};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Wire shape of the candidate node list (`{"items": [...]}`)
pub type NodeList = k8s_openapi::List<Node>;

/// Request body of `/filter` and `/prioritize` (scheduler-extender v1)
#[derive(Debug, Clone, Deserialize)]
pub struct ExtenderArgs {
    pub pod: Pod,
    pub nodes: NodeList,
}

/// Reply body of `/filter`
#[derive(Debug, Clone, Serialize)]
pub struct ExtenderFilterResult {
    pub nodes: NodeList,
    #[serde(rename = "failedNodes")]
    pub failed_nodes: HashMap<String, String>,
    pub error: String,
}

/// One entry of the `/prioritize` reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPriority {
    pub host: String,
    pub score: i64,
}

/// Request body of `/bind`
#[derive(Debug, Clone, Deserialize)]
pub struct ExtenderBindingArgs {
    #[serde(rename = "podName")]
    pub pod_name: String,
    #[serde(rename = "podNamespace")]
    pub pod_namespace: String,
    #[serde(rename = "podUID")]
    pub pod_uid: String,
    pub node: String,
}

/// Reply body of `/bind`; binding failures travel in-band at HTTP 200
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtenderBindingResult {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extender_args_deserialize() {
        let json = r#"{
            "pod": {"metadata": {"name": "web-1", "namespace": "default"}},
            "nodes": {"items": [
                {"metadata": {"name": "rpi-1"}},
                {"metadata": {"name": "vm-1"}}
            ]}
        }"#;
        let args: ExtenderArgs = serde_json::from_str(json).unwrap();
        assert_eq!(args.pod.metadata.name.as_deref(), Some("web-1"));
        assert_eq!(args.nodes.items.len(), 2);
        assert_eq!(
            args.nodes.items[1].metadata.name.as_deref(),
            Some("vm-1")
        );
    }

    #[test]
    fn test_binding_args_wire_names() {
        let json = r#"{
            "podName": "web-1",
            "podNamespace": "default",
            "podUID": "abc-123",
            "node": "rpi-2"
        }"#;
        let args: ExtenderBindingArgs = serde_json::from_str(json).unwrap();
        assert_eq!(args.pod_name, "web-1");
        assert_eq!(args.pod_uid, "abc-123");
        assert_eq!(args.node, "rpi-2");
    }

    #[test]
    fn test_filter_result_serialize() {
        let mut failed = HashMap::new();
        failed.insert("vm-1".to_string(), "no prober data".to_string());

        let result = ExtenderFilterResult {
            nodes: NodeList {
                items: Vec::new(),
                metadata: Default::default(),
            },
            failed_nodes: failed,
            error: String::new(),
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["failedNodes"]["vm-1"], "no prober data");
        assert_eq!(value["error"], "");
    }
}
