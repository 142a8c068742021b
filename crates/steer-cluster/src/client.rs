use crate::auth::ClusterAuth;
use crate::error::{ClusterError, Result};
use k8s_openapi::api::core::v1::{Binding, Node, Pod};
use k8s_openapi::api::policy::v1::Eviction;
use k8s_openapi::List;
use reqwest::{Certificate, Client};
use std::time::Duration;
use tracing::debug;

/// Typed client for the handful of cluster API calls the controller makes
pub struct ClusterClient {
    http: Client,
    server: String,
    token: String,
}

impl ClusterClient {
    pub fn new(auth: &ClusterAuth) -> Result<Self> {
        let mut builder = Client::builder().timeout(Duration::from_secs(10));

        if let Some(pem) = &auth.ca_pem {
            let cert = Certificate::from_pem(pem)
                .map_err(|e| ClusterError::client_build(e.to_string()))?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder
            .build()
            .map_err(|e| ClusterError::client_build(e.to_string()))?;

        Ok(Self {
            http,
            server: auth.server.trim_end_matches('/').to_string(),
            token: auth.token.clone(),
        })
    }

    /// GET /api/v1/namespaces/{namespace}/pods?fieldSelector=spec.nodeName={node}
    pub async fn list_pods_on_node(&self, namespace: &str, node: &str) -> Result<Vec<Pod>> {
        let url = format!("{}/api/v1/namespaces/{}/pods", self.server, namespace);
        debug!("GET {} (node {})", url, node);

        let resp = self
            .http
            .get(&url)
            .query(&[("fieldSelector", format!("spec.nodeName={}", node))])
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ClusterError::request_failed(&url, e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClusterError::api_status(&url, status, body));
        }

        let list = resp
            .json::<List<Pod>>()
            .await
            .map_err(|e| ClusterError::schema_invalid(&url, e.to_string()))?;

        Ok(list.items)
    }

    /// GET /api/v1/nodes/{name}
    pub async fn get_node(&self, name: &str) -> Result<Node> {
        let url = format!("{}/api/v1/nodes/{}", self.server, name);
        debug!("GET {}", url);

        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ClusterError::request_failed(&url, e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClusterError::api_status(&url, status, body));
        }

        resp.json::<Node>()
            .await
            .map_err(|e| ClusterError::schema_invalid(&url, e.to_string()))
    }

    /// POST /api/v1/namespaces/{namespace}/pods/{name}/binding
    pub async fn bind_pod(&self, namespace: &str, pod_name: &str, binding: &Binding) -> Result<()> {
        let url = format!(
            "{}/api/v1/namespaces/{}/pods/{}/binding",
            self.server, namespace, pod_name
        );
        debug!("POST {}", url);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(binding)
            .send()
            .await
            .map_err(|e| ClusterError::request_failed(&url, e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClusterError::api_status(&url, status, body));
        }

        Ok(())
    }

    /// POST /api/v1/namespaces/{namespace}/pods/{name}/eviction
    pub async fn evict_pod(
        &self,
        namespace: &str,
        pod_name: &str,
        eviction: &Eviction,
    ) -> Result<()> {
        let url = format!(
            "{}/api/v1/namespaces/{}/pods/{}/eviction",
            self.server, namespace, pod_name
        );
        debug!("POST {}", url);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(eviction)
            .send()
            .await
            .map_err(|e| ClusterError::request_failed(&url, e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClusterError::api_status(&url, status, body));
        }

        Ok(())
    }
}

/// First InternalIP in the node's status addresses
pub fn node_internal_ip(node: &Node) -> Option<String> {
    node.status
        .as_ref()?
        .addresses
        .as_ref()?
        .iter()
        .find(|a| a.type_ == "InternalIP")
        .map(|a| a.address.clone())
}
