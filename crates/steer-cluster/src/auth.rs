use crate::error::{ClusterError, Result};
use std::path::Path;

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Resolved credentials for talking to the API server and to kubelets
#[derive(Debug, Clone)]
pub struct ClusterAuth {
    /// API server base URL, e.g. `https://10.96.0.1:443`
    pub server: String,
    /// Bearer token of the mounted service account
    pub token: String,
    /// Cluster CA bundle (PEM); absent when running against a dev cluster
    /// whose CA is already in the system trust store
    pub ca_pem: Option<Vec<u8>>,
}

impl ClusterAuth {
    /// Resolve credentials from the standard in-cluster environment: the
    /// `KUBERNETES_SERVICE_*` variables plus the mounted service account
    pub fn in_cluster() -> Result<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .map_err(|_| ClusterError::init_failed("KUBERNETES_SERVICE_HOST is not set"))?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT")
            .map_err(|_| ClusterError::init_failed("KUBERNETES_SERVICE_PORT is not set"))?;

        Self::from_service_account_dir(
            format!("https://{}:{}", host, port),
            Path::new(SERVICE_ACCOUNT_DIR),
        )
    }

    /// Resolve the token and CA from a service-account directory
    pub fn from_service_account_dir(server: String, dir: &Path) -> Result<Self> {
        let token_path = dir.join("token");
        let token = std::fs::read_to_string(&token_path)
            .map_err(|e| {
                ClusterError::init_failed(format!(
                    "cannot read {}: {}",
                    token_path.display(),
                    e
                ))
            })?
            .trim()
            .to_string();

        // CA is optional; reqwest falls back to the system roots without it
        let ca_pem = std::fs::read(dir.join("ca.crt")).ok();

        Ok(Self {
            server,
            token,
            ca_pem,
        })
    }

    /// Build credentials from explicit parts (tests, out-of-cluster runs)
    pub fn from_parts(
        server: impl Into<String>,
        token: impl Into<String>,
        ca_pem: Option<Vec<u8>>,
    ) -> Self {
        Self {
            server: server.into(),
            token: token.into(),
            ca_pem,
        }
    }
}
