use miette::Diagnostic;
use thiserror::Error;

/// Cluster API error type
#[derive(Error, Debug, Diagnostic)]
pub enum ClusterError {
    /// In-cluster credentials could not be resolved
    #[error("Cluster client initialisation failed: {message}")]
    #[diagnostic(
        code(steer::cluster::init_failed),
        help("This process must run in-cluster with a mounted service account")
    )]
    InitFailed { message: String },

    /// HTTP client could not be constructed
    #[error("Failed to build cluster HTTP client: {message}")]
    #[diagnostic(
        code(steer::cluster::client_build),
        help("Check the CA certificate in the mounted service account")
    )]
    ClientBuild { message: String },

    /// Outbound request failed before a response arrived
    #[error("Request to {url} failed: {message}")]
    #[diagnostic(
        code(steer::cluster::request_failed),
        help("Verify the API server address and network policies")
    )]
    RequestFailed { url: String, message: String },

    /// API server answered with a non-success status
    #[error("Cluster API returned {status} for {url}: {body}")]
    #[diagnostic(
        code(steer::cluster::api_status),
        help("The response body carries the API server's Status message")
    )]
    ApiStatus {
        url: String,
        status: u16,
        body: String,
    },

    /// Response body did not match the expected schema
    #[error("Failed to parse response from {url}: {message}")]
    #[diagnostic(
        code(steer::cluster::schema_invalid),
        help("The API server may be a different version than expected")
    )]
    SchemaInvalid { url: String, message: String },

    /// Node object carries no InternalIP address
    #[error("Node {node} has no InternalIP")]
    #[diagnostic(
        code(steer::cluster::node_address_missing),
        help("Check the node's status.addresses in the cluster")
    )]
    NodeAddressMissing { node: String },
}

/// Result type for cluster operations
pub type Result<T> = std::result::Result<T, ClusterError>;

impl ClusterError {
    pub fn init_failed(message: impl Into<String>) -> Self {
        Self::InitFailed {
            message: message.into(),
        }
    }

    pub fn client_build(message: impl Into<String>) -> Self {
        Self::ClientBuild {
            message: message.into(),
        }
    }

    pub fn request_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn api_status(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::ApiStatus {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    pub fn schema_invalid(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaInvalid {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn node_address_missing(node: impl Into<String>) -> Self {
        Self::NodeAddressMissing { node: node.into() }
    }
}
