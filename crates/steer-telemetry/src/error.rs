use miette::Diagnostic;
use thiserror::Error;

/// Telemetry error type
#[derive(Error, Debug, Diagnostic)]
pub enum TelemetryError {
    /// HTTP client could not be constructed
    #[error("Failed to build HTTP client: {message}")]
    #[diagnostic(
        code(steer::telemetry::client_build),
        help("Check the CA certificate material handed to the client")
    )]
    ClientBuild { message: String },

    /// Outbound request failed (connect, timeout, ...)
    #[error("Request to {url} failed: {message}")]
    #[diagnostic(
        code(steer::telemetry::request_failed),
        help("Verify the endpoint is reachable from this pod and not timing out")
    )]
    RequestFailed { url: String, message: String },

    /// Endpoint answered with a non-success status
    #[error("Unexpected status {status} from {url}: {body}")]
    #[diagnostic(
        code(steer::telemetry::unexpected_status),
        help("Check the upstream service's logs and the credentials in use")
    )]
    UnexpectedStatus {
        url: String,
        status: u16,
        body: String,
    },

    /// Response body did not match the expected schema
    #[error("Failed to parse response from {url}: {message}")]
    #[diagnostic(
        code(steer::telemetry::schema_invalid),
        help("The upstream service may be a different version than expected")
    )]
    SchemaInvalid { url: String, message: String },
}

/// Result type for telemetry operations
pub type Result<T> = std::result::Result<T, TelemetryError>;

impl TelemetryError {
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

    pub fn unexpected_status(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::UnexpectedStatus {
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
}
