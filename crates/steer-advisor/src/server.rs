use crate::advisor::Advisor;
use crate::handlers::{bind, filter, health, prioritize};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Advisor server configuration
#[derive(Clone)]
pub struct Config {
    /// Address to listen on
    pub listen_addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3001".parse().unwrap(),
        }
    }
}

/// HTTP server exposing the scheduler-extender surface
pub struct AdvisorServer {
    config: Config,
    advisor: Arc<Advisor>,
}

impl AdvisorServer {
    /// Create a new advisor server
    pub fn new(config: Config, advisor: Arc<Advisor>) -> Self {
        Self { config, advisor }
    }

    /// Build the router
    fn build_router(&self) -> Router {
        Router::new()
            .route("/filter", post(filter))
            .route("/prioritize", post(prioritize))
            .route("/bind", post(bind))
            .route("/health", get(health))
            .layer(TraceLayer::new_for_http())
            .with_state(self.advisor.clone())
    }

    /// Run the server until the token is cancelled; in-flight handlers
    /// complete before the listener closes
    pub async fn run(self, token: CancellationToken) -> Result<(), std::io::Error> {
        let app = self.build_router();

        info!("Starting advisor server on {}", self.config.listen_addr);

        let listener = TcpListener::bind(self.config.listen_addr).await?;

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use steer_cluster::{ClusterAuth, ClusterClient};
    use steer_core::{MeasurementsConfig, ProberConfig, ScoringConfig};
    use steer_telemetry::{MeasurementsClient, ProbeClient};

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
        let cfg = ScoringConfig {
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
        };
        Arc::new(Advisor::new(cluster, measurements, prober, cfg))
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.listen_addr.to_string(), "0.0.0.0:3001");
    }

    #[test]
    fn test_build_router() {
        let server = AdvisorServer::new(Config::default(), test_advisor());
        let router = server.build_router();

        // Router should build successfully
        assert!(std::mem::size_of_val(&router) > 0);
    }
}
