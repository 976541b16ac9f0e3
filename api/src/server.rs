//! HTTP server.
//!
//! Serves the WebSocket endpoint and a health report, and shuts down
//! gracefully on SIGINT or SIGTERM.

use std::future::Future;
use std::io;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::{ConfigError, ServerConfig};
use crate::state::AppState;
use crate::ws::{ws_handler, LiveMetricsSnapshot};

/// Server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Could not bind the listen address.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// Address that was requested.
        address: String,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The server stopped with an I/O error.
    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}

/// Health report returned by `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process is serving.
    pub status: &'static str,
    /// Current server time, RFC 3339.
    pub timestamp: String,
    /// When the server started, RFC 3339.
    pub started_at: String,
    /// Live connections.
    pub connections: usize,
    /// Users with at least one live connection.
    pub users: usize,
    /// Topics with at least one watcher.
    pub rooms: usize,
    /// Counter snapshot.
    pub metrics: LiveMetricsSnapshot,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// `GET /health`
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let hub = &state.hub;
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339(),
        started_at: state.started_at.to_rfc3339(),
        connections: hub.connection_count().await,
        users: hub.user_count().await,
        rooms: hub.room_count().await,
        metrics: hub.metrics().snapshot(),
    })
}

/// The live update server.
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    /// Creates a server.
    #[must_use]
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the shared state.
    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// Binds the configured address and serves until a shutdown signal.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the address cannot be
    /// bound or the server fails.
    pub async fn run(self) -> Result<(), ServerError> {
        self.config.validate()?;

        let address = self.config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.clone(),
                source,
            })?;

        info!("Listening on {}", address);
        self.serve(listener, shutdown_signal()).await
    }

    /// Serves on an already bound listener until `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(ServerError::Serve)?;

        info!("Server stopped");
        Ok(())
    }
}

/// Completes when SIGINT or SIGTERM is received.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT, shutting down");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        },
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::live::{LiveHub, TopicId, UserId};
    use crate::ws::CommentEvent;

    async fn get_json(state: AppState, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request");
        let response = router(state).oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_health_empty() {
        let (status, body) = get_json(AppState::default(), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["connections"], 0);
        assert_eq!(body["users"], 0);
        assert_eq!(body["rooms"], 0);
        assert_eq!(body["metrics"]["active_connections"], 0);
    }

    #[tokio::test]
    async fn test_health_reflects_hub() {
        let hub = LiveHub::new(8);
        let lifecycle = hub.lifecycle();
        let (mut session, _rx) = lifecycle.connect().await;
        lifecycle
            .authenticate(&mut session, UserId::from("alice"))
            .await;
        lifecycle
            .subscribe(&mut session, TopicId::from("owls"))
            .await;
        hub.broadcast(&TopicId::from("owls"), CommentEvent::added(json!({"id": 1})))
            .await;

        let (status, body) = get_json(AppState::new(hub.clone()), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["connections"], 1);
        assert_eq!(body["users"], 1);
        assert_eq!(body["rooms"], 1);
        assert_eq!(body["metrics"]["comment_updates_delivered"], 1);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, _) = get_json(AppState::default(), "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_server_error_display() {
        let err = ServerError::from(ConfigError::EmptyHost);
        assert_eq!(
            err.to_string(),
            "invalid configuration: host must not be empty"
        );
    }
}
