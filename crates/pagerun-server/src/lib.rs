//! HTTP surface for the pagerun remote execution service.
//!
//! Three routes: a plain-text liveness probe, `/execute` for running untrusted
//! payloads in ephemeral browser sessions, and `/generate-keywords` for the
//! hosted-model keyword extraction. The two POST routes sit behind a static
//! bearer-style token check; every failure is converted to a JSON body at this
//! boundary and nothing is allowed to crash the process.

pub mod error;
pub mod handler;

pub use error::{Result, ServerError};
pub use handler::{ExecuteHandler, KeywordHandler};

use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use pagerun_core::CoreError;
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Plain-text liveness message served on `/`.
const LIVENESS_MESSAGE: &str = "pagerun execution server up and running";

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Static token required on the POST routes
    pub auth_token: String,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
    /// Enable request logging
    pub enable_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:4000".parse().unwrap(),
            auth_token: String::new(),
            max_body_size: 50 * 1024 * 1024, // 50MB, payloads can embed data inline
            enable_logging: true,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = token.into();
        self
    }

    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    pub fn with_logging(mut self, enable: bool) -> Self {
        self.enable_logging = enable;
        self
    }
}

/// Shared application state containing the handlers and configuration.
#[derive(Clone)]
pub struct AppState<E: ExecuteHandler, K: KeywordHandler> {
    pub executor: E,
    pub keywords: K,
    pub config: ServerConfig,
}

/// Static token check applied to the POST routes.
///
/// Rejected requests never reach a handler, so no session and no upstream
/// call is ever made on their behalf.
async fn require_token<E: ExecuteHandler, K: KeywordHandler>(
    State(state): State<AppState<E, K>>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value == state.config.auth_token)
        .unwrap_or(false);

    if authorized {
        next.run(request).await
    } else {
        log::warn!("rejected {} with missing or invalid token", request.uri());
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Unauthorized" })),
        )
            .into_response()
    }
}

/// Handler for the `/` GET endpoint.
async fn root_handler() -> &'static str {
    LIVENESS_MESSAGE
}

/// Handler for the `/health` GET endpoint.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handler for the `/execute` POST endpoint.
async fn execute_handler<E: ExecuteHandler, K: KeywordHandler>(
    State(state): State<AppState<E, K>>,
    body: String,
) -> std::result::Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    if body.trim().is_empty() {
        log::warn!("execute request with empty payload");
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No code provided" })),
        ));
    }

    match state.executor.execute(&body).await {
        Ok(value) => Ok(Json(json!({ "result": value }))),
        Err(CoreError::Validation(message)) => {
            Err((StatusCode::BAD_REQUEST, Json(json!({ "error": message }))))
        }
        Err(CoreError::Execution { message, trace }) => {
            log::error!("execution failed: {}", message);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": message, "trace": trace })),
            ))
        }
        Err(e) => {
            log::error!("execute request failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string(), "trace": e.to_string() })),
            ))
        }
    }
}

/// Handler for the `/generate-keywords` POST endpoint.
async fn keywords_handler<E: ExecuteHandler, K: KeywordHandler>(
    State(state): State<AppState<E, K>>,
    body: String,
) -> std::result::Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    if body.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No text provided" })),
        ));
    }

    match state.keywords.keywords(&body).await {
        Ok(keywords) => Ok(Json(json!({ "keywords": keywords }))),
        Err(CoreError::Validation(message)) => {
            Err((StatusCode::BAD_REQUEST, Json(json!({ "error": message }))))
        }
        Err(e) => {
            log::error!("keyword extraction failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Keyword extraction failed",
                    "details": e.to_string(),
                })),
            ))
        }
    }
}

/// The pagerun HTTP server.
pub struct PagerunServer<E: ExecuteHandler, K: KeywordHandler> {
    executor: E,
    keywords: K,
    config: ServerConfig,
}

impl<E: ExecuteHandler, K: KeywordHandler> PagerunServer<E, K> {
    pub fn new(executor: E, keywords: K) -> Self {
        Self {
            executor,
            keywords,
            config: ServerConfig::default(),
        }
    }

    pub fn with_config(executor: E, keywords: K, config: ServerConfig) -> Self {
        Self {
            executor,
            keywords,
            config,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the Axum router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        let state = AppState {
            executor: self.executor.clone(),
            keywords: self.keywords.clone(),
            config: self.config.clone(),
        };

        let protected = Router::new()
            .route("/execute", post(execute_handler::<E, K>))
            .route("/generate-keywords", post(keywords_handler::<E, K>))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                require_token::<E, K>,
            ))
            .layer(DefaultBodyLimit::max(state.config.max_body_size));

        let mut router = Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_handler))
            .merge(protected)
            .with_state(state);

        if self.config.enable_logging {
            router = router.layer(middleware::from_fn(
                |request: axum::http::Request<axum::body::Body>,
                 next: axum::middleware::Next| async {
                    let request_id = uuid::Uuid::new_v4().to_string();
                    let method = request.method().clone();
                    let uri = request.uri().clone();
                    log::info!("Request {} {} {}", request_id, method, uri);

                    let start = std::time::Instant::now();
                    let response = next.run(request).await;
                    let duration = start.elapsed();

                    log::info!(
                        "Response {} {} completed in {:?}",
                        request_id,
                        response.status(),
                        duration
                    );
                    response
                },
            ));
        }

        router.layer(TraceLayer::new_for_http())
    }

    /// Start the server and listen for connections.
    ///
    /// This method will block until the server is shut down.
    pub async fn serve(self) -> Result<()> {
        let router = self.build_router();
        let listener = TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|e| {
                ServerError::config_error(format!(
                    "Failed to bind to {}: {}",
                    self.config.bind_addr, e
                ))
            })?;

        log::info!("pagerun server starting on {}", self.config.bind_addr);
        log::info!("Liveness: http://{}/", self.config.bind_addr);
        log::info!("Execute endpoint: http://{}/execute", self.config.bind_addr);
        log::info!(
            "Keywords endpoint: http://{}/generate-keywords",
            self.config.bind_addr
        );

        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::internal(format!("Server error: {}", e)))?;
        Ok(())
    }

    /// Start the server with graceful shutdown support.
    ///
    /// The server will shut down when the provided shutdown signal resolves.
    pub async fn serve_with_shutdown<F>(self, shutdown_signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();
        let listener = TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|e| {
                ServerError::config_error(format!(
                    "Failed to bind to {}: {}",
                    self.config.bind_addr, e
                ))
            })?;

        log::info!(
            "pagerun server starting on {} with graceful shutdown",
            self.config.bind_addr
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::internal(format!("Server error: {}", e)))?;

        log::info!("pagerun server shut down gracefully");
        Ok(())
    }
}

/// Utility function to create a shutdown signal from Ctrl+C / SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log::info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            log::info!("Received SIGTERM, shutting down...");
        },
    }
}
