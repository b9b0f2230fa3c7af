//! Control API for the notification manager
//!
//! ## Endpoints
//!
//! - `GET /control/health` - Health check
//! - `GET /control/notifications/telegram` - Current Telegram configuration
//! - `PUT /control/notifications/telegram` - Validate and apply a new configuration
//! - `POST /control/notifications/telegram/test` - Send a test message
//! - `GET /control/notifications/telegram/state` - Per-metric alert state

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;
pub use types::{HealthResponse, TestMessageRequest};

use std::net::SocketAddr;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:3030")
    pub bind_addr: SocketAddr,

    /// Optional bearer token required on every request
    pub auth_token: Option<String>,

    /// Allow cross-origin requests
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(
                crate::util::get_default_addr(),
                crate::util::get_default_port(),
            ),
            auth_token: None,
            enable_cors: false,
        }
    }
}

/// Builds the router with all routes and the configured layers.
pub fn router(config: &ApiConfig, state: ApiState) -> Router {
    let mut app = Router::new()
        .route("/control/health", get(routes::health::health_check))
        .route(
            "/control/notifications/telegram",
            get(routes::telegram::get_config).put(routes::telegram::put_config),
        )
        .route(
            "/control/notifications/telegram/test",
            post(routes::telegram::send_test),
        )
        .route(
            "/control/notifications/telegram/state",
            get(routes::telegram::alert_states),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    if let Some(token) = config.auth_token.clone() {
        app = app.layer(axum::middleware::from_fn_with_state(
            token,
            middleware::auth::auth_middleware,
        ));
    }

    app
}

/// Spawn the API server
///
/// Binds the listener, serves the router in a background task and returns
/// the local address.
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {}", config.bind_addr);

    let app = router(&config, state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {addr}");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("API server error: {e}");
        }
    });

    Ok(addr)
}
