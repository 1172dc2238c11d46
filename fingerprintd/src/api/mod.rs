//! API module for the fingerprint bridge daemon
//!
//! Contains the REST API and WebSocket push channel with Axum router and
//! handlers.

pub(crate) mod handlers;

use crate::bridge::{Broadcaster, CommandGateway, ConnectionManager};
use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Application state shared across all handlers
#[derive(Clone)]
pub(crate) struct AppState {
    /// Owner of the serial link
    pub manager: Arc<ConnectionManager>,
    /// Dashboard operations on top of the manager
    pub gateway: CommandGateway,
    /// Push-channel fan-out
    pub broadcaster: Arc<Broadcaster>,
    /// Baud rate used when a connect request omits one
    pub default_baud_rate: u32,
    /// Server start time for uptime calculation
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(
        manager: Arc<ConnectionManager>,
        broadcaster: Arc<Broadcaster>,
        default_baud_rate: u32,
    ) -> Self {
        Self {
            gateway: CommandGateway::new(manager.clone()),
            manager,
            broadcaster,
            default_baud_rate,
            start_time: Instant::now(),
        }
    }
}

/// Create the main API router with all endpoints
pub(crate) fn create_router(state: AppState) -> Router {
    info!("Setting up API router...");

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024)); // 1MB limit

    Router::new()
        // Port discovery
        .route("/api/serial/ports", get(handlers::serial::list_ports))
        .route(
            "/api/serial/ports/details",
            get(handlers::serial::list_port_details),
        )
        // Connection lifecycle
        .route("/api/serial/status", get(handlers::serial::get_status))
        .route("/api/serial/connect", post(handlers::serial::connect))
        .route("/api/serial/disconnect", post(handlers::serial::disconnect))
        // Device commands
        .route("/api/serial/command", post(handlers::serial::send_command))
        .route("/api/serial/register", post(handlers::serial::register))
        .route("/api/serial/verify", post(handlers::serial::verify))
        .route("/api/serial/stop", post(handlers::serial::stop))
        .route(
            "/api/serial/delete/:id",
            post(handlers::serial::delete_fingerprint),
        )
        .route("/api/serial/delete-all", post(handlers::serial::delete_all))
        // Push channel
        .route("/ws", get(handlers::ws::ws_handler))
        // System info endpoint
        .route("/api/info", get(handlers::info::get_info))
        // Root endpoint
        .route("/", get(handlers::info::root))
        .layer(middleware_stack)
        .with_state(state)
}

/// Error handling utilities
pub(crate) mod error {
    use axum::{
        http::StatusCode,
        response::{IntoResponse, Response},
        Json,
    };
    use fingerprint_core::api::ApiResponse;
    use fingerprint_core::BridgeError;

    use tracing::error;

    /// Custom error type for API responses
    #[derive(Debug)]
    pub struct ApiError {
        pub status_code: StatusCode,
        pub message: String,
    }

    impl ApiError {
        /// Create a new API error
        pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
            Self {
                status_code,
                message: message.into(),
            }
        }

        /// Create a bad request error
        pub fn bad_request(message: impl Into<String>) -> Self {
            Self::new(StatusCode::BAD_REQUEST, message)
        }

        /// Request conflicts with the current connection state
        pub fn conflict(message: impl Into<String>) -> Self {
            Self::new(StatusCode::CONFLICT, message)
        }

        /// Create an internal server error
        pub fn internal_error(message: impl Into<String>) -> Self {
            Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
        }

        /// Create a service unavailable error (for device issues)
        pub fn service_unavailable(message: impl Into<String>) -> Self {
            Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
        }
    }

    impl IntoResponse for ApiError {
        fn into_response(self) -> Response {
            error!("API Error {}: {}", self.status_code, self.message);

            let response: ApiResponse<()> = ApiResponse::error(self.message);

            (self.status_code, Json(response)).into_response()
        }
    }

    /// Convert BridgeError to ApiError
    impl From<BridgeError> for ApiError {
        fn from(err: BridgeError) -> Self {
            match err {
                BridgeError::InvalidArgument(msg) => Self::bad_request(msg),
                BridgeError::AlreadyConnected | BridgeError::NotConnected => {
                    Self::conflict(err.to_string())
                }
                BridgeError::ConnectFailed(_)
                | BridgeError::WriteFailed(_)
                | BridgeError::Timeout(_) => Self::service_unavailable(err.to_string()),
                _ => Self::internal_error(err.to_string()),
            }
        }
    }

}

/// Helper macros for common responses
#[macro_export]
macro_rules! api_ok {
    ($data:expr) => {
        Ok(axum::Json(fingerprint_core::api::ApiResponse::success($data)))
    };
}

#[macro_export]
macro_rules! api_fail {
    ($message:expr) => {
        Err($crate::api::error::ApiError::bad_request($message))
    };
}
