//! Info handlers for system information and root endpoint

use crate::api::error::ApiError;
use crate::api::AppState;

use axum::{extract::State, Json};
use fingerprint_core::api::{ApiResponse, InfoResponse};
use serde_json::{json, Value};
use tracing::debug;

/// Handle the root endpoint.
///
/// Provide basic service identification and status. Useful for health checks
/// and verifying the API is accessible.
///
/// # Endpoint
///
/// `GET /`
pub(crate) async fn root() -> Result<Json<ApiResponse<Value>>, ApiError> {
    debug!("Request: GET /");

    let data = json!({
        "service": "Fingerprint Bridge API Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "ok"
    });

    Ok(Json(ApiResponse::success(data)))
}

/// Retrieve server and link information.
///
/// # Endpoint
///
/// `GET /api/info`
///
/// # Returns
///
/// - `version` - Server version
/// - `uptime` - Server uptime in seconds
/// - `connection` - Current serial connection snapshot
/// - `link_state` - Connection manager state
/// - `subscribers` - Live push-channel subscribers
pub(crate) async fn get_info(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<InfoResponse>>, ApiError> {
    debug!("Request: GET /api/info");

    let info_response = InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: state.start_time.elapsed().as_secs(),
        connection: state.manager.status(),
        link_state: state.manager.link_state(),
        subscribers: state.broadcaster.subscriber_count().await,
    };

    Ok(Json(ApiResponse::success(info_response)))
}
