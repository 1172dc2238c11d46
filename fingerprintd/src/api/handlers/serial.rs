//! Serial handlers: port discovery, connection lifecycle, and device commands

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::{api_fail, api_ok};

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use fingerprint_core::api::{
    AckResponse, ApiResponse, CommandRequest, ConnectRequest, ConnectResponse,
    PortDetailsResponse, PortsResponse,
};
use fingerprint_core::{BridgeError, ConnectionStatus};
use fingerprint_hardware::discovery;
use tracing::{debug, info, warn};

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// List serial device paths visible to the host.
///
/// # Endpoint
///
/// `GET /api/serial/ports`
///
/// # Behavior
///
/// Enumeration runs fresh on every request. Failures degrade to an empty list.
pub(crate) async fn list_ports() -> ApiResult<PortsResponse> {
    debug!("Request: GET /api/serial/ports");

    let ports = tokio::task::spawn_blocking(discovery::list_ports)
        .await
        .unwrap_or_else(|e| {
            warn!("Port enumeration task failed: {}", e);
            Vec::new()
        });

    api_ok!(PortsResponse { ports })
}

/// List serial ports with USB identification.
///
/// # Endpoint
///
/// `GET /api/serial/ports/details`
pub(crate) async fn list_port_details() -> ApiResult<PortDetailsResponse> {
    debug!("Request: GET /api/serial/ports/details");

    let ports = tokio::task::spawn_blocking(discovery::list_port_details)
        .await
        .unwrap_or_else(|e| {
            warn!("Port enumeration task failed: {}", e);
            Vec::new()
        });

    api_ok!(PortDetailsResponse { ports })
}

/// `GET /api/serial/status`
pub(crate) async fn get_status(State(state): State<AppState>) -> ApiResult<ConnectionStatus> {
    debug!("Request: GET /api/serial/status");
    api_ok!(state.manager.status())
}

/// Open the device link.
///
/// # Endpoint
///
/// `POST /api/serial/connect`
///
/// # Body
///
/// `{"port": "/dev/ttyACM0", "baudRate": 9600}`; `baudRate` is optional.
pub(crate) async fn connect(
    State(state): State<AppState>,
    payload: Result<Json<ConnectRequest>, JsonRejection>,
) -> ApiResult<ConnectResponse> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    debug!("Request: POST /api/serial/connect {:?}", request);

    let port = match request.port.as_deref().map(str::trim) {
        Some(port) if !port.is_empty() => port.to_string(),
        _ => return api_fail!("Port is required"),
    };
    let baud_rate = request.baud_rate.unwrap_or(state.default_baud_rate);
    if baud_rate == 0 {
        return api_fail!("Baud rate must be greater than 0");
    }

    let status = state.manager.connect(&port, baud_rate).await?;
    info!("Connected to {} at {} baud", port, baud_rate);

    api_ok!(ConnectResponse {
        message: "Connected successfully".to_string(),
        status,
    })
}

/// `POST /api/serial/disconnect`
pub(crate) async fn disconnect(State(state): State<AppState>) -> ApiResult<AckResponse> {
    debug!("Request: POST /api/serial/disconnect");
    state.manager.disconnect().await?;
    api_ok!(AckResponse::new("Disconnected successfully"))
}

/// Write arbitrary text to the device.
///
/// # Endpoint
///
/// `POST /api/serial/command` with body `{"command": "..."}`
pub(crate) async fn send_command(
    State(state): State<AppState>,
    payload: Result<Json<CommandRequest>, JsonRejection>,
) -> ApiResult<AckResponse> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    debug!("Request: POST /api/serial/command {:?}", request);

    let Some(command) = request.command.filter(|c| !c.trim().is_empty()) else {
        return api_fail!("Command is required");
    };

    state.gateway.raw_command(&command).await?;
    api_ok!(AckResponse::new("Command sent successfully"))
}

/// `POST /api/serial/register`
pub(crate) async fn register(State(state): State<AppState>) -> ApiResult<AckResponse> {
    debug!("Request: POST /api/serial/register");
    state.gateway.register().await?;
    api_ok!(AckResponse::new("Registration started"))
}

/// `POST /api/serial/verify`
pub(crate) async fn verify(State(state): State<AppState>) -> ApiResult<AckResponse> {
    debug!("Request: POST /api/serial/verify");
    state.gateway.verify().await?;
    api_ok!(AckResponse::new("Verification started"))
}

/// `POST /api/serial/stop`
pub(crate) async fn stop(State(state): State<AppState>) -> ApiResult<AckResponse> {
    debug!("Request: POST /api/serial/stop");
    state.gateway.stop().await?;
    api_ok!(AckResponse::new("Stop command sent"))
}

/// Delete one fingerprint template.
///
/// # Endpoint
///
/// `POST /api/serial/delete/:id`
///
/// # Errors
///
/// Returns 400 "Invalid ID" when `id` is not a non-negative integer.
pub(crate) async fn delete_fingerprint(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<AckResponse> {
    debug!("Request: POST /api/serial/delete/{}", id);

    let id = state
        .gateway
        .delete_one_str(&id)
        .await
        .map_err(|e| match e {
            BridgeError::InvalidArgument(_) => ApiError::bad_request("Invalid ID"),
            other => other.into(),
        })?;

    api_ok!(AckResponse::new(format!("Delete command sent for ID {}", id)))
}

/// `POST /api/serial/delete-all`
pub(crate) async fn delete_all(State(state): State<AppState>) -> ApiResult<AckResponse> {
    debug!("Request: POST /api/serial/delete-all");
    state.gateway.delete_all().await?;
    api_ok!(AckResponse::new("Delete all command sent"))
}
