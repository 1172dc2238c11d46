//! Test utilities for CLI testing
//!
//! Provides an in-process mock of the bridge daemon: the REST routes with the
//! same envelopes and status codes, plus a `/ws` push channel that tests can
//! feed by hand.

use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use fingerprint_core::api::{
    AckResponse, ApiResponse, CommandRequest, ConnectRequest, ConnectResponse, InfoResponse,
    PortDetails, PortDetailsResponse, PortKind, PortsResponse, PushMessage,
};
use fingerprint_core::{ConnectionStatus, FingerprintId, LinkState, DEFAULT_BAUD_RATE};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex};

/// Mock daemon state
#[derive(Debug, Clone)]
pub struct MockServerState {
    /// Current link snapshot
    pub status: Arc<Mutex<ConnectionStatus>>,
    /// Command tokens "written to the device", in order
    pub sent: Arc<Mutex<Vec<String>>>,
    /// Ports reported by discovery
    pub ports: Vec<String>,
    /// Push channel feed
    pub push: broadcast::Sender<PushMessage>,
}

impl Default for MockServerState {
    fn default() -> Self {
        let (push, _) = broadcast::channel(64);
        Self {
            status: Arc::new(Mutex::new(ConnectionStatus::default())),
            sent: Arc::new(Mutex::new(Vec::new())),
            ports: vec!["/dev/ttyACM0".to_string(), "/dev/ttyS0".to_string()],
            push,
        }
    }
}

impl MockServerState {
    async fn record(&self, token: &str) -> Result<(), MockError> {
        if !self.status.lock().await.connected {
            return Err(MockError::conflict("Not connected to any port"));
        }
        self.sent.lock().await.push(token.to_string());
        // No receivers is fine
        let _ = self.push.send(PushMessage::CommandSent {
            command: token.to_string(),
        });
        Ok(())
    }
}

/// Error envelope returned by the mock
struct MockError {
    status: StatusCode,
    message: String,
}

impl MockError {
    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.to_string(),
        }
    }

    fn conflict(message: &str) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.to_string(),
        }
    }
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()>::error(self.message);
        (self.status, Json(body)).into_response()
    }
}

type MockResult<T> = std::result::Result<Json<ApiResponse<T>>, MockError>;

fn ack(message: impl Into<String>) -> MockResult<AckResponse> {
    Ok(Json(ApiResponse::success(AckResponse::new(message))))
}

/// Mock server implementation
#[derive(Debug)]
pub struct MockServer {
    state: MockServerState,
    port: u16,
}

impl Default for MockServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockServer {
    /// Create a new mock server
    pub fn new() -> Self {
        Self {
            state: MockServerState::default(),
            port: 0, // Will be assigned when server starts
        }
    }

    /// Start the mock server and return the address
    pub async fn start(mut self) -> Result<(Self, String)> {
        let app = self.create_router();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        self.port = addr.port();

        let server_url = format!("http://127.0.0.1:{}", self.port);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Mock server error: {}", e);
            }
        });

        // Give the server a moment to start and verify it's running
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                break;
            }
        }

        Ok((self, server_url))
    }

    /// Get the server port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get a reference to the server state
    pub fn state(&self) -> &MockServerState {
        &self.state
    }

    /// Command tokens received so far
    pub async fn sent_commands(&self) -> Vec<String> {
        self.state.sent.lock().await.clone()
    }

    /// Push a message to every open `/ws` socket
    pub async fn push(&self, message: PushMessage) {
        // Wait for the socket task to subscribe
        for _ in 0..50 {
            if self.state.push.receiver_count() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let _ = self.state.push.send(message);
    }

    /// Create the mock server router
    fn create_router(&self) -> Router {
        Router::new()
            .route("/", get(root_handler))
            .route("/api/info", get(info_handler))
            .route("/api/serial/ports", get(ports_handler))
            .route("/api/serial/ports/details", get(port_details_handler))
            .route("/api/serial/status", get(status_handler))
            .route("/api/serial/connect", post(connect_handler))
            .route("/api/serial/disconnect", post(disconnect_handler))
            .route("/api/serial/command", post(command_handler))
            .route("/api/serial/register", post(register_handler))
            .route("/api/serial/verify", post(verify_handler))
            .route("/api/serial/stop", post(stop_handler))
            .route("/api/serial/delete/:id", post(delete_handler))
            .route("/api/serial/delete-all", post(delete_all_handler))
            .route("/ws", get(ws_handler))
            .with_state(self.state.clone())
    }
}

async fn root_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "success",
        "data": {"service": "Fingerprint Bridge API Server", "status": "ok"}
    }))
}

async fn info_handler(State(state): State<MockServerState>) -> MockResult<InfoResponse> {
    let connection = state.status.lock().await.clone();
    let link_state = if connection.connected {
        LinkState::Connected
    } else {
        LinkState::Disconnected
    };

    Ok(Json(ApiResponse::success(InfoResponse {
        version: "0.1.0-test".to_string(),
        uptime: 3600,
        connection,
        link_state,
        subscribers: state.push.receiver_count(),
    })))
}

async fn ports_handler(State(state): State<MockServerState>) -> MockResult<PortsResponse> {
    Ok(Json(ApiResponse::success(PortsResponse {
        ports: state.ports.clone(),
    })))
}

async fn port_details_handler(
    State(state): State<MockServerState>,
) -> MockResult<PortDetailsResponse> {
    let ports = state
        .ports
        .iter()
        .map(|port| {
            let usb = port.contains("ACM");
            PortDetails {
                port: port.clone(),
                kind: if usb { PortKind::Usb } else { PortKind::Unknown },
                vid: usb.then_some(0x2341),
                pid: usb.then_some(0x0043),
                manufacturer: usb.then(|| "Arduino".to_string()),
                product: None,
                serial_number: None,
            }
        })
        .collect();

    Ok(Json(ApiResponse::success(PortDetailsResponse { ports })))
}

async fn status_handler(State(state): State<MockServerState>) -> MockResult<ConnectionStatus> {
    Ok(Json(ApiResponse::success(state.status.lock().await.clone())))
}

async fn connect_handler(
    State(state): State<MockServerState>,
    Json(request): Json<ConnectRequest>,
) -> MockResult<ConnectResponse> {
    let Some(port) = request.port.filter(|p| !p.is_empty()) else {
        return Err(MockError::bad_request("Port is required"));
    };

    let mut status = state.status.lock().await;
    if status.connected {
        return Err(MockError::conflict("Already connected to a port"));
    }

    *status = ConnectionStatus {
        connected: true,
        port: Some(port.clone()),
        baud_rate: request.baud_rate.unwrap_or(DEFAULT_BAUD_RATE),
    };
    let _ = state.push.send(PushMessage::SerialConnected {
        port,
        baud_rate: status.baud_rate,
    });

    Ok(Json(ApiResponse::success(ConnectResponse {
        message: "Connected successfully".to_string(),
        status: status.clone(),
    })))
}

async fn disconnect_handler(State(state): State<MockServerState>) -> MockResult<AckResponse> {
    let mut status = state.status.lock().await;
    if status.connected {
        status.connected = false;
        status.port = None;
        let _ = state.push.send(PushMessage::SerialDisconnected);
    }
    ack("Disconnected successfully")
}

async fn command_handler(
    State(state): State<MockServerState>,
    Json(request): Json<CommandRequest>,
) -> MockResult<AckResponse> {
    let Some(command) = request.command.filter(|c| !c.is_empty()) else {
        return Err(MockError::bad_request("Command is required"));
    };
    state.record(&command).await?;
    ack("Command sent successfully")
}

async fn register_handler(State(state): State<MockServerState>) -> MockResult<AckResponse> {
    state.record("R").await?;
    ack("Registration started")
}

async fn verify_handler(State(state): State<MockServerState>) -> MockResult<AckResponse> {
    state.record("V").await?;
    ack("Verification started")
}

async fn stop_handler(State(state): State<MockServerState>) -> MockResult<AckResponse> {
    state.record("S").await?;
    ack("Stop command sent")
}

async fn delete_handler(
    State(state): State<MockServerState>,
    Path(id): Path<String>,
) -> MockResult<AckResponse> {
    let id: FingerprintId = id
        .parse()
        .map_err(|_| MockError::bad_request("Invalid ID"))?;
    state.record(&format!("D {}", id)).await?;
    ack(format!("Delete command sent for ID {}", id))
}

async fn delete_all_handler(State(state): State<MockServerState>) -> MockResult<AckResponse> {
    state.record("DA").await?;
    ack("Delete all command sent")
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<MockServerState>) -> Response {
    ws.on_upgrade(move |socket| mock_socket(socket, state))
}

async fn mock_socket(mut socket: WebSocket, state: MockServerState) {
    let mut feed = state.push.subscribe();
    let snapshot: PushMessage = state.status.lock().await.clone().into();

    let Ok(text) = snapshot.to_json() else {
        return;
    };
    if socket.send(Message::Text(text)).await.is_err() {
        return;
    }

    while let Ok(message) = feed.recv().await {
        let Ok(text) = message.to_json() else {
            continue;
        };
        if socket.send(Message::Text(text)).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_startup() {
        let (server, url) = MockServer::new().start().await.unwrap();

        assert!(server.port() > 0);
        assert!(url.starts_with("http://127.0.0.1:"));

        let response = reqwest::get(&url).await.unwrap();
        assert!(response.status().is_success());
    }

    #[tokio::test]
    async fn test_mock_commands_require_connection() {
        let (server, url) = MockServer::new().start().await.unwrap();
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/api/serial/verify", url))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);

        let response = client
            .post(format!("{}/api/serial/connect", url))
            .json(&json!({"port": "COM3"}))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());

        let response = client
            .post(format!("{}/api/serial/verify", url))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        assert_eq!(server.sent_commands().await, vec!["V"]);
        assert_eq!(server.state().status.lock().await.baud_rate, 9600);
    }

    #[tokio::test]
    async fn test_mock_rejects_bad_id() {
        let (_server, url) = MockServer::new().start().await.unwrap();

        let response = reqwest::Client::new()
            .post(format!("{}/api/serial/delete/abc", url))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        let body: ApiResponse<AckResponse> = response.json().await.unwrap();
        assert!(matches!(body, ApiResponse::Error { error } if error == "Invalid ID"));
    }
}
