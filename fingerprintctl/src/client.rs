//! HTTP and push-channel client for the fingerprint bridge daemon.

use anyhow::{anyhow, Context, Result};
use fingerprint_core::api::{
    AckResponse, ApiResponse, CommandRequest, ConnectRequest, ConnectResponse, InfoResponse,
    PortDetailsResponse, PortsResponse, PushMessage,
};
use fingerprint_core::{ConnectionStatus, FingerprintId};
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Normalize a server URL by removing trailing slashes.
fn normalize_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Derive the push-channel URL from the HTTP base URL.
fn push_url(base_url: &str) -> Result<String> {
    if let Some(rest) = base_url.strip_prefix("http://") {
        Ok(format!("ws://{}/ws", rest))
    } else if let Some(rest) = base_url.strip_prefix("https://") {
        Ok(format!("wss://{}/ws", rest))
    } else {
        Err(anyhow!(
            "Server URL must start with http:// or https://, got '{}'",
            base_url
        ))
    }
}

/// Client for the bridge daemon's REST API and WebSocket push channel.
///
/// # Retry Logic
///
/// Read-only requests (`GET`) are retried when they fail before reaching the
/// server (connection refused, timeout). Retries back off linearly:
/// `retry_delay * (attempt + 1)`. Requests that change device state are sent
/// once, so a slow server never receives a command twice.
///
/// # Examples
///
/// ```no_run
/// use fingerprintctl::client::BridgeClient;
/// use std::time::Duration;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = BridgeClient::with_config(
///     "http://localhost:5000".to_string(),
///     10,  // timeout in seconds
///     3,   // max retries
///     Duration::from_millis(500),  // initial retry delay
/// )?;
///
/// let status = client.get_status().await?;
/// println!("Connected: {}", status.connected);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BridgeClient {
    client: Client,
    base_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl BridgeClient {
    /// Create a new bridge client.
    ///
    /// # Arguments
    ///
    /// * `server_url` - Base URL of the bridge (e.g., "http://localhost:5000")
    /// * `timeout_secs` - Request timeout in seconds
    /// * `max_retries` - Maximum number of retry attempts for failed reads
    /// * `retry_delay` - Initial delay between retries
    pub fn with_config(
        server_url: String,
        timeout_secs: u64,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("fingerprintctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: normalize_url(&server_url),
            max_retries,
            retry_delay,
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Process an HTTP response and extract the envelope's data.
    ///
    /// Error responses from the bridge carry `{"status":"error","error":...}`;
    /// that reason is surfaced as-is. Anything else falls back to a message
    /// built from the status code.
    async fn handle_response<T: DeserializeOwned>(response: Response, endpoint: &str) -> Result<T> {
        let status = response.status();
        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {}", endpoint))?;

        if !status.is_success() {
            if let Ok(ApiResponse::<serde_json::Value>::Error { error }) =
                serde_json::from_str(&text)
            {
                return Err(anyhow!("{} (HTTP {})", error, status.as_u16()));
            }

            let error_msg = match status {
                StatusCode::NOT_FOUND => format!("Endpoint {} not found", endpoint),
                StatusCode::BAD_REQUEST => format!("Bad request to {}: {}", endpoint, text),
                StatusCode::CONFLICT => format!("Conflict at {}: {}", endpoint, text),
                StatusCode::INTERNAL_SERVER_ERROR => {
                    format!("Server error at {}: {}", endpoint, text)
                }
                StatusCode::SERVICE_UNAVAILABLE => format!("Service unavailable at {}", endpoint),
                _ => format!("HTTP {} error at {}: {}", status, endpoint, text),
            };
            return Err(anyhow!(error_msg));
        }

        let api_response: ApiResponse<T> = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse JSON response from {}", endpoint))?;

        match api_response {
            ApiResponse::Success { data } => Ok(data),
            ApiResponse::Error { error } => Err(anyhow!("Server error at {}: {}", endpoint, error)),
        }
    }

    /// Execute an HTTP request with automatic retry logic.
    ///
    /// Only retry on connection-related errors. HTTP error statuses are
    /// returned immediately.
    async fn execute_with_retry<F, Fut, T>(&self, endpoint: &str, request_fn: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<Response, reqwest::Error>>,
        T: DeserializeOwned,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match request_fn().await {
                Ok(response) => {
                    return Self::handle_response(response, endpoint).await;
                }
                Err(e) => {
                    let should_retry = e.is_connect() || e.is_timeout() || e.is_request();
                    last_error = Some(e);

                    if attempt < self.max_retries && should_retry {
                        tokio::time::sleep(self.retry_delay * (attempt + 1)).await;
                        continue;
                    } else {
                        break;
                    }
                }
            }
        }

        match last_error {
            Some(e) => Err(anyhow!(
                "Failed to reach {} after {} attempts: {}",
                endpoint,
                self.max_retries + 1,
                e
            )),
            None => Err(anyhow!("Failed to reach {}", endpoint)),
        }
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let url = format!("{}/api/{}", self.base_url, endpoint);
        self.execute_with_retry(endpoint, || self.client.get(&url).send())
            .await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let url = format!("{}/api/{}", self.base_url, endpoint);
        let mut request = self.client.post(&url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", endpoint))?;

        Self::handle_response(response, endpoint).await
    }

    /// Retrieve daemon version, uptime and link summary.
    pub async fn get_info(&self) -> Result<InfoResponse> {
        self.get("info").await
    }

    /// List serial device paths visible to the daemon host.
    pub async fn list_ports(&self) -> Result<PortsResponse> {
        self.get("serial/ports").await
    }

    /// List serial ports with USB metadata.
    pub async fn list_port_details(&self) -> Result<PortDetailsResponse> {
        self.get("serial/ports/details").await
    }

    /// Current connection snapshot.
    pub async fn get_status(&self) -> Result<ConnectionStatus> {
        self.get("serial/status").await
    }

    /// Open `port` on the daemon.
    ///
    /// When `baud_rate` is `None` the daemon uses its configured default.
    ///
    /// # Errors
    ///
    /// Returns an error if the port is empty, the daemon already holds a link,
    /// or the device cannot be opened.
    pub async fn connect(&self, port: &str, baud_rate: Option<u32>) -> Result<ConnectResponse> {
        if port.trim().is_empty() {
            return Err(anyhow!("Port cannot be empty"));
        }

        let request = ConnectRequest {
            port: Some(port.to_string()),
            baud_rate,
        };
        self.post("serial/connect", Some(serde_json::to_value(request)?))
            .await
    }

    /// Close the daemon's device link. Succeeds when nothing is open.
    pub async fn disconnect(&self) -> Result<AckResponse> {
        self.post("serial/disconnect", None).await
    }

    /// Write one raw line to the device.
    pub async fn send_command(&self, command: &str) -> Result<AckResponse> {
        if command.is_empty() {
            return Err(anyhow!("Command cannot be empty"));
        }

        let request = CommandRequest {
            command: Some(command.to_string()),
        };
        self.post("serial/command", Some(serde_json::to_value(request)?))
            .await
    }

    /// Start enrollment on the device.
    pub async fn register(&self) -> Result<AckResponse> {
        self.post("serial/register", None).await
    }

    /// Start a verification scan.
    pub async fn verify(&self) -> Result<AckResponse> {
        self.post("serial/verify", None).await
    }

    /// Abort the device's current operation.
    pub async fn stop(&self) -> Result<AckResponse> {
        self.post("serial/stop", None).await
    }

    /// Delete one stored template.
    pub async fn delete_fingerprint(&self, id: FingerprintId) -> Result<AckResponse> {
        self.post(&format!("serial/delete/{}", id), None).await
    }

    /// Delete every stored template.
    pub async fn delete_all(&self) -> Result<AckResponse> {
        self.post("serial/delete-all", None).await
    }

    /// Open the push channel.
    ///
    /// The first message received is always the daemon's status snapshot.
    pub async fn subscribe(&self) -> Result<PushStream> {
        let url = push_url(&self.base_url)?;
        let (socket, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .with_context(|| format!("Failed to open push channel at {}", url))?;

        Ok(PushStream { socket })
    }

    /// Check if the daemon answers on its root endpoint.
    ///
    /// Uses a short timeout (3 seconds). Any failure yields `false`.
    pub async fn ping(&self) -> Result<bool> {
        let url = format!("{}/", self.base_url);

        let client = Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
            .context("Failed to create ping client")?;

        match client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_e) => Ok(false),
        }
    }

    /// Check connectivity, API health and device link in one pass.
    ///
    /// # Returns
    ///
    /// Returns a map containing:
    /// - `connected` - Whether the daemon is reachable
    /// - `ping_ms` - Response time in milliseconds
    /// - `api_working` - Whether `/api/info` answers (if connected)
    /// - `server_version` - Daemon version (if API is working)
    /// - `device_connected` - Whether a serial link is open (if API is working)
    /// - `device_port` - Open device path, when there is one
    /// - `api_error` - Error message if the API check fails
    pub async fn health_check(&self) -> Result<HashMap<String, serde_json::Value>> {
        use serde_json::Value;

        let mut health = HashMap::new();

        let ping_start = std::time::Instant::now();
        let ping_success = self.ping().await?;
        let ping_duration = ping_start.elapsed();

        health.insert("connected".to_string(), Value::Bool(ping_success));
        health.insert(
            "ping_ms".to_string(),
            Value::Number(serde_json::Number::from(ping_duration.as_millis() as u64)),
        );

        if ping_success {
            match self.get_info().await {
                Ok(info) => {
                    health.insert("api_working".to_string(), Value::Bool(true));
                    health.insert("server_version".to_string(), Value::String(info.version));
                    health.insert(
                        "device_connected".to_string(),
                        Value::Bool(info.connection.connected),
                    );
                    if let Some(port) = info.connection.port {
                        health.insert("device_port".to_string(), Value::String(port));
                    }
                }
                Err(e) => {
                    health.insert("api_working".to_string(), Value::Bool(false));
                    health.insert("api_error".to_string(), Value::String(e.to_string()));
                }
            }
        }

        Ok(health)
    }
}

/// Live subscription to the daemon's push channel
pub struct PushStream {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl PushStream {
    /// Wait for the next push message.
    ///
    /// Returns `None` once the daemon closes the socket. Control frames are
    /// skipped; a text frame that does not parse is an error.
    pub async fn next_message(&mut self) -> Option<Result<PushMessage>> {
        loop {
            let frame = match self.socket.next().await? {
                Ok(frame) => frame,
                Err(e) => return Some(Err(anyhow!("Push channel error: {}", e))),
            };

            match frame {
                Message::Text(text) => {
                    return Some(
                        serde_json::from_str(&text)
                            .with_context(|| format!("Unexpected push message: {}", text)),
                    )
                }
                Message::Close(_) => return None,
                _ => continue,
            }
        }
    }

    /// Close the socket politely.
    pub async fn close(mut self) -> Result<()> {
        self.socket
            .close(None)
            .await
            .context("Failed to close push channel")
    }
}
