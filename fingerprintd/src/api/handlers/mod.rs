//! API request handlers for the fingerprint bridge daemon.
//!
//! # Handler Modules
//!
//! - [`info`] - System information and root endpoint
//! - [`serial`] - Port discovery, connection lifecycle, device commands
//! - [`ws`] - WebSocket push channel
//!
//! # API Structure
//!
//! All REST handlers follow a consistent pattern:
//! - Accept `State<AppState>` for accessing shared application state
//! - Return `Result<Json<ApiResponse<T>>, ApiError>` for uniform responses
//! - Use `api_ok!()` and `api_fail!()` macros for response construction
//! - Log operations using the `tracing` crate

pub mod info;
pub mod serial;
pub mod ws;
