//! REST API client module for the OpenCARWINGS service.
//!
//! This module provides the `ApiClient` for communicating with an
//! OpenCARWINGS server to fetch vehicle telemetry and send remote commands.
//!
//! The API uses JWT bearer token authentication obtained through the
//! `/api/token/obtain/` endpoint, with expired access tokens transparently
//! renewed via `/api/token/refresh/`.

pub mod client;
pub mod error;
pub mod transport;

pub use client::{ApiClient, CarCommand, DEFAULT_API_BASE};
pub use error::ApiError;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
