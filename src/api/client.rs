//! API client for the OpenCARWINGS service.
//!
//! Handles the JWT token lifecycle (credential exchange, transparent
//! refresh-on-401) and raw authenticated requests against one base URL for
//! one account. The client does not know whether a stored access token is
//! still valid; it optimistically sends whatever it has and reacts to the
//! server's rejection.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::auth::{TokenSet, TokenStore};
use crate::cars::{Car, CarApi};

use super::transport::{HttpResponse, HttpTransport, ReqwestTransport};
use super::ApiError;

/// Base URL of the public OpenCARWINGS instance.
pub const DEFAULT_API_BASE: &str = "https://opencarwings.viaaq.eu";

const TOKEN_OBTAIN_PATH: &str = "/api/token/obtain/";
const TOKEN_REFRESH_PATH: &str = "/api/token/refresh/";
const CAR_LIST_PATH: &str = "/api/car/";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    refresh: Option<String>,
}

/// Remote commands accepted by the `/api/command/{vin}/` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarCommand {
    /// Ask the car to report fresh telemetry.
    RefreshData,
    /// Start charging.
    ChargeStart,
    /// Turn the climate control on.
    AcOn,
    /// Turn the climate control off.
    AcOff,
}

impl CarCommand {
    /// Numeric `command_type` value on the wire.
    pub fn command_type(self) -> u8 {
        match self {
            CarCommand::RefreshData => 1,
            CarCommand::ChargeStart => 2,
            CarCommand::AcOn => 3,
            CarCommand::AcOff => 4,
        }
    }
}

/// Authenticated HTTP access to one upstream base URL for one account.
pub struct ApiClient<T: HttpTransport = ReqwestTransport> {
    transport: T,
    base_url: String,
    tokens: TokenStore,
    /// Serializes refresh-and-retry sequences so concurrent calls that race
    /// into a 401 trigger a single token refresh between them.
    refresh_lock: tokio::sync::Mutex<()>,
    detail_supported: bool,
}

impl ApiClient<ReqwestTransport> {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Ok(Self::with_transport(ReqwestTransport::new()?, base_url))
    }
}

impl<T: HttpTransport> ApiClient<T> {
    pub fn with_transport(transport: T, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            transport,
            base_url,
            tokens: TokenStore::new(),
            refresh_lock: tokio::sync::Mutex::new(()),
            detail_supported: true,
        }
    }

    /// Disable per-VIN detail fetches for server deployments that lack the
    /// detail endpoint; the fetcher then serves list-tier records unmodified.
    pub fn without_detail(mut self) -> Self {
        self.detail_supported = false;
        self
    }

    /// Seed tokens from stored configuration.
    pub fn set_tokens(&self, access: Option<String>, refresh: Option<String>) {
        self.tokens.set_tokens(access, refresh);
    }

    /// Current token pair, e.g. for the host to persist.
    pub fn tokens(&self) -> TokenSet {
        self.tokens.get()
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Exchange username/password for a token pair.
    ///
    /// Succeeds only on a 200/201 response carrying a non-empty access token;
    /// every other outcome, including transport failure, is an
    /// authentication failure.
    pub async fn obtain_token(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenSet, ApiError> {
        debug!(username, "Requesting JWT token pair");
        let body = json!({"username": username, "password": password});
        let response = self
            .transport
            .execute(Method::POST, &self.url(TOKEN_OBTAIN_PATH), None, Some(&body))
            .await
            .map_err(|e| ApiError::AuthenticationFailed(format!("token request failed: {e}")))?;

        if !matches!(response.status.as_u16(), 200 | 201) {
            debug!(status = %response.status, "Token obtain rejected");
            return Err(ApiError::AuthenticationFailed(
                "invalid credentials or server error".to_string(),
            ));
        }

        let data: TokenResponse = response
            .json()
            .map_err(|e| ApiError::AuthenticationFailed(e.to_string()))?;
        let access = data
            .access
            .filter(|a| !a.is_empty())
            .ok_or_else(|| ApiError::AuthenticationFailed("no access token received".to_string()))?;

        self.tokens.set_tokens(Some(access), data.refresh);
        Ok(self.tokens.get())
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Only the access token is replaced; the upstream service never rotates
    /// the refresh token on use.
    pub async fn refresh_access_token(&self) -> Result<String, ApiError> {
        let refresh = self.tokens.refresh().ok_or(ApiError::MissingRefreshToken)?;

        debug!("Refreshing JWT access token");
        let body = json!({"refresh": refresh});
        let response = self
            .transport
            .execute(Method::POST, &self.url(TOKEN_REFRESH_PATH), None, Some(&body))
            .await?;

        if !matches!(response.status.as_u16(), 200 | 201) {
            debug!(status = %response.status, "Token refresh rejected");
            return Err(ApiError::AuthenticationFailed("refresh failed".to_string()));
        }

        let data: TokenResponse = response
            .json()
            .map_err(|e| ApiError::AuthenticationFailed(e.to_string()))?;
        let access = data.access.filter(|a| !a.is_empty()).ok_or_else(|| {
            ApiError::AuthenticationFailed("no access token received on refresh".to_string())
        })?;

        self.tokens.set_access(access.clone());
        Ok(access)
    }

    /// Issue an authenticated request against `base_url + path`.
    ///
    /// On a 401 with a refresh token available, performs exactly one token
    /// refresh and retries the original request exactly once; a second 401
    /// after the retry is returned to the caller as-is. A caller that hits a
    /// 401 while another caller's refresh is already underway waits for that
    /// refresh and retries with its token instead of issuing a second
    /// refresh.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<HttpResponse, ApiError> {
        let url = self.url(path);
        let access = self.tokens.access();
        let response = self
            .transport
            .execute(method.clone(), &url, access.as_deref(), body)
            .await?;

        if response.status != StatusCode::UNAUTHORIZED || self.tokens.refresh().is_none() {
            return Ok(response);
        }

        debug!(%url, "Received 401, attempting token refresh");
        let _guard = self.refresh_lock.lock().await;

        let retry_token = match self.tokens.access() {
            // Another caller already refreshed while we waited for the lock.
            Some(current) if access.as_deref() != Some(current.as_str()) => current,
            _ => self.refresh_access_token().await?,
        };

        self.transport
            .execute(method, &url, Some(&retry_token), body)
            .await
    }

    /// Send a remote command to one car.
    pub async fn send_command(&self, vin: &str, command: CarCommand) -> Result<(), ApiError> {
        let body = json!({"vin": vin, "command_type": command.command_type()});
        let path = format!("/api/command/{vin}/");
        let response = self.request(Method::POST, &path, Some(&body)).await?;

        if response.status.is_client_error() || response.status.is_server_error() {
            warn!(vin, status = %response.status, "Command rejected");
            return Err(ApiError::from_status(response.status, &response.body));
        }
        debug!(vin, ?command, "Command accepted");
        Ok(())
    }
}

#[async_trait]
impl<T: HttpTransport> CarApi for ApiClient<T> {
    async fn list_cars(&self) -> Result<Vec<Car>, ApiError> {
        let response = self.request(Method::GET, CAR_LIST_PATH, None).await?;
        if response.status != StatusCode::OK {
            return Err(ApiError::from_status(response.status, &response.body));
        }
        response.json()
    }

    fn supports_detail(&self) -> bool {
        self.detail_supported
    }

    async fn car_detail(&self, vin: &str) -> Result<Car, ApiError> {
        let response = self
            .request(Method::GET, &format!("/api/car/{vin}/"), None)
            .await?;
        if response.status != StatusCode::OK {
            return Err(ApiError::from_status(response.status, &response.body));
        }
        response.json()
    }
}
