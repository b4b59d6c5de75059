use thiserror::Error;

/// Errors raised by the OpenCARWINGS API client.
///
/// Two classes matter to callers: authentication failures (credentials or
/// refresh token rejected) trigger the host platform's re-authentication
/// flow, everything else is a transient request failure that leaves
/// previously fetched data valid. Use [`ApiError::is_authentication`] to
/// tell them apart.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("No refresh token available")]
    MissingRefreshToken,

    #[error("Unauthorized - token rejected by server")]
    Unauthorized,

    #[error("Request failed with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Whether this failure should start the host's re-authentication flow.
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            ApiError::AuthenticationFailed(_)
                | ApiError::MissingRefreshToken
                | ApiError::Unauthorized
        )
    }

    /// Truncate a response body to avoid carrying excessive data in errors
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            _ => ApiError::Status {
                status,
                body: Self::truncate_body(body),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_classification() {
        assert!(ApiError::AuthenticationFailed("bad password".into()).is_authentication());
        assert!(ApiError::MissingRefreshToken.is_authentication());
        assert!(ApiError::Unauthorized.is_authentication());

        assert!(!ApiError::InvalidResponse("not json".into()).is_authentication());
        assert!(!ApiError::Status {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body: "oops".into(),
        }
        .is_authentication());
    }

    #[test]
    fn test_from_status_maps_unauthorized() {
        let err = ApiError::from_status(reqwest::StatusCode::UNAUTHORIZED, "expired");
        assert!(matches!(err, ApiError::Unauthorized));

        let err = ApiError::from_status(reqwest::StatusCode::NOT_FOUND, "missing");
        assert!(matches!(err, ApiError::Status { .. }));
        assert!(!err.is_authentication());
    }

    #[test]
    fn test_from_status_truncates_long_bodies() {
        let body = "x".repeat(2000);
        let err = ApiError::from_status(reqwest::StatusCode::BAD_GATEWAY, &body);
        let message = err.to_string();
        assert!(message.contains("truncated, 2000 total bytes"));
        assert!(message.len() < body.len());
    }
}
