//! Error types for the gateway HTTP layer, and the `SyncError` → HTTP status
//! mapping §7 describes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use eas_sync::SyncError;

/// Gateway-level errors: everything between the HTTP request landing and
/// the dispatcher being invoked (credential extraction, command/device
/// query-string parsing).
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("missing or malformed Authorization header")]
    MissingCredentials,

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("missing required query parameter: {0}")]
    MissingQueryParam(String),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl GatewayError {
    /// Maps this error to an HTTP status code (§7). Most protocol-level
    /// outcomes never reach this mapping at all: the dispatcher embeds
    /// `Status=2/3/8` directly in a successfully-built WBXML response. What
    /// lands here is the handful of failures that occur *before* any WBXML
    /// envelope can be constructed (negotiation failure, unparsable body),
    /// plus the two outcomes §7 names explicitly: 401 for credentials, 449
    /// for the provisioning gate.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::MissingCredentials | GatewayError::AuthFailed(_) => {
                StatusCode::UNAUTHORIZED
            }
            GatewayError::MissingQueryParam(_) => StatusCode::BAD_REQUEST,
            GatewayError::Sync(SyncError::NotProvisioned) => {
                StatusCode::from_u16(449).expect("449 is a valid HTTP status")
            }
            GatewayError::Sync(e) if e.is_protocol_error() => StatusCode::BAD_REQUEST,
            GatewayError::Sync(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::warn!(error = %self, %status, "request failed");
        (status, self.to_string()).into_response()
    }
}
