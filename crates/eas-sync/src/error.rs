//! # Sync Orchestration Error Types
//!
//! Error types for the dispatcher, state machine, and protocol handlers.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                              │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   Protocol      │  │   Provisioning  │  │      Wrapped            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  NotProvisioned │  │  CodecFailed            │ │
//! │  │  UnsupportedVer │  │                 │  │  DatabaseError          │ │
//! │  │  StaleSyncKey   │  │                 │  │                         │ │
//! │  │  ClassMismatch  │  │                 │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for sync orchestration operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Orchestration-layer errors: everything between the dispatcher receiving
/// a decoded request and a WBXML response being ready to write back.
///
/// Per §7, every variant here ultimately surfaces to the device as one of
/// WBXML Status {1, 2, 3, 8} or an HTTP status {401, 449, 500} — see
/// `SyncError::status_code()` in `apps/gateway::error` for that mapping.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Sync engine configuration was invalid at startup.
    #[error("invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// The client's `MS-ASProtocolVersion` header named a version outside
    /// the negotiable set.
    #[error("unsupported protocol version: {0}")]
    UnsupportedProtocolVersion(String),

    /// A non-Provision command arrived for a device that has not completed
    /// the Provision handshake.
    #[error("device is not provisioned")]
    NotProvisioned,

    /// A Sync request's client key was too far from the server's
    /// confirmed key to reconcile (§4.4 step 4).
    #[error("stale sync key for collection {collection_id}")]
    StaleSyncKey { collection_id: String },

    /// The Class supplied in the request did not match the collection's
    /// configured Class (§4.4 Open Question #2).
    #[error("collection {collection_id} class mismatch: expected {expected}, got {actual}")]
    CollectionClassMismatch {
        collection_id: String,
        expected: String,
        actual: String,
    },

    /// The request envelope was missing a required query parameter or
    /// carried a `Cmd` the dispatcher does not recognize.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// An external `MailStore` call failed.
    #[error("mail store error: {0}")]
    MailStoreError(String),

    /// WBXML codec failure, wrapped from `eas_core`.
    #[error(transparent)]
    CodecFailed(#[from] eas_core::CodecError),

    /// Body pipeline failure, wrapped from `eas_core`.
    #[error(transparent)]
    BodyFailed(#[from] eas_core::BodyError),

    /// Persistence failure, wrapped from `eas_db`.
    #[error(transparent)]
    DatabaseError(#[from] eas_db::DbError),

    /// An internal channel (e.g. Ping's subscription wakeup) closed
    /// unexpectedly.
    #[error("channel error: {0}")]
    ChannelError(String),

    /// The process is shutting down and cannot accept new long-poll waits.
    #[error("sync engine is shutting down")]
    ShuttingDown,
}

impl SyncError {
    /// True for errors that a client can recover from simply by resending
    /// the same request (no local state change required on either side).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::MailStoreError(_) | SyncError::DatabaseError(_) | SyncError::ChannelError(_)
        )
    }

    /// True for errors that indicate a protocol-level disagreement rather
    /// than a transient failure.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            SyncError::UnsupportedProtocolVersion(_)
                | SyncError::StaleSyncKey { .. }
                | SyncError::CollectionClassMismatch { .. }
                | SyncError::MalformedRequest(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SyncError::MailStoreError("timeout".into()).is_retryable());
        assert!(!SyncError::NotProvisioned.is_retryable());
        assert!(!SyncError::StaleSyncKey {
            collection_id: "1".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_protocol_error_classification() {
        assert!(SyncError::StaleSyncKey {
            collection_id: "1".into()
        }
        .is_protocol_error());
        assert!(!SyncError::NotProvisioned.is_protocol_error());
    }

    #[test]
    fn test_error_display() {
        let err = SyncError::CollectionClassMismatch {
            collection_id: "2".into(),
            expected: "Email".into(),
            actual: "Calendar".into(),
        };
        assert!(err.to_string().contains("Email"));
        assert!(err.to_string().contains("Calendar"));
    }
}
