//! Gateway configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults, structurally identical to how the teacher's cloud-api loads
//! its config.

use std::env;

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// HTTP bind address, e.g. `0.0.0.0:8443`.
    pub bind_addr: String,

    /// SQLite connection string for the sync-state database.
    pub database_url: String,

    /// `MS-ASProtocolVersion` values this gateway negotiates.
    pub supported_protocol_versions: Vec<String>,

    /// Default negotiated version for a modern client (absent header).
    pub default_protocol_version_modern: String,

    /// Default negotiated version for a legacy client (`Cmd=Options` only).
    pub default_protocol_version_legacy: String,

    /// Minimum Ping heartbeat the dispatcher will honor.
    pub ping_heartbeat_min_secs: u32,

    /// Maximum Ping heartbeat the dispatcher will honor.
    pub ping_heartbeat_max_secs: u32,

    /// Heartbeat used when a Ping request omits `HeartbeatInterval`.
    pub ping_heartbeat_default_secs: u32,

    /// The policy key assigned once Provision Phase 2 completes.
    pub provision_policy_key: String,

    /// Max resend entries held by the idempotency cache.
    pub idempotency_cache_capacity: usize,

    /// Upper bound on a Sync collection's `WindowSize`.
    pub max_window_size: usize,
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = GatewayConfig {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8443".to_string()),

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://eas.db".to_string()),

            supported_protocol_versions: env::var("SUPPORTED_PROTOCOL_VERSIONS")
                .unwrap_or_else(|_| "12.1,14.0,14.1,16.0,16.1".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),

            default_protocol_version_modern: env::var("DEFAULT_PROTOCOL_VERSION_MODERN")
                .unwrap_or_else(|_| "16.1".to_string()),

            default_protocol_version_legacy: env::var("DEFAULT_PROTOCOL_VERSION_LEGACY")
                .unwrap_or_else(|_| "14.1".to_string()),

            ping_heartbeat_min_secs: env::var("PING_HEARTBEAT_MIN_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PING_HEARTBEAT_MIN_SECS".to_string()))?,

            ping_heartbeat_max_secs: env::var("PING_HEARTBEAT_MAX_SECS")
                .unwrap_or_else(|_| "1800".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PING_HEARTBEAT_MAX_SECS".to_string()))?,

            ping_heartbeat_default_secs: env::var("PING_HEARTBEAT_DEFAULT_SECS")
                .unwrap_or_else(|_| "540".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PING_HEARTBEAT_DEFAULT_SECS".to_string()))?,

            provision_policy_key: env::var("PROVISION_POLICY_KEY")
                .unwrap_or_else(|_| "1234567890".to_string()),

            idempotency_cache_capacity: env::var("IDEMPOTENCY_CACHE_CAPACITY")
                .unwrap_or_else(|_| "1024".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("IDEMPOTENCY_CACHE_CAPACITY".to_string()))?,

            max_window_size: env::var("MAX_WINDOW_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("MAX_WINDOW_SIZE".to_string()))?,
        };

        if config.supported_protocol_versions.is_empty() {
            return Err(ConfigError::MissingRequired(
                "SUPPORTED_PROTOCOL_VERSIONS".to_string(),
            ));
        }

        Ok(config)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_parse_cleanly() {
        // SAFETY: test runs single-threaded within this process; no other
        // test reads these particular env vars concurrently.
        for var in [
            "BIND_ADDR",
            "DATABASE_URL",
            "SUPPORTED_PROTOCOL_VERSIONS",
            "PING_HEARTBEAT_MIN_SECS",
        ] {
            unsafe { env::remove_var(var) };
        }
        let config = GatewayConfig::load().unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8443");
        assert_eq!(config.default_protocol_version_modern, "16.1");
        assert_eq!(config.supported_protocol_versions.len(), 5);
    }
}
