//! # EAS Gateway
//!
//! The HTTP process exposing `/Microsoft-Server-ActiveSync` to ActiveSync
//! devices: axum routing, Basic-auth extraction, environment-driven
//! configuration, and the in-memory collaborator implementations the
//! dispatcher runs against.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         EAS Gateway Process                             │
//! │                                                                         │
//! │  Device ───► axum (POST/OPTIONS) ───► Dispatcher ───► SQLite            │
//! │                     │                      │                            │
//! │                     ▼                      ▼                            │
//! │               Basic auth          InMemoryMailStore /                   │
//! │              (StaticAuthService)  InMemoryChangeNotifier                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod server;

use std::sync::Arc;

use eas_db::pool::Database;
use eas_sync::Dispatcher;

use crate::collaborators::{EmptyDirectory, InMemoryChangeNotifier, InMemoryMailStore, StaticAuthService};

pub use config::GatewayConfig;
pub use error::GatewayError;

/// Shared application state, built once at startup and handed to every
/// request via axum's `State` extractor.
pub struct AppState {
    pub dispatcher: Dispatcher<InMemoryMailStore, InMemoryChangeNotifier, EmptyDirectory>,
    pub auth: StaticAuthService,
    pub config: GatewayConfig,
}

impl AppState {
    pub fn new(db: Database, config: GatewayConfig) -> Self {
        let dispatcher_config = eas_sync::DispatcherConfig {
            max_window_size: config.max_window_size,
            heartbeat_min_secs: config.ping_heartbeat_min_secs,
            heartbeat_max_secs: config.ping_heartbeat_max_secs,
            heartbeat_default_secs: config.ping_heartbeat_default_secs,
        };

        let dispatcher = Dispatcher {
            db,
            registry: eas_sync::KeyedLockRegistry::new(),
            cache: eas_sync::IdempotencyCache::new(config.idempotency_cache_capacity),
            mail_store: Arc::new(InMemoryMailStore::new()),
            notifier: Arc::new(InMemoryChangeNotifier::new()),
            directory: None::<Arc<EmptyDirectory>>,
            config: dispatcher_config,
        };

        AppState {
            dispatcher,
            auth: StaticAuthService,
            config,
        }
    }
}
