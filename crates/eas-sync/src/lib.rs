//! # eas-sync: Protocol Orchestration Layer for the EAS Gateway
//!
//! This crate owns everything between a decoded WBXML request and the
//! WBXML response written back to the client: command dispatch, the
//! Sync per-collection state machine, the Provision/Ping/FolderSync/
//! ItemOperations/Settings/Search handlers, the per-key actor registry,
//! and the idempotency cache.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Sync Orchestration                              │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                   Dispatcher (request entrypoint)                 │  │
//! │  │                                                                    │  │
//! │  │  Negotiates MS-ASProtocolVersion, gates on Provision status,      │  │
//! │  │  routes by Cmd to the handler below                               │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │    ┌──────────┬───────────────┼───────────────┬──────────┬─────────┐   │
//! │    ▼          ▼               ▼               ▼          ▼         ▼   │
//! │ ┌──────┐ ┌──────────┐  ┌─────────────┐  ┌──────────┐ ┌────────┐ ┌─────┐│
//! │ │Folder│ │  Sync    │  │  Provision  │  │   Ping   │ │ItemOps │ │misc ││
//! │ │Sync  │ │StateMach.│  │  (2-phase)  │  │(long-poll│ │ Fetch  │ │     ││
//! │ └──────┘ └──────────┘  └─────────────┘  └──────────┘ └────────┘ └─────┘│
//! │                                                                         │
//! │  Every CollectionState/DeviceRecord mutation is serialized per key     │
//! │  through the KeyedLockRegistry before it reaches eas-db.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`dispatcher`] - Command routing, protocol negotiation, provisioning gate
//! - [`state_machine`] - The Sync command's per-collection state machine
//! - [`provision`] - The Provision two-step PolicyKey handshake
//! - [`ping`] - The Ping long-poll heartbeat engine
//! - [`foldersync`] - The fixed FolderSync hierarchy handler
//! - [`item_operations`] - Standalone ItemOperations Fetch
//! - [`settings`] - The static Settings acknowledgement document
//! - [`search`] - Best-effort GAL lookup
//! - [`idempotency`] - The bounded SyncBatch resend cache
//! - [`registry`] - Per-key serialization for CollectionState/DeviceRecord
//! - [`collaborators`] - External interfaces (MailStore, AuthService, Clock, ...)
//! - [`requests`] - Typed request extraction from decoded WBXML trees
//! - [`wire`] - Shared WBXML response fragments (body/application data)
//! - [`error`] - Orchestration error types

pub mod collaborators;
pub mod dispatcher;
pub mod error;
pub mod foldersync;
pub mod idempotency;
pub mod item_operations;
pub mod ping;
pub mod provision;
pub mod registry;
pub mod requests;
pub mod search;
pub mod settings;
pub mod state_machine;
pub mod wire;

pub use collaborators::{
    AuthService, AuthenticatedUser, ChangeNotifier, ChangeSignal, Clock, DirectoryEntry,
    DirectoryLookup, MailStore, SystemClock,
};
pub use dispatcher::{negotiate_protocol_version, DispatchedResponse, Dispatcher, DispatcherConfig};
pub use error::{SyncError, SyncResult};
pub use idempotency::IdempotencyCache;
pub use registry::KeyedLockRegistry;
