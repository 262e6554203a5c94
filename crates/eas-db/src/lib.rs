//! # eas-db: Persistence Layer for the EAS Gateway
//!
//! This crate provides database access for the EAS gateway's per-device and
//! per-collection sync state. It uses SQLite for storage with sqlx for async
//! operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        EAS Gateway Data Flow                            │
//! │                                                                         │
//! │  eas-sync state machine (Sync, Provision, FolderSync handlers)         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     eas-db (THIS CRATE)                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (device.rs,   │    │  (embedded)  │  │   │
//! │  │   │               │    │  collection.rs│    │              │  │   │
//! │  │   │ SqlitePool    │◄───│  folder.rs)   │    │ 0001_init.sql│  │   │
//! │  │   │ Connection    │    │               │    │              │  │   │
//! │  │   │ Management    │    │               │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │                        eas.db                                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (device, collection, folder)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use eas_db::{Database, DbConfig};
//!
//! let config = DbConfig::new("path/to/eas.db");
//! let db = Database::new(config).await?;
//!
//! let state = db.collections().load_state("alice", "DEVICE1", "1").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::DbError;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::collection::CollectionRepository;
pub use repository::device::DeviceRepository;
pub use repository::folder::FolderHierarchyRepository;
