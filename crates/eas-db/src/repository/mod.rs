//! # Repository Module
//!
//! Database repository implementations for the EAS gateway.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  eas-sync dispatcher                                                   │
//! │       │                                                                 │
//! │       │  db.collections().load_state(user, device, collection_id)       │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  CollectionRepository                                                  │
//! │  ├── load_state(&self, user, device, collection_id)                    │
//! │  ├── reset(&self, user, device, collection_id)                         │
//! │  ├── stage_pending(&self, ..., new_key, ids)                           │
//! │  └── commit_pending(&self, ...)                                        │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • Easy to test (mock the repository)                                  │
//! │  • SQL is isolated in one place                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`DeviceRepository`] - Device provisioning state
//! - [`CollectionRepository`] - Per-collection sync cursor and pending batches
//! - [`FolderHierarchyRepository`] - Per-device folder hierarchy sync cursor

pub mod collection;
pub mod device;
pub mod folder;
