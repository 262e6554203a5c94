//! # eas-core: Pure Protocol Logic for the EAS Gateway
//!
//! This crate is the **heart** of the EAS gateway. It contains the WBXML
//! wire codec and the MIME/body pipeline as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        EAS Gateway Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/gateway (axum HTTP)                     │   │
//! │  │    POST /Microsoft-Server-ActiveSync  ──►  dispatcher           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    eas-sync (state machine)                     │   │
//! │  │   Sync / Provision / Ping / FolderSync / ItemOperations         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ eas-core (THIS CRATE) ★                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐                 │   │
//! │  │   │   types   │  │   wbxml   │  │   body    │                 │   │
//! │  │   │  SyncKey  │  │  encoder  │  │ selection │                 │   │
//! │  │   │ MailItem  │  │  decoder  │  │truncation │                 │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘                 │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    eas-db (Database Layer)                      │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (SyncKey, CollectionState, MailItem, etc.)
//! - [`wbxml`] - WBXML binary codec (encoder, decoder, token tables)
//! - [`body`] - Body preference selection, truncation, MIME pipeline
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Byte-Exact Codec**: Encoder output is a correctness requirement, not an
//!    approximation - every codec test asserts exact bytes
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod body;
pub mod error;
pub mod types;
pub mod wbxml;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use eas_core::SyncKey` instead of
// `use eas_core::types::SyncKey`

pub use error::{BodyError, CodecError};
pub use types::*;
