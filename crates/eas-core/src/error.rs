//! # Error Types
//!
//! Domain-specific error types for eas-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  eas-core errors (this file)                                           │
//! │  ├── CodecError  - WBXML encode/decode failures                        │
//! │  └── BodyError   - body selection/truncation/MIME failures             │
//! │                                                                         │
//! │  eas-db errors (separate crate)                                        │
//! │  └── DbError     - database operation failures                        │
//! │                                                                         │
//! │  eas-sync errors (separate crate)                                      │
//! │  └── SyncError   - wraps CodecError/BodyError/DbError, maps to         │
//! │                    WBXML Status values                                 │
//! │                                                                         │
//! │  Flow: CodecError/BodyError → SyncError → GatewayError → HTTP response │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (tag name, offset, etc.)
//! 3. Errors are enum variants, never String
//! 4. Per §7 of the protocol, every CodecError/BodyError surfaces as
//!    WBXML Status=3 one layer up; these types exist to give the log line
//!    and the test suite something more specific than "server error"

use thiserror::Error;

// =============================================================================
// Codec Error
// =============================================================================

/// WBXML encode/decode errors.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The input ended before a structurally required token.
    #[error("unexpected end of WBXML input at offset {offset}")]
    UnexpectedEof { offset: usize },

    /// A required tag was absent from the decoded request.
    #[error("missing required tag: {tag}")]
    MissingTag { tag: &'static str },

    /// An inline string (STR_I) was not valid UTF-8.
    #[error("invalid UTF-8 in inline string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    /// A multi-byte uint32 (mb_u32) length prefix overflowed u32.
    #[error("opaque length overflow at offset {offset}")]
    LengthOverflow { offset: usize },

    /// The document did not start with the expected WBXML header bytes.
    #[error("invalid WBXML header: expected 03 01 6A 00, got {found:02x?}")]
    InvalidHeader { found: Vec<u8> },

    /// A codepage switch referenced a codepage this codec does not implement.
    #[error("unsupported codepage: {0}")]
    UnsupportedCodepage(u8),
}

// =============================================================================
// Body Error
// =============================================================================

/// Body-preference selection, truncation, and MIME transcoding errors.
#[derive(Debug, Error)]
pub enum BodyError {
    /// Neither body_plain, body_html, nor mime_content was present on a
    /// MailItem, so no BodyPreference Type could be satisfied.
    #[error("mail item {item_id} has no body content of any kind")]
    NoBodyContent { item_id: i64 },

    /// mail-parser failed to parse a stored mime_content blob.
    #[error("failed to parse MIME content: {0}")]
    MimeParseFailed(String),

    /// lettre failed to build a synthesized multipart/alternative message.
    #[error("failed to synthesize MIME message: {0}")]
    MimeSynthesisFailed(String),

    /// A declared charset was not recognized by the decoder.
    #[error("unrecognized charset: {0}")]
    UnknownCharset(String),
}

/// Convenience type alias for Results with CodecError.
pub type CodecResult<T> = Result<T, CodecError>;

/// Convenience type alias for Results with BodyError.
pub type BodyResult<T> = Result<T, BodyError>;
