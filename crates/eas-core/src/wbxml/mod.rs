//! # WBXML Codec
//!
//! Encoder and decoder for the WAP Binary XML wire format MS-ASWBXML layers
//! on top of. The encoder ([`writer::WbxmlWriter`]) is a thin stateful byte
//! builder; the decoder ([`reader::decode`]) produces a generic [`reader::Element`]
//! tree that callers in `eas-sync` walk to pull out the fields a given
//! command needs.
//!
//! [`tokens`] holds the per-codepage tag tables used by both directions.

pub mod reader;
pub mod tokens;
pub mod writer;

pub use reader::{decode, Element, Node};
pub use writer::WbxmlWriter;
