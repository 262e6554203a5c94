//! Stateful WBXML encoder.
//!
//! Mirrors the structure of a typical streaming XML writer: callers push
//! `start`/`end` pairs and inline strings in document order, and the writer
//! tracks which codepage is currently active so it only emits `SWITCH_PAGE`
//! when the page actually changes.

use super::tokens::control::{END, OPAQUE, STR_I, SWITCH_PAGE};

/// Builds a single WBXML document, byte by byte.
///
/// `cur_page` starts at a sentinel no real codepage uses, so the first
/// [`WbxmlWriter::page`] call always emits a page switch even if the caller's
/// first codepage is 0 (AirSync).
pub struct WbxmlWriter {
    buf: Vec<u8>,
    cur_page: u16,
}

impl WbxmlWriter {
    pub fn new() -> Self {
        WbxmlWriter {
            buf: Vec::with_capacity(256),
            cur_page: 0xFFFF,
        }
    }

    /// Emits the WBXML 1.3 header: version, unknown public id, UTF-8
    /// charset, empty string table.
    pub fn header(&mut self) {
        self.buf.extend_from_slice(&[0x03, 0x01, 0x6A, 0x00]);
    }

    /// Switches the active codepage, emitting `SWITCH_PAGE` only if needed.
    pub fn page(&mut self, cp: u8) {
        if self.cur_page != cp as u16 {
            self.buf.push(SWITCH_PAGE);
            self.buf.push(cp);
            self.cur_page = cp as u16;
        }
    }

    /// Opens a tag. `with_content` is false for an empty element like
    /// `<MoreAvailable/>`; the content bit (0x40) is set otherwise.
    pub fn start(&mut self, tok: u8, with_content: bool) {
        self.buf.push(if with_content { tok | 0x40 } else { tok });
    }

    /// Closes the most recently opened element.
    pub fn end(&mut self) {
        self.buf.push(END);
    }

    /// Writes an inline, NUL-terminated UTF-8 string (`STR_I`).
    pub fn write_str(&mut self, s: &str) {
        self.buf.push(STR_I);
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0x00);
    }

    /// Writes an opaque byte blob (`OPAQUE`) with an `mb_u32` length prefix,
    /// used for base64-less binary attachment/body data.
    pub fn write_opaque(&mut self, data: &[u8]) {
        self.buf.push(OPAQUE);
        write_mb_u32(&mut self.buf, data.len() as u32);
        self.buf.extend_from_slice(data);
    }

    /// Convenience for `start(tok, true); write_str(s); end();`.
    pub fn write_text_element(&mut self, tok: u8, s: &str) {
        self.start(tok, true);
        self.write_str(s);
        self.end();
    }

    /// Convenience for an empty element: `start(tok, false)`.
    pub fn write_empty_element(&mut self, tok: u8) {
        self.start(tok, false);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Splices in a previously-encoded byte range verbatim (the idempotent
    /// Sync resend path replays a cached fragment rather than re-encoding
    /// it). The spliced bytes' trailing codepage is unknown to this writer,
    /// so the next `page()` call always re-emits `SWITCH_PAGE` regardless of
    /// what page it thinks it is already on.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        self.cur_page = 0xFFFF;
    }
}

impl Default for WbxmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn write_mb_u32(buf: &mut Vec<u8>, mut value: u32) {
    let mut bytes = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        bytes.push(((value & 0x7F) as u8) | 0x80);
        value >>= 7;
    }
    bytes.reverse();
    buf.extend_from_slice(&bytes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wbxml::tokens::{airsync, codepage};

    #[test]
    fn test_header_bytes() {
        let mut w = WbxmlWriter::new();
        w.header();
        assert_eq!(w.bytes(), &[0x03, 0x01, 0x6A, 0x00]);
    }

    #[test]
    fn test_page_switch_only_on_change() {
        let mut w = WbxmlWriter::new();
        w.page(codepage::AIRSYNC);
        w.page(codepage::AIRSYNC);
        // only one SWITCH_PAGE pair should have been emitted
        assert_eq!(w.bytes(), &[SWITCH_PAGE, codepage::AIRSYNC]);
    }

    #[test]
    fn test_start_with_and_without_content() {
        let mut w = WbxmlWriter::new();
        w.start(airsync::MORE_AVAILABLE, false);
        w.start(airsync::SYNC, true);
        assert_eq!(
            w.bytes(),
            &[airsync::MORE_AVAILABLE, airsync::SYNC | 0x40]
        );
    }

    #[test]
    fn test_write_str_nul_terminated() {
        let mut w = WbxmlWriter::new();
        w.write_str("42");
        assert_eq!(w.bytes(), &[STR_I, b'4', b'2', 0x00]);
    }

    #[test]
    fn test_write_text_element_roundtrip_shape() {
        let mut w = WbxmlWriter::new();
        w.write_text_element(airsync::SYNC_KEY, "1");
        assert_eq!(
            w.bytes(),
            &[airsync::SYNC_KEY | 0x40, STR_I, b'1', 0x00, END]
        );
    }

    #[test]
    fn test_mb_u32_small_value() {
        let mut buf = Vec::new();
        write_mb_u32(&mut buf, 5);
        assert_eq!(buf, vec![5]);
    }

    #[test]
    fn test_mb_u32_multibyte_value() {
        let mut buf = Vec::new();
        write_mb_u32(&mut buf, 300);
        // 300 = 0b100101100 -> 7-bit groups: 0000010 0101100
        assert_eq!(buf, vec![0x82, 0x2C]);
    }
}
