//! Recursive-descent WBXML decoder.
//!
//! Decodes a request body into a generic [`Element`] tree rather than one
//! struct per command: MS-ASCMD request bodies nest arbitrarily (a
//! `<Collection>` inside `<Collections>` inside `<Sync>`, `BodyPreference`
//! blocks inside `Options`, etc.) and a single walkable tree lets
//! `eas-sync`'s per-command extraction code stay declarative instead of
//! hand-rolling a parser per command the way the original byte-scanning
//! implementation did.

use super::tokens::control::{END, OPAQUE, STR_I, SWITCH_PAGE};
use crate::error::{CodecError, CodecResult};

/// One parsed child of an [`Element`]: nested tag, inline text, or opaque
/// binary data (used for base64-free attachment/body payloads).
#[derive(Debug, Clone)]
pub enum Node {
    Element(Element),
    Text(String),
    Opaque(Vec<u8>),
}

/// A decoded WBXML element, tagged with the codepage it was read under so
/// that same-numbered tokens from different codepages are never confused.
#[derive(Debug, Clone)]
pub struct Element {
    pub codepage: u8,
    pub tag: u8,
    pub children: Vec<Node>,
}

impl Element {
    /// First direct child element matching `(codepage, tag)`.
    pub fn child(&self, codepage: u8, tag: u8) -> Option<&Element> {
        self.children.iter().find_map(|n| match n {
            Node::Element(e) if e.codepage == codepage && e.tag == tag => Some(e),
            _ => None,
        })
    }

    /// All direct child elements matching `(codepage, tag)`, in document order.
    pub fn children_matching(&self, codepage: u8, tag: u8) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(move |n| match n {
            Node::Element(e) if e.codepage == codepage && e.tag == tag => Some(e),
            _ => None,
        })
    }

    /// This element's own inline text content, if any (the common case of
    /// `<Tag>STR_I</Tag>` with no nested elements).
    pub fn text(&self) -> Option<&str> {
        self.children.iter().find_map(|n| match n {
            Node::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Text content of a direct child matching `(codepage, tag)`.
    pub fn child_text(&self, codepage: u8, tag: u8) -> Option<&str> {
        self.child(codepage, tag).and_then(Element::text)
    }

    /// Opaque binary content of a direct child matching `(codepage, tag)`.
    pub fn child_opaque(&self, codepage: u8, tag: u8) -> Option<&[u8]> {
        self.child(codepage, tag).and_then(|e| {
            e.children.iter().find_map(|n| match n {
                Node::Opaque(b) => Some(b.as_slice()),
                _ => None,
            })
        })
    }

    /// True if an empty element (no content bit) with this tag is a direct
    /// child, e.g. `<MoreAvailable/>`.
    pub fn has_empty_child(&self, codepage: u8, tag: u8) -> bool {
        self.child(codepage, tag).is_some()
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    page: u8,
}

impl<'a> Cursor<'a> {
    fn read_byte(&mut self) -> CodecResult<u8> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or(CodecError::UnexpectedEof { offset: self.pos })?;
        self.pos += 1;
        Ok(b)
    }

    fn peek_byte(&self) -> CodecResult<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(CodecError::UnexpectedEof { offset: self.pos })
    }

    fn read_cstr(&mut self) -> CodecResult<String> {
        let start = self.pos;
        while self.peek_byte()? != 0x00 {
            self.pos += 1;
        }
        let slice = &self.data[start..self.pos];
        self.pos += 1; // consume NUL terminator
        String::from_utf8(slice.to_vec()).map_err(|_| CodecError::InvalidUtf8 { offset: start })
    }

    fn read_mb_u32(&mut self) -> CodecResult<u32> {
        let start = self.pos;
        let mut value: u32 = 0;
        loop {
            let b = self.read_byte()?;
            value = value
                .checked_shl(7)
                .ok_or(CodecError::LengthOverflow { offset: start })?
                | (b & 0x7F) as u32;
            if b & 0x80 == 0 {
                break;
            }
        }
        Ok(value)
    }

    fn read_bytes(&mut self, len: usize) -> CodecResult<Vec<u8>> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or(CodecError::LengthOverflow { offset: self.pos })?;
        if end > self.data.len() {
            return Err(CodecError::UnexpectedEof { offset: self.pos });
        }
        let out = self.data[self.pos..end].to_vec();
        self.pos = end;
        Ok(out)
    }

    fn decode_element(&mut self) -> CodecResult<Element> {
        let b = self.read_byte()?;
        let tag = b & 0x3F;
        let has_content = b & 0x40 != 0;
        let codepage = self.page;
        let mut children = Vec::new();

        if has_content {
            loop {
                match self.peek_byte()? {
                    END => {
                        self.read_byte()?;
                        break;
                    }
                    SWITCH_PAGE => {
                        self.read_byte()?;
                        self.page = self.read_byte()?;
                    }
                    STR_I => {
                        self.read_byte()?;
                        children.push(Node::Text(self.read_cstr()?));
                    }
                    OPAQUE => {
                        self.read_byte()?;
                        let len = self.read_mb_u32()? as usize;
                        children.push(Node::Opaque(self.read_bytes(len)?));
                    }
                    _ => {
                        children.push(Node::Element(self.decode_element()?));
                    }
                }
            }
        }

        Ok(Element {
            codepage,
            tag,
            children,
        })
    }
}

/// Decodes a complete WBXML document (header + one root element).
pub fn decode(data: &[u8]) -> CodecResult<Element> {
    if data.len() < 4 || data[0..4] != [0x03, 0x01, 0x6A, 0x00] {
        return Err(CodecError::InvalidHeader {
            found: data.get(0..4.min(data.len())).unwrap_or(&[]).to_vec(),
        });
    }

    let mut cur = Cursor {
        data,
        pos: 4,
        page: 0,
    };

    // A leading SWITCH_PAGE before the root tag is common (root is rarely
    // in codepage 0 for e.g. FolderSync/Provision requests).
    while cur.peek_byte()? == SWITCH_PAGE {
        cur.read_byte()?;
        cur.page = cur.read_byte()?;
    }

    cur.decode_element()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wbxml::tokens::{airsync, codepage};
    use crate::wbxml::writer::WbxmlWriter;

    #[test]
    fn test_invalid_header_rejected() {
        let err = decode(&[0x00, 0x00, 0x00, 0x00]).unwrap_err();
        assert!(matches!(err, CodecError::InvalidHeader { .. }));
    }

    #[test]
    fn test_decode_simple_sync_request() {
        let mut w = WbxmlWriter::new();
        w.header();
        w.page(codepage::AIRSYNC);
        w.start(airsync::SYNC, true);
        w.start(airsync::COLLECTIONS, true);
        w.start(airsync::COLLECTION, true);
        w.write_text_element(airsync::SYNC_KEY, "1");
        w.write_text_element(airsync::COLLECTION_ID, "1");
        w.end(); // Collection
        w.end(); // Collections
        w.end(); // Sync

        let root = decode(&w.into_bytes()).unwrap();
        assert_eq!(root.codepage, codepage::AIRSYNC);
        assert_eq!(root.tag, airsync::SYNC);

        let collections = root.child(codepage::AIRSYNC, airsync::COLLECTIONS).unwrap();
        let collection = collections
            .child(codepage::AIRSYNC, airsync::COLLECTION)
            .unwrap();
        assert_eq!(
            collection.child_text(codepage::AIRSYNC, airsync::SYNC_KEY),
            Some("1")
        );
        assert_eq!(
            collection.child_text(codepage::AIRSYNC, airsync::COLLECTION_ID),
            Some("1")
        );
    }

    #[test]
    fn test_decode_empty_element() {
        let mut w = WbxmlWriter::new();
        w.header();
        w.page(codepage::AIRSYNC);
        w.start(airsync::SYNC, true);
        w.write_empty_element(airsync::MORE_AVAILABLE);
        w.end();

        let root = decode(&w.into_bytes()).unwrap();
        assert!(root.has_empty_child(codepage::AIRSYNC, airsync::MORE_AVAILABLE));
    }

    #[test]
    fn test_decode_truncated_input_is_eof() {
        let err = decode(&[0x03, 0x01, 0x6A, 0x00, 0x45]).unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_decode_opaque_data() {
        let mut w = WbxmlWriter::new();
        w.header();
        w.page(codepage::AIRSYNCBASE);
        w.start(crate::wbxml::tokens::airsyncbase::DATA, true);
        w.write_opaque(&[1, 2, 3, 4]);
        w.end();

        let root = decode(&w.into_bytes()).unwrap();
        let data = root.children.iter().find_map(|n| match n {
            Node::Opaque(b) => Some(b.clone()),
            _ => None,
        });
        assert_eq!(data, Some(vec![1, 2, 3, 4]));
    }
}
