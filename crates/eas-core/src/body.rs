//! # Body Pipeline
//!
//! Selects a body type from the client's `BodyPreference` set, assembles the
//! content for that type from a [`MailItem`]'s stored fields, and truncates
//! it per the `EstimatedDataSize`/`Truncated` wire semantics (MS-ASAIRS
//! §2.2.2.17): `EstimatedDataSize` always reports the **untruncated** size.

use crate::error::{BodyError, BodyResult};
use crate::types::{BodyPreference, BodyType, MailItem};
use lettre::message::{header, Mailbox, Message, MultiPart, SinglePart};
use std::str::FromStr;
use std::sync::OnceLock;

/// Which command is requesting a body, since Sync and Fetch rank the four
/// body types in opposite orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionContext {
    Sync,
    Fetch,
}

const SYNC_PRIORITY: [BodyType; 3] = [BodyType::Html, BodyType::Plain, BodyType::Mime];
const FETCH_PRIORITY: [BodyType; 3] = [BodyType::Mime, BodyType::Html, BodyType::Plain];

/// The body, ready to place under a `<Body>` element in emission order.
#[derive(Debug, Clone)]
pub struct BodyContent {
    pub body_type: BodyType,
    pub data: Vec<u8>,
    /// Always the untruncated byte length, even when `truncated` is true.
    pub estimated_data_size: usize,
    pub truncated: bool,
    pub content_type: Option<&'static str>,
}

/// Default type used when a request carries no `BodyPreference` at all.
fn default_preference(context: SelectionContext) -> BodyPreference {
    let body_type = match context {
        SelectionContext::Sync => BodyType::Html,
        SelectionContext::Fetch => BodyType::Mime,
    };
    BodyPreference {
        body_type,
        truncation_size: None,
        all_or_none: false,
    }
}

/// Picks the `BodyPreference` entry the pipeline should honor. Duplicate
/// entries for the same `Type` resolve to the largest `truncation_size`
/// among them (`None` beats any number, since it means "no truncation").
pub fn select_preference(prefs: &[BodyPreference], context: SelectionContext) -> BodyPreference {
    if prefs.is_empty() {
        return default_preference(context);
    }

    let priority = match context {
        SelectionContext::Sync => SYNC_PRIORITY,
        SelectionContext::Fetch => FETCH_PRIORITY,
    };

    for candidate_type in priority {
        let best = prefs
            .iter()
            .filter(|p| p.body_type == candidate_type)
            .copied()
            .reduce(|a, b| match (a.truncation_size, b.truncation_size) {
                (None, _) | (_, None) => BodyPreference {
                    truncation_size: None,
                    ..a
                },
                (Some(x), Some(y)) if x >= y => a,
                _ => b,
            });
        if let Some(pref) = best {
            return pref;
        }
    }

    // Client asked only for a type we don't rank (e.g. Rtf); fall back to
    // our own default rather than honoring an unsupported type.
    default_preference(context)
}

fn html_tag_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"<[^>]*>").expect("static HTML tag pattern is valid"))
}

fn strip_html_tags(html: &str) -> String {
    html_tag_regex().replace_all(html, "").to_string()
}

/// Extracts a text or HTML part from a stored MIME blob, used when the
/// caller asked for Type 1/2 but only `mime_content` is stored.
fn extract_from_mime(mime_content: &[u8], want_html: bool) -> Option<String> {
    let message = mail_parser::MessageParser::default().parse(mime_content)?;
    if want_html {
        message.body_html(0).map(|c| c.into_owned())
    } else {
        message.body_text(0).map(|c| c.into_owned())
    }
}

fn utf8_safe_prefix(bytes: &[u8], max_len: usize) -> &[u8] {
    if bytes.len() <= max_len {
        return bytes;
    }
    let mut end = max_len;
    while end > 0 && (bytes[end] & 0xC0) == 0x80 {
        end -= 1;
    }
    &bytes[..end]
}

/// Converts bare `\n` into `\r\n` without doubling up existing `\r\n` pairs.
/// Applied only after the untruncated size has been measured, per spec.
fn normalize_line_endings(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                out.push('\r');
                out.push('\n');
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            '\n' => {
                out.push('\r');
                out.push('\n');
            }
            _ => out.push(c),
        }
    }
    out
}

fn finalize_text(raw: String, truncation_size: Option<u32>) -> (Vec<u8>, usize, bool) {
    let raw_bytes = raw.as_bytes();
    let estimated_size = raw_bytes.len();

    let (body_bytes, truncated): (&[u8], bool) = match truncation_size {
        Some(limit) if (limit as usize) < estimated_size => {
            (utf8_safe_prefix(raw_bytes, limit as usize), true)
        }
        _ => (raw_bytes, false),
    };

    let body_str = String::from_utf8_lossy(body_bytes);
    let normalized = normalize_line_endings(&body_str);
    (normalized.into_bytes(), estimated_size, truncated)
}

/// Type=4 has no client-visible default truncation; absent a client value
/// the pipeline still caps it so a single giant attachment can't blow out a
/// response.
const MIME_DEFAULT_CAP: usize = 512 * 1024;

fn finalize_mime(bytes: Vec<u8>, truncation_size: Option<u32>) -> (Vec<u8>, usize, bool) {
    let estimated_size = bytes.len();
    let limit = truncation_size
        .map(|t| t as usize)
        .unwrap_or(MIME_DEFAULT_CAP);
    if limit >= estimated_size {
        (bytes, estimated_size, false)
    } else {
        (bytes[..limit].to_vec(), estimated_size, true)
    }
}

fn placeholder_mailbox() -> Mailbox {
    Mailbox::new(None, "invalid@invalid".parse().expect("literal address is valid"))
}

fn parse_mailbox(s: &str) -> Mailbox {
    Mailbox::from_str(s).unwrap_or_else(|_| placeholder_mailbox())
}

/// Builds a multipart/alternative RFC 5322 message from the stored plain and
/// HTML bodies when no `mime_content` is on file. `lettre` formats with CRLF
/// line endings internally, satisfying the wire requirement directly.
fn synthesize_mime(item: &MailItem) -> BodyResult<Vec<u8>> {
    let builder = Message::builder()
        .from(parse_mailbox(&item.from))
        .to(parse_mailbox(&item.to))
        .subject(item.subject.clone())
        .date(item.received_at.into());

    let message = match (&item.body_plain, &item.body_html) {
        (Some(plain), Some(html)) => builder
            .multipart(
                MultiPart::alternative()
                    .singlepart(SinglePart::plain(plain.clone()))
                    .singlepart(SinglePart::html(html.clone())),
            )
            .map_err(|e| BodyError::MimeSynthesisFailed(e.to_string()))?,
        (Some(plain), None) => builder
            .header(header::ContentType::TEXT_PLAIN)
            .body(plain.clone())
            .map_err(|e| BodyError::MimeSynthesisFailed(e.to_string()))?,
        (None, Some(html)) => builder
            .header(header::ContentType::TEXT_HTML)
            .body(html.clone())
            .map_err(|e| BodyError::MimeSynthesisFailed(e.to_string()))?,
        (None, None) => return Err(BodyError::NoBodyContent { item_id: item.id }),
    };

    Ok(message.formatted())
}

/// Assembles the body for `item` under the already-selected `preference`.
pub fn assemble_body(item: &MailItem, preference: BodyPreference) -> BodyResult<BodyContent> {
    match preference.body_type {
        BodyType::Plain => {
            let text = item
                .body_plain
                .clone()
                .or_else(|| item.body_html.as_deref().map(strip_html_tags))
                .or_else(|| {
                    item.mime_content
                        .as_deref()
                        .and_then(|m| extract_from_mime(m, false))
                })
                .ok_or(BodyError::NoBodyContent { item_id: item.id })?;
            let (data, estimated_data_size, truncated) =
                finalize_text(text, preference.truncation_size);
            Ok(BodyContent {
                body_type: BodyType::Plain,
                data,
                estimated_data_size,
                truncated,
                content_type: Some("text/plain; charset=utf-8"),
            })
        }
        BodyType::Html => {
            let text = item
                .body_html
                .clone()
                .or_else(|| item.body_plain.clone())
                .or_else(|| {
                    item.mime_content
                        .as_deref()
                        .and_then(|m| extract_from_mime(m, true))
                })
                .ok_or(BodyError::NoBodyContent { item_id: item.id })?;
            let (data, estimated_data_size, truncated) =
                finalize_text(text, preference.truncation_size);
            Ok(BodyContent {
                body_type: BodyType::Html,
                data,
                estimated_data_size,
                truncated,
                content_type: Some("text/html; charset=utf-8"),
            })
        }
        BodyType::Mime => {
            let bytes = match &item.mime_content {
                Some(b) => b.clone(),
                None => synthesize_mime(item)?,
            };
            let (data, estimated_data_size, truncated) =
                finalize_mime(bytes, preference.truncation_size);
            Ok(BodyContent {
                body_type: BodyType::Mime,
                data,
                estimated_data_size,
                truncated,
                content_type: Some("message/rfc822"),
            })
        }
        BodyType::Rtf => Err(BodyError::NoBodyContent { item_id: item.id }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(plain: Option<&str>, html: Option<&str>, mime: Option<Vec<u8>>) -> MailItem {
        MailItem {
            id: 1,
            subject: "Hello".to_string(),
            from: "alice@example.com".to_string(),
            to: "bob@example.com".to_string(),
            received_at: Utc::now(),
            is_read: false,
            body_plain: plain.map(str::to_string),
            body_html: html.map(str::to_string),
            mime_content: mime,
            message_id: None,
        }
    }

    #[test]
    fn test_select_preference_sync_prefers_html() {
        let prefs = [
            BodyPreference {
                body_type: BodyType::Plain,
                truncation_size: None,
                all_or_none: false,
            },
            BodyPreference {
                body_type: BodyType::Html,
                truncation_size: None,
                all_or_none: false,
            },
        ];
        let selected = select_preference(&prefs, SelectionContext::Sync);
        assert_eq!(selected.body_type, BodyType::Html);
    }

    #[test]
    fn test_select_preference_fetch_prefers_mime() {
        let prefs = [BodyPreference {
            body_type: BodyType::Html,
            truncation_size: None,
            all_or_none: false,
        }];
        let selected = select_preference(&prefs, SelectionContext::Fetch);
        // client didn't ask for Mime, so Html (their only offer) is honored
        assert_eq!(selected.body_type, BodyType::Html);
    }

    #[test]
    fn test_select_preference_empty_uses_default() {
        let selected = select_preference(&[], SelectionContext::Sync);
        assert_eq!(selected.body_type, BodyType::Html);
        let selected = select_preference(&[], SelectionContext::Fetch);
        assert_eq!(selected.body_type, BodyType::Mime);
    }

    #[test]
    fn test_duplicate_type_tie_break_prefers_null_truncation() {
        let prefs = [
            BodyPreference {
                body_type: BodyType::Plain,
                truncation_size: Some(100),
                all_or_none: false,
            },
            BodyPreference {
                body_type: BodyType::Plain,
                truncation_size: None,
                all_or_none: false,
            },
        ];
        let selected = select_preference(&prefs, SelectionContext::Fetch);
        assert_eq!(selected.truncation_size, None);
    }

    #[test]
    fn test_duplicate_type_tie_break_largest_numeric_wins() {
        let prefs = [
            BodyPreference {
                body_type: BodyType::Plain,
                truncation_size: Some(100),
                all_or_none: false,
            },
            BodyPreference {
                body_type: BodyType::Plain,
                truncation_size: Some(500),
                all_or_none: false,
            },
        ];
        let selected = select_preference(&prefs, SelectionContext::Fetch);
        assert_eq!(selected.truncation_size, Some(500));
    }

    #[test]
    fn test_assemble_plain_falls_back_to_stripped_html() {
        let mail = item(None, Some("<p>Hi <b>there</b></p>"), None);
        let content = assemble_body(
            &mail,
            BodyPreference {
                body_type: BodyType::Plain,
                truncation_size: None,
                all_or_none: false,
            },
        )
        .unwrap();
        assert_eq!(String::from_utf8(content.data).unwrap(), "Hi there");
        assert!(!content.truncated);
    }

    #[test]
    fn test_estimated_data_size_is_untruncated() {
        let mail = item(Some("0123456789"), None, None);
        let content = assemble_body(
            &mail,
            BodyPreference {
                body_type: BodyType::Plain,
                truncation_size: Some(4),
                all_or_none: false,
            },
        )
        .unwrap();
        assert_eq!(content.estimated_data_size, 10);
        assert!(content.truncated);
        assert_eq!(content.data.len(), 4);
    }

    #[test]
    fn test_truncation_is_utf8_safe() {
        // "café" is 5 bytes in UTF-8 (c-a-f-é where é is 2 bytes)
        let mail = item(Some("café"), None, None);
        let content = assemble_body(
            &mail,
            BodyPreference {
                body_type: BodyType::Plain,
                truncation_size: Some(4),
                all_or_none: false,
            },
        )
        .unwrap();
        // byte 4 would split the 2-byte 'é'; safe prefix backs off to "caf"
        assert_eq!(content.data, b"caf");
        assert!(String::from_utf8(content.data).is_ok());
    }

    #[test]
    fn test_no_truncation_when_limit_exceeds_size() {
        let mail = item(Some("short"), None, None);
        let content = assemble_body(
            &mail,
            BodyPreference {
                body_type: BodyType::Plain,
                truncation_size: Some(1000),
                all_or_none: false,
            },
        )
        .unwrap();
        assert!(!content.truncated);
        assert_eq!(content.estimated_data_size, 5);
    }

    #[test]
    fn test_mime_uses_stored_content_verbatim() {
        let stored = b"From: a@b.com\r\nTo: c@d.com\r\n\r\nbody".to_vec();
        let mail = item(None, None, Some(stored.clone()));
        let content = assemble_body(
            &mail,
            BodyPreference {
                body_type: BodyType::Mime,
                truncation_size: None,
                all_or_none: false,
            },
        )
        .unwrap();
        assert_eq!(content.data, stored);
        assert!(!content.truncated);
    }

    #[test]
    fn test_mime_synthesized_when_absent() {
        let mail = item(Some("plain body"), Some("<p>html body</p>"), None);
        let content = assemble_body(
            &mail,
            BodyPreference {
                body_type: BodyType::Mime,
                truncation_size: None,
                all_or_none: false,
            },
        )
        .unwrap();
        let text = String::from_utf8_lossy(&content.data);
        assert!(text.contains("multipart/alternative"));
        assert!(text.contains("plain body"));
        assert!(text.contains("html body"));
    }

    #[test]
    fn test_no_body_content_errors() {
        let mail = item(None, None, None);
        let err = assemble_body(
            &mail,
            BodyPreference {
                body_type: BodyType::Plain,
                truncation_size: None,
                all_or_none: false,
            },
        )
        .unwrap_err();
        assert!(matches!(err, BodyError::NoBodyContent { item_id: 1 }));
    }
}
