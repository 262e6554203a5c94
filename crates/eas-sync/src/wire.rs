//! Shared WBXML response fragments.
//!
//! Both the Sync `<Add>` path and ItemOperations `<Fetch>` responses emit
//! the same two building blocks: a mail item's Email `ApplicationData` and
//! its AirSyncBase `<Body>`. Keeping them here avoids the two call sites
//! drifting out of the element-ordering invariant §8 pins down.

use eas_core::body::{assemble_body, BodyContent};
use eas_core::types::{BodyPreference, MailItem};
use eas_core::wbxml::tokens::{airsyncbase, codepage, email};
use eas_core::wbxml::WbxmlWriter;
use eas_core::BodyError;

/// Writes `<Body>Type, EstimatedDataSize, Truncated, Data, ContentType</Body>`
/// in the order §8 Testable Property 4 requires.
pub fn write_body_element(w: &mut WbxmlWriter, body: &BodyContent) {
    w.page(codepage::AIRSYNCBASE);
    w.start(airsyncbase::BODY, true);
    w.write_text_element(airsyncbase::TYPE, &(body.body_type as u8).to_string());
    w.write_text_element(
        airsyncbase::ESTIMATED_DATA_SIZE,
        &body.estimated_data_size.to_string(),
    );
    w.write_text_element(
        airsyncbase::TRUNCATED,
        if body.truncated { "1" } else { "0" },
    );
    w.start(airsyncbase::DATA, true);
    w.write_opaque(&body.data);
    w.end(); // Data
    if let Some(content_type) = body.content_type {
        w.write_text_element(airsyncbase::CONTENT_TYPE, content_type);
    }
    w.end(); // Body
}

/// Writes a mail item's Email-codepage `ApplicationData`, including the
/// selected `<Body>`, then switches back to the AirSync codepage so the
/// caller can continue writing sibling elements (`<ServerId>`, etc.)
/// without tracking the page switch itself.
pub fn write_mail_item_application_data(
    w: &mut WbxmlWriter,
    item: &MailItem,
    preference: BodyPreference,
) -> Result<(), BodyError> {
    let body = assemble_body(item, preference)?;

    w.page(codepage::EMAIL);
    w.write_text_element(email::SUBJECT, &item.subject);
    w.write_text_element(email::FROM, &item.from);
    w.write_text_element(email::TO, &item.to);
    w.write_text_element(
        email::DATE_RECEIVED,
        &item.received_at.to_rfc3339(),
    );
    w.write_text_element(email::READ, if item.is_read { "1" } else { "0" });

    write_body_element(w, &body);
    w.page(codepage::AIRSYNC);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eas_core::types::BodyType;
    use chrono::Utc;

    fn sample_item() -> MailItem {
        MailItem {
            id: 1,
            subject: "Hello".into(),
            from: "a@example.com".into(),
            to: "b@example.com".into(),
            received_at: Utc::now(),
            is_read: false,
            body_plain: Some("hi".into()),
            body_html: None,
            mime_content: None,
            message_id: None,
        }
    }

    #[test]
    fn test_write_mail_item_application_data_succeeds() {
        let mut w = WbxmlWriter::new();
        w.header();
        let preference = BodyPreference {
            body_type: BodyType::Plain,
            truncation_size: None,
            all_or_none: false,
        };
        write_mail_item_application_data(&mut w, &sample_item(), preference).unwrap();
        assert!(!w.bytes().is_empty());
    }
}
