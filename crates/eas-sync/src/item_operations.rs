//! ItemOperations command handler: single/multi-item Fetch (§4.5).
//!
//! Unlike Sync's `<Fetch>` (piggybacked on a collection's sync response),
//! ItemOperations Fetch is a standalone request/response pair with no sync
//! key involved — a client uses it to pull one message's full body after
//! seeing a truncated preview from Sync.

use eas_core::body::{select_preference, SelectionContext};
use eas_core::wbxml::tokens::{codepage, item_operations};
use eas_core::wbxml::WbxmlWriter;

use crate::collaborators::MailStore;
use crate::error::SyncResult;
use crate::requests::ItemOperationsFetchRequest;
use crate::wire::write_mail_item_application_data;

pub mod status {
    pub const SUCCESS: u8 = 1;
    pub const ITEM_NOT_FOUND: u8 = 8;
}

/// Resolves and writes one `<Response><Fetch>...</Fetch></Response>` block
/// per requested item. The caller writes the enclosing `<ItemOperations>`
/// start/end and top-level `<Status>`.
pub async fn handle_item_operations<M: MailStore>(
    w: &mut WbxmlWriter,
    mail_store: &M,
    user_id: &str,
    fetches: &[ItemOperationsFetchRequest],
) -> SyncResult<()> {
    w.page(codepage::ITEM_OPERATIONS);
    w.start(item_operations::RESPONSE, true);

    for fetch in fetches {
        write_fetch_result(w, mail_store, user_id, fetch).await?;
    }

    w.end(); // Response
    Ok(())
}

async fn write_fetch_result<M: MailStore>(
    w: &mut WbxmlWriter,
    mail_store: &M,
    user_id: &str,
    fetch: &ItemOperationsFetchRequest,
) -> SyncResult<()> {
    let id: Option<i64> = fetch.server_id.parse().ok();
    let item = match id {
        Some(id) => mail_store.get_items(user_id, &[id]).await?.into_iter().next(),
        None => None,
    };

    w.page(codepage::ITEM_OPERATIONS);
    w.start(item_operations::FETCH, true);

    match item {
        Some(item) => {
            w.write_text_element(item_operations::STATUS, "1");
            w.write_text_element(item_operations::COLLECTION_ID, &fetch.collection_id);
            w.write_text_element(item_operations::SERVER_ID, &fetch.server_id);
            let preference = select_preference(&fetch.body_preferences, SelectionContext::Fetch);
            w.start(item_operations::DATA, true);
            write_mail_item_application_data(w, &item, preference)?;
            w.end(); // Data
        }
        None => {
            w.write_text_element(item_operations::STATUS, &status::ITEM_NOT_FOUND.to_string());
            w.write_text_element(item_operations::COLLECTION_ID, &fetch.collection_id);
            w.write_text_element(item_operations::SERVER_ID, &fetch.server_id);
        }
    }

    w.end(); // Fetch
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use eas_core::types::MailItem;

    struct StubStore {
        items: Vec<MailItem>,
    }

    impl MailStore for StubStore {
        async fn list_folder(
            &self,
            _user_id: &str,
            _folder_id: &str,
            _limit: usize,
            _exclude: &[i64],
        ) -> SyncResult<Vec<MailItem>> {
            Ok(Vec::new())
        }

        async fn get_items(&self, _user_id: &str, ids: &[i64]) -> SyncResult<Vec<MailItem>> {
            Ok(self.items.iter().filter(|i| ids.contains(&i.id)).cloned().collect())
        }

        async fn max_item_id(&self, _user_id: &str, _folder_id: &str) -> SyncResult<Option<i64>> {
            Ok(self.items.iter().map(|i| i.id).max())
        }
    }

    fn sample_item() -> MailItem {
        MailItem {
            id: 42,
            subject: "Hi".into(),
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

    #[tokio::test]
    async fn test_fetch_found_item() {
        let store = StubStore { items: vec![sample_item()] };
        let mut w = WbxmlWriter::new();
        w.header();
        let fetches = vec![ItemOperationsFetchRequest {
            collection_id: "2".into(),
            server_id: "42".into(),
            body_preferences: Vec::new(),
        }];
        handle_item_operations(&mut w, &store, "alice", &fetches).await.unwrap();
        assert!(!w.bytes().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_missing_item_reports_not_found() {
        let store = StubStore { items: vec![] };
        let mut w = WbxmlWriter::new();
        w.header();
        let fetches = vec![ItemOperationsFetchRequest {
            collection_id: "2".into(),
            server_id: "999".into(),
            body_preferences: Vec::new(),
        }];
        handle_item_operations(&mut w, &store, "alice", &fetches).await.unwrap();
        assert!(!w.bytes().is_empty());
    }
}
