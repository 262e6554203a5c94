//! FolderSync command handler (§4.8).
//!
//! The folder hierarchy is fixed: seven system folders, no creation or
//! deletion. Only the sync key advances, and only on a client key of `"0"`.

use eas_core::types::SyncKey;
use eas_core::wbxml::tokens::{codepage, folder_hierarchy};
use eas_core::wbxml::WbxmlWriter;
use eas_db::repository::folder::FolderHierarchyRepository;

use crate::error::SyncResult;

/// WBXML Status codes this handler can produce.
pub mod status {
    pub const SUCCESS: u8 = 1;
    pub const INVALID_SYNC_KEY: u8 = 8;
}

/// One entry of the fixed hierarchy: `(server_id, parent_id, display_name,
/// folder_type)`. Folder type numbering follows MS-ASCMD §2.2.3.167.1.
struct StaticFolder {
    server_id: &'static str,
    display_name: &'static str,
    folder_type: u8,
}

const HIERARCHY: &[StaticFolder] = &[
    StaticFolder { server_id: "2", display_name: "Inbox", folder_type: 2 },
    StaticFolder { server_id: "3", display_name: "Drafts", folder_type: 3 },
    StaticFolder { server_id: "4", display_name: "Deleted Items", folder_type: 4 },
    StaticFolder { server_id: "5", display_name: "Sent Items", folder_type: 5 },
    StaticFolder { server_id: "6", display_name: "Outbox", folder_type: 6 },
    StaticFolder { server_id: "8", display_name: "Calendar", folder_type: 8 },
    StaticFolder { server_id: "9", display_name: "Contacts", folder_type: 9 },
];

/// The Email class folder (Inbox) is the only collection FolderSync's
/// static hierarchy maps directly to a Sync `Class`/`CollectionId`; used by
/// the dispatcher to resolve `expected_class` for a given collection id.
pub fn class_for_collection(collection_id: &str) -> Option<&'static str> {
    match collection_id {
        "2" | "3" | "4" | "5" | "6" => Some("Email"),
        "8" => Some("Calendar"),
        "9" => Some("Contacts"),
        _ => None,
    }
}

pub struct FolderSyncOutcome {
    pub status: u8,
    pub response_sync_key: SyncKey,
}

/// Handles one FolderSync request, writing `<Changes>/<Count>/<Add>*` into
/// `w` when the full hierarchy is sent. The caller writes the enclosing
/// `<FolderSync><Status><SyncKey>` wrapper around this.
pub async fn handle_foldersync(
    w: &mut WbxmlWriter,
    repo: &FolderHierarchyRepository,
    user_id: &str,
    device_id: &str,
    client_key: &SyncKey,
) -> SyncResult<FolderSyncOutcome> {
    let state = repo.load_state(user_id, device_id).await?;

    if client_key.is_zero() {
        let advanced = repo.advance(user_id, device_id).await?;
        write_full_hierarchy(w);
        return Ok(FolderSyncOutcome {
            status: status::SUCCESS,
            response_sync_key: advanced.sync_key,
        });
    }

    if *client_key == state.sync_key {
        write_empty_changes(w);
        return Ok(FolderSyncOutcome {
            status: status::SUCCESS,
            response_sync_key: state.sync_key,
        });
    }

    Ok(FolderSyncOutcome {
        status: status::INVALID_SYNC_KEY,
        response_sync_key: SyncKey::zero(),
    })
}

fn write_full_hierarchy(w: &mut WbxmlWriter) {
    w.page(codepage::FOLDER_HIERARCHY);
    w.start(folder_hierarchy::CHANGES, true);
    w.write_text_element(folder_hierarchy::COUNT, &HIERARCHY.len().to_string());
    for folder in HIERARCHY {
        w.start(folder_hierarchy::ADD, true);
        w.write_text_element(folder_hierarchy::SERVER_ID, folder.server_id);
        w.write_text_element(folder_hierarchy::PARENT_ID, "0");
        w.write_text_element(folder_hierarchy::DISPLAY_NAME, folder.display_name);
        w.write_text_element(folder_hierarchy::TYPE, &folder.folder_type.to_string());
        w.end(); // Add
    }
    w.end(); // Changes
}

fn write_empty_changes(w: &mut WbxmlWriter) {
    w.page(codepage::FOLDER_HIERARCHY);
    w.start(folder_hierarchy::CHANGES, true);
    w.write_text_element(folder_hierarchy::COUNT, "0");
    w.end();
}

#[cfg(test)]
mod tests {
    use super::*;
    use eas_db::pool::{Database, DbConfig};

    async fn seeded_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.devices().load_or_create("alice", "DEVICE1", "iPhone").await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_initial_foldersync_sends_full_hierarchy() {
        let db = seeded_db().await;
        let mut w = WbxmlWriter::new();
        w.header();
        let outcome = handle_foldersync(
            &mut w,
            &db.folder_hierarchy(),
            "alice",
            "DEVICE1",
            &SyncKey::zero(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.status, status::SUCCESS);
        assert_eq!(outcome.response_sync_key, SyncKey::from_counter(1));
    }

    #[tokio::test]
    async fn test_matching_key_sends_empty_changes() {
        let db = seeded_db().await;
        let mut w = WbxmlWriter::new();
        w.header();
        handle_foldersync(&mut w, &db.folder_hierarchy(), "alice", "DEVICE1", &SyncKey::zero())
            .await
            .unwrap();

        let mut w2 = WbxmlWriter::new();
        w2.header();
        let outcome = handle_foldersync(
            &mut w2,
            &db.folder_hierarchy(),
            "alice",
            "DEVICE1",
            &SyncKey::from_counter(1),
        )
        .await
        .unwrap();
        assert_eq!(outcome.status, status::SUCCESS);
        assert_eq!(outcome.response_sync_key, SyncKey::from_counter(1));
    }

    #[tokio::test]
    async fn test_mismatched_key_is_invalid() {
        let db = seeded_db().await;
        let mut w = WbxmlWriter::new();
        w.header();
        let outcome = handle_foldersync(
            &mut w,
            &db.folder_hierarchy(),
            "alice",
            "DEVICE1",
            &SyncKey::from_counter(99),
        )
        .await
        .unwrap();
        assert_eq!(outcome.status, status::INVALID_SYNC_KEY);
        assert!(outcome.response_sync_key.is_zero());
    }

    #[test]
    fn test_class_for_collection_mapping() {
        assert_eq!(class_for_collection("2"), Some("Email"));
        assert_eq!(class_for_collection("8"), Some("Calendar"));
        assert_eq!(class_for_collection("999"), None);
    }
}
