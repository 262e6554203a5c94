//! Search command handler (§10.7): best-effort GAL lookup.
//!
//! A dispatcher with no [`DirectoryLookup`] wired up still answers with a
//! well-formed empty result set rather than failing the command — a client
//! treats zero results as normal, an unhandled command as a protocol error.

use eas_core::wbxml::tokens::{codepage, search};
use eas_core::wbxml::WbxmlWriter;

use crate::collaborators::{DirectoryEntry, DirectoryLookup};
use crate::error::SyncResult;

pub mod status {
    pub const SUCCESS: u8 = 1;
}

/// Runs a GAL search and writes the full `<Search>...</Search>` body
/// (`<Status>`, `<Response><Store><Status>...<Result>*`).
pub async fn handle_search<D: DirectoryLookup>(
    w: &mut WbxmlWriter,
    directory: Option<&D>,
    query: &str,
) -> SyncResult<()> {
    let entries = match directory {
        Some(directory) => directory.resolve(query).await?,
        None => Vec::new(),
    };

    w.page(codepage::SEARCH);
    w.write_text_element(search::STATUS, "1");
    w.start(search::RESPONSE, true);
    w.start(search::STORE, true);
    w.write_text_element(search::STATUS, "1");
    for entry in &entries {
        write_result(w, entry);
    }
    w.end(); // Store
    w.end(); // Response

    Ok(())
}

fn write_result(w: &mut WbxmlWriter, entry: &DirectoryEntry) {
    w.page(codepage::SEARCH);
    w.start(search::RESULT, true);
    w.start(search::PROPERTIES, true);
    w.write_text_element(search::DISPLAY_NAME, &entry.display_name);
    w.write_text_element(search::EMAIL_ADDRESS, &entry.email_address);
    w.end(); // Properties
    w.end(); // Result
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoDirectory;
    impl DirectoryLookup for NoDirectory {
        async fn resolve(&self, _query: &str) -> SyncResult<Vec<DirectoryEntry>> {
            Ok(Vec::new())
        }
    }

    struct StubDirectory;
    impl DirectoryLookup for StubDirectory {
        async fn resolve(&self, _query: &str) -> SyncResult<Vec<DirectoryEntry>> {
            Ok(vec![DirectoryEntry {
                display_name: "Alice".into(),
                email_address: "alice@example.com".into(),
            }])
        }
    }

    #[tokio::test]
    async fn test_no_directory_returns_empty_result_set() {
        let mut w = WbxmlWriter::new();
        w.header();
        handle_search::<NoDirectory>(&mut w, None, "alice").await.unwrap();
        assert!(!w.bytes().is_empty());
    }

    #[tokio::test]
    async fn test_wired_directory_emits_result() {
        let mut w = WbxmlWriter::new();
        w.header();
        let directory = StubDirectory;
        handle_search(&mut w, Some(&directory), "alice").await.unwrap();
        assert!(!w.bytes().is_empty());
    }
}
