//! Command dispatcher (§4.5): the single entry point the gateway calls per
//! request, after it has already authenticated the caller and decoded the
//! WBXML request body (if any) into an [`Element`] tree.
//!
//! This module owns protocol-version negotiation and the provisioning gate;
//! everything after that is a thin route to the per-command handler plus
//! the envelope bytes (`<Sync>`, `<FolderSync>`, ...) those handlers don't
//! write themselves. One `Dispatcher` is built at startup and shared (via
//! `Arc`) across every request, the way `apps/cloud-api`'s service structs
//! are built once and cloned into each request's handler state.

use std::sync::Arc;

use eas_core::types::SyncKey;
use eas_core::wbxml::tokens::{airsync, codepage, folder_hierarchy, item_operations, ping as ping_tokens, provision, search, settings};
use eas_core::wbxml::{decode, Element, WbxmlWriter};
use eas_db::pool::Database;

use crate::collaborators::{ChangeNotifier, DirectoryLookup, MailStore};
use crate::error::{SyncError, SyncResult};
use crate::idempotency::IdempotencyCache;
use crate::registry::KeyedLockRegistry;
use crate::requests::{
    parse_foldersync_key, parse_item_operations_request, parse_ping_request, parse_provision_policy_key,
    parse_sync_request, PingRequest,
};
use crate::{foldersync, item_operations as item_ops_handler, ping, provision as provision_handler, search as search_handler, settings as settings_handler, state_machine};

/// The protocol versions this gateway negotiates, per §4.5.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["12.1", "14.0", "14.1", "16.0", "16.1"];
pub const DEFAULT_PROTOCOL_VERSION_MODERN: &str = "16.1";
pub const DEFAULT_PROTOCOL_VERSION_LEGACY: &str = "14.1";

/// Negotiates `MS-ASProtocolVersion`. A client that omits the header is
/// assumed to be a fresh, modern client making its very first request (real
/// legacy clients always send the header, having learned it from an earlier
/// OPTIONS exchange), so absence resolves to the modern default rather than
/// the legacy one.
pub fn negotiate_protocol_version(requested: Option<&str>) -> SyncResult<&'static str> {
    match requested {
        None => Ok(DEFAULT_PROTOCOL_VERSION_MODERN),
        Some(v) => SUPPORTED_PROTOCOL_VERSIONS
            .iter()
            .find(|&&supported| supported == v)
            .copied()
            .ok_or_else(|| SyncError::UnsupportedProtocolVersion(v.to_string())),
    }
}

/// Tunables that in `apps/gateway` come from `GatewayConfig` (§10.5).
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub max_window_size: usize,
    pub heartbeat_min_secs: u32,
    pub heartbeat_max_secs: u32,
    pub heartbeat_default_secs: u32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfig {
            max_window_size: 100,
            heartbeat_min_secs: ping::HEARTBEAT_MIN_SECS,
            heartbeat_max_secs: ping::HEARTBEAT_MAX_SECS,
            heartbeat_default_secs: ping::HEARTBEAT_DEFAULT_SECS,
        }
    }
}

/// Everything the dispatcher needs beyond the per-request identity and
/// command: the persistence handle, the shared caches/locks, the
/// configuration, and the collaborators the gateway wires up at startup.
///
/// `mail_store`/`notifier`/`directory` are `Arc`-owned (not borrowed) since
/// Ping's cancellation-safe unsubscribe path spawns a detached task that
/// must own its notifier handle past this request's lifetime.
pub struct Dispatcher<M, N, D> {
    pub db: Database,
    pub registry: KeyedLockRegistry,
    pub cache: IdempotencyCache,
    pub mail_store: Arc<M>,
    pub notifier: Arc<N>,
    pub directory: Option<Arc<D>>,
    pub config: DispatcherConfig,
}

pub struct DispatchedResponse {
    pub negotiated_protocol_version: &'static str,
    pub wbxml: Vec<u8>,
}

impl<M, N, D> Dispatcher<M, N, D>
where
    M: MailStore + 'static,
    N: ChangeNotifier + 'static,
    D: DirectoryLookup + 'static,
{
    /// Routes one request. `body` is the raw WBXML request payload, absent
    /// for commands with no body (a bare Ping retry with all-default
    /// parameters, for instance).
    pub async fn dispatch(
        &self,
        cmd: &str,
        user_id: &str,
        device_id: &str,
        device_type: &str,
        requested_protocol_version: Option<&str>,
        body: Option<&[u8]>,
    ) -> SyncResult<DispatchedResponse> {
        let negotiated_protocol_version = negotiate_protocol_version(requested_protocol_version)?;

        let device = self.db.devices().load_or_create(user_id, device_id, device_type).await?;
        if cmd != "Provision" && !device.is_provisioned {
            return Err(SyncError::NotProvisioned);
        }

        let root = body.map(decode).transpose()?;

        let wbxml = match cmd {
            "FolderSync" => self.handle_foldersync(user_id, device_id, root.as_ref()).await?,
            "Sync" => self.handle_sync(user_id, device_id, root.as_ref()).await?,
            "Ping" => self.handle_ping(user_id, root.as_ref()).await?,
            "Provision" => self.handle_provision(user_id, device_id, device_type, root.as_ref()).await?,
            "ItemOperations" => self.handle_item_operations(user_id, root.as_ref()).await?,
            "Settings" => self.handle_settings(),
            "Search" => self.handle_search(root.as_ref()).await?,
            other => unsupported_command_response(other),
        };

        Ok(DispatchedResponse {
            negotiated_protocol_version,
            wbxml,
        })
    }

    /// Runs `foldersync::handle_foldersync` into a scratch writer to learn
    /// its outcome, then composes the final envelope with `Status`/`SyncKey`
    /// written ahead of the (possibly empty) hierarchy fragment — splicing
    /// via `write_raw` rather than re-running the handler a second time,
    /// which would double the key advancement its `Commands==0` branch does.
    async fn handle_foldersync(&self, user_id: &str, device_id: &str, root: Option<&Element>) -> SyncResult<Vec<u8>> {
        let _guard = self.registry.lock_device(user_id, device_id).await;
        let client_key = root.map(parse_foldersync_key).unwrap_or_else(SyncKey::zero);

        let mut scratch = WbxmlWriter::new();
        let outcome = foldersync::handle_foldersync(&mut scratch, &self.db.folder_hierarchy(), user_id, device_id, &client_key).await?;
        let fragment = scratch.into_bytes();

        let mut w = WbxmlWriter::new();
        w.header();
        w.page(codepage::FOLDER_HIERARCHY);
        w.start(folder_hierarchy::FOLDER_SYNC, true);
        w.write_text_element(folder_hierarchy::STATUS, &outcome.status.to_string());
        w.write_text_element(folder_hierarchy::SYNC_KEY, outcome.response_sync_key.as_str());
        w.write_raw(&fragment);
        w.end(); // FolderSync
        Ok(w.into_bytes())
    }

    async fn handle_sync(&self, user_id: &str, device_id: &str, root: Option<&Element>) -> SyncResult<Vec<u8>> {
        let Some(root) = root else {
            return Err(SyncError::MalformedRequest("Sync request had no body".into()));
        };
        let collections = parse_sync_request(root)?;

        let mut w = WbxmlWriter::new();
        w.header();
        w.page(codepage::AIRSYNC);
        w.start(airsync::SYNC, true);
        w.start(airsync::COLLECTIONS, true);

        for collection in &collections {
            let _guard = self
                .registry
                .lock_collection(user_id, device_id, &collection.collection_id)
                .await;
            let expected_class = foldersync::class_for_collection(&collection.collection_id);

            // The outcome (and thus Status/SyncKey) isn't known until
            // `process_collection` has already written Commands/
            // MoreAvailable/Responses, so that fragment is built into a
            // scratch writer and spliced in after Status — the way
            // `handle_foldersync` already does for its own hierarchy
            // fragment — to keep the required SyncKey/CollectionId/Class/
            // Status/Commands/MoreAvailable/Responses order (§4.4).
            let mut scratch = WbxmlWriter::new();
            let outcome = state_machine::process_collection(
                &mut scratch,
                &self.db.collections(),
                &self.cache,
                self.mail_store.as_ref(),
                user_id,
                device_id,
                collection,
                self.config.max_window_size,
                expected_class,
            )
            .await?;
            let fragment = scratch.into_bytes();

            w.page(codepage::AIRSYNC);
            w.start(airsync::COLLECTION, true);
            w.write_text_element(airsync::SYNC_KEY, outcome.response_sync_key.as_str());
            w.write_text_element(airsync::COLLECTION_ID, &collection.collection_id);
            if let Some(class) = &collection.class {
                w.write_text_element(airsync::CLASS, class);
            }
            w.write_text_element(airsync::STATUS, &outcome.status.to_string());
            w.write_raw(&fragment);
            w.end(); // Collection
        }

        w.end(); // Collections
        w.end(); // Sync
        Ok(w.into_bytes())
    }

    async fn handle_ping(&self, user_id: &str, root: Option<&Element>) -> SyncResult<Vec<u8>> {
        let request = root.map(parse_ping_request).unwrap_or(PingRequest {
            heartbeat_interval: None,
            folder_ids: Vec::new(),
        });
        let heartbeat_secs = request
            .heartbeat_interval
            .unwrap_or(self.config.heartbeat_default_secs)
            .clamp(self.config.heartbeat_min_secs, self.config.heartbeat_max_secs);

        let outcome = ping::wait_for_change(self.notifier.clone(), user_id, &request.folder_ids, heartbeat_secs).await?;

        let mut w = WbxmlWriter::new();
        w.header();
        w.page(codepage::PING);
        w.start(ping_tokens::PING, true);
        w.write_text_element(ping_tokens::STATUS, &outcome.status.to_string());
        if !outcome.changed_folder_ids.is_empty() {
            w.start(ping_tokens::FOLDERS, true);
            for id in &outcome.changed_folder_ids {
                w.write_text_element(ping_tokens::FOLDER, id);
            }
            w.end();
        }
        w.end(); // Ping
        Ok(w.into_bytes())
    }

    async fn handle_provision(
        &self,
        user_id: &str,
        device_id: &str,
        device_type: &str,
        root: Option<&Element>,
    ) -> SyncResult<Vec<u8>> {
        let client_policy_key = root.and_then(parse_provision_policy_key);

        let _guard = self.registry.lock_device(user_id, device_id).await;

        let mut w = WbxmlWriter::new();
        w.header();
        w.page(codepage::PROVISION);
        w.start(provision::PROVISION, true);
        w.write_text_element(provision::STATUS, "1");

        provision_handler::handle_provision(
            &mut w,
            &self.db.devices(),
            user_id,
            device_id,
            device_type,
            client_policy_key.as_deref(),
        )
        .await?;

        w.end(); // Provision
        Ok(w.into_bytes())
    }

    async fn handle_item_operations(&self, user_id: &str, root: Option<&Element>) -> SyncResult<Vec<u8>> {
        let fetches = root.map(parse_item_operations_request).unwrap_or_default();

        let mut w = WbxmlWriter::new();
        w.header();
        w.page(codepage::ITEM_OPERATIONS);
        w.start(item_operations::ITEM_OPERATIONS, true);
        w.write_text_element(item_operations::STATUS, "1");

        item_ops_handler::handle_item_operations(&mut w, self.mail_store.as_ref(), user_id, &fetches).await?;

        w.end(); // ItemOperations
        Ok(w.into_bytes())
    }

    fn handle_settings(&self) -> Vec<u8> {
        let mut w = WbxmlWriter::new();
        w.header();
        w.page(codepage::SETTINGS);
        w.start(settings::SETTINGS, true);
        settings_handler::write_settings_response(&mut w);
        w.end(); // Settings
        w.into_bytes()
    }

    async fn handle_search(&self, root: Option<&Element>) -> SyncResult<Vec<u8>> {
        let query = root
            .and_then(|r| r.child(codepage::SEARCH, search::STORE))
            .and_then(|store| store.child_text(codepage::SEARCH, search::QUERY))
            .unwrap_or("")
            .to_string();

        let mut w = WbxmlWriter::new();
        w.header();
        w.page(codepage::SEARCH);
        w.start(search::SEARCH, true);
        search_handler::handle_search(&mut w, self.directory.as_deref(), &query).await?;
        w.end(); // Search
        Ok(w.into_bytes())
    }
}

/// A Cmd the dispatcher doesn't recognize gets a minimal, well-formed
/// protocol-error response rather than a hard failure — matching how real
/// EAS servers respond to commands outside the set they implement.
fn unsupported_command_response(cmd: &str) -> Vec<u8> {
    tracing::warn!(cmd, "unsupported EAS command");
    let mut w = WbxmlWriter::new();
    w.header();
    w.page(codepage::AIRSYNC);
    w.write_text_element(airsync::STATUS, "2");
    w.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiate_defaults_to_modern_when_absent() {
        assert_eq!(negotiate_protocol_version(None).unwrap(), DEFAULT_PROTOCOL_VERSION_MODERN);
    }

    #[test]
    fn test_negotiate_accepts_supported_version() {
        assert_eq!(negotiate_protocol_version(Some("14.1")).unwrap(), "14.1");
    }

    #[test]
    fn test_negotiate_rejects_unsupported_version() {
        assert!(negotiate_protocol_version(Some("2.5")).is_err());
    }

    // --- end-to-end dispatch -------------------------------------------

    use std::sync::Mutex as StdMutex;

    use chrono::Utc;
    use eas_core::types::MailItem;
    use eas_db::pool::DbConfig;

    use crate::collaborators::{ChangeSignal, DirectoryEntry};

    struct StubMailStore {
        items: StdMutex<Vec<MailItem>>,
    }

    impl StubMailStore {
        fn with_one_item() -> Self {
            StubMailStore {
                items: StdMutex::new(vec![MailItem {
                    id: 1,
                    subject: "hello".into(),
                    from: "a@example.com".into(),
                    to: "b@example.com".into(),
                    received_at: Utc::now(),
                    is_read: false,
                    body_plain: Some("hi".into()),
                    body_html: None,
                    mime_content: None,
                    message_id: None,
                }]),
            }
        }
    }

    impl MailStore for StubMailStore {
        async fn list_folder(&self, _user_id: &str, _folder_id: &str, limit: usize, exclude: &[i64]) -> SyncResult<Vec<MailItem>> {
            let mut items = self.items.lock().unwrap().clone();
            items.retain(|i| !exclude.contains(&i.id));
            items.truncate(limit);
            Ok(items)
        }

        async fn get_items(&self, _user_id: &str, ids: &[i64]) -> SyncResult<Vec<MailItem>> {
            Ok(self.items.lock().unwrap().iter().filter(|i| ids.contains(&i.id)).cloned().collect())
        }

        async fn max_item_id(&self, _user_id: &str, _folder_id: &str) -> SyncResult<Option<i64>> {
            Ok(self.items.lock().unwrap().iter().map(|i| i.id).max())
        }
    }

    struct NeverSignal;
    impl ChangeSignal for NeverSignal {
        async fn wait(&mut self) {
            std::future::pending::<()>().await
        }
    }

    struct StubNotifier;
    impl ChangeNotifier for StubNotifier {
        type Signal = NeverSignal;
        async fn subscribe(&self, _user_id: &str, _folder_ids: &[String]) -> SyncResult<Self::Signal> {
            Ok(NeverSignal)
        }
        async fn unsubscribe(&self, _signal: Self::Signal) {}
    }

    struct StubDirectory;
    impl DirectoryLookup for StubDirectory {
        async fn resolve(&self, _query: &str) -> SyncResult<Vec<DirectoryEntry>> {
            Ok(Vec::new())
        }
    }

    async fn test_dispatcher() -> Dispatcher<StubMailStore, StubNotifier, StubDirectory> {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Dispatcher {
            db,
            registry: KeyedLockRegistry::new(),
            cache: IdempotencyCache::new(128),
            mail_store: Arc::new(StubMailStore::with_one_item()),
            notifier: Arc::new(StubNotifier),
            directory: None::<Arc<StubDirectory>>,
            config: DispatcherConfig::default(),
        }
    }

    fn encode(build: impl FnOnce(&mut WbxmlWriter)) -> Vec<u8> {
        let mut w = WbxmlWriter::new();
        w.header();
        build(&mut w);
        w.into_bytes()
    }

    /// A device that hasn't provisioned yet is rejected before any handler
    /// runs, for every command except `Provision` itself (§4.5).
    #[tokio::test]
    async fn test_unprovisioned_device_is_gated() {
        let dispatcher = test_dispatcher().await;
        let err = dispatcher
            .dispatch("FolderSync", "alice", "DEVICE1", "iPhone", Some("16.1"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotProvisioned));
    }

    /// Provision's two-phase handshake issues a real `PolicyKey` on the
    /// second call, after which the same device can reach FolderSync and
    /// Sync (§4.3, §4.5).
    #[tokio::test]
    async fn test_provision_then_foldersync_then_sync_end_to_end() {
        let dispatcher = test_dispatcher().await;

        // Phase 1: policy download, no PolicyKey in the request at all.
        dispatcher
            .dispatch("Provision", "alice", "DEVICE1", "iPhone", Some("16.1"), None)
            .await
            .unwrap();

        let device = dispatcher.db.devices().load("alice", "DEVICE1").await.unwrap().unwrap();
        assert!(!device.is_provisioned);

        // Phase 2: acknowledge with the temporary key to receive the real one.
        let phase_two_body = encode(|w| {
            w.page(codepage::PROVISION);
            w.start(provision::PROVISION, true);
            w.start(provision::POLICIES, true);
            w.start(provision::POLICY, true);
            w.write_text_element(provision::POLICY_KEY, "0");
            w.end();
            w.end();
            w.end();
        });
        dispatcher
            .dispatch("Provision", "alice", "DEVICE1", "iPhone", Some("16.1"), Some(&phase_two_body))
            .await
            .unwrap();

        let device = dispatcher.db.devices().load("alice", "DEVICE1").await.unwrap().unwrap();
        assert!(device.is_provisioned);

        // A now-provisioned device reaches FolderSync.
        let foldersync_body = encode(|w| {
            w.page(codepage::FOLDER_HIERARCHY);
            w.start(folder_hierarchy::FOLDER_SYNC, true);
            w.write_text_element(folder_hierarchy::SYNC_KEY, "0");
            w.end();
        });
        let response = dispatcher
            .dispatch("FolderSync", "alice", "DEVICE1", "iPhone", Some("16.1"), Some(&foldersync_body))
            .await
            .unwrap();
        assert!(!response.wbxml.is_empty());

        // An initial Sync against the Inbox (collection "2") picks up the
        // seeded item and advances past the zero SyncKey.
        let sync_body = encode(|w| {
            w.page(codepage::AIRSYNC);
            w.start(airsync::SYNC, true);
            w.start(airsync::COLLECTIONS, true);
            w.start(airsync::COLLECTION, true);
            w.write_text_element(airsync::SYNC_KEY, "0");
            w.write_text_element(airsync::COLLECTION_ID, "2");
            w.end();
            w.end();
            w.end();
        });
        let response = dispatcher
            .dispatch("Sync", "alice", "DEVICE1", "iPhone", Some("16.1"), Some(&sync_body))
            .await
            .unwrap();
        assert_eq!(response.negotiated_protocol_version, "16.1");
        assert!(!response.wbxml.is_empty());
    }

    /// An unrecognized `Cmd` still gets a well-formed response rather than
    /// a hard failure, once the device is provisioned.
    #[tokio::test]
    async fn test_unknown_command_returns_protocol_error_status() {
        let dispatcher = test_dispatcher().await;
        dispatcher.db.devices().load_or_create("alice", "DEVICE1", "iPhone").await.unwrap();
        dispatcher.db.devices().mark_provisioned("alice", "DEVICE1", "1234567890").await.unwrap();

        let response = dispatcher
            .dispatch("Frobnicate", "alice", "DEVICE1", "iPhone", Some("16.1"), None)
            .await
            .unwrap();
        assert!(!response.wbxml.is_empty());
    }
}
