//! Typed request extraction from decoded WBXML element trees.
//!
//! One function per command, each walking the generic [`Element`] tree
//! `eas_core::wbxml::decode` produces and pulling out exactly the fields
//! the corresponding handler needs. Keeping this declarative (accessor
//! calls, not byte scanning) is the payoff of the tree-shaped decoder.

use eas_core::types::{BodyPreference, BodyType, SyncKey};
use eas_core::wbxml::tokens::{airsync, airsyncbase, codepage, ping, provision};
use eas_core::wbxml::{Element, Node};

use crate::error::{SyncError, SyncResult};

/// A single `<Collection>` block of a Sync request.
#[derive(Debug, Clone)]
pub struct SyncCollectionRequest {
    pub collection_id: String,
    pub class: Option<String>,
    pub client_key: SyncKey,
    pub window_size: usize,
    pub fetch_server_ids: Vec<String>,
    pub body_preferences: Vec<BodyPreference>,
}

/// Finds every descendant (not just direct children) matching `(codepage, tag)`.
/// `BodyPreference` blocks live under `<Options>`, which this codec does not
/// model as its own token, so direct-child lookup alone would miss them.
fn find_descendants<'a>(elem: &'a Element, codepage: u8, tag: u8, out: &mut Vec<&'a Element>) {
    for node in &elem.children {
        if let Node::Element(child) = node {
            if child.codepage == codepage && child.tag == tag {
                out.push(child);
            }
            find_descendants(child, codepage, tag, out);
        }
    }
}

fn parse_body_preferences(collection: &Element) -> Vec<BodyPreference> {
    let mut prefs_elems = Vec::new();
    find_descendants(
        collection,
        codepage::AIRSYNCBASE,
        airsyncbase::BODY_PREFERENCE,
        &mut prefs_elems,
    );

    prefs_elems
        .into_iter()
        .filter_map(|pref| {
            let body_type = pref
                .child_text(codepage::AIRSYNCBASE, airsyncbase::TYPE)?
                .parse::<u8>()
                .ok()
                .and_then(BodyType::from_u8)?;
            let truncation_size = pref
                .child_text(codepage::AIRSYNCBASE, airsyncbase::TRUNCATION_SIZE)
                .and_then(|s| s.parse::<u32>().ok());
            let all_or_none = pref
                .child_text(codepage::AIRSYNCBASE, airsyncbase::ALL_OR_NONE)
                .map(|s| s == "1")
                .unwrap_or(false);

            Some(BodyPreference {
                body_type,
                truncation_size,
                all_or_none,
            })
        })
        .collect()
}

/// Extracts every `<Collection>` from a decoded Sync request.
pub fn parse_sync_request(root: &Element) -> SyncResult<Vec<SyncCollectionRequest>> {
    let collections_elem = root
        .child(codepage::AIRSYNC, airsync::COLLECTIONS)
        .ok_or_else(|| SyncError::MalformedRequest("Sync request has no <Collections>".into()))?;

    let mut out = Vec::new();
    for collection in collections_elem.children_matching(codepage::AIRSYNC, airsync::COLLECTION) {
        let collection_id = collection
            .child_text(codepage::AIRSYNC, airsync::COLLECTION_ID)
            .ok_or_else(|| SyncError::MalformedRequest("Collection missing CollectionId".into()))?
            .to_string();

        let client_key = collection
            .child_text(codepage::AIRSYNC, airsync::SYNC_KEY)
            .map(SyncKey::from_wire)
            .unwrap_or_else(SyncKey::zero);

        let window_size = collection
            .child_text(codepage::AIRSYNC, airsync::WINDOW_SIZE)
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(25);

        let class = collection
            .child_text(codepage::AIRSYNC, airsync::CLASS)
            .map(str::to_string);

        let mut fetch_elems = Vec::new();
        find_descendants(collection, codepage::AIRSYNC, airsync::FETCH, &mut fetch_elems);
        let fetch_server_ids = fetch_elems
            .into_iter()
            .filter_map(|f| f.child_text(codepage::AIRSYNC, airsync::SERVER_ID))
            .map(str::to_string)
            .collect();

        let body_preferences = parse_body_preferences(collection);

        out.push(SyncCollectionRequest {
            collection_id,
            class,
            client_key,
            window_size,
            fetch_server_ids,
            body_preferences,
        });
    }

    Ok(out)
}

/// Extracts the PolicyKey inline string from a Provision request, if present.
/// `None` means "no PolicyKey tag at all" (Phase 1); `Some("0")` means the
/// client is acknowledging (Phase 2).
pub fn parse_provision_policy_key(root: &Element) -> Option<String> {
    root.child(codepage::PROVISION, provision::POLICIES)
        .and_then(|policies| policies.child(codepage::PROVISION, provision::POLICY))
        .and_then(|policy| policy.child_text(codepage::PROVISION, provision::POLICY_KEY))
        .map(str::to_string)
}

/// A decoded Ping request.
#[derive(Debug, Clone)]
pub struct PingRequest {
    pub heartbeat_interval: Option<u32>,
    pub folder_ids: Vec<String>,
}

pub fn parse_ping_request(root: &Element) -> PingRequest {
    let heartbeat_interval = root
        .child_text(codepage::PING, ping::HEARTBEAT_INTERVAL)
        .and_then(|s| s.parse::<u32>().ok());

    let folder_ids = root
        .child(codepage::PING, ping::FOLDERS)
        .map(|folders| {
            folders
                .children_matching(codepage::PING, ping::FOLDER)
                .filter_map(|f| f.child_text(codepage::PING, ping::SERVER_ENTRY_ID))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    PingRequest {
        heartbeat_interval,
        folder_ids,
    }
}

/// Extracts the SyncKey from a FolderSync request.
pub fn parse_foldersync_key(root: &Element) -> SyncKey {
    use eas_core::wbxml::tokens::folder_hierarchy;
    root.child_text(codepage::FOLDER_HIERARCHY, folder_hierarchy::SYNC_KEY)
        .map(SyncKey::from_wire)
        .unwrap_or_else(SyncKey::zero)
}

/// One `<Fetch>` block of an ItemOperations request.
#[derive(Debug, Clone)]
pub struct ItemOperationsFetchRequest {
    pub collection_id: String,
    pub server_id: String,
    pub body_preferences: Vec<BodyPreference>,
}

/// Extracts every `<Fetch>` from a decoded ItemOperations request.
pub fn parse_item_operations_request(root: &Element) -> Vec<ItemOperationsFetchRequest> {
    use eas_core::wbxml::tokens::item_operations;

    root.children_matching(codepage::ITEM_OPERATIONS, item_operations::FETCH)
        .filter_map(|fetch| {
            let collection_id = fetch
                .child_text(codepage::ITEM_OPERATIONS, item_operations::COLLECTION_ID)?
                .to_string();
            let server_id = fetch
                .child_text(codepage::ITEM_OPERATIONS, item_operations::SERVER_ID)?
                .to_string();
            let body_preferences = parse_body_preferences(fetch);

            Some(ItemOperationsFetchRequest {
                collection_id,
                server_id,
                body_preferences,
            })
        })
        .collect()
}
