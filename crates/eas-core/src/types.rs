//! # Domain Types
//!
//! Core data types shared by every layer of the EAS gateway: the wire-level
//! identity of a sync session (`SyncKey`), the durable per-collection cursor
//! (`CollectionState`), and the read-only view the gateway expects from the
//! external mail store (`MailItem`).
//!
//! ## Why a newtype for SyncKey?
//! The wire form of a SyncKey is a string (the protocol permits non-numeric
//! keys), but internally a numeric counter is what every comparison in the
//! state machine actually needs. `SyncKey` keeps the wire string as the
//! canonical identity and derives the counter from it.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// SyncKey
// =============================================================================

/// A textual sync cursor. Canonical form is a decimal counter starting at
/// `"0"`. `"0"` always means "client has nothing for this collection; reset".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncKey(String);

impl SyncKey {
    /// The reset key every collection and every device starts from.
    pub fn zero() -> Self {
        SyncKey("0".to_string())
    }

    /// Builds a SyncKey from a counter value.
    pub fn from_counter(counter: u64) -> Self {
        SyncKey(counter.to_string())
    }

    /// Parses a SyncKey from the wire string of a request.
    pub fn from_wire(s: impl Into<String>) -> Self {
        SyncKey(s.into())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == "0"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric counter this key represents, if it parses as one.
    /// Non-numeric keys (permitted on the wire) never equal a numeric key.
    pub fn as_counter(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for SyncKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// DeviceRecord
// =============================================================================

/// Per (user, device) provisioning state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub user_id: String,
    pub device_id: String,
    pub device_type: String,
    pub is_provisioned: bool,
    /// The 10-digit string `"1234567890"` once provisioning is complete,
    /// else `"0"`.
    pub policy_key: String,
}

impl DeviceRecord {
    pub fn new_unprovisioned(
        user_id: impl Into<String>,
        device_id: impl Into<String>,
        device_type: impl Into<String>,
    ) -> Self {
        DeviceRecord {
            user_id: user_id.into(),
            device_id: device_id.into(),
            device_type: device_type.into(),
            is_provisioned: false,
            policy_key: "0".to_string(),
        }
    }
}

// =============================================================================
// CollectionState
// =============================================================================

/// Per (user, device, collection) sync cursor and pending-batch bookkeeping.
///
/// Invariants: `pending_sync_key` is `Some` iff a batch is awaiting client
/// confirmation; while pending, `pending_item_ids` and `synced_ids` are
/// disjoint; on commit, pending ids move into `synced_ids` and the pending
/// fields reset to `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionState {
    pub user_id: String,
    pub device_id: String,
    pub collection_id: String,
    pub sync_key: SyncKey,
    pub counter: u64,
    /// Ordered, most-recent-last; capped at `SYNCED_IDS_CAP`.
    pub synced_ids: Vec<i64>,
    pub pending_sync_key: Option<SyncKey>,
    pub pending_max_id: Option<i64>,
    pub pending_item_ids: Option<Vec<i64>>,
}

/// Most-recent synced ids retained per collection; older ids are below any
/// active pagination window and are dropped on commit.
pub const SYNCED_IDS_CAP: usize = 2_000;

impl CollectionState {
    pub fn fresh(
        user_id: impl Into<String>,
        device_id: impl Into<String>,
        collection_id: impl Into<String>,
    ) -> Self {
        CollectionState {
            user_id: user_id.into(),
            device_id: device_id.into(),
            collection_id: collection_id.into(),
            sync_key: SyncKey::zero(),
            counter: 0,
            synced_ids: Vec::new(),
            pending_sync_key: None,
            pending_max_id: None,
            pending_item_ids: None,
        }
    }

    pub fn reset(&mut self) {
        self.sync_key = SyncKey::zero();
        self.counter = 0;
        self.synced_ids.clear();
        self.pending_sync_key = None;
        self.pending_max_id = None;
        self.pending_item_ids = None;
    }

    pub fn stage_pending(&mut self, new_key: SyncKey, ids: Vec<i64>) {
        self.counter += 1;
        self.pending_max_id = ids.iter().copied().max();
        self.pending_sync_key = Some(new_key);
        self.pending_item_ids = Some(ids);
    }

    pub fn commit_pending(&mut self) {
        if let Some(ids) = self.pending_item_ids.take() {
            self.synced_ids.extend(ids);
            let len = self.synced_ids.len();
            if len > SYNCED_IDS_CAP {
                self.synced_ids.drain(0..len - SYNCED_IDS_CAP);
            }
        }
        if let Some(key) = self.pending_sync_key.take() {
            self.sync_key = key;
        }
        self.pending_max_id = None;
    }

    pub fn has_pending(&self) -> bool {
        self.pending_sync_key.is_some()
    }
}

// =============================================================================
// FolderHierarchyState
// =============================================================================

/// Per (user, device) folder hierarchy sync cursor. The hierarchy itself is
/// static (seven system folders), so only key advancement is stateful.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderHierarchyState {
    pub user_id: String,
    pub device_id: String,
    pub sync_key: SyncKey,
    pub counter: u64,
}

impl FolderHierarchyState {
    pub fn fresh(user_id: impl Into<String>, device_id: impl Into<String>) -> Self {
        FolderHierarchyState {
            user_id: user_id.into(),
            device_id: device_id.into(),
            sync_key: SyncKey::zero(),
            counter: 0,
        }
    }
}

// =============================================================================
// SyncBatch
// =============================================================================

/// An immutable value produced by the codec for a single Sync response.
/// Cached keyed by (user, device, collection, pending_sync_key) for
/// byte-identical idempotent resends.
#[derive(Debug, Clone)]
pub struct SyncBatch {
    pub response_sync_key: SyncKey,
    pub payload: Vec<u8>,
    pub sent_count: usize,
    pub more_available: bool,
}

// =============================================================================
// MailItem
// =============================================================================

/// Read-only view of a message, as consumed from the external mail store.
/// Ordering contract: items for a folder are returned newest-first by `id`;
/// `id` is monotonic with receipt order within a folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailItem {
    pub id: i64,
    pub subject: String,
    pub from: String,
    pub to: String,
    pub received_at: chrono::DateTime<chrono::Utc>,
    pub is_read: bool,
    pub body_plain: Option<String>,
    pub body_html: Option<String>,
    pub mime_content: Option<Vec<u8>>,
    pub message_id: Option<String>,
}

// =============================================================================
// BodyPreference
// =============================================================================

/// A client-supplied body type preference. Multiple entries may be present
/// per request; the body pipeline selects one per the rules in
/// [`crate::body`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyPreference {
    pub body_type: BodyType,
    pub truncation_size: Option<u32>,
    pub all_or_none: bool,
}

/// The four AirSyncBase body types a client may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum BodyType {
    Plain = 1,
    Html = 2,
    Rtf = 3,
    Mime = 4,
}

impl BodyType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(BodyType::Plain),
            2 => Some(BodyType::Html),
            3 => Some(BodyType::Rtf),
            4 => Some(BodyType::Mime),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_key_zero() {
        let key = SyncKey::zero();
        assert!(key.is_zero());
        assert_eq!(key.as_str(), "0");
    }

    #[test]
    fn test_sync_key_counter_roundtrip() {
        let key = SyncKey::from_counter(42);
        assert_eq!(key.as_counter(), Some(42));
        assert_eq!(key.as_str(), "42");
    }

    #[test]
    fn test_collection_state_stage_and_commit() {
        let mut state = CollectionState::fresh("u1", "d1", "1");
        state.stage_pending(SyncKey::from_counter(1), vec![111, 110, 109]);
        assert!(state.has_pending());
        assert_eq!(state.pending_max_id, Some(111));

        state.commit_pending();
        assert!(!state.has_pending());
        assert_eq!(state.synced_ids, vec![111, 110, 109]);
        assert_eq!(state.sync_key, SyncKey::from_counter(1));
    }

    #[test]
    fn test_synced_ids_cap() {
        let mut state = CollectionState::fresh("u1", "d1", "1");
        let ids: Vec<i64> = (0..(SYNCED_IDS_CAP as i64 + 50)).collect();
        state.stage_pending(SyncKey::from_counter(1), ids);
        state.commit_pending();
        assert_eq!(state.synced_ids.len(), SYNCED_IDS_CAP);
        // oldest ids (0..50) should have been dropped
        assert_eq!(state.synced_ids[0], 50);
    }

    #[test]
    fn test_body_type_from_u8() {
        assert_eq!(BodyType::from_u8(2), Some(BodyType::Html));
        assert_eq!(BodyType::from_u8(9), None);
    }
}
