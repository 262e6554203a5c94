//! The Sync command state machine (§4.4).
//!
//! One `<Collection>` block is processed per call. The outcome (and thus
//! the `Status`/`SyncKey` to report) isn't known until after `Commands`/
//! `MoreAvailable`/`Responses` have been built, so the caller (the
//! dispatcher) runs this module into a scratch `WbxmlWriter`, then writes
//! `SyncKey`/`CollectionId`/`Class`/`Status` into the real document ahead
//! of that fragment — the order required for a client to accept the
//! response (§4.4) — and splices the fragment in afterward.

use eas_core::body::{select_preference, SelectionContext};
use eas_core::types::{CollectionState, MailItem, SyncBatch, SyncKey};
use eas_core::wbxml::tokens::{airsync, codepage};
use eas_core::wbxml::WbxmlWriter;
use eas_db::repository::collection::CollectionRepository;

use crate::collaborators::MailStore;
use crate::error::SyncResult;
use crate::idempotency::IdempotencyCache;
use crate::requests::SyncCollectionRequest;
use crate::wire::write_mail_item_application_data;

/// A client key is considered unreconcilable once it drifts this far from
/// the server's confirmed counter (§4.4 step 4).
const STALE_KEY_THRESHOLD: i64 = 3;

/// WBXML Status codes this module can produce (§7).
pub mod status {
    pub const SUCCESS: u8 = 1;
    pub const PROTOCOL_ERROR: u8 = 2;
    pub const SERVER_ERROR: u8 = 3;
}

/// What the caller needs to finish writing a `<Collection>` block: the
/// `SyncKey`/`Status` pair, plus whether this call actually touched the
/// writer (a rejected collection writes nothing past its own tags).
pub struct CollectionOutcome {
    pub status: u8,
    pub response_sync_key: SyncKey,
}

/// Runs one collection's request through the state machine, writing its
/// `Commands`/`MoreAvailable`/`Responses` straight into `w` on success.
///
/// `max_window_size` and `expected_class` come from the gateway's
/// configuration and the static folder table respectively; both are looked
/// up outside this module since neither is collection-state.
pub async fn process_collection<M: MailStore>(
    w: &mut WbxmlWriter,
    repo: &CollectionRepository,
    cache: &IdempotencyCache,
    mail_store: &M,
    user_id: &str,
    device_id: &str,
    req: &SyncCollectionRequest,
    max_window_size: usize,
    expected_class: Option<&str>,
) -> SyncResult<CollectionOutcome> {
    if let (Some(expected), Some(actual)) = (expected_class, req.class.as_deref()) {
        if expected != actual {
            return Ok(CollectionOutcome {
                status: status::PROTOCOL_ERROR,
                response_sync_key: SyncKey::zero(),
            });
        }
    }

    let mut state = repo
        .load_state(user_id, device_id, &req.collection_id)
        .await?;

    if req.client_key.is_zero() {
        state = repo.reset(user_id, device_id, &req.collection_id).await?;
        return new_batch(w, repo, cache, mail_store, &mut state, req, max_window_size).await;
    }

    if state.has_pending() {
        let pending_key = state.pending_sync_key.clone().expect("has_pending checked");

        if is_acknowledgment(&req.client_key, &pending_key) {
            state = repo.commit_pending(user_id, device_id, &req.collection_id).await?;
            cache
                .invalidate(user_id, device_id, &req.collection_id, pending_key.as_str())
                .await;
            return new_batch(w, repo, cache, mail_store, &mut state, req, max_window_size).await;
        }

        if req.client_key == state.sync_key {
            if let Some(batch) = cache
                .get(user_id, device_id, &req.collection_id, pending_key.as_str())
                .await
            {
                w.write_raw(&batch.payload);
                return Ok(CollectionOutcome {
                    status: status::SUCCESS,
                    response_sync_key: batch.response_sync_key,
                });
            }
        }
    }

    if is_stale(&req.client_key, &state.sync_key) {
        return Ok(CollectionOutcome {
            status: status::SERVER_ERROR,
            response_sync_key: SyncKey::zero(),
        });
    }

    // Anything that didn't match steps 1-4 (including a key within the
    // reconciliation window that doesn't exactly equal the confirmed key)
    // falls through to building a fresh batch, per §4.4 step 5's "otherwise".
    new_batch(w, repo, cache, mail_store, &mut state, req, max_window_size).await
}

fn is_acknowledgment(client_key: &SyncKey, pending_key: &SyncKey) -> bool {
    if client_key == pending_key {
        return true;
    }
    match (client_key.as_counter(), pending_key.as_counter()) {
        (Some(client), Some(pending)) => client > pending,
        _ => false,
    }
}

fn is_stale(client_key: &SyncKey, server_key: &SyncKey) -> bool {
    if client_key.is_zero() {
        return false;
    }
    match (client_key.as_counter(), server_key.as_counter()) {
        (Some(client), Some(server)) => (client as i64 - server as i64).abs() > STALE_KEY_THRESHOLD,
        // Non-numeric keys never reconcile with a numeric server key.
        _ => true,
    }
}

async fn new_batch<M: MailStore>(
    w: &mut WbxmlWriter,
    repo: &CollectionRepository,
    cache: &IdempotencyCache,
    mail_store: &M,
    state: &mut CollectionState,
    req: &SyncCollectionRequest,
    max_window_size: usize,
) -> SyncResult<CollectionOutcome> {
    let fragment_start = w.bytes().len();
    let window = req.window_size.min(max_window_size).max(1);
    let mut exclude = state.synced_ids.clone();
    if let Some(pending) = &state.pending_item_ids {
        exclude.extend(pending.iter().copied());
    }

    let mut items = mail_store
        .list_folder(user_id_of(state), &req.collection_id, window + 1, &exclude)
        .await?;

    if items.is_empty() && !state.synced_ids.is_empty() {
        if let Some(store_max) = mail_store
            .max_item_id(user_id_of(state), &req.collection_id)
            .await?
        {
            let our_max = state.synced_ids.iter().copied().max().unwrap_or(0);
            if our_max >= store_max {
                state.synced_ids.clear();
                repo.save(state).await?;
                items = mail_store
                    .list_folder(user_id_of(state), &req.collection_id, window + 1, &[])
                    .await?;
            }
        }
    }

    let more_available = items.len() > window;
    items.truncate(window);

    let added_ids: Vec<i64> = items.iter().map(|item| item.id).collect();
    let preference = select_preference(&req.body_preferences, SelectionContext::Sync);

    let wrote_commands = !items.is_empty();
    if wrote_commands {
        w.page(codepage::AIRSYNC);
        w.start(airsync::COMMANDS, true);
        for item in &items {
            write_add(w, item, preference)?;
        }
        w.end(); // Commands
    }

    if more_available {
        w.page(codepage::AIRSYNC);
        w.write_empty_element(airsync::MORE_AVAILABLE);
    }

    let fetch_items = if req.fetch_server_ids.is_empty() {
        Vec::new()
    } else {
        let ids: Vec<i64> = req
            .fetch_server_ids
            .iter()
            .filter_map(|s| s.parse::<i64>().ok())
            .collect();
        mail_store.get_items(user_id_of(state), &ids).await?
    };

    if !fetch_items.is_empty() {
        w.page(codepage::AIRSYNC);
        w.start(airsync::RESPONSES, true);
        for item in &fetch_items {
            write_fetch_response(w, item, preference)?;
        }
        w.end(); // Responses
    }

    // Per §4.4: a response containing only Fetch results must not advance
    // the collection's sync key.
    let advances_key = wrote_commands || more_available;

    if !advances_key {
        return Ok(CollectionOutcome {
            status: status::SUCCESS,
            response_sync_key: state.sync_key.clone(),
        });
    }

    let new_key = SyncKey::from_counter(state.counter + 1);
    let staged = repo
        .stage_pending(user_id_of(state), device_id_of(state), &req.collection_id, new_key.clone(), added_ids)
        .await?;
    *state = staged;

    let batch = SyncBatch {
        response_sync_key: new_key.clone(),
        payload: w.bytes()[fragment_start..].to_vec(),
        sent_count: items.len(),
        more_available,
    };
    cache
        .put(
            user_id_of(state),
            device_id_of(state),
            &req.collection_id,
            new_key.as_str(),
            batch,
        )
        .await;

    Ok(CollectionOutcome {
        status: status::SUCCESS,
        response_sync_key: new_key,
    })
}

fn user_id_of(state: &CollectionState) -> &str {
    &state.user_id
}

fn device_id_of(state: &CollectionState) -> &str {
    &state.device_id
}

fn write_add(
    w: &mut WbxmlWriter,
    item: &MailItem,
    preference: eas_core::types::BodyPreference,
) -> SyncResult<()> {
    w.page(codepage::AIRSYNC);
    w.start(airsync::ADD, true);
    w.write_text_element(airsync::SERVER_ID, &item.id.to_string());
    w.start(airsync::APPLICATION_DATA, true);
    write_mail_item_application_data(w, item, preference)?;
    w.end(); // ApplicationData
    w.end(); // Add
    Ok(())
}

fn write_fetch_response(
    w: &mut WbxmlWriter,
    item: &MailItem,
    preference: eas_core::types::BodyPreference,
) -> SyncResult<()> {
    w.page(codepage::AIRSYNC);
    w.start(airsync::FETCH, true);
    w.write_text_element(airsync::SERVER_ID, &item.id.to_string());
    w.write_text_element(airsync::STATUS, "1");
    w.start(airsync::APPLICATION_DATA, true);
    write_mail_item_application_data(w, item, preference)?;
    w.end(); // ApplicationData
    w.end(); // Fetch
    Ok(())
}
