//! External collaborator interfaces (§6).
//!
//! The state machine, dispatcher, and Ping engine are generic over these
//! traits rather than depending on `dyn` objects: the gateway binary is the
//! only place that needs to pick a concrete mail store, auth service, and
//! clock, and generics let every handler stay `async fn` without pulling in
//! an async-trait macro this workspace otherwise has no use for.

use eas_core::types::MailItem;

use crate::error::SyncResult;

/// Read access to the external mail store: folders and messages.
///
/// `list_folder`/`get_items` return newest-first by id, matching the
/// ordering contract MailItem's docs describe in §3.
pub trait MailStore: Send + Sync {
    /// Lists up to `limit` items in `folder_id`, newest-first by id,
    /// excluding item ids in `exclude`.
    fn list_folder(
        &self,
        user_id: &str,
        folder_id: &str,
        limit: usize,
        exclude: &[i64],
    ) -> impl std::future::Future<Output = SyncResult<Vec<MailItem>>> + Send;

    /// Resolves a specific set of item ids, for ItemOperations/Fetch.
    fn get_items(
        &self,
        user_id: &str,
        ids: &[i64],
    ) -> impl std::future::Future<Output = SyncResult<Vec<MailItem>>> + Send;

    /// Returns the highest item id currently stored for a folder, used by
    /// the stuck-state recovery check in §4.4.
    fn max_item_id(
        &self,
        user_id: &str,
        folder_id: &str,
    ) -> impl std::future::Future<Output = SyncResult<Option<i64>>> + Send;
}

/// A single-shot signal the Ping engine waits on: either a change
/// notification fires it, or the caller's own heartbeat deadline elapses.
pub trait ChangeSignal: Send {
    fn wait(&mut self) -> impl std::future::Future<Output = ()> + Send;
}

/// Subscribes requests to folder change notifications for Ping (§4.7).
///
/// Implementations MUST arm the subscription (register it in whatever
/// fan-out registry backs notifications) before `subscribe` returns, per
/// the resolved race in §4.7.
pub trait ChangeNotifier: Send + Sync {
    type Signal: ChangeSignal;

    fn subscribe(
        &self,
        user_id: &str,
        folder_ids: &[String],
    ) -> impl std::future::Future<Output = SyncResult<Self::Signal>> + Send;

    fn unsubscribe(&self, signal: Self::Signal) -> impl std::future::Future<Output = ()> + Send;
}

/// An authenticated identity resolved from an HTTP Basic credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

/// Authenticates the Basic credential extracted from the request.
pub trait AuthService: Send + Sync {
    fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> impl std::future::Future<Output = SyncResult<AuthenticatedUser>> + Send;
}

/// Wall-clock access, injected so Ping heartbeat tests can control time.
pub trait Clock: Send + Sync {
    fn now(&self) -> chrono::DateTime<chrono::Utc>;
}

/// Production clock backed by `chrono::Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::Utc::now()
    }
}

/// A single Global Address List match (§10.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub display_name: String,
    pub email_address: String,
}

/// Best-effort GAL lookup for the Search command (§10.7). Optional: a
/// dispatcher with no `DirectoryLookup` wired up answers Search with an
/// empty result set rather than failing the command.
pub trait DirectoryLookup: Send + Sync {
    fn resolve(
        &self,
        query: &str,
    ) -> impl std::future::Future<Output = SyncResult<Vec<DirectoryEntry>>> + Send;
}
