//! Concrete stand-ins for the external collaborators §6 names: a mail
//! store, a change notifier, an auth service, and a directory lookup.
//!
//! These interfaces are deliberately out of this workspace's scope (§1
//! lists the real mail store and user directory as external systems this
//! gateway proxies to); a process that actually serves ActiveSync devices
//! still needs *something* behind each trait to boot, so this module wires
//! up in-memory defaults a deployment swaps out behind the same traits.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use eas_sync::{
    AuthService, AuthenticatedUser, ChangeNotifier, ChangeSignal, DirectoryEntry, DirectoryLookup,
    MailStore, SyncResult,
};
use tokio::sync::Notify;

use eas_core::types::MailItem;

/// An in-memory mailbox keyed by `(user_id, folder_id)`. Seeds a one-item
/// Inbox for every user on first touch, so a freshly-provisioned device has
/// something to sync.
pub struct InMemoryMailStore {
    folders: Mutex<HashMap<(String, String), Vec<MailItem>>>,
}

impl InMemoryMailStore {
    pub fn new() -> Self {
        InMemoryMailStore {
            folders: Mutex::new(HashMap::new()),
        }
    }

    fn folder_or_seed(&self, user_id: &str, folder_id: &str) -> Vec<MailItem> {
        let mut folders = self.folders.lock().expect("mail store mutex poisoned");
        let key = (user_id.to_string(), folder_id.to_string());
        if folder_id == "2" && !folders.contains_key(&key) {
            folders.insert(key.clone(), vec![welcome_message()]);
        }
        folders.get(&key).cloned().unwrap_or_default()
    }
}

impl Default for InMemoryMailStore {
    fn default() -> Self {
        Self::new()
    }
}

fn welcome_message() -> MailItem {
    MailItem {
        id: 1,
        subject: "Welcome to your mailbox".to_string(),
        from: "postmaster@example.com".to_string(),
        to: "you@example.com".to_string(),
        received_at: Utc::now(),
        is_read: false,
        body_plain: Some("Your device is now syncing with this gateway.".to_string()),
        body_html: None,
        mime_content: None,
        message_id: Some("<welcome@eas-gateway>".to_string()),
    }
}

impl MailStore for InMemoryMailStore {
    async fn list_folder(
        &self,
        user_id: &str,
        folder_id: &str,
        limit: usize,
        exclude: &[i64],
    ) -> SyncResult<Vec<MailItem>> {
        let mut items = self.folder_or_seed(user_id, folder_id);
        items.retain(|item| !exclude.contains(&item.id));
        items.sort_by(|a, b| b.id.cmp(&a.id));
        items.truncate(limit);
        Ok(items)
    }

    async fn get_items(&self, user_id: &str, ids: &[i64]) -> SyncResult<Vec<MailItem>> {
        let folders = self.folders.lock().expect("mail store mutex poisoned");
        Ok(folders
            .iter()
            .filter(|((u, _), _)| u == user_id)
            .flat_map(|(_, items)| items.iter())
            .filter(|item| ids.contains(&item.id))
            .cloned()
            .collect())
    }

    async fn max_item_id(&self, user_id: &str, folder_id: &str) -> SyncResult<Option<i64>> {
        Ok(self
            .folder_or_seed(user_id, folder_id)
            .iter()
            .map(|item| item.id)
            .max())
    }
}

/// A `ChangeSignal` backed by `tokio::sync::Notify`.
pub struct NotifySignal {
    notify: std::sync::Arc<Notify>,
}

impl ChangeSignal for NotifySignal {
    async fn wait(&mut self) {
        self.notify.notified().await;
    }
}

/// Fans out change notifications per user via one `Notify` per user id.
/// Real deployments would replace this with a subscription against the
/// actual mail store's own change feed.
///
/// `notify_waiters()` only wakes tasks already parked in `.notified()`, so
/// there is a narrow race between `subscribe()` returning and the Ping
/// engine's first poll of `wait()` where a notification could be missed;
/// a production notifier would use a registry of oneshot channels handed
/// out at `subscribe()` time to close it.
pub struct InMemoryChangeNotifier {
    per_user: Mutex<HashMap<String, std::sync::Arc<Notify>>>,
}

impl InMemoryChangeNotifier {
    pub fn new() -> Self {
        InMemoryChangeNotifier {
            per_user: Mutex::new(HashMap::new()),
        }
    }

    /// Wakes every Ping currently waiting on `user_id`.
    pub fn notify_user(&self, user_id: &str) {
        let per_user = self.per_user.lock().expect("notifier mutex poisoned");
        if let Some(notify) = per_user.get(user_id) {
            notify.notify_waiters();
        }
    }
}

impl Default for InMemoryChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier for InMemoryChangeNotifier {
    type Signal = NotifySignal;

    async fn subscribe(&self, user_id: &str, _folder_ids: &[String]) -> SyncResult<Self::Signal> {
        let mut per_user = self.per_user.lock().expect("notifier mutex poisoned");
        let notify = per_user
            .entry(user_id.to_string())
            .or_insert_with(|| std::sync::Arc::new(Notify::new()))
            .clone();
        Ok(NotifySignal { notify })
    }

    async fn unsubscribe(&self, _signal: Self::Signal) {}
}

/// Accepts any Basic credential, treating the username as the user id.
/// A real deployment swaps this for a check against the mailbox directory.
pub struct StaticAuthService;

impl AuthService for StaticAuthService {
    async fn authenticate(&self, username: &str, _password: &str) -> SyncResult<AuthenticatedUser> {
        Ok(AuthenticatedUser {
            user_id: username.to_string(),
        })
    }
}

/// A `DirectoryLookup` with no entries; Search always answers with an
/// empty result set (§10.7).
pub struct EmptyDirectory;

impl DirectoryLookup for EmptyDirectory {
    async fn resolve(&self, _query: &str) -> SyncResult<Vec<DirectoryEntry>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inbox_is_seeded_on_first_list() {
        let store = InMemoryMailStore::new();
        let items = store.list_folder("alice", "2", 25, &[]).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 1);
    }

    #[tokio::test]
    async fn test_list_folder_respects_exclude() {
        let store = InMemoryMailStore::new();
        store.list_folder("alice", "2", 25, &[]).await.unwrap();
        let items = store.list_folder("alice", "2", 25, &[1]).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_change_notifier_wakes_waiter() {
        let notifier = std::sync::Arc::new(InMemoryChangeNotifier::new());
        let mut signal = notifier.subscribe("alice", &[]).await.unwrap();

        let waiter = tokio::spawn(async move {
            signal.wait().await;
        });
        // Give the spawned task a chance to register as a waiter before
        // notify_waiters() fires; notify_waiters() (unlike notify_one())
        // stores no permit for a waiter that arrives afterward.
        tokio::task::yield_now().await;
        notifier.notify_user("alice");

        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("signal should have fired")
            .unwrap();
    }
}
