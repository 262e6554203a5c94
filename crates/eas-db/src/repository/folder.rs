//! Per-device folder hierarchy sync cursor repository.

use eas_core::types::{FolderHierarchyState, SyncKey};
use sqlx::SqlitePool;

use crate::error::DbResult;

pub struct FolderHierarchyRepository {
    pool: SqlitePool,
}

impl FolderHierarchyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        FolderHierarchyRepository { pool }
    }

    /// Loads the current state, or a fresh zero state if this device has
    /// never run FolderSync.
    pub async fn load_state(
        &self,
        user_id: &str,
        device_id: &str,
    ) -> DbResult<FolderHierarchyState> {
        let row = sqlx::query!(
            r#"
            SELECT sync_key, counter as "counter: i64"
            FROM folder_hierarchy_states
            WHERE user_id = ? AND device_id = ?
            "#,
            user_id,
            device_id
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(FolderHierarchyState::fresh(user_id, device_id));
        };

        Ok(FolderHierarchyState {
            user_id: user_id.to_string(),
            device_id: device_id.to_string(),
            sync_key: SyncKey::from_wire(row.sync_key),
            counter: row.counter as u64,
        })
    }

    /// Persists the state, upserting on the primary key.
    pub async fn save(&self, state: &FolderHierarchyState) -> DbResult<()> {
        let counter = state.counter as i64;
        let sync_key = state.sync_key.as_str();

        sqlx::query!(
            r#"
            INSERT INTO folder_hierarchy_states (user_id, device_id, sync_key, counter)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id, device_id) DO UPDATE SET
                sync_key = excluded.sync_key,
                counter = excluded.counter
            "#,
            state.user_id,
            state.device_id,
            sync_key,
            counter
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Advances the sync key to the next counter value, as the fixed
    /// 7-folder hierarchy has no per-folder change tracking to reset.
    pub async fn advance(&self, user_id: &str, device_id: &str) -> DbResult<FolderHierarchyState> {
        let mut state = self.load_state(user_id, device_id).await?;
        state.counter += 1;
        state.sync_key = SyncKey::from_counter(state.counter);
        self.save(&state).await?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};

    async fn seeded_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.devices()
            .load_or_create("alice", "DEVICE1", "iPhone")
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_load_state_defaults_to_fresh() {
        let db = seeded_db().await;
        let state = db
            .folder_hierarchy()
            .load_state("alice", "DEVICE1")
            .await
            .unwrap();
        assert!(state.sync_key.is_zero());
    }

    #[tokio::test]
    async fn test_advance_persists_and_increments() {
        let db = seeded_db().await;
        let folders = db.folder_hierarchy();

        let first = folders.advance("alice", "DEVICE1").await.unwrap();
        assert_eq!(first.counter, 1);

        let second = folders.advance("alice", "DEVICE1").await.unwrap();
        assert_eq!(second.counter, 2);

        let reloaded = folders.load_state("alice", "DEVICE1").await.unwrap();
        assert_eq!(reloaded.counter, 2);
        assert_eq!(reloaded.sync_key, second.sync_key);
    }
}
