//! Shared store service wrapper used by the recorder, loader, and engine.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{
    CacheRepository, Database, LibSqlCacheRepository, LibSqlPendingRepository,
    LibSqlSettingsRepository, PendingRepository, SettingsRepository,
};
use crate::error::Error;
use crate::models::{CachedEvent, CachedTicket, PendingCheckin, PendingSwag, Settings, SwagItem};
use crate::Result;

/// Cloneable handle to the local store.
///
/// All components share the one open database. Each method locks, runs a
/// single repository operation, and yields, so every store operation is
/// independently atomic; cross-record consistency is the caller's job
/// (the recorder performs its paired writes back-to-back).
#[derive(Clone)]
pub struct Store {
    db: Arc<Mutex<Database>>,
}

impl Store {
    /// Open the store at the given filesystem path, creating parent
    /// directories as needed.
    pub async fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::StorageUnavailable(e.to_string()))?;
        }

        let db = Database::open(&db_path).await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    /// Open an in-memory store (primarily for tests)
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    // --- cached event data ---

    pub async fn save_event(&self, event: &CachedEvent) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlCacheRepository::new(db.connection())
            .save_event(event)
            .await
    }

    pub async fn event(&self, id: i64) -> Result<Option<CachedEvent>> {
        let db = self.db.lock().await;
        LibSqlCacheRepository::new(db.connection()).event(id).await
    }

    pub async fn event_by_slug(&self, slug: &str) -> Result<Option<CachedEvent>> {
        let db = self.db.lock().await;
        LibSqlCacheRepository::new(db.connection())
            .event_by_slug(slug)
            .await
    }

    pub async fn save_tickets(&self, tickets: &[CachedTicket]) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlCacheRepository::new(db.connection())
            .save_tickets(tickets)
            .await
    }

    pub async fn ticket_by_code(&self, code: &str) -> Result<Option<CachedTicket>> {
        let db = self.db.lock().await;
        LibSqlCacheRepository::new(db.connection())
            .ticket_by_code(code)
            .await
    }

    pub async fn tickets_for_event(&self, event_id: i64) -> Result<Vec<CachedTicket>> {
        let db = self.db.lock().await;
        LibSqlCacheRepository::new(db.connection())
            .tickets_for_event(event_id)
            .await
    }

    pub async fn update_ticket(&self, ticket: &CachedTicket) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlCacheRepository::new(db.connection())
            .update_ticket(ticket)
            .await
    }

    pub async fn save_swag_items(&self, items: &[SwagItem]) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlCacheRepository::new(db.connection())
            .save_swag_items(items)
            .await
    }

    pub async fn swag_items_for_event(&self, event_id: i64) -> Result<Vec<SwagItem>> {
        let db = self.db.lock().await;
        LibSqlCacheRepository::new(db.connection())
            .swag_items_for_event(event_id)
            .await
    }

    pub async fn clear_event(&self, event_id: i64) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlCacheRepository::new(db.connection())
            .clear_event(event_id)
            .await
    }

    // --- pending queue ---

    pub async fn save_checkin(
        &self,
        ticket_code: &str,
        checked_in_at: i64,
        notes: &str,
    ) -> Result<i64> {
        let db = self.db.lock().await;
        LibSqlPendingRepository::new(db.connection())
            .save_checkin(ticket_code, checked_in_at, notes)
            .await
    }

    pub async fn pending_checkin(&self, local_id: i64) -> Result<Option<PendingCheckin>> {
        let db = self.db.lock().await;
        LibSqlPendingRepository::new(db.connection())
            .checkin(local_id)
            .await
    }

    pub async fn unsynced_checkins(&self) -> Result<Vec<PendingCheckin>> {
        let db = self.db.lock().await;
        LibSqlPendingRepository::new(db.connection())
            .unsynced_checkins()
            .await
    }

    pub async fn mark_checkin_synced(&self, local_id: i64, server_reference: &str) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlPendingRepository::new(db.connection())
            .mark_checkin_synced(local_id, server_reference)
            .await
    }

    pub async fn save_swag_collection(
        &self,
        checkin_ref: &str,
        swag_item_id: i64,
        ticket_code: &str,
        collected_at: i64,
    ) -> Result<i64> {
        let db = self.db.lock().await;
        LibSqlPendingRepository::new(db.connection())
            .save_swag_collection(checkin_ref, swag_item_id, ticket_code, collected_at)
            .await
    }

    pub async fn unsynced_swag(&self) -> Result<Vec<PendingSwag>> {
        let db = self.db.lock().await;
        LibSqlPendingRepository::new(db.connection())
            .unsynced_swag()
            .await
    }

    pub async fn mark_swag_synced(&self, local_id: i64) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlPendingRepository::new(db.connection())
            .mark_swag_synced(local_id)
            .await
    }

    /// Unsynced record counts: (check-ins, swag collections)
    pub async fn pending_counts(&self) -> Result<(usize, usize)> {
        let db = self.db.lock().await;
        let repo = LibSqlPendingRepository::new(db.connection());
        let checkins = repo.unsynced_checkin_count().await?;
        let swag = repo.unsynced_swag_count().await?;
        Ok((checkins, swag))
    }

    // --- settings ---

    pub async fn setting(&self, key: &str) -> Result<Option<String>> {
        let db = self.db.lock().await;
        LibSqlSettingsRepository::new(db.connection()).get(key).await
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlSettingsRepository::new(db.connection())
            .set(key, value)
            .await
    }

    pub async fn settings(&self) -> Result<Settings> {
        let db = self.db.lock().await;
        LibSqlSettingsRepository::new(db.connection()).load().await
    }

    pub async fn offline_mode(&self) -> Result<bool> {
        Ok(self.settings().await?.offline_mode)
    }

    pub async fn set_offline_mode(&self, enabled: bool) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlSettingsRepository::new(db.connection())
            .save(&Settings {
                offline_mode: enabled,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pending_counts() {
        let store = Store::open_in_memory().await.unwrap();

        assert_eq!(store.pending_counts().await.unwrap(), (0, 0));

        store.save_checkin("ABC123", 1_000, "").await.unwrap();
        store
            .save_swag_collection("local:1", 5, "ABC123", 1_100)
            .await
            .unwrap();

        assert_eq!(store.pending_counts().await.unwrap(), (1, 1));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_offline_mode_persists() {
        let store = Store::open_in_memory().await.unwrap();

        assert!(!store.offline_mode().await.unwrap());
        store.set_offline_mode(true).await.unwrap();
        assert!(store.offline_mode().await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_creates_parent_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("nested").join("gatecheck.db");

        let store = Store::open(&db_path).await.unwrap();
        store.set_setting("probe", "1").await.unwrap();

        assert!(db_path.exists());
    }
}
