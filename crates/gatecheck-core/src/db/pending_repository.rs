//! Pending check-in and swag collection queue repository

use crate::error::{Error, Result};
use crate::models::{PendingCheckin, PendingSwag};
use libsql::{params, Connection, Row};

/// Storage operations for locally-queued records awaiting sync (async)
#[allow(async_fn_in_trait)]
pub trait PendingRepository {
    /// Queue a check-in recorded offline; returns its local id
    async fn save_checkin(
        &self,
        ticket_code: &str,
        checked_in_at: i64,
        notes: &str,
    ) -> Result<i64>;

    /// Pending check-in by local id
    async fn checkin(&self, local_id: i64) -> Result<Option<PendingCheckin>>;

    /// All check-ins not yet confirmed by the server, oldest first
    async fn unsynced_checkins(&self) -> Result<Vec<PendingCheckin>>;

    /// Mark a check-in synced and attach the server-issued reference
    async fn mark_checkin_synced(&self, local_id: i64, server_reference: &str) -> Result<()>;

    /// Count of unsynced check-ins
    async fn unsynced_checkin_count(&self) -> Result<usize>;

    /// Queue a swag collection; returns its local id
    async fn save_swag_collection(
        &self,
        checkin_ref: &str,
        swag_item_id: i64,
        ticket_code: &str,
        collected_at: i64,
    ) -> Result<i64>;

    /// All swag collections not yet confirmed by the server, oldest first
    async fn unsynced_swag(&self) -> Result<Vec<PendingSwag>>;

    /// Mark a swag collection synced
    async fn mark_swag_synced(&self, local_id: i64) -> Result<()>;

    /// Count of unsynced swag collections
    async fn unsynced_swag_count(&self) -> Result<usize>;
}

/// libSQL implementation of `PendingRepository`
pub struct LibSqlPendingRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlPendingRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_checkin(row: &Row) -> Result<PendingCheckin> {
        Ok(PendingCheckin {
            local_id: row.get(0)?,
            ticket_code: row.get(1)?,
            checked_in_at: row.get(2)?,
            notes: row.get(3)?,
            synced: row.get::<i32>(4)? != 0,
            server_reference: row.get::<Option<String>>(5)?,
        })
    }

    fn parse_swag(row: &Row) -> Result<PendingSwag> {
        Ok(PendingSwag {
            local_id: row.get(0)?,
            checkin_ref: row.get(1)?,
            swag_item_id: row.get(2)?,
            ticket_code: row.get(3)?,
            collected_at: row.get(4)?,
            synced: row.get::<i32>(5)? != 0,
        })
    }

    async fn count(&self, sql: &str) -> Result<usize> {
        let mut rows = self.conn.query(sql, ()).await?;
        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

impl PendingRepository for LibSqlPendingRepository<'_> {
    async fn save_checkin(
        &self,
        ticket_code: &str,
        checked_in_at: i64,
        notes: &str,
    ) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO checkins (ticket_code, checked_in_at, notes, synced) VALUES (?, ?, ?, 0)",
                params![ticket_code, checked_in_at, notes],
            )
            .await?;
        Ok(self.conn.last_insert_rowid())
    }

    async fn checkin(&self, local_id: i64) -> Result<Option<PendingCheckin>> {
        let mut rows = self
            .conn
            .query(
                "SELECT local_id, ticket_code, checked_in_at, notes, synced, server_reference
                 FROM checkins WHERE local_id = ?",
                params![local_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_checkin(&row)?)),
            None => Ok(None),
        }
    }

    async fn unsynced_checkins(&self) -> Result<Vec<PendingCheckin>> {
        // Oldest first so check-ins reach the server before the swag
        // collections that reference them
        let mut rows = self
            .conn
            .query(
                "SELECT local_id, ticket_code, checked_in_at, notes, synced, server_reference
                 FROM checkins WHERE synced = 0
                 ORDER BY checked_in_at ASC, local_id ASC",
                (),
            )
            .await?;

        let mut checkins = Vec::new();
        while let Some(row) = rows.next().await? {
            checkins.push(Self::parse_checkin(&row)?);
        }
        Ok(checkins)
    }

    async fn mark_checkin_synced(&self, local_id: i64, server_reference: &str) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE checkins SET synced = 1, server_reference = ? WHERE local_id = ?",
                params![server_reference, local_id],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(format!("pending check-in {local_id}")));
        }
        Ok(())
    }

    async fn unsynced_checkin_count(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM checkins WHERE synced = 0")
            .await
    }

    async fn save_swag_collection(
        &self,
        checkin_ref: &str,
        swag_item_id: i64,
        ticket_code: &str,
        collected_at: i64,
    ) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO swag_collections (checkin_ref, swag_item_id, ticket_code, collected_at, synced)
                 VALUES (?, ?, ?, ?, 0)",
                params![checkin_ref, swag_item_id, ticket_code, collected_at],
            )
            .await?;
        Ok(self.conn.last_insert_rowid())
    }

    async fn unsynced_swag(&self) -> Result<Vec<PendingSwag>> {
        let mut rows = self
            .conn
            .query(
                "SELECT local_id, checkin_ref, swag_item_id, ticket_code, collected_at, synced
                 FROM swag_collections WHERE synced = 0
                 ORDER BY collected_at ASC, local_id ASC",
                (),
            )
            .await?;

        let mut collections = Vec::new();
        while let Some(row) = rows.next().await? {
            collections.push(Self::parse_swag(&row)?);
        }
        Ok(collections)
    }

    async fn mark_swag_synced(&self, local_id: i64) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE swag_collections SET synced = 1 WHERE local_id = ?",
                params![local_id],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(format!("pending swag collection {local_id}")));
        }
        Ok(())
    }

    async fn unsynced_swag_count(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM swag_collections WHERE synced = 0")
            .await
    }
}
