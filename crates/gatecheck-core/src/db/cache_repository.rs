//! Cached event data repository (events, tickets, swag items)

use crate::error::Result;
use crate::models::{CachedEvent, CachedTicket, SwagItem};
use libsql::{params, Connection, Row};

/// Storage operations for snapshot-cached event data (async)
#[allow(async_fn_in_trait)]
pub trait CacheRepository {
    /// Upsert the cached event row
    async fn save_event(&self, event: &CachedEvent) -> Result<()>;

    /// Get a cached event by server id
    async fn event(&self, id: i64) -> Result<Option<CachedEvent>>;

    /// Get a cached event by slug
    async fn event_by_slug(&self, slug: &str) -> Result<Option<CachedEvent>>;

    /// Bulk-upsert tickets from a snapshot
    async fn save_tickets(&self, tickets: &[CachedTicket]) -> Result<()>;

    /// Look up a ticket by its check-in code
    async fn ticket_by_code(&self, code: &str) -> Result<Option<CachedTicket>>;

    /// All cached tickets for an event
    async fn tickets_for_event(&self, event_id: i64) -> Result<Vec<CachedTicket>>;

    /// Overwrite a cached ticket (check-in flag flip)
    async fn update_ticket(&self, ticket: &CachedTicket) -> Result<()>;

    /// Bulk-upsert swag items from a snapshot
    async fn save_swag_items(&self, items: &[SwagItem]) -> Result<()>;

    /// All swag items for an event
    async fn swag_items_for_event(&self, event_id: i64) -> Result<Vec<SwagItem>>;

    /// Delete an event and its cached tickets and swag items
    async fn clear_event(&self, event_id: i64) -> Result<()>;
}

/// libSQL implementation of `CacheRepository`
pub struct LibSqlCacheRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlCacheRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_event(row: &Row) -> Result<CachedEvent> {
        Ok(CachedEvent {
            id: row.get(0)?,
            slug: row.get(1)?,
            name: row.get(2)?,
            synced_at: row.get(3)?,
        })
    }

    fn parse_ticket(row: &Row) -> Result<CachedTicket> {
        Ok(CachedTicket {
            id: row.get(0)?,
            code: row.get(1)?,
            event_id: row.get(2)?,
            attendee_name: row.get(3)?,
            attendee_email: row.get(4)?,
            ticket_type: row.get(5)?,
            is_checked_in: row.get::<i32>(6)? != 0,
            checked_in_at: row.get::<Option<i64>>(7)?,
        })
    }

    fn parse_swag_item(row: &Row) -> Result<SwagItem> {
        Ok(SwagItem {
            id: row.get(0)?,
            event_id: row.get(1)?,
            name: row.get(2)?,
        })
    }

    async fn put_ticket(&self, ticket: &CachedTicket) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO tickets
                 (id, code, event_id, attendee_name, attendee_email, ticket_type, is_checked_in, checked_in_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    ticket.id,
                    ticket.code.as_str(),
                    ticket.event_id,
                    ticket.attendee_name.as_str(),
                    ticket.attendee_email.as_str(),
                    ticket.ticket_type.as_str(),
                    i32::from(ticket.is_checked_in),
                    ticket.checked_in_at,
                ],
            )
            .await?;
        Ok(())
    }
}

impl CacheRepository for LibSqlCacheRepository<'_> {
    async fn save_event(&self, event: &CachedEvent) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO events (id, slug, name, synced_at) VALUES (?, ?, ?, ?)",
                params![
                    event.id,
                    event.slug.as_str(),
                    event.name.as_str(),
                    event.synced_at
                ],
            )
            .await?;
        Ok(())
    }

    async fn event(&self, id: i64) -> Result<Option<CachedEvent>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, slug, name, synced_at FROM events WHERE id = ?",
                params![id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_event(&row)?)),
            None => Ok(None),
        }
    }

    async fn event_by_slug(&self, slug: &str) -> Result<Option<CachedEvent>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, slug, name, synced_at FROM events WHERE slug = ?",
                params![slug],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_event(&row)?)),
            None => Ok(None),
        }
    }

    async fn save_tickets(&self, tickets: &[CachedTicket]) -> Result<()> {
        for ticket in tickets {
            self.put_ticket(ticket).await?;
        }
        Ok(())
    }

    async fn ticket_by_code(&self, code: &str) -> Result<Option<CachedTicket>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, code, event_id, attendee_name, attendee_email, ticket_type, is_checked_in, checked_in_at
                 FROM tickets WHERE code = ?",
                params![code],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_ticket(&row)?)),
            None => Ok(None),
        }
    }

    async fn tickets_for_event(&self, event_id: i64) -> Result<Vec<CachedTicket>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, code, event_id, attendee_name, attendee_email, ticket_type, is_checked_in, checked_in_at
                 FROM tickets WHERE event_id = ? ORDER BY code ASC",
                params![event_id],
            )
            .await?;

        let mut tickets = Vec::new();
        while let Some(row) = rows.next().await? {
            tickets.push(Self::parse_ticket(&row)?);
        }
        Ok(tickets)
    }

    async fn update_ticket(&self, ticket: &CachedTicket) -> Result<()> {
        self.put_ticket(ticket).await
    }

    async fn save_swag_items(&self, items: &[SwagItem]) -> Result<()> {
        for item in items {
            self.conn
                .execute(
                    "INSERT OR REPLACE INTO swag_items (id, event_id, name) VALUES (?, ?, ?)",
                    params![item.id, item.event_id, item.name.as_str()],
                )
                .await?;
        }
        Ok(())
    }

    async fn swag_items_for_event(&self, event_id: i64) -> Result<Vec<SwagItem>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, event_id, name FROM swag_items WHERE event_id = ? ORDER BY id ASC",
                params![event_id],
            )
            .await?;

        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(Self::parse_swag_item(&row)?);
        }
        Ok(items)
    }

    async fn clear_event(&self, event_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM tickets WHERE event_id = ?", params![event_id])
            .await?;
        self.conn
            .execute(
                "DELETE FROM swag_items WHERE event_id = ?",
                params![event_id],
            )
            .await?;
        self.conn
            .execute("DELETE FROM events WHERE id = ?", params![event_id])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn event() -> CachedEvent {
        CachedEvent {
            id: 7,
            slug: "rustconf-2026".to_string(),
            name: "RustConf 2026".to_string(),
            synced_at: 1_700_000_000_000,
        }
    }

    fn ticket(code: &str) -> CachedTicket {
        CachedTicket {
            id: 0,
            code: code.to_string(),
            event_id: 7,
            attendee_name: "Ada Lovelace".to_string(),
            attendee_email: "ada@example.com".to_string(),
            ticket_type: "General Admission".to_string(),
            is_checked_in: false,
            checked_in_at: None,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_save_and_get_event_by_slug() {
        let db = setup().await;
        let repo = LibSqlCacheRepository::new(db.connection());

        repo.save_event(&event()).await.unwrap();

        let fetched = repo.event_by_slug("rustconf-2026").await.unwrap().unwrap();
        assert_eq!(fetched, event());

        let missing = repo.event_by_slug("unknown").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_save_event_overwrites() {
        let db = setup().await;
        let repo = LibSqlCacheRepository::new(db.connection());

        repo.save_event(&event()).await.unwrap();
        let mut updated = event();
        updated.name = "RustConf 2026 (updated)".to_string();
        repo.save_event(&updated).await.unwrap();

        let fetched = repo.event(7).await.unwrap().unwrap();
        assert_eq!(fetched.name, "RustConf 2026 (updated)");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_ticket_by_code() {
        let db = setup().await;
        let repo = LibSqlCacheRepository::new(db.connection());

        let mut a = ticket("ABC123");
        a.id = 1;
        let mut b = ticket("XYZ789");
        b.id = 2;
        repo.save_tickets(&[a.clone(), b]).await.unwrap();

        let fetched = repo.ticket_by_code("ABC123").await.unwrap().unwrap();
        assert_eq!(fetched, a);

        assert!(repo.ticket_by_code("NOPE").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_ticket_flips_flag() {
        let db = setup().await;
        let repo = LibSqlCacheRepository::new(db.connection());

        let mut t = ticket("ABC123");
        t.id = 1;
        repo.save_tickets(&[t.clone()]).await.unwrap();

        t.is_checked_in = true;
        t.checked_in_at = Some(1_700_000_000_000);
        repo.update_ticket(&t).await.unwrap();

        let fetched = repo.ticket_by_code("ABC123").await.unwrap().unwrap();
        assert!(fetched.is_checked_in);
        assert_eq!(fetched.checked_in_at, Some(1_700_000_000_000));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_clear_event_removes_cached_data() {
        let db = setup().await;
        let repo = LibSqlCacheRepository::new(db.connection());

        repo.save_event(&event()).await.unwrap();
        let mut t = ticket("ABC123");
        t.id = 1;
        repo.save_tickets(&[t]).await.unwrap();
        repo.save_swag_items(&[SwagItem {
            id: 1,
            event_id: 7,
            name: "T-Shirt".to_string(),
        }])
        .await
        .unwrap();

        repo.clear_event(7).await.unwrap();

        assert!(repo.event(7).await.unwrap().is_none());
        assert!(repo.tickets_for_event(7).await.unwrap().is_empty());
        assert!(repo.swag_items_for_event(7).await.unwrap().is_empty());
    }
}
