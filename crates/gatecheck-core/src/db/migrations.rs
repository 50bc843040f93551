//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        migrate_v1(conn).await?;
    }
    if version < 2 {
        migrate_v2(conn).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    // Check if schema_version table exists
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Apply a migration's statements inside a single transaction.
async fn apply(conn: &Connection, statements: &[&str]) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    Ok(())
}

/// Migration to version 1: check-in schema (events, tickets, pending
/// check-ins, settings)
async fn migrate_v1(conn: &Connection) -> Result<()> {
    let statements = [
        // Schema version tracking
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        // Cached events; slug is a secondary unique lookup key
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY,
            slug TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            synced_at INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_events_synced_at ON events(synced_at DESC)",
        // Cached tickets; code is what gets scanned at the gate
        "CREATE TABLE IF NOT EXISTS tickets (
            id INTEGER PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            event_id INTEGER NOT NULL,
            attendee_name TEXT NOT NULL,
            attendee_email TEXT NOT NULL,
            ticket_type TEXT NOT NULL,
            is_checked_in INTEGER NOT NULL DEFAULT 0,
            checked_in_at INTEGER
        )",
        "CREATE INDEX IF NOT EXISTS idx_tickets_event ON tickets(event_id)",
        "CREATE INDEX IF NOT EXISTS idx_tickets_checked_in ON tickets(is_checked_in)",
        // Pending check-in queue; local_id is the only identity until synced
        "CREATE TABLE IF NOT EXISTS checkins (
            local_id INTEGER PRIMARY KEY AUTOINCREMENT,
            ticket_code TEXT NOT NULL,
            checked_in_at INTEGER NOT NULL,
            notes TEXT NOT NULL DEFAULT '',
            synced INTEGER NOT NULL DEFAULT 0,
            server_reference TEXT
        )",
        "CREATE INDEX IF NOT EXISTS idx_checkins_ticket_code ON checkins(ticket_code)",
        "CREATE INDEX IF NOT EXISTS idx_checkins_synced ON checkins(synced)",
        "CREATE INDEX IF NOT EXISTS idx_checkins_checked_in_at ON checkins(checked_in_at)",
        // Settings table (local only)
        "CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        // Record migration version
        "INSERT INTO schema_version (version) VALUES (1)",
    ];

    apply(conn, &statements).await?;

    tracing::info!("Migrated database to version 1");
    Ok(())
}

/// Migration to version 2: swag inventory cache and collection queue
async fn migrate_v2(conn: &Connection) -> Result<()> {
    let statements = [
        "CREATE TABLE IF NOT EXISTS swag_items (
            id INTEGER PRIMARY KEY,
            event_id INTEGER NOT NULL,
            name TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_swag_items_event ON swag_items(event_id)",
        // checkin_ref holds the server reference when the owning check-in
        // has synced, else its local pending id
        "CREATE TABLE IF NOT EXISTS swag_collections (
            local_id INTEGER PRIMARY KEY AUTOINCREMENT,
            checkin_ref TEXT NOT NULL,
            swag_item_id INTEGER NOT NULL,
            ticket_code TEXT NOT NULL,
            collected_at INTEGER NOT NULL,
            synced INTEGER NOT NULL DEFAULT 0
        )",
        "CREATE INDEX IF NOT EXISTS idx_swag_collections_checkin ON swag_collections(checkin_ref)",
        "CREATE INDEX IF NOT EXISTS idx_swag_collections_synced ON swag_collections(synced)",
        "INSERT INTO schema_version (version) VALUES (2)",
    ];

    apply(conn, &statements).await?;

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::Builder;

    async fn setup() -> Connection {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        db.connect().unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations_idempotent() {
        let conn = setup().await;
        run(&conn).await.unwrap();
        run(&conn).await.unwrap(); // Should not fail

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migration_v2_creates_swag_tables() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        let mut rows = conn
            .query(
                "SELECT EXISTS(
                    SELECT 1 FROM sqlite_master
                    WHERE type = 'table' AND name = 'swag_collections'
                )",
                (),
            )
            .await
            .unwrap();

        let exists = rows
            .next()
            .await
            .unwrap()
            .is_some_and(|row| row.get::<i32>(0).unwrap() != 0);

        assert!(exists);
    }
}
