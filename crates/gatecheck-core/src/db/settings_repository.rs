//! Settings repository implementation

use crate::error::Result;
use crate::models::Settings;
use libsql::Connection;

/// Trait for settings storage operations (async)
#[allow(async_fn_in_trait)]
pub trait SettingsRepository {
    /// Get a raw setting value
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a raw setting value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Load typed settings from the database
    async fn load(&self) -> Result<Settings>;

    /// Save typed settings to the database
    async fn save(&self, settings: &Settings) -> Result<()>;
}

/// libSQL implementation of `SettingsRepository`
pub struct LibSqlSettingsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSettingsRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl SettingsRepository for LibSqlSettingsRepository<'_> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM settings WHERE key = ?", [key])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }

    async fn load(&self) -> Result<Settings> {
        let mut settings = Settings::default();

        if let Some(value) = self.get("offline_mode").await? {
            settings.offline_mode = matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        Ok(settings)
    }

    async fn save(&self, settings: &Settings) -> Result<()> {
        self.set(
            "offline_mode",
            if settings.offline_mode { "true" } else { "false" },
        )
        .await?;
        Ok(())
    }
}
