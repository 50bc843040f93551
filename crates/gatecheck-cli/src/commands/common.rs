//! Shared command plumbing: config resolution and service construction.

use std::path::PathBuf;

use gatecheck_core::checkin::CheckinRef;
use gatecheck_core::{CheckinService, ServiceConfig, Store};

use crate::cli::Cli;
use crate::error::CliError;

const SETTING_BASE_URL: &str = "base_url";
const SETTING_ORG_SLUG: &str = "org_slug";
const SETTING_EVENT_SLUG: &str = "event_slug";

pub struct Context {
    pub service: CheckinService,
    pub event_slug: String,
}

impl Context {
    /// Open the local store and assemble the service from flags, falling
    /// back to values cached in the settings table. Flags win and are
    /// persisted for later runs.
    pub async fn resolve(cli: &Cli) -> Result<Self, CliError> {
        let db_path = cli.db_path.clone().unwrap_or_else(default_db_path);
        tracing::debug!(path = %db_path.display(), "using local cache database");
        let store = Store::open(&db_path).await?;

        let base_url =
            resolve_setting(&store, SETTING_BASE_URL, cli.base_url.clone(), "base-url").await?;
        let org_slug = resolve_setting(&store, SETTING_ORG_SLUG, cli.org.clone(), "org").await?;
        let event_slug =
            resolve_setting(&store, SETTING_EVENT_SLUG, cli.event.clone(), "event").await?;

        let config = ServiceConfig::new(base_url, org_slug, event_slug.clone(), db_path);
        let service = CheckinService::from_store(config, store)?;
        Ok(Self {
            service,
            event_slug,
        })
    }
}

async fn resolve_setting(
    store: &Store,
    key: &str,
    flag: Option<String>,
    flag_name: &'static str,
) -> Result<String, CliError> {
    if let Some(value) = flag.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        store.set_setting(key, &value).await?;
        return Ok(value);
    }

    store
        .setting(key)
        .await?
        .ok_or(CliError::MissingConfig(flag_name))
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gatecheck")
        .join("gatecheck.db")
}

/// Parse a check-in reference: `local:<id>` for a pending record, anything
/// else is a server reference.
pub fn parse_checkin_ref(raw: &str) -> Result<CheckinRef, CliError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CliError::InvalidCheckinRef(raw.to_string()));
    }

    if let Some(local) = raw.strip_prefix("local:") {
        let local_id = local
            .parse::<i64>()
            .map_err(|_| CliError::InvalidCheckinRef(raw.to_string()))?;
        return Ok(CheckinRef::Local(local_id));
    }

    Ok(CheckinRef::Server(raw.to_string()))
}

/// Format a unix-ms timestamp for terminal output.
pub fn format_timestamp(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map_or_else(|| ms.to_string(), |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_local_checkin_ref() {
        assert_eq!(parse_checkin_ref("local:17").unwrap(), CheckinRef::Local(17));
    }

    #[test]
    fn parse_server_checkin_ref() {
        assert_eq!(
            parse_checkin_ref("ref-42").unwrap(),
            CheckinRef::Server("ref-42".to_string())
        );
    }

    #[test]
    fn parse_rejects_empty_and_malformed_refs() {
        assert!(parse_checkin_ref("  ").is_err());
        assert!(parse_checkin_ref("local:abc").is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resolve_setting_prefers_flag_and_caches_it() {
        let store = Store::open_in_memory().await.unwrap();

        let value = resolve_setting(&store, "org_slug", Some("acme".to_string()), "org")
            .await
            .unwrap();
        assert_eq!(value, "acme");

        // Cached: next run without the flag resolves the same value
        let cached = resolve_setting(&store, "org_slug", None, "org").await.unwrap();
        assert_eq!(cached, "acme");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resolve_setting_fails_without_flag_or_cache() {
        let store = Store::open_in_memory().await.unwrap();

        let error = resolve_setting(&store, "org_slug", None, "org").await.unwrap_err();
        assert!(matches!(error, CliError::MissingConfig("org")));
    }
}
