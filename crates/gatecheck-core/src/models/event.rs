//! Cached event model

use serde::{Deserialize, Serialize};

/// An event cached locally for offline check-in.
///
/// Exactly one row per server id; `slug` is a secondary unique lookup key.
/// Written only by the snapshot loader, which stamps `synced_at`; the
/// recorder treats it as read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEvent {
    /// Server-issued event id
    pub id: i64,
    /// Human-readable slug used in URLs
    pub slug: String,
    /// Display name
    pub name: String,
    /// Unix ms of the last successful cache refresh
    pub synced_at: i64,
}
