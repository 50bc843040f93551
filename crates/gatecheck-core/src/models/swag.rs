//! Swag item model

use serde::{Deserialize, Serialize};

/// A swag item collectible at check-in, cached per event.
///
/// Read-only cache, refreshed wholesale by the snapshot loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwagItem {
    /// Server-issued item id
    pub id: i64,
    /// Owning event id
    pub event_id: i64,
    /// Display name (e.g. "T-Shirt")
    pub name: String,
}
