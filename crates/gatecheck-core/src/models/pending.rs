//! Locally-queued records awaiting server reconciliation

use serde::{Deserialize, Serialize};

/// A check-in recorded while offline, queued for replay to the server.
///
/// `local_id` is the only identity until the sync engine marks the record
/// synced and attaches the server-issued reference. Created by the
/// recorder; mutated only by the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCheckin {
    /// Local auto-incrementing id
    pub local_id: i64,
    /// Ticket code this check-in belongs to (not store-enforced)
    pub ticket_code: String,
    /// Client-side check-in timestamp (unix ms)
    pub checked_in_at: i64,
    /// Free-text notes
    pub notes: String,
    /// Whether the server has confirmed this record
    pub synced: bool,
    /// Server-issued reference, set once synced
    pub server_reference: Option<String>,
}

/// A swag collection recorded while offline.
///
/// `checkin_ref` is the owning check-in's server reference when that
/// check-in has already synced, otherwise its local pending id rendered as
/// a string. Same lifecycle as [`PendingCheckin`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSwag {
    /// Local auto-incrementing id
    pub local_id: i64,
    /// Reference to the owning check-in
    pub checkin_ref: String,
    /// Swag item collected
    pub swag_item_id: i64,
    /// Ticket code, used by the server to resolve the check-in on sync
    pub ticket_code: String,
    /// Client-side collection timestamp (unix ms)
    pub collected_at: i64,
    /// Whether the server has confirmed this record
    pub synced: bool,
}
