//! gatecheck-core - Core library for Gatecheck
//!
//! Offline-first check-in for event staff: a durable local cache of an
//! event's tickets and swag inventory, a dual-path (online/offline)
//! check-in recorder, and a reconciliation engine that replays queued
//! records against the backend once it is reachable again.

pub mod api;
pub mod checkin;
pub mod connectivity;
pub mod db;
pub mod error;
pub mod models;
pub mod service;
pub mod snapshot;
pub mod store;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use service::{CheckinService, OfflineStatus, ServiceConfig};
pub use store::Store;
