//! Event snapshot cache loader.

use crate::api::{CheckinApi, SwagItemPayload, TicketPayload};
use crate::error::{Error, Result};
use crate::models::{CachedEvent, CachedTicket, SwagItem};
use crate::store::Store;
use crate::util::unix_timestamp_ms;

/// Summary of a completed snapshot load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub event_id: i64,
    pub tickets: usize,
    pub swag_items: usize,
}

/// Pulls an event snapshot from the backend and persists it for offline use.
pub struct SnapshotLoader {
    store: Store,
    api: CheckinApi,
}

impl SnapshotLoader {
    pub const fn new(store: Store, api: CheckinApi) -> Self {
        Self { store, api }
    }

    /// Fetch and cache the full snapshot for an event.
    ///
    /// The snapshot is authoritative: cached tickets and swag items are
    /// replaced wholesale, including any local `is_checked_in` edits. On
    /// fetch failure the previous cache is left intact and the error
    /// surfaces as [`Error::SyncFailed`]; the caller decides whether to
    /// retry or fall back to the stale cache.
    pub async fn load_event_snapshot(
        &self,
        org: &str,
        event_slug: &str,
    ) -> Result<SnapshotSummary> {
        let payload = self
            .api
            .fetch_snapshot(org, event_slug)
            .await
            .map_err(|error| Error::SyncFailed(error.to_string()))?;

        let event = CachedEvent {
            id: payload.event.id,
            slug: payload.event.slug,
            name: payload.event.name,
            synced_at: unix_timestamp_ms(),
        };
        let tickets: Vec<CachedTicket> =
            payload.tickets.into_iter().map(ticket_from_payload).collect();
        let swag_items: Vec<SwagItem> = payload
            .swag_items
            .into_iter()
            .map(swag_item_from_payload)
            .collect();

        self.store.save_event(&event).await?;
        self.store.save_tickets(&tickets).await?;
        self.store.save_swag_items(&swag_items).await?;

        tracing::info!(
            event = %event.slug,
            tickets = tickets.len(),
            swag_items = swag_items.len(),
            "event snapshot cached"
        );

        Ok(SnapshotSummary {
            event_id: event.id,
            tickets: tickets.len(),
            swag_items: swag_items.len(),
        })
    }
}

fn ticket_from_payload(payload: TicketPayload) -> CachedTicket {
    CachedTicket {
        id: payload.id,
        code: payload.code,
        event_id: payload.event_id,
        attendee_name: payload.attendee_name,
        attendee_email: payload.attendee_email,
        ticket_type: payload.ticket_type,
        is_checked_in: payload.is_checked_in,
        checked_in_at: payload.checked_in_at,
    }
}

fn swag_item_from_payload(payload: SwagItemPayload) -> SwagItem {
    SwagItem {
        id: payload.id,
        event_id: payload.event_id,
        name: payload.name,
    }
}
