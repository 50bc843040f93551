//! Dual-path check-in and swag collection recorder.

use std::fmt;
use std::sync::Arc;

use crate::api::{ApiError, CheckinApi, VerifyResponse, VerifyStatus};
use crate::connectivity::ConnectivityMonitor;
use crate::error::Result;
use crate::models::{CachedTicket, SwagItem};
use crate::store::Store;
use crate::util::unix_timestamp_ms;

/// Notes attached to check-ins recorded while offline.
const OFFLINE_CHECKIN_NOTES: &str = "Offline check-in";

/// Minimum query length for the offline ticket search.
const MIN_SEARCH_QUERY_CHARS: usize = 2;

/// Maximum rows returned by the offline ticket search.
const MAX_SEARCH_RESULTS: usize = 20;

/// Reference to a check-in: local until the record has synced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckinRef {
    /// Server-issued reference
    Server(String),
    /// Local pending-record id, the only identity until sync
    Local(i64),
}

impl fmt::Display for CheckinRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server(reference) => write!(f, "{reference}"),
            Self::Local(local_id) => write!(f, "local:{local_id}"),
        }
    }
}

/// Outcome of a ticket verification.
///
/// Failures are outcome variants, not errors, so the UI renders a message
/// without a try/catch at every call site.
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyOutcome {
    /// Ticket verified and checked in
    CheckedIn {
        reference: CheckinRef,
        attendee_name: String,
        ticket_type: String,
        /// Swag collectible at this event
        swag_items: Vec<SwagItem>,
        /// True when the check-in was queued locally for later sync
        queued_offline: bool,
    },
    /// Business-rule rejection; not retryable
    AlreadyCheckedIn {
        code: String,
        message: Option<String>,
    },
    /// Ticket code absent from the server or the offline cache
    NotFound {
        code: String,
        message: Option<String>,
    },
}

/// Outcome of a swag collection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwagOutcome {
    /// Confirmed by the server
    Collected,
    /// Queued locally; will sync in the background
    Queued { local_id: i64 },
    /// Rejected by the server
    Rejected { message: String },
}

/// Executes check-in and swag operations, online when possible, against the
/// local cache otherwise.
pub struct Recorder {
    store: Store,
    api: CheckinApi,
    monitor: Arc<ConnectivityMonitor>,
    org_slug: String,
    event_slug: String,
}

impl Recorder {
    pub fn new(
        store: Store,
        api: CheckinApi,
        monitor: Arc<ConnectivityMonitor>,
        org_slug: impl Into<String>,
        event_slug: impl Into<String>,
    ) -> Self {
        Self {
            store,
            api,
            monitor,
            org_slug: org_slug.into(),
            event_slug: event_slug.into(),
        }
    }

    /// Whether operations should go to the server directly.
    ///
    /// Forced offline mode routes everything through the local path even
    /// when the backend is reachable.
    async fn use_online_path(&self) -> bool {
        if !self.monitor.is_online() {
            return false;
        }
        !self.store.offline_mode().await.unwrap_or(false)
    }

    /// Verify a ticket and check it in.
    pub async fn verify_ticket(&self, code: &str) -> Result<VerifyOutcome> {
        if self.use_online_path().await {
            match self
                .api
                .verify_ticket(&self.org_slug, &self.event_slug, code)
                .await
            {
                Ok(response) => return Ok(outcome_from_response(code, response)),
                Err(error) => {
                    tracing::warn!(%error, "online verification failed, using offline path");
                }
            }
        }
        self.verify_ticket_offline(code).await
    }

    async fn verify_ticket_offline(&self, code: &str) -> Result<VerifyOutcome> {
        let Some(mut ticket) = self.store.ticket_by_code(code).await? else {
            return Ok(VerifyOutcome::NotFound {
                code: code.to_string(),
                message: Some("Ticket not found in offline cache".to_string()),
            });
        };

        // The local flag is the source of truth here: it is flipped the
        // moment a pending check-in is written, so it also covers check-ins
        // that have not synced yet.
        if ticket.is_checked_in {
            return Ok(VerifyOutcome::AlreadyCheckedIn {
                code: code.to_string(),
                message: Some("Ticket already checked in".to_string()),
            });
        }

        let now = unix_timestamp_ms();
        let local_id = self
            .store
            .save_checkin(code, now, OFFLINE_CHECKIN_NOTES)
            .await?;

        ticket.is_checked_in = true;
        ticket.checked_in_at = Some(now);
        self.store.update_ticket(&ticket).await?;

        let swag_items = self.store.swag_items_for_event(ticket.event_id).await?;

        tracing::info!(code, local_id, "check-in queued for sync");
        Ok(VerifyOutcome::CheckedIn {
            reference: CheckinRef::Local(local_id),
            attendee_name: ticket.attendee_name,
            ticket_type: ticket.ticket_type,
            swag_items,
            queued_offline: true,
        })
    }

    /// Collect a swag item for a checked-in ticket.
    ///
    /// The online path needs a server reference; a check-in that only has
    /// its local pending id is queued directly (the server resolves it by
    /// ticket code at sync time). A transport failure on the online path
    /// queues the collection locally instead; a server-side rejection is
    /// returned as `Rejected`.
    pub async fn collect_swag(
        &self,
        checkin_ref: &CheckinRef,
        swag_item_id: i64,
        ticket_code: &str,
    ) -> Result<SwagOutcome> {
        if matches!(checkin_ref, CheckinRef::Server(_)) && self.use_online_path().await {
            match self
                .api
                .collect_swag(&checkin_ref.to_string(), swag_item_id)
                .await
            {
                Ok(()) => return Ok(SwagOutcome::Collected),
                Err(ApiError::Api(message)) => return Ok(SwagOutcome::Rejected { message }),
                Err(error) => {
                    tracing::warn!(%error, "online swag collection failed, queueing locally");
                }
            }
        }

        let local_id = self
            .store
            .save_swag_collection(
                &checkin_ref.to_string(),
                swag_item_id,
                ticket_code,
                unix_timestamp_ms(),
            )
            .await?;
        tracing::info!(ticket_code, swag_item_id, local_id, "swag collection queued for sync");
        Ok(SwagOutcome::Queued { local_id })
    }

    /// Search cached tickets for this event by code, attendee name, or
    /// email. Returns nothing for queries shorter than two characters.
    pub async fn search_tickets(&self, query: &str) -> Result<Vec<CachedTicket>> {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_QUERY_CHARS {
            return Ok(Vec::new());
        }

        let Some(event) = self.store.event_by_slug(&self.event_slug).await? else {
            return Ok(Vec::new());
        };

        let tickets = self.store.tickets_for_event(event.id).await?;
        Ok(tickets
            .into_iter()
            .filter(|ticket| ticket.matches(query))
            .take(MAX_SEARCH_RESULTS)
            .collect())
    }
}

fn outcome_from_response(code: &str, response: VerifyResponse) -> VerifyOutcome {
    match response.status {
        VerifyStatus::CheckedIn => VerifyOutcome::CheckedIn {
            reference: CheckinRef::Server(response.reference.unwrap_or_default()),
            attendee_name: response
                .attendee_name
                .unwrap_or_else(|| "Guest".to_string()),
            ticket_type: response.ticket_type.unwrap_or_else(|| "Ticket".to_string()),
            swag_items: response
                .swag_items
                .into_iter()
                .map(|item| SwagItem {
                    id: item.id,
                    event_id: item.event_id,
                    name: item.name,
                })
                .collect(),
            queued_offline: false,
        },
        VerifyStatus::AlreadyCheckedIn => VerifyOutcome::AlreadyCheckedIn {
            code: code.to_string(),
            message: response.message,
        },
        VerifyStatus::NotFound => VerifyOutcome::NotFound {
            code: code.to_string(),
            message: response.message,
        },
    }
}
