//! Cached ticket model

use serde::{Deserialize, Serialize};

/// A ticket cached locally for offline verification.
///
/// Bulk-upserted by the snapshot loader and superseded wholesale on the
/// next refresh. The recorder flips `is_checked_in` optimistically when it
/// queues an offline check-in, so the local flag also covers check-ins that
/// are still pending sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedTicket {
    /// Server-issued ticket id
    pub id: i64,
    /// The code scanned or typed at the gate (unique per event cache)
    pub code: String,
    /// Owning event id
    pub event_id: i64,
    /// Attendee display name
    pub attendee_name: String,
    /// Attendee email
    pub attendee_email: String,
    /// Ticket type label (e.g. "General Admission")
    pub ticket_type: String,
    /// Whether the ticket has been checked in (server-side or locally)
    pub is_checked_in: bool,
    /// Unix ms of the check-in, when known
    pub checked_in_at: Option<i64>,
}

impl CachedTicket {
    /// Case-insensitive substring match against code, attendee name, or
    /// email. Used by the offline ticket search.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.code.to_lowercase().contains(&query)
            || self.attendee_name.to_lowercase().contains(&query)
            || self.attendee_email.to_lowercase().contains(&query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket() -> CachedTicket {
        CachedTicket {
            id: 1,
            code: "ABC123".to_string(),
            event_id: 7,
            attendee_name: "Ada Lovelace".to_string(),
            attendee_email: "ada@example.com".to_string(),
            ticket_type: "General Admission".to_string(),
            is_checked_in: false,
            checked_in_at: None,
        }
    }

    #[test]
    fn matches_code_case_insensitive() {
        assert!(ticket().matches("abc1"));
        assert!(ticket().matches("ABC123"));
    }

    #[test]
    fn matches_name_and_email() {
        assert!(ticket().matches("lovelace"));
        assert!(ticket().matches("ada@example"));
    }

    #[test]
    fn rejects_unrelated_query() {
        assert!(!ticket().matches("xyz"));
    }
}
