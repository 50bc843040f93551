//! Persisted terminal settings

use serde::{Deserialize, Serialize};

/// Settings persisted in the local store across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Route all operations through the offline path even when connected,
    /// for "always cache, sync in background" workflows at flaky venues.
    pub offline_mode: bool,
}
