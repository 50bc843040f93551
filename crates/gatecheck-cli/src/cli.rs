use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "gatecheck")]
#[command(about = "Offline-capable event check-in from the terminal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local cache database
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Backend base URL (cached after first use)
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Organizer slug (cached after first use)
    #[arg(long, global = true, value_name = "SLUG")]
    pub org: Option<String>,

    /// Event slug (cached after first use)
    #[arg(long, global = true, value_name = "SLUG")]
    pub event: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch and cache the event snapshot for offline use
    Cache,
    /// Verify a ticket and check it in
    Checkin {
        /// Ticket code
        code: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search cached tickets by code, attendee name, or email
    Search {
        /// Search query (minimum two characters)
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Collect a swag item for a checked-in ticket
    Swag {
        /// Check-in reference (server reference, or `local:<id>`)
        #[arg(long)]
        checkin: String,
        /// Swag item id
        #[arg(long)]
        item: i64,
        /// Ticket code
        #[arg(long)]
        code: String,
    },
    /// Replay queued check-ins and swag collections against the backend
    Sync,
    /// Show connectivity and pending-queue status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List locally-queued records awaiting sync
    Pending {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle forced offline mode
    OfflineMode {
        /// New state
        #[arg(value_enum)]
        state: OfflineModeState,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OfflineModeState {
    On,
    Off,
}
