//! Data models for the offline check-in cache

mod event;
mod pending;
mod settings;
mod swag;
mod ticket;

pub use event::CachedEvent;
pub use pending::{PendingCheckin, PendingSwag};
pub use settings::Settings;
pub use swag::SwagItem;
pub use ticket::CachedTicket;
