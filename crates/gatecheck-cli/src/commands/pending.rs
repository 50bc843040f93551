use serde::Serialize;

use gatecheck_core::models::{PendingCheckin, PendingSwag};

use crate::commands::common::{format_timestamp, Context};
use crate::error::CliError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PendingQueue {
    checkins: Vec<PendingCheckin>,
    swag_collections: Vec<PendingSwag>,
}

pub async fn run(ctx: &Context, as_json: bool) -> Result<(), CliError> {
    let checkins = ctx.service.store().unsynced_checkins().await?;
    let swag_collections = ctx.service.store().unsynced_swag().await?;

    if as_json {
        let queue = PendingQueue {
            checkins,
            swag_collections,
        };
        println!("{}", serde_json::to_string_pretty(&queue)?);
        return Ok(());
    }

    if checkins.is_empty() && swag_collections.is_empty() {
        println!("Nothing pending; all records are synced.");
        return Ok(());
    }

    for checkin in &checkins {
        println!(
            "check-in local:{}  {}  at {}",
            checkin.local_id,
            checkin.ticket_code,
            format_timestamp(checkin.checked_in_at)
        );
    }
    for swag in &swag_collections {
        println!(
            "swag     local:{}  {}  item {}  at {}",
            swag.local_id,
            swag.ticket_code,
            swag.swag_item_id,
            format_timestamp(swag.collected_at)
        );
    }
    Ok(())
}
