use serde::Serialize;

use crate::cli::OfflineModeState;
use crate::commands::common::{format_timestamp, Context};
use crate::error::CliError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusItem {
    is_online: bool,
    offline_mode: bool,
    pending_checkins: usize,
    pending_swag: usize,
    cached_event: Option<CachedEventItem>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CachedEventItem {
    slug: String,
    name: String,
    tickets: usize,
    synced_at: i64,
}

pub async fn run(ctx: &Context, as_json: bool) -> Result<(), CliError> {
    ctx.service.probe_connectivity().await;
    let status = ctx.service.status().await?;
    let offline_mode = ctx.service.offline_mode().await?;

    let cached_event = match ctx.service.store().event_by_slug(&ctx.event_slug).await? {
        Some(event) => {
            let tickets = ctx.service.store().tickets_for_event(event.id).await?;
            Some(CachedEventItem {
                slug: event.slug,
                name: event.name,
                tickets: tickets.len(),
                synced_at: event.synced_at,
            })
        }
        None => None,
    };

    if as_json {
        let item = StatusItem {
            is_online: status.is_online,
            offline_mode,
            pending_checkins: status.pending_checkins,
            pending_swag: status.pending_swag,
            cached_event,
        };
        println!("{}", serde_json::to_string_pretty(&item)?);
        return Ok(());
    }

    println!(
        "Backend: {}",
        if status.is_online { "online" } else { "offline" }
    );
    println!(
        "Forced offline mode: {}",
        if offline_mode { "on" } else { "off" }
    );
    println!(
        "Pending: {} check-ins, {} swag collections",
        status.pending_checkins, status.pending_swag
    );
    match cached_event {
        Some(event) => println!(
            "Cached event: {} ({} tickets, snapshot {})",
            event.name,
            event.tickets,
            format_timestamp(event.synced_at)
        ),
        None => println!("Cached event: none (run `gatecheck cache`)"),
    }
    Ok(())
}

pub async fn set_offline_mode(ctx: &Context, state: OfflineModeState) -> Result<(), CliError> {
    let enabled = state == OfflineModeState::On;
    if enabled {
        ctx.service.probe_connectivity().await;
    }

    let summary = ctx.service.set_offline_mode(enabled).await?;
    if enabled {
        println!("Forced offline mode enabled");
        if let Some(summary) = summary {
            println!(
                "Cached {} tickets and {} swag items for offline use",
                summary.tickets, summary.swag_items
            );
        }
    } else {
        println!("Forced offline mode disabled");
    }
    Ok(())
}
