use gatecheck_core::checkin::VerifyOutcome;
use serde::Serialize;

use crate::commands::common::Context;
use crate::error::CliError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckinItem {
    status: &'static str,
    reference: Option<String>,
    attendee_name: Option<String>,
    ticket_type: Option<String>,
    queued_offline: bool,
    swag_items: Vec<SwagItemView>,
    message: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SwagItemView {
    id: i64,
    name: String,
}

fn item_from_outcome(outcome: &VerifyOutcome) -> CheckinItem {
    match outcome {
        VerifyOutcome::CheckedIn {
            reference,
            attendee_name,
            ticket_type,
            swag_items,
            queued_offline,
        } => CheckinItem {
            status: "checked-in",
            reference: Some(reference.to_string()),
            attendee_name: Some(attendee_name.clone()),
            ticket_type: Some(ticket_type.clone()),
            queued_offline: *queued_offline,
            swag_items: swag_items
                .iter()
                .map(|item| SwagItemView {
                    id: item.id,
                    name: item.name.clone(),
                })
                .collect(),
            message: None,
        },
        VerifyOutcome::AlreadyCheckedIn { message, .. } => CheckinItem {
            status: "already-checked-in",
            reference: None,
            attendee_name: None,
            ticket_type: None,
            queued_offline: false,
            swag_items: Vec::new(),
            message: message.clone(),
        },
        VerifyOutcome::NotFound { message, .. } => CheckinItem {
            status: "not-found",
            reference: None,
            attendee_name: None,
            ticket_type: None,
            queued_offline: false,
            swag_items: Vec::new(),
            message: message.clone(),
        },
    }
}

pub async fn run(ctx: &Context, code: &str, as_json: bool) -> Result<(), CliError> {
    ctx.service.probe_connectivity().await;
    let outcome = ctx.service.verify_ticket(code).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&item_from_outcome(&outcome))?);
        return Ok(());
    }

    match outcome {
        VerifyOutcome::CheckedIn {
            reference,
            attendee_name,
            ticket_type,
            swag_items,
            queued_offline,
        } => {
            println!("Checked in: {attendee_name} ({ticket_type})");
            if queued_offline {
                println!("Recorded offline; will sync later (reference {reference})");
            } else {
                println!("Confirmed by server (reference {reference})");
            }
            if !swag_items.is_empty() {
                println!("Collectible swag:");
                for item in swag_items {
                    println!("  [{}] {}", item.id, item.name);
                }
            }
        }
        VerifyOutcome::AlreadyCheckedIn { code, message } => {
            println!(
                "{}",
                message.unwrap_or_else(|| format!("Ticket {code} already checked in"))
            );
        }
        VerifyOutcome::NotFound { code, message } => {
            println!(
                "{}",
                message.unwrap_or_else(|| format!("Ticket {code} not found"))
            );
        }
    }
    Ok(())
}
