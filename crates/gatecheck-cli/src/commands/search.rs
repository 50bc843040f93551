use crate::commands::common::Context;
use crate::error::CliError;

pub async fn run(ctx: &Context, query: &str, as_json: bool) -> Result<(), CliError> {
    let tickets = ctx.service.search_tickets(query).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&tickets)?);
        return Ok(());
    }

    if tickets.is_empty() {
        println!("No cached tickets match '{query}'");
        return Ok(());
    }

    for ticket in tickets {
        let state = if ticket.is_checked_in {
            "checked in"
        } else {
            "not checked in"
        };
        println!(
            "{}  {} <{}>  {}  ({state})",
            ticket.code, ticket.attendee_name, ticket.attendee_email, ticket.ticket_type
        );
    }
    Ok(())
}
