use crate::commands::common::Context;
use crate::error::CliError;

pub async fn run(ctx: &Context) -> Result<(), CliError> {
    if !ctx.service.probe_connectivity().await {
        return Err(CliError::Offline);
    }

    let summary = ctx.service.load_event_snapshot().await?;
    println!(
        "Cached {} tickets and {} swag items for offline use",
        summary.tickets, summary.swag_items
    );
    Ok(())
}
