use crate::commands::common::Context;
use crate::error::CliError;

pub async fn run(ctx: &Context) -> Result<(), CliError> {
    if !ctx.service.probe_connectivity().await {
        return Err(CliError::Offline);
    }

    match ctx.service.sync_now().await? {
        Some(report) => {
            println!(
                "Synced {} check-ins and {} swag collections",
                report.checkins_synced, report.swag_synced
            );
            if report.checkins_failed > 0 || report.swag_failed > 0 {
                println!(
                    "{} check-ins and {} swag collections failed; they stay queued for the next sync",
                    report.checkins_failed, report.swag_failed
                );
            }
        }
        None => println!("Sync skipped: a pass is already running or the backend is unreachable"),
    }
    Ok(())
}
