use gatecheck_core::checkin::SwagOutcome;

use crate::commands::common::{parse_checkin_ref, Context};
use crate::error::CliError;

pub async fn run(ctx: &Context, checkin: &str, item: i64, code: &str) -> Result<(), CliError> {
    let checkin_ref = parse_checkin_ref(checkin)?;

    ctx.service.probe_connectivity().await;
    let outcome = ctx.service.collect_swag(&checkin_ref, item, code).await?;

    match outcome {
        SwagOutcome::Collected => println!("Swag collected"),
        SwagOutcome::Queued { local_id } => {
            println!("Swag collection queued (local id {local_id}); will sync later");
        }
        SwagOutcome::Rejected { message } => println!("Swag collection rejected: {message}"),
    }
    Ok(())
}
