//! `maillink forward` -- one forward cycle.

use std::sync::Arc;

use maillink_services::{ForwardCycle, StateStore, local_today};
use maillink_types::{Environment, RelayConfig};
use tracing::{error, info};

use super::{link_pattern, load_config, mailbox_connector, telegram_channel};

/// Wire a forward cycle from configuration.
pub fn build_cycle(config: &RelayConfig) -> anyhow::Result<ForwardCycle> {
    Ok(ForwardCycle::new(
        mailbox_connector(&config.mailbox, &config.base_dir)?,
        telegram_channel(&config.telegram),
        Arc::new(StateStore::new(config.state_path())),
        config.filter.clone(),
        link_pattern()?,
        config.telegram.chat_id.clone(),
    ))
}

pub async fn run(env: &dyn Environment, dry_run: bool) -> anyhow::Result<()> {
    let config = load_config(env)?;
    let cycle = build_cycle(&config)?.dry_run(dry_run);

    match cycle.run_once(local_today()).await {
        Ok(report) => {
            info!(
                delivered = report.delivered.len(),
                failed = report.failed.len(),
                "forward finished"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "forward failed");
            Err(e.into())
        }
    }
}
