//! `maillink run` -- forward on a fixed interval until Ctrl+C.

use maillink_services::Scheduler;
use maillink_types::Environment;

use super::forward::build_cycle;
use super::{load_config, shutdown_token};

pub async fn run(env: &dyn Environment, interval_secs: u64) -> anyhow::Result<()> {
    let config = load_config(env)?;
    let cycle = build_cycle(&config)?;

    Scheduler::new(interval_secs)
        .run_forward(&cycle, shutdown_token())
        .await;
    Ok(())
}
