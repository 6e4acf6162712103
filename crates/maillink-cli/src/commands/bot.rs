//! `maillink bot` -- answer `/link` in the authorized Telegram chat.

use maillink_services::{BotLoop, LinkFinder};
use maillink_types::Environment;
use tracing::info;

use super::{link_pattern, load_config, mailbox_connector, shutdown_token, telegram_channel};

pub async fn run(env: &dyn Environment) -> anyhow::Result<()> {
    let config = load_config(env)?;
    let connector = mailbox_connector(&config.mailbox, &config.base_dir)?;
    let finder = LinkFinder::new(connector, config.filter.clone(), link_pattern()?);

    let bot = BotLoop::new(
        telegram_channel(&config.telegram),
        finder,
        config.telegram.chat_id.clone(),
    );

    info!("bot running, press Ctrl+C to stop");
    bot.run(shutdown_token()).await;
    Ok(())
}
