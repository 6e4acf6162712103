//! [`TelegramChannel`] -- [`DeliveryChannel`] over the Telegram Bot API.

use async_trait::async_trait;
use maillink_types::{ChannelError, SecretString};
use tracing::{debug, info, warn};

use crate::delivery::{DeliveryFailure, MAX_MESSAGE_CHARS, chunk_text};
use crate::traits::{DeliveryChannel, InboundEvent};

use super::client::{SendAttempt, TelegramClient};
use super::types::{BotCommand, Update};

/// Commands advertised in the bot menu.
const COMMANDS: &[(&str, &str)] = &[("link", "Get Claude sign-in link"), ("start", "Start")];

/// Telegram delivery channel.
///
/// Each chunk is sent with HTML formatting first and, if the API rejects
/// it, once more as plain text. There is no other retry.
pub struct TelegramChannel {
    client: TelegramClient,
}

impl TelegramChannel {
    pub fn new(token: &SecretString) -> Self {
        Self {
            client: TelegramClient::new(token),
        }
    }

    /// Create a channel with a custom [`TelegramClient`] (for testing).
    pub fn with_client(client: TelegramClient) -> Self {
        Self { client }
    }

    async fn send_chunk(&self, target: &str, chunk: &str) -> Result<(), DeliveryFailure> {
        let network = |e: reqwest::Error| DeliveryFailure::Network(e.to_string());

        if let SendAttempt::Rejected {
            status,
            description,
        } = self.client.send_html(target, chunk).await.map_err(network)?
        {
            debug!(status, error = %description, "html send rejected, retrying as plain text");
            if let SendAttempt::Rejected {
                status,
                description,
            } = self.client.send_plain(target, chunk).await.map_err(network)?
            {
                return Err(DeliveryFailure::from_response(status, &description));
            }
        }
        Ok(())
    }
}

/// Map an update to an inbound event. Updates without a text message
/// keep their id (so the cursor moves past them) with empty text.
fn to_event(update: &Update) -> InboundEvent {
    let msg = update.any_message();
    InboundEvent {
        update_id: update.update_id,
        chat_id: msg.map(|m| m.chat.id.to_string()).unwrap_or_default(),
        text: msg.and_then(|m| m.text.clone()).unwrap_or_default(),
    }
}

#[async_trait]
impl DeliveryChannel for TelegramChannel {
    async fn send(&self, target: &str, text: &str) -> Result<(), DeliveryFailure> {
        let chunks = chunk_text(text, MAX_MESSAGE_CHARS);
        let total = chunks.len();
        for (index, chunk) in chunks.into_iter().enumerate() {
            if let Err(failure) = self.send_chunk(target, chunk).await {
                if index > 0 {
                    warn!(sent = index, total, "delivery stopped part-way");
                }
                return Err(failure);
            }
        }
        Ok(())
    }

    async fn receive(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<InboundEvent>, ChannelError> {
        let updates = self.client.get_updates(offset, timeout_secs).await?;
        let mut events: Vec<InboundEvent> = updates.iter().map(to_event).collect();
        events.sort_by_key(|e| e.update_id);
        Ok(events)
    }

    async fn register_commands(&self) -> Result<(), ChannelError> {
        let commands = COMMANDS
            .iter()
            .map(|(command, description)| BotCommand {
                command: (*command).into(),
                description: (*description).into(),
            })
            .collect();
        self.client.set_my_commands(commands).await?;
        self.client.set_chat_menu_button().await?;
        info!("bot commands registered");
        Ok(())
    }
}
