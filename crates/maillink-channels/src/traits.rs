//! Channel abstraction.

use async_trait::async_trait;
use maillink_types::ChannelError;

use crate::delivery::DeliveryFailure;

/// A text command received from a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Cursor value; the next poll should start after it.
    pub update_id: i64,
    pub chat_id: String,
    /// Empty when the update carried no text message.
    pub text: String,
}

/// Outbound delivery plus inbound long-poll.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Send `text` to `target`, split into transport-sized chunks.
    ///
    /// Text is sent rich-formatted (HTML), so callers must escape text
    /// they compose themselves. Fails on the first chunk that cannot be
    /// delivered; earlier chunks stay delivered.
    async fn send(&self, target: &str, text: &str) -> Result<(), DeliveryFailure>;

    /// Block for up to `timeout_secs` waiting for new events after
    /// `offset`. Returns events in cursor order.
    async fn receive(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<InboundEvent>, ChannelError>;

    /// Advertise the bot's commands to clients.
    async fn register_commands(&self) -> Result<(), ChannelError>;
}
