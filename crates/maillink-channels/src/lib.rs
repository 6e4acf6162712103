//! Delivery channel for maillink.
//!
//! # Modules
//!
//! - [`traits`] -- the [`DeliveryChannel`] seam used by the forward cycle
//!   and the bot loop
//! - [`delivery`] -- chunking, failure classification, HTML escaping
//! - [`telegram`] -- Telegram Bot API client and channel implementation

pub mod delivery;
pub mod telegram;
pub mod traits;

pub use delivery::{DeliveryFailure, MAX_MESSAGE_CHARS, chunk_text, escape_html};
pub use telegram::{TelegramChannel, TelegramClient};
pub use traits::{DeliveryChannel, InboundEvent};
