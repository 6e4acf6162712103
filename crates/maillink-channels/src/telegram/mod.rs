//! Telegram Bot API transport.
//!
//! - [`types`] -- request/response types
//! - [`client`] -- HTTP client wrapper
//! - [`channel`] -- [`DeliveryChannel`](crate::traits::DeliveryChannel)
//!   implementation

pub mod channel;
pub mod client;
pub mod types;

pub use channel::TelegramChannel;
pub use client::TelegramClient;
