//! # maillink-types
//!
//! Core type definitions shared by every maillink crate:
//!
//! - **[`error`]** -- [`ConfigError`] and [`ChannelError`]
//! - **[`config`]** -- [`RelayConfig`] built once at startup from the environment
//! - **[`env`]** -- [`Environment`] abstraction over process variables
//! - **[`secret`]** -- [`SecretString`] for credentials that must never be logged
//! - **[`state`]** -- [`ProcessingState`], the only durable entity

pub mod config;
pub mod env;
pub mod error;
pub mod secret;
pub mod state;

pub use config::{
    MailboxConfig, RelayConfig, SubjectFilter, TelegramConfig, credentials_path, resolve_base_dir,
    state_path, token_path,
};
pub use env::{Environment, MapEnvironment, NativeEnvironment};
pub use error::{ChannelError, ConfigError};
pub use secret::SecretString;
pub use state::ProcessingState;
