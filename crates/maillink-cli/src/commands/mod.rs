//! CLI command implementations for `maillink`.
//!
//! - [`auth`] -- one-time Gmail consent.
//! - [`bot`] -- Telegram command loop.
//! - [`forward`] -- single forward cycle.
//! - [`run`] -- scheduled forward cycles.
//! - [`probe`] -- print today's newest link.

pub mod auth;
pub mod bot;
pub mod forward;
pub mod probe;
pub mod run;

use std::path::Path;
use std::sync::Arc;

use maillink_channels::{DeliveryChannel, TelegramChannel};
use maillink_mail::imap::{ImapAuthenticator, ImapConnector, PasswordLogin, XOAuth2Login};
use maillink_mail::{LinkPattern, MailboxConnector};
use maillink_oauth2::{OAuthCredentialProvider, TokenStore};
use maillink_types::{
    ConfigError, Environment, MailboxConfig, NativeEnvironment, RelayConfig, TelegramConfig,
    resolve_base_dir, token_path,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Load `.env` from the working directory, then from the data directory.
/// Variables already set win over both.
pub fn load_env() -> NativeEnvironment {
    if let Ok(path) = dotenvy::dotenv() {
        debug!(path = %path.display(), "loaded .env");
    }
    let base_dir = resolve_base_dir(&NativeEnvironment);
    let dotenv = base_dir.join(".env");
    if dotenv.exists()
        && let Err(e) = dotenvy::from_path(&dotenv)
    {
        warn!(path = %dotenv.display(), error = %e, "could not load .env");
    }
    NativeEnvironment
}

/// Full configuration for the commands that talk to both mail and Telegram.
pub fn load_config(env: &dyn Environment) -> anyhow::Result<RelayConfig> {
    Ok(RelayConfig::load(env, resolve_base_dir(env))?)
}

/// Pick the login strategy: a password when `IMAP_PASSWORD` is set,
/// otherwise the OAuth token written by `maillink auth`.
pub fn select_authenticator(
    mailbox: &MailboxConfig,
    base_dir: &Path,
) -> Result<Arc<dyn ImapAuthenticator>, ConfigError> {
    if let Some(password) = &mailbox.password {
        return Ok(Arc::new(PasswordLogin::new(password.clone())));
    }
    let store = TokenStore::new(token_path(base_dir));
    if store.exists() {
        let provider = OAuthCredentialProvider::new(store);
        return Ok(Arc::new(XOAuth2Login::new(Arc::new(provider))));
    }
    Err(ConfigError::NoCredential)
}

pub fn mailbox_connector(
    mailbox: &MailboxConfig,
    base_dir: &Path,
) -> Result<Arc<dyn MailboxConnector>, ConfigError> {
    let auth = select_authenticator(mailbox, base_dir)?;
    info!(
        host = %mailbox.host,
        user = %mailbox.user,
        folder = %mailbox.folder,
        method = auth.method(),
        "mailbox configured"
    );
    Ok(Arc::new(ImapConnector::new(mailbox.clone(), auth)))
}

pub fn telegram_channel(telegram: &TelegramConfig) -> Arc<dyn DeliveryChannel> {
    Arc::new(TelegramChannel::new(&telegram.bot_token))
}

pub fn link_pattern() -> anyhow::Result<LinkPattern> {
    Ok(LinkPattern::claude()?)
}

/// Token cancelled on Ctrl+C.
pub fn shutdown_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received shutdown signal");
        }
        trigger.cancel();
    });
    cancel
}

#[cfg(test)]
mod tests {
    use super::*;
    use maillink_types::MapEnvironment;

    fn mailbox(env: MapEnvironment) -> MailboxConfig {
        MailboxConfig::from_env(&env.with("IMAP_USER", "me@gmail.com")).unwrap()
    }

    #[test]
    fn password_wins_over_token() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(token_path(dir.path()), "{}").unwrap();

        let config = mailbox(MapEnvironment::new().with("IMAP_PASSWORD", "app-password"));
        let auth = select_authenticator(&config, dir.path()).unwrap();
        assert_eq!(auth.method(), "password");
    }

    #[test]
    fn token_file_selects_xoauth2() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(token_path(dir.path()), "{}").unwrap();

        let auth = select_authenticator(&mailbox(MapEnvironment::new()), dir.path()).unwrap();
        assert_eq!(auth.method(), "xoauth2");
    }

    #[test]
    fn no_credential_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = select_authenticator(&mailbox(MapEnvironment::new()), dir.path())
            .err()
            .unwrap();
        assert_eq!(err, ConfigError::NoCredential);
        assert!(err.to_string().contains("maillink auth"));
    }

    #[test]
    fn missing_setting_is_named() {
        let env = MapEnvironment::new()
            .with("IMAP_USER", "me@gmail.com")
            .with("TELEGRAM_BOT_TOKEN", "123:abc")
            .with("MAILLINK_HOME", "/tmp/maillink");
        let err = load_config(&env).unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_CHAT_ID"));
    }
}
