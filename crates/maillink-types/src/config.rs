//! Runtime configuration.
//!
//! All settings come from environment variables (optionally seeded from a
//! `.env` file by the binary). [`RelayConfig`] is built once at process
//! start and handed to every component by reference; nothing reads the
//! environment after that.
//!
//! | variable | default |
//! |---|---|
//! | `IMAP_HOST` | `imap.gmail.com` |
//! | `IMAP_PORT` | `993` |
//! | `IMAP_USER` | required |
//! | `IMAP_PASSWORD` | unset (OAuth is used instead) |
//! | `IMAP_FOLDER` | `INBOX` |
//! | `TELEGRAM_BOT_TOKEN` | required |
//! | `TELEGRAM_CHAT_ID` | required |
//! | `SUBJECT_FILTER` | `Secure link` |
//! | `SUBJECT_CONFIRM` | `claude` |
//! | `MAILLINK_HOME` | directory of the executable |

use std::path::{Path, PathBuf};

use crate::env::Environment;
use crate::error::ConfigError;
use crate::secret::SecretString;

const STATE_FILE: &str = "state.json";
const TOKEN_FILE: &str = "token.json";
const CREDENTIALS_FILE: &str = "credentials.json";

/// Read a variable, treating an empty (or whitespace-only) value as unset.
fn non_empty(env: &dyn Environment, name: &str) -> Option<String> {
    env.get_var(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(env: &dyn Environment, name: &'static str) -> Result<String, ConfigError> {
    non_empty(env, name).ok_or(ConfigError::Missing(name))
}

/// Mailbox connection settings.
#[derive(Debug, Clone)]
pub struct MailboxConfig {
    /// IMAP server hostname.
    pub host: String,
    /// IMAP server port (implicit TLS).
    pub port: u16,
    /// Login identity, usually the email address.
    pub user: String,
    /// App password. `None` selects the OAuth strategy.
    pub password: Option<SecretString>,
    /// Folder to search.
    pub folder: String,
}

impl MailboxConfig {
    /// Load mailbox settings. `IMAP_USER` is required.
    pub fn from_env(env: &dyn Environment) -> Result<Self, ConfigError> {
        let port = match non_empty(env, "IMAP_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                key: "IMAP_PORT",
                reason: e.to_string(),
            })?,
            None => 993,
        };

        Ok(Self {
            host: non_empty(env, "IMAP_HOST").unwrap_or_else(|| "imap.gmail.com".into()),
            port,
            user: required(env, "IMAP_USER")?,
            password: non_empty(env, "IMAP_PASSWORD").map(SecretString::from),
            folder: non_empty(env, "IMAP_FOLDER").unwrap_or_else(|| "INBOX".into()),
        })
    }
}

/// Push-transport settings.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot token from `@BotFather`.
    pub bot_token: SecretString,
    /// The single authorized chat. Deliveries go here and only commands
    /// from this chat are answered.
    pub chat_id: String,
}

impl TelegramConfig {
    /// Load transport settings. Both values are required.
    pub fn from_env(env: &dyn Environment) -> Result<Self, ConfigError> {
        Ok(Self {
            bot_token: required(env, "TELEGRAM_BOT_TOKEN")?.into(),
            chat_id: required(env, "TELEGRAM_CHAT_ID")?,
        })
    }
}

/// Which subjects identify a login email.
///
/// `keyword` is sent to the server as the `SUBJECT` search term. Servers
/// match it loosely, so every fetched candidate is re-checked locally
/// against both `keyword` and `confirm`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectFilter {
    /// Primary search keyword.
    pub keyword: String,
    /// Secondary keyword that must also appear in the decoded subject.
    pub confirm: String,
}

impl Default for SubjectFilter {
    fn default() -> Self {
        Self {
            keyword: "Secure link".into(),
            confirm: "claude".into(),
        }
    }
}

impl SubjectFilter {
    /// Load the filter, falling back to the defaults.
    pub fn from_env(env: &dyn Environment) -> Self {
        let defaults = Self::default();
        Self {
            keyword: non_empty(env, "SUBJECT_FILTER").unwrap_or(defaults.keyword),
            confirm: non_empty(env, "SUBJECT_CONFIRM").unwrap_or(defaults.confirm),
        }
    }

    /// Case-insensitive check that `subject` contains both keywords.
    pub fn accepts(&self, subject: &str) -> bool {
        let subject = subject.to_lowercase();
        subject.contains(&self.keyword.to_lowercase())
            && subject.contains(&self.confirm.to_lowercase())
    }
}

/// Complete configuration for the `bot`, `forward`, `run` and `probe`
/// commands.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub mailbox: MailboxConfig,
    pub telegram: TelegramConfig,
    pub filter: SubjectFilter,
    /// Directory holding `state.json`, `token.json` and `credentials.json`.
    pub base_dir: PathBuf,
}

impl RelayConfig {
    /// Load and validate everything. The first missing value is reported.
    pub fn load(env: &dyn Environment, base_dir: PathBuf) -> Result<Self, ConfigError> {
        Ok(Self {
            mailbox: MailboxConfig::from_env(env)?,
            telegram: TelegramConfig::from_env(env)?,
            filter: SubjectFilter::from_env(env),
            base_dir,
        })
    }

    pub fn state_path(&self) -> PathBuf {
        state_path(&self.base_dir)
    }

    pub fn token_path(&self) -> PathBuf {
        token_path(&self.base_dir)
    }
}

pub fn state_path(base_dir: &Path) -> PathBuf {
    base_dir.join(STATE_FILE)
}

pub fn token_path(base_dir: &Path) -> PathBuf {
    base_dir.join(TOKEN_FILE)
}

pub fn credentials_path(base_dir: &Path) -> PathBuf {
    base_dir.join(CREDENTIALS_FILE)
}

/// Resolve the data directory: `MAILLINK_HOME`, else the directory of the
/// running executable, else the current directory.
pub fn resolve_base_dir(env: &dyn Environment) -> PathBuf {
    if let Some(dir) = non_empty(env, "MAILLINK_HOME") {
        return PathBuf::from(dir);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MapEnvironment;

    fn full_env() -> MapEnvironment {
        MapEnvironment::new()
            .with("IMAP_USER", "me@gmail.com")
            .with("TELEGRAM_BOT_TOKEN", "123:ABC")
            .with("TELEGRAM_CHAT_ID", "987654")
    }

    #[test]
    fn defaults_applied() {
        let cfg = RelayConfig::load(&full_env(), PathBuf::from("/data")).unwrap();
        assert_eq!(cfg.mailbox.host, "imap.gmail.com");
        assert_eq!(cfg.mailbox.port, 993);
        assert_eq!(cfg.mailbox.folder, "INBOX");
        assert!(cfg.mailbox.password.is_none());
        assert_eq!(cfg.filter, SubjectFilter::default());
        assert_eq!(cfg.state_path(), PathBuf::from("/data/state.json"));
        assert_eq!(cfg.token_path(), PathBuf::from("/data/token.json"));
    }

    #[test]
    fn missing_user_is_named() {
        let env = MapEnvironment::new()
            .with("TELEGRAM_BOT_TOKEN", "123:ABC")
            .with("TELEGRAM_CHAT_ID", "987654");
        let err = RelayConfig::load(&env, PathBuf::from(".")).unwrap_err();
        assert_eq!(err, ConfigError::Missing("IMAP_USER"));
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let env = full_env().with("TELEGRAM_CHAT_ID", "  ");
        let err = TelegramConfig::from_env(&env).unwrap_err();
        assert_eq!(err, ConfigError::Missing("TELEGRAM_CHAT_ID"));
    }

    #[test]
    fn bad_port_rejected() {
        let env = full_env().with("IMAP_PORT", "imap");
        let err = MailboxConfig::from_env(&env).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "IMAP_PORT", .. }));
    }

    #[test]
    fn password_is_optional_and_redacted() {
        let env = full_env().with("IMAP_PASSWORD", "abcd efgh");
        let cfg = MailboxConfig::from_env(&env).unwrap();
        assert_eq!(cfg.password.as_ref().map(|p| p.expose()), Some("abcd efgh"));
        assert!(!format!("{cfg:?}").contains("abcd efgh"));
    }

    #[test]
    fn subject_filter_requires_both_keywords() {
        let filter = SubjectFilter::default();
        assert!(filter.accepts("Secure link to log in to Claude.ai"));
        assert!(filter.accepts("SECURE LINK to log in to CLAUDE.AI"));
        assert!(!filter.accepts("Secure link to log in to Example"));
        assert!(!filter.accepts("Your Claude.ai receipt"));
    }

    #[test]
    fn subject_filter_overrides() {
        let env = MapEnvironment::new()
            .with("SUBJECT_FILTER", "Sign in")
            .with("SUBJECT_CONFIRM", "acme");
        let filter = SubjectFilter::from_env(&env);
        assert!(filter.accepts("Sign in to Acme"));
    }

    #[test]
    fn base_dir_prefers_override() {
        let env = MapEnvironment::new().with("MAILLINK_HOME", "/srv/maillink");
        assert_eq!(resolve_base_dir(&env), PathBuf::from("/srv/maillink"));
    }
}
