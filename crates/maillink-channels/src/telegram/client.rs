//! HTTP client wrapper for the Telegram Bot API.
//!
//! Covers the methods maillink needs: `sendMessage` (rich and plain),
//! `getUpdates`, `setMyCommands` and `setChatMenuButton`. The base URL
//! embeds the bot token, so it is never logged.

use std::time::Duration;

use maillink_types::{ChannelError, SecretString};
use reqwest::{Client, Response};
use serde::Serialize;
use tracing::{debug, trace};

use super::types::{
    BotCommand, MenuButton, PlainMessageForm, SendMessageRequest, SetChatMenuButtonRequest,
    SetMyCommandsRequest, TelegramResponse, Update,
};

/// Timeout for `sendMessage`.
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the setup calls made at bot start.
const SETUP_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP timeout on top of the long-poll timeout.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Answer to a single `sendMessage` call that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendAttempt {
    Sent,
    Rejected { status: u16, description: String },
}

/// HTTP client for the Telegram Bot API.
pub struct TelegramClient {
    http: Client,
    /// `https://api.telegram.org/bot{token}` by default.
    base_url: String,
}

impl TelegramClient {
    pub fn new(token: &SecretString) -> Self {
        Self::with_base_url(format!("https://api.telegram.org/bot{}", token.expose()))
    }

    /// Point the client at a custom base URL (for testing).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    /// `sendMessage` with `parse_mode=HTML`, JSON body.
    pub async fn send_html(&self, chat_id: &str, text: &str) -> Result<SendAttempt, reqwest::Error> {
        let req = SendMessageRequest {
            chat_id,
            text,
            parse_mode: "HTML",
        };
        debug!(chat_id = %chat_id, chars = text.chars().count(), "sending message (html)");
        let resp = self
            .http
            .post(self.url("sendMessage"))
            .json(&req)
            .timeout(SEND_TIMEOUT)
            .send()
            .await?;
        Ok(attempt_from(resp).await)
    }

    /// `sendMessage` without formatting, form body.
    pub async fn send_plain(&self, chat_id: &str, text: &str) -> Result<SendAttempt, reqwest::Error> {
        let form = PlainMessageForm { chat_id, text };
        debug!(chat_id = %chat_id, chars = text.chars().count(), "sending message (plain)");
        let resp = self
            .http
            .post(self.url("sendMessage"))
            .form(&form)
            .timeout(SEND_TIMEOUT)
            .send()
            .await?;
        Ok(attempt_from(resp).await)
    }

    /// Fetch new updates using long polling.
    ///
    /// `offset` is the id of the first update to return; `timeout` is the
    /// long-poll timeout in seconds.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: u64,
    ) -> Result<Vec<Update>, ChannelError> {
        let mut query = vec![("timeout", timeout.to_string())];
        if let Some(off) = offset {
            query.push(("offset", off.to_string()));
        }

        trace!(?offset, timeout, "polling for updates");

        let resp = self
            .http
            .get(self.url("getUpdates"))
            .query(&query)
            .timeout(Duration::from_secs(timeout) + POLL_GRACE)
            .send()
            .await
            .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ChannelError::AuthFailed("bot token rejected".into()));
        }
        if !status.is_success() {
            return Err(ChannelError::ReceiveFailed(format!(
                "getUpdates error: {}",
                status.as_u16()
            )));
        }

        let body: TelegramResponse<Vec<Update>> = resp
            .json()
            .await
            .map_err(|e| ChannelError::ReceiveFailed(e.to_string()))?;

        if !body.ok {
            let desc = body.description.unwrap_or_else(|| "unknown error".into());
            return Err(ChannelError::ReceiveFailed(desc));
        }

        let updates = body.result.unwrap_or_default();
        debug!(count = updates.len(), "received updates");
        Ok(updates)
    }

    /// Register the command list shown in the client's menu.
    pub async fn set_my_commands(&self, commands: Vec<BotCommand>) -> Result<(), ChannelError> {
        self.post_setup("setMyCommands", &SetMyCommandsRequest { commands })
            .await
    }

    /// Make the chat's menu button open the command list.
    pub async fn set_chat_menu_button(&self) -> Result<(), ChannelError> {
        let req = SetChatMenuButtonRequest {
            menu_button: MenuButton {
                button_type: "commands".into(),
            },
        };
        self.post_setup("setChatMenuButton", &req).await
    }

    async fn post_setup<T: Serialize>(&self, method: &str, body: &T) -> Result<(), ChannelError> {
        let resp = self
            .http
            .post(self.url(method))
            .json(body)
            .timeout(SETUP_TIMEOUT)
            .send()
            .await
            .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;

        match attempt_from(resp).await {
            SendAttempt::Sent => Ok(()),
            SendAttempt::Rejected {
                status,
                description,
            } => Err(ChannelError::Other(format!(
                "{method} failed: {status} {description}"
            ))),
        }
    }
}

/// Turn a response into an attempt outcome. The description comes from
/// the JSON body, else the raw body text, else the status code.
async fn attempt_from(resp: Response) -> SendAttempt {
    let status = resp.status();
    if status.is_success() {
        return SendAttempt::Sent;
    }

    let text = resp.text().await.unwrap_or_default();
    let description = serde_json::from_str::<TelegramResponse<serde_json::Value>>(&text)
        .ok()
        .and_then(|body| body.description)
        .unwrap_or_else(|| {
            if text.is_empty() {
                status.as_u16().to_string()
            } else {
                text
            }
        });

    SendAttempt::Rejected {
        status: status.as_u16(),
        description,
    }
}
