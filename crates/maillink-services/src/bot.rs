//! Bot command loop.
//!
//! Long-polls the channel for commands from the authorized chat and
//! answers `/link` with today's newest sign-in link. Independent of the
//! forward cycle: it never touches processing state or message flags.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use maillink_channels::{DeliveryChannel, InboundEvent, escape_html};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::lookup::{LinkFinder, LinkLookup};

/// Long-poll timeout passed to the channel.
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 60;

/// Wait after a failed poll before trying again.
const ERROR_RETRY_DELAY: Duration = Duration::from_secs(5);

pub const GREETING: &str =
    "Hi! Use /link to get the latest Claude sign-in link from today's email.";

pub const ACKNOWLEDGEMENT: &str = "Checking your email…";

/// A recognized command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    Link,
    Start,
}

impl BotCommand {
    /// Match `text` (trimmed, case-insensitive) against the known phrases.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "/link" | "link" | "/getlink" | "get link" => Some(Self::Link),
            "/start" | "start" => Some(Self::Start),
            _ => None,
        }
    }
}

type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Receive/dispatch loop for one authorized chat.
pub struct BotLoop {
    channel: Arc<dyn DeliveryChannel>,
    finder: LinkFinder,
    chat_id: String,
    poll_timeout_secs: u64,
    today: Clock,
}

impl BotLoop {
    pub fn new(
        channel: Arc<dyn DeliveryChannel>,
        finder: LinkFinder,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            channel,
            finder,
            chat_id: chat_id.into(),
            poll_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
            today: Arc::new(crate::local_today),
        }
    }

    pub fn with_poll_timeout(mut self, secs: u64) -> Self {
        self.poll_timeout_secs = secs;
        self
    }

    /// Override the date used for lookups (for testing).
    pub fn with_clock(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Arc::new(today);
        self
    }

    /// Register commands, then poll until `cancel` fires.
    ///
    /// A failed poll is logged and retried after a short delay. Cancellation
    /// interrupts the poll or the delay, never a command being answered.
    pub async fn run(&self, cancel: CancellationToken) {
        if let Err(e) = self.channel.register_commands().await {
            warn!(error = %e, "could not register bot commands");
        }

        info!(chat_id = %self.chat_id, "bot listening");
        let mut offset: Option<i64> = None;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("bot received cancellation");
                    break;
                }
                result = self.channel.receive(offset, self.poll_timeout_secs) => {
                    match result {
                        Ok(events) => {
                            for event in &events {
                                self.handle(event).await;
                                offset = Some(event.update_id + 1);
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "polling for commands failed");
                            tokio::select! {
                                _ = cancel.cancelled() => {
                                    info!("bot cancelled during error backoff");
                                    break;
                                }
                                _ = tokio::time::sleep(ERROR_RETRY_DELAY) => {}
                            }
                        }
                    }
                }
            }
        }

        info!("bot stopped");
    }

    /// Answer one event. Returns the command that was handled, if any.
    pub async fn handle(&self, event: &InboundEvent) -> Option<BotCommand> {
        if event.chat_id != self.chat_id {
            debug!(update_id = event.update_id, chat_id = %event.chat_id, "ignoring other chat");
            return None;
        }
        let command = BotCommand::parse(&event.text)?;
        info!(update_id = event.update_id, ?command, "command received");

        match command {
            BotCommand::Start => self.reply(&escape_html(GREETING)).await,
            BotCommand::Link => {
                self.reply(&escape_html(ACKNOWLEDGEMENT)).await;
                let lookup = self.finder.latest((self.today)()).await;
                if let LinkLookup::Found { uid, .. } = &lookup {
                    info!(uid, "sending link on request");
                }
                self.reply(&lookup.reply_text()).await;
            }
        }
        Some(command)
    }

    async fn reply(&self, text: &str) {
        if let Err(failure) = self.channel.send(&self.chat_id, text).await {
            warn!(chat_id = %self.chat_id, error = %failure, "reply failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maillink_channels::{TelegramChannel, TelegramClient};
    use maillink_mail::{LinkPattern, MemoryMailbox};
    use maillink_types::SubjectFilter;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
    }

    fn event(update_id: i64, chat_id: &str, text: &str) -> InboundEvent {
        InboundEvent {
            update_id,
            chat_id: chat_id.into(),
            text: text.into(),
        }
    }

    async fn telegram() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sendMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"message_id": 1, "date": 0, "chat": {"id": 42, "type": "private"}}
            })))
            .mount(&server)
            .await;
        server
    }

    fn bot(server: &MockServer, mb: &MemoryMailbox) -> BotLoop {
        let channel = TelegramChannel::with_client(TelegramClient::with_base_url(server.uri()));
        let finder = LinkFinder::new(
            Arc::new(mb.clone()),
            SubjectFilter::default(),
            LinkPattern::claude().unwrap(),
        );
        BotLoop::new(Arc::new(channel), finder, "42").with_clock(today)
    }

    async fn replies(server: &MockServer) -> Vec<String> {
        server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == "/sendMessage")
            .map(|r| {
                let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
                body["text"].as_str().unwrap().to_string()
            })
            .collect()
    }

    #[test]
    fn command_phrases() {
        assert_eq!(BotCommand::parse("/link"), Some(BotCommand::Link));
        assert_eq!(BotCommand::parse("  Get Link "), Some(BotCommand::Link));
        assert_eq!(BotCommand::parse("/GETLINK"), Some(BotCommand::Link));
        assert_eq!(BotCommand::parse("link"), Some(BotCommand::Link));
        assert_eq!(BotCommand::parse("/start"), Some(BotCommand::Start));
        assert_eq!(BotCommand::parse("Start"), Some(BotCommand::Start));
        assert_eq!(BotCommand::parse("/link please"), None);
        assert_eq!(BotCommand::parse(""), None);
    }

    #[tokio::test]
    async fn link_without_mail_replies_no_match() {
        let server = telegram().await;
        let mb = MemoryMailbox::new();

        let handled = bot(&server, &mb).handle(&event(1, "42", "/link")).await;

        assert_eq!(handled, Some(BotCommand::Link));
        assert_eq!(
            replies(&server).await,
            vec!["Checking your email…", "No Claude login email from today."]
        );
    }

    #[tokio::test]
    async fn link_sends_newest_link() {
        let server = telegram().await;
        let mb = MemoryMailbox::new();
        mb.insert(
            77,
            today(),
            "Subject: Secure link to log in to Claude.ai\r\n\r\nhttps://claude.ai/magic-link#fresh\r\n",
        );
        mb.set_seen(77, true);

        bot(&server, &mb).handle(&event(1, "42", "get link")).await;

        assert_eq!(
            replies(&server).await,
            vec!["Checking your email…", "https://claude.ai/magic-link#fresh"]
        );
        assert!(mb.is_seen(77));
        assert_eq!(mb.open_sessions(), 0);
    }

    #[tokio::test]
    async fn lookup_errors_are_replied() {
        let server = telegram().await;
        let mb = MemoryMailbox::new();
        mb.fail_search("BAD");

        bot(&server, &mb).handle(&event(1, "42", "/link")).await;

        let texts = replies(&server).await;
        assert_eq!(texts[1], "IMAP search failed: BAD");
    }

    #[tokio::test]
    async fn start_replies_with_greeting() {
        let server = telegram().await;
        let mb = MemoryMailbox::new();

        let handled = bot(&server, &mb).handle(&event(1, "42", "/start")).await;

        assert_eq!(handled, Some(BotCommand::Start));
        assert_eq!(replies(&server).await, vec![GREETING]);
        assert_eq!(mb.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn other_chats_and_chatter_are_ignored() {
        let server = telegram().await;
        let mb = MemoryMailbox::new();
        let bot = bot(&server, &mb);

        assert_eq!(bot.handle(&event(1, "999", "/link")).await, None);
        assert_eq!(bot.handle(&event(2, "42", "hello there")).await, None);
        assert_eq!(bot.handle(&event(3, "42", "")).await, None);
        assert!(replies(&server).await.is_empty());
        assert_eq!(mb.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn run_dispatches_then_stops_on_cancel() {
        let server = telegram().await;
        for endpoint in ["/setMyCommands", "/setChatMenuButton"] {
            Mock::given(method("POST"))
                .and(path(endpoint))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": true})))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/getUpdates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": [{"update_id": 10, "message": {"message_id": 1, "date": 0,
                    "chat": {"id": 42, "type": "private"}, "text": "/start"}}]
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/getUpdates"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": true, "result": []}))
                    .set_delay(Duration::from_millis(20)),
            )
            .mount(&server)
            .await;

        let mb = MemoryMailbox::new();
        let bot = Arc::new(bot(&server, &mb).with_poll_timeout(0));
        let cancel = CancellationToken::new();

        let handle = {
            let bot = Arc::clone(&bot);
            let cancel = cancel.clone();
            tokio::spawn(async move { bot.run(cancel).await })
        };

        for _ in 0..100 {
            if !replies(&server).await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("bot should stop promptly")
            .unwrap();

        assert_eq!(replies(&server).await, vec![GREETING]);

        let polls: Vec<_> = server
            .received_requests()
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.url.path() == "/getUpdates")
            .collect();
        assert!(polls.len() >= 2);
        assert!(polls[1].url.query().unwrap_or_default().contains("offset=11"));
    }

    #[tokio::test]
    async fn cancel_interrupts_error_backoff() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/getUpdates"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let mb = MemoryMailbox::new();
        let bot = Arc::new(bot(&server, &mb).with_poll_timeout(0));
        let cancel = CancellationToken::new();
        let handle = {
            let bot = Arc::clone(&bot);
            let cancel = cancel.clone();
            tokio::spawn(async move { bot.run(cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("backoff should honor cancellation")
            .unwrap();
    }
}
