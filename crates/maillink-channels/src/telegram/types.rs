//! Telegram Bot API types.

use serde::{Deserialize, Serialize};

/// Wrapper for all Telegram Bot API responses.
///
/// Every API method returns `{ ok: bool, result?: T, description?: String }`.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    /// Human-readable error description, present when `ok` is `false`.
    pub description: Option<String>,
}

/// A single update from `getUpdates`.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Monotonically increasing update identifier.
    pub update_id: i64,
    pub message: Option<Message>,
    pub edited_message: Option<Message>,
}

impl Update {
    /// The new or edited message carried by this update.
    pub fn any_message(&self) -> Option<&Message> {
        self.message.as_ref().or(self.edited_message.as_ref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
    #[serde(default)]
    pub date: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    /// `"private"`, `"group"`, `"supergroup"` or `"channel"`.
    #[serde(rename = "type")]
    pub chat_type: String,
}

/// Rich `sendMessage` body (JSON).
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest<'a> {
    pub chat_id: &'a str,
    pub text: &'a str,
    pub parse_mode: &'a str,
}

/// Plain `sendMessage` body (form-encoded).
#[derive(Debug, Clone, Serialize)]
pub struct PlainMessageForm<'a> {
    pub chat_id: &'a str,
    pub text: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct BotCommand {
    pub command: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetMyCommandsRequest {
    pub commands: Vec<BotCommand>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MenuButton {
    #[serde(rename = "type")]
    pub button_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetChatMenuButtonRequest {
    pub menu_button: MenuButton,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_updates_with_edits() {
        let json = r#"{
            "ok": true,
            "result": [
                {"update_id": 10, "message": {"message_id": 1, "date": 1700000000,
                    "chat": {"id": 42, "type": "private"}, "text": "/link"}},
                {"update_id": 11, "edited_message": {"message_id": 1, "date": 1700000001,
                    "chat": {"id": 42, "type": "private"}, "text": "/start"}},
                {"update_id": 12, "callback_query": {"id": "x"}}
            ]
        }"#;
        let resp: TelegramResponse<Vec<Update>> = serde_json::from_str(json).unwrap();
        let updates = resp.result.unwrap();
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[0].any_message().unwrap().text.as_deref(), Some("/link"));
        assert_eq!(updates[1].any_message().unwrap().text.as_deref(), Some("/start"));
        assert!(updates[2].any_message().is_none());
    }

    #[test]
    fn deserialize_error_response() {
        let json = r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#;
        let resp: TelegramResponse<Vec<Update>> = serde_json::from_str(json).unwrap();
        assert!(!resp.ok);
        assert!(resp.result.is_none());
        assert_eq!(resp.description.as_deref(), Some("Unauthorized"));
    }

    #[test]
    fn serialize_requests() {
        let req = SendMessageRequest {
            chat_id: "42",
            text: "hi",
            parse_mode: "HTML",
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            serde_json::json!({"chat_id": "42", "text": "hi", "parse_mode": "HTML"})
        );

        let menu = SetChatMenuButtonRequest {
            menu_button: MenuButton {
                button_type: "commands".into(),
            },
        };
        assert_eq!(
            serde_json::to_value(&menu).unwrap(),
            serde_json::json!({"menu_button": {"type": "commands"}})
        );
    }
}
