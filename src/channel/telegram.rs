//! Telegram Bot API channel.
//!
//! Long-polls `getUpdates` over `ureq` and renders option sets as inline
//! keyboards with one button per row. The channel is bound to a single chat;
//! updates from any other chat are dropped.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::{ChannelError, ChannelResult, InboundEvent, MessagingChannel, OptionButton};

/// Default Bot API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram refuses callback data longer than this.
pub const MAX_CALLBACK_BYTES: usize = 64;

/// Connection settings for [`TelegramChannel`].
#[derive(Clone)]
pub struct TelegramSettings {
    pub token: String,
    pub chat_id: i64,
    pub poll_timeout: Duration,
    pub api_base: String,
}

impl TelegramSettings {
    pub fn new(token: impl Into<String>, chat_id: i64) -> Self {
        Self {
            token: token.into(),
            chat_id,
            poll_timeout: Duration::from_secs(60),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl std::fmt::Debug for TelegramSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSettings")
            .field("token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("poll_timeout", &self.poll_timeout)
            .field("api_base", &self.api_base)
            .finish()
    }
}

// ── Bot API wire types ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct Message {
    message_id: i64,
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    id: String,
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    data: Option<String>,
}

/// The message a pressed button lives on.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CallbackOrigin {
    message_id: i64,
    payload: String,
}

/// An update reduced to what the controller needs.
#[derive(Debug, PartialEq, Eq)]
enum Incoming {
    Text(String),
    Press {
        query_id: String,
        origin: CallbackOrigin,
        title: String,
    },
}

fn classify(update: Update, chat_id: i64) -> Option<Incoming> {
    if let Some(message) = update.message {
        if message.chat.id != chat_id {
            tracing::debug!(chat = message.chat.id, "message from foreign chat dropped");
            return None;
        }
        return message.text.map(Incoming::Text);
    }

    let query = update.callback_query?;
    let message = query.message?;
    if message.chat.id != chat_id {
        tracing::debug!(chat = message.chat.id, "callback from foreign chat dropped");
        return None;
    }
    Some(Incoming::Press {
        query_id: query.id,
        origin: CallbackOrigin {
            message_id: message.message_id,
            payload: query.data.unwrap_or_default(),
        },
        title: message.text.unwrap_or_default(),
    })
}

fn keyboard<'a>(buttons: impl IntoIterator<Item = (&'a str, &'a str)>) -> Value {
    let rows: Vec<Value> = buttons
        .into_iter()
        .map(|(label, payload)| json!([{ "text": label, "callback_data": payload }]))
        .collect();
    json!({ "inline_keyboard": rows })
}

// ── TelegramChannel ──────────────────────────────────────────────────────

pub struct TelegramChannel {
    settings: TelegramSettings,
    agent: ureq::Agent,
    offset: i64,
    /// Events fetched but not handed out yet, each with its button origin.
    pending: VecDeque<(InboundEvent, Option<CallbackOrigin>)>,
    last_origin: Option<CallbackOrigin>,
}

impl TelegramChannel {
    pub fn new(settings: TelegramSettings) -> Self {
        // Long polls hold the connection open for `poll_timeout`.
        let agent = ureq::AgentBuilder::new()
            .timeout(settings.poll_timeout + Duration::from_secs(10))
            .user_agent(concat!("deck-scout/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            settings,
            agent,
            offset: 0,
            pending: VecDeque::new(),
            last_origin: None,
        }
    }

    pub fn settings(&self) -> &TelegramSettings {
        &self.settings
    }

    fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> ChannelResult<T> {
        let url = format!(
            "{}/bot{}/{method}",
            self.settings.api_base.trim_end_matches('/'),
            self.settings.token
        );

        let response = match self.agent.post(&url).send_json(body) {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, resp)) => {
                let description = resp
                    .into_json::<ApiResponse<Value>>()
                    .ok()
                    .and_then(|r| r.description)
                    .unwrap_or_else(|| format!("HTTP {code}"));
                return Err(ChannelError::Api {
                    method: method.to_string(),
                    description,
                });
            }
            // The transport error text embeds the URL, which carries the token.
            Err(ureq::Error::Transport(transport)) => {
                return Err(ChannelError::Transport {
                    message: format!("{method}: {}", transport.kind()),
                });
            }
        };

        let parsed: ApiResponse<T> =
            response.into_json().map_err(|e| ChannelError::Transport {
                message: format!("{method}: invalid response body: {e}"),
            })?;

        match (parsed.ok, parsed.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(ChannelError::Api {
                method: method.to_string(),
                description: parsed
                    .description
                    .unwrap_or_else(|| "no result".to_string()),
            }),
        }
    }

    fn poll(&mut self) -> ChannelResult<()> {
        let updates: Vec<Update> = self.call(
            "getUpdates",
            json!({
                "offset": self.offset,
                "timeout": self.settings.poll_timeout.as_secs(),
                "allowed_updates": ["message", "callback_query"],
            }),
        )?;

        for update in updates {
            self.offset = self.offset.max(update.update_id + 1);
            match classify(update, self.settings.chat_id) {
                Some(Incoming::Text(text)) => {
                    self.pending.push_back((InboundEvent::Command(text), None));
                }
                Some(Incoming::Press {
                    query_id,
                    origin,
                    title,
                }) => {
                    if let Err(e) = self.call::<Value>(
                        "answerCallbackQuery",
                        json!({ "callback_query_id": query_id }),
                    ) {
                        tracing::warn!(error = %e, "failed to answer callback query");
                    }
                    let event = InboundEvent::callback(title, origin.payload.clone());
                    self.pending.push_back((event, Some(origin)));
                }
                None => {}
            }
        }
        Ok(())
    }
}

impl MessagingChannel for TelegramChannel {
    fn send_text(&mut self, text: &str) -> ChannelResult<()> {
        self.call::<Value>(
            "sendMessage",
            json!({ "chat_id": self.settings.chat_id, "text": text }),
        )?;
        Ok(())
    }

    fn send_options(&mut self, title: &str, options: &[OptionButton]) -> ChannelResult<()> {
        for option in options {
            if option.payload.len() > MAX_CALLBACK_BYTES {
                tracing::warn!(
                    payload = %option.payload,
                    bytes = option.payload.len(),
                    "callback data exceeds the Bot API limit"
                );
            }
        }
        let markup = keyboard(
            options
                .iter()
                .map(|o| (o.label.as_str(), o.payload.as_str())),
        );
        self.call::<Value>(
            "sendMessage",
            json!({
                "chat_id": self.settings.chat_id,
                "text": title,
                "reply_markup": markup,
            }),
        )?;
        Ok(())
    }

    fn edit_last_options(&mut self, label: &str) -> ChannelResult<()> {
        let origin = self.last_origin.clone().ok_or(ChannelError::NothingToEdit)?;
        self.call::<Value>(
            "editMessageReplyMarkup",
            json!({
                "chat_id": self.settings.chat_id,
                "message_id": origin.message_id,
                "reply_markup": keyboard([(label, origin.payload.as_str())]),
            }),
        )?;
        Ok(())
    }

    /// Hands out one event per call so that `edit_last_options` always
    /// targets the message of the callback currently being handled.
    fn receive(&mut self) -> ChannelResult<Vec<InboundEvent>> {
        if self.pending.is_empty() {
            self.poll()?;
        }
        let Some((event, origin)) = self.pending.pop_front() else {
            return Ok(Vec::new());
        };
        if origin.is_some() {
            self.last_origin = origin;
        }
        Ok(vec![event])
    }

    fn is_connected(&self) -> bool {
        // Long polling has no session to lose.
        true
    }
}

impl std::fmt::Debug for TelegramChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramChannel")
            .field("settings", &self.settings)
            .field("offset", &self.offset)
            .field("pending", &self.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(value: Value) -> Update {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn text_from_bound_chat_is_a_command() {
        let u = update(json!({
            "update_id": 10,
            "message": { "message_id": 1, "chat": { "id": 42 }, "text": "/update" }
        }));
        assert_eq!(classify(u, 42), Some(Incoming::Text("/update".into())));
    }

    #[test]
    fn foreign_chat_is_dropped() {
        let u = update(json!({
            "update_id": 11,
            "message": { "message_id": 1, "chat": { "id": 7 }, "text": "/reset" }
        }));
        assert_eq!(classify(u, 42), None);
    }

    #[test]
    fn callback_keeps_origin_and_title() {
        let u = update(json!({
            "update_id": 12,
            "callback_query": {
                "id": "q1",
                "data": "pick:3",
                "message": { "message_id": 99, "chat": { "id": 42 }, "text": "Priority decks" }
            }
        }));
        assert_eq!(
            classify(u, 42),
            Some(Incoming::Press {
                query_id: "q1".into(),
                origin: CallbackOrigin {
                    message_id: 99,
                    payload: "pick:3".into()
                },
                title: "Priority decks".into(),
            })
        );
    }

    #[test]
    fn message_without_text_is_ignored() {
        let u = update(json!({
            "update_id": 13,
            "message": { "message_id": 2, "chat": { "id": 42 } }
        }));
        assert_eq!(classify(u, 42), None);
    }

    #[test]
    fn keyboard_has_one_button_per_row() {
        let markup = keyboard([("A", "pick:1"), ("B", "pick:2")]);
        let rows = markup["inline_keyboard"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0]["text"], "B");
        assert_eq!(rows[1][0]["callback_data"], "pick:2");
    }

    #[test]
    fn edit_without_callback_fails() {
        let mut channel = TelegramChannel::new(TelegramSettings::new("t", 1));
        assert!(matches!(
            channel.edit_last_options("DONE"),
            Err(ChannelError::NothingToEdit)
        ));
    }

    #[test]
    fn settings_debug_hides_token() {
        let rendered = format!("{:?}", TelegramSettings::new("secret-token", 1));
        assert!(!rendered.contains("secret-token"));
    }
}
