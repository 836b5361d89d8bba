//! Messaging channel abstraction.
//!
//! `MessagingChannel` is the seam between the interaction controller and a
//! chat transport. The controller renders plain text and titled option sets,
//! and consumes an ordered stream of [`InboundEvent`]s.
//!
//! Implementations: [`TelegramChannel`] (Bot API), [`ConsoleChannel`]
//! (stdin/stdout) and [`MemoryChannel`] (recording, for tests).

pub mod console;
pub mod memory;
pub mod payload;
pub mod telegram;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use console::ConsoleChannel;
pub use memory::{MemoryChannel, Outbound};
pub use payload::CallbackPayload;
pub use telegram::TelegramChannel;

// ── Errors ───────────────────────────────────────────────────────────────

#[derive(Debug, Error, Diagnostic)]
pub enum ChannelError {
    #[error("transport error: {message}")]
    #[diagnostic(
        code(scout::channel::transport),
        help("The underlying transport (stdin, Bot API, ...) encountered an error.")
    )]
    Transport { message: String },

    #[error("Bot API call {method} rejected: {description}")]
    #[diagnostic(
        code(scout::channel::api),
        help("Check the bot token and chat id in the [telegram] config section.")
    )]
    Api { method: String, description: String },

    #[error("no option set to edit")]
    #[diagnostic(
        code(scout::channel::nothing_to_edit),
        help("Options can only be edited after a button on them was pressed.")
    )]
    NothingToEdit,
}

/// Convenience alias for channel operations.
pub type ChannelResult<T> = std::result::Result<T, ChannelError>;

// ── Messages ─────────────────────────────────────────────────────────────

/// One button in a rendered option set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionButton {
    pub label: String,
    /// Encoded [`CallbackPayload`] returned when the button is pressed.
    pub payload: String,
}

impl OptionButton {
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

/// Something the user did, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InboundEvent {
    /// Free text, usually a `/command`.
    Command(String),
    /// A button press on a previously sent option set.
    Callback {
        /// Title of the option set the button belonged to (informational).
        source_title: String,
        payload: String,
    },
}

impl InboundEvent {
    pub fn command(text: impl Into<String>) -> Self {
        Self::Command(text.into())
    }

    pub fn callback(source_title: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::Callback {
            source_title: source_title.into(),
            payload: payload.into(),
        }
    }
}

// ── MessagingChannel trait ───────────────────────────────────────────────

/// A chat transport bound to exactly one conversation.
pub trait MessagingChannel: Send {
    fn send_text(&mut self, text: &str) -> ChannelResult<()>;

    /// Render a titled set of buttons, one per row.
    fn send_options(&mut self, title: &str, options: &[OptionButton]) -> ChannelResult<()>;

    /// Replace the buttons of the option set the latest callback came from
    /// with a single button labelled `label` (same payload).
    fn edit_last_options(&mut self, label: &str) -> ChannelResult<()>;

    /// Next batch of inbound events. May block (long polling); an empty batch
    /// is not an error.
    fn receive(&mut self) -> ChannelResult<Vec<InboundEvent>>;

    /// Whether more events can arrive.
    fn is_connected(&self) -> bool;
}
