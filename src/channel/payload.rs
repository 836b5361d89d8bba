//! Tagged callback payloads.
//!
//! Every button carries its own handler tag, so dispatch never depends on the
//! text of the message the button was attached to.

use std::fmt;

use crate::catalog::DisplayId;

const PICK: &str = "pick:";
const DONE: &str = "done:";
const UNDO: &str = "undo:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackPayload {
    /// A deck was chosen from an offer.
    Select(DisplayId),
    /// The chosen deck was played to completion.
    Confirm(DisplayId),
    /// A completed deck should be offered again.
    Restore(String),
}

impl CallbackPayload {
    /// Decode a payload. Unknown tags and malformed ids yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        if let Some(id) = raw.strip_prefix(PICK) {
            id.parse().ok().map(Self::Select)
        } else if let Some(id) = raw.strip_prefix(DONE) {
            id.parse().ok().map(Self::Confirm)
        } else if let Some(name) = raw.strip_prefix(UNDO) {
            (!name.is_empty()).then(|| Self::Restore(name.to_string()))
        } else {
            None
        }
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CallbackPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select(id) => write!(f, "{PICK}{id}"),
            Self::Confirm(id) => write!(f, "{DONE}{id}"),
            Self::Restore(name) => write!(f, "{UNDO}{name}"),
        }
    }
}
