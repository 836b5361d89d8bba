//! Display-id → deck-name mapping for the active conversation.
//!
//! Each recommendation cycle overwrites the ids it reuses and leaves every
//! other id alone, so buttons from an older cycle keep resolving until the
//! process restarts or a newer cycle claims the same id. Ids derive from
//! catalog positions, so a reused id may now name a different deck; the
//! latest mapping wins.

use std::collections::HashMap;

use miette::Diagnostic;
use thiserror::Error;

use crate::catalog::DisplayId;
use crate::recommend::OfferGroup;

#[derive(Debug, Error, Diagnostic)]
pub enum SessionError {
    #[error("session expired: option {display_id} is no longer known")]
    #[diagnostic(
        code(scout::session::expired),
        help("The bot restarted since these options were sent. Run /update for fresh ones.")
    )]
    Expired { display_id: String },
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Default, Clone)]
pub struct SessionIndex {
    entries: HashMap<DisplayId, String>,
}

impl SessionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. Returns the name previously mapped to `display_id`.
    pub fn record(&mut self, display_id: DisplayId, name: impl Into<String>) -> Option<String> {
        self.entries.insert(display_id, name.into())
    }

    /// Record every entry of an offer group.
    pub fn record_group(&mut self, group: &OfferGroup) {
        for offer in &group.entries {
            if let Some(previous) = self.record(offer.display_id, offer.name.clone()) {
                if previous != offer.name {
                    tracing::debug!(
                        display_id = %offer.display_id,
                        %previous,
                        current = %offer.name,
                        "display id remapped"
                    );
                }
            }
        }
    }

    pub fn resolve(&self, display_id: DisplayId) -> SessionResult<&str> {
        self.entries
            .get(&display_id)
            .map(String::as_str)
            .ok_or_else(|| SessionError::Expired {
                display_id: display_id.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
