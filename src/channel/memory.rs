//! Recording in-memory channel.
//!
//! Clones share one queue and one transcript, so a test can keep a handle
//! while the controller owns the boxed channel.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{ChannelResult, InboundEvent, MessagingChannel, OptionButton};

/// One thing the controller sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Options {
        title: String,
        buttons: Vec<OptionButton>,
    },
    Edit {
        label: String,
    },
}

#[derive(Debug, Default)]
struct MemoryState {
    inbound: VecDeque<InboundEvent>,
    outbound: Vec<Outbound>,
    closed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryChannel {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, event: InboundEvent) {
        self.lock().inbound.push_back(event);
    }

    pub fn push_command(&self, text: impl Into<String>) {
        self.push(InboundEvent::command(text));
    }

    pub fn push_callback(&self, source_title: impl Into<String>, payload: impl Into<String>) {
        self.push(InboundEvent::callback(source_title, payload));
    }

    /// No further events after the queued ones.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    pub fn pending(&self) -> usize {
        self.lock().inbound.len()
    }

    /// Everything sent so far.
    pub fn outbound(&self) -> Vec<Outbound> {
        self.lock().outbound.clone()
    }

    /// Everything sent so far, clearing the transcript.
    pub fn take_outbound(&self) -> Vec<Outbound> {
        std::mem::take(&mut self.lock().outbound)
    }

    /// Only the plain text messages.
    pub fn texts(&self) -> Vec<String> {
        self.lock()
            .outbound
            .iter()
            .filter_map(|o| match o {
                Outbound::Text(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Every option set sent, as `(title, buttons)`.
    pub fn option_sets(&self) -> Vec<(String, Vec<OptionButton>)> {
        self.lock()
            .outbound
            .iter()
            .filter_map(|o| match o {
                Outbound::Options { title, buttons } => Some((title.clone(), buttons.clone())),
                _ => None,
            })
            .collect()
    }

    fn record(&self, outbound: Outbound) {
        self.lock().outbound.push(outbound);
    }
}

impl MessagingChannel for MemoryChannel {
    fn send_text(&mut self, text: &str) -> ChannelResult<()> {
        self.record(Outbound::Text(text.to_string()));
        Ok(())
    }

    fn send_options(&mut self, title: &str, options: &[OptionButton]) -> ChannelResult<()> {
        self.record(Outbound::Options {
            title: title.to_string(),
            buttons: options.to_vec(),
        });
        Ok(())
    }

    fn edit_last_options(&mut self, label: &str) -> ChannelResult<()> {
        self.record(Outbound::Edit {
            label: label.to_string(),
        });
        Ok(())
    }

    fn receive(&mut self) -> ChannelResult<Vec<InboundEvent>> {
        Ok(self.lock().inbound.drain(..).collect())
    }

    fn is_connected(&self) -> bool {
        let state = self.lock();
        !(state.closed && state.inbound.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let handle = MemoryChannel::new();
        let mut owned: Box<dyn MessagingChannel> = Box::new(handle.clone());

        handle.push_command("/help");
        handle.push_callback("Ordinary deck", "pick:1");
        assert_eq!(handle.pending(), 2);

        let events = owned.receive().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(handle.pending(), 0);

        owned.send_text("hello").unwrap();
        owned.edit_last_options("RESTORED").unwrap();
        assert_eq!(handle.texts(), vec!["hello"]);
        assert_eq!(handle.take_outbound().len(), 2);
        assert!(handle.outbound().is_empty());
    }

    #[test]
    fn disconnects_once_closed_and_drained() {
        let mut ch = MemoryChannel::new();
        ch.push_command("/mode");
        ch.close();
        assert!(ch.is_connected());
        ch.receive().unwrap();
        assert!(!ch.is_connected());
    }
}
