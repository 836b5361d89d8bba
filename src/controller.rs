//! Interaction controller: the offer → select → confirm/restore state machine.
//!
//! Events are handled one at a time in arrival order. Every failure inside a
//! single event is reported to the channel, logged, and leaves the controller
//! `Idle`; the loop itself only stops when the channel disconnects.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::{CatalogSource, DisplayId};
use crate::channel::{CallbackPayload, InboundEvent, MessagingChannel, OptionButton};
use crate::error::{ScoutError, ScoutResult};
use crate::recommend::RecommendationSelector;
use crate::session::SessionIndex;
use crate::store::CompletionStore;

/// Title of the single-button set asking whether a deck was played.
pub const CONFIRM_TITLE: &str = "Completed?";
/// Title of the completed-deck list rendered by `/done`.
pub const COMPLETED_TITLE: &str = "Completed decks";

pub const COMPLETED_LABEL: &str = "SUCCESSFULLY COMPLETED";
pub const RESTORED_LABEL: &str = "RESTORED";

/// Answer to a button whose payload is not understood.
pub const REFRESH_NOTICE: &str = "Session finished. Run /update to refresh decks.";

/// Pause after a failed receive before polling again.
const RECEIVE_BACKOFF: Duration = Duration::from_secs(5);

// ── Commands ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Mode,
    Switch,
    Update,
    Reset,
    Done,
}

impl Command {
    pub const ALL: [Command; 6] = [
        Command::Help,
        Command::Mode,
        Command::Switch,
        Command::Update,
        Command::Reset,
        Command::Done,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Mode => "mode",
            Self::Switch => "switch",
            Self::Update => "update",
            Self::Reset => "reset",
            Self::Done => "done",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Help => "list commands",
            Self::Mode => "show the active mode",
            Self::Switch => "toggle between main and pbe mode",
            Self::Update => "fetch decks and offer new ones",
            Self::Reset => "forget every completed deck of the active mode",
            Self::Done => "list completed decks, press one to restore it",
        }
    }

    /// Parse `/name` or `/name@botname`; trailing words are ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?.strip_prefix('/')?;
        let name = word.split('@').next().unwrap_or(word);
        Self::ALL.into_iter().find(|cmd| cmd.name() == name)
    }

    fn help_text() -> String {
        Self::ALL
            .iter()
            .map(|cmd| format!("/{} - {}", cmd.name(), cmd.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.name())
    }
}

// ── State ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    /// Offer groups were rendered.
    Offered,
    /// A deck was picked; its confirmation button is live.
    AwaitingConfirmation { display_id: DisplayId },
    /// The completed list was rendered.
    ReviewingCompleted,
}

// ── Controller ───────────────────────────────────────────────────────────

pub struct InteractionController {
    store: Arc<dyn CompletionStore>,
    source: CatalogSource,
    channel: Box<dyn MessagingChannel>,
    selector: RecommendationSelector,
    session: SessionIndex,
    state: InteractionState,
}

impl InteractionController {
    pub fn new(
        store: Arc<dyn CompletionStore>,
        source: CatalogSource,
        channel: Box<dyn MessagingChannel>,
        selector: RecommendationSelector,
    ) -> Self {
        Self {
            store,
            source,
            channel,
            selector,
            session: SessionIndex::new(),
            state: InteractionState::Idle,
        }
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn session(&self) -> &SessionIndex {
        &self.session
    }

    pub fn source(&self) -> &CatalogSource {
        &self.source
    }

    /// Run one transition for `event` and return the resulting state.
    pub fn handle_event(&mut self, event: InboundEvent) -> InteractionState {
        let outcome = match event {
            InboundEvent::Command(text) => self.on_command(&text),
            InboundEvent::Callback {
                source_title,
                payload,
            } => self.on_callback(&source_title, &payload),
        };

        let next = match outcome {
            Ok(next) => next,
            Err(err) => {
                self.report(&err);
                InteractionState::Idle
            }
        };
        if next != self.state {
            tracing::debug!(from = ?self.state, to = ?next, "state transition");
        }
        self.state = next;
        next
    }

    /// Receive one batch and handle it. Returns how many events were handled.
    pub fn pump(&mut self) -> ScoutResult<usize> {
        let events = self.channel.receive()?;
        let count = events.len();
        for event in events {
            self.handle_event(event);
        }
        Ok(count)
    }

    /// Pump until the channel disconnects.
    pub fn run(&mut self) -> ScoutResult<()> {
        tracing::info!("controller started");
        while self.channel.is_connected() {
            if let Err(e) = self.pump() {
                // A failed receive is transient for long-polling transports.
                tracing::warn!(error = %e, "receive failed");
                if !self.channel.is_connected() {
                    return Err(e);
                }
                std::thread::sleep(RECEIVE_BACKOFF);
            }
        }
        tracing::info!("channel disconnected, controller stopped");
        Ok(())
    }

    fn report(&mut self, err: &ScoutError) {
        tracing::warn!(error = %err, state = ?self.state, "event failed");
        if let Err(send_err) = self.channel.send_text(&format!("Error: {err}")) {
            tracing::warn!(error = %send_err, "could not report error to channel");
        }
    }

    // ── Commands ─────────────────────────────────────────────────────────

    fn on_command(&mut self, text: &str) -> ScoutResult<InteractionState> {
        let Some(command) = Command::parse(text) else {
            self.channel
                .send_text(&format!("Unknown command: {}. Send /help for the list.", text.trim()))?;
            return Ok(self.state);
        };
        tracing::debug!(%command, "command received");

        match command {
            Command::Help => {
                self.channel.send_text(&Command::help_text())?;
                Ok(self.state)
            }
            Command::Mode => {
                let mode = self.store.mode()?;
                self.channel
                    .send_text(&format!("Current mode: {}", mode.label()))?;
                Ok(self.state)
            }
            Command::Switch => {
                let mode = self.store.mode()?.toggle();
                self.store.save_mode(mode)?;
                tracing::info!(%mode, "mode switched");
                self.channel
                    .send_text(&format!("Mode switched. Current mode: {}", mode.label()))?;
                Ok(InteractionState::Idle)
            }
            Command::Update => self.offer(),
            Command::Reset => {
                let mode = self.store.mode()?;
                self.store.delete_all(mode)?;
                tracing::info!(%mode, "completed list reset");
                self.channel
                    .send_text(&format!("Completed list of {} cleared.", mode.label()))?;
                Ok(InteractionState::Idle)
            }
            Command::Done => self.review_completed(),
        }
    }

    /// The recommendation cycle: Idle → Offered.
    fn offer(&mut self) -> ScoutResult<InteractionState> {
        let mode = self.store.mode()?;
        let catalog = self.source.refresh(mode)?;
        let completed = self.store.completed_set(mode)?;
        let groups = self.selector.select(&catalog, &completed);

        if groups.is_empty() {
            tracing::info!(%mode, catalog = catalog.len(), "nothing left to recommend");
            self.channel.send_text(&format!(
                "Congratulations! All {} decks completed.",
                mode.label()
            ))?;
            return Ok(InteractionState::Idle);
        }

        for group in &groups {
            self.session.record_group(group);
            let buttons: Vec<OptionButton> = group
                .entries
                .iter()
                .map(|offer| {
                    OptionButton::new(
                        offer.name.clone(),
                        CallbackPayload::Select(offer.display_id).encode(),
                    )
                })
                .collect();
            self.channel.send_options(group.kind.title(), &buttons)?;
        }
        tracing::info!(
            %mode,
            catalog = catalog.len(),
            completed = completed.len(),
            groups = groups.len(),
            "offers sent"
        );
        Ok(InteractionState::Offered)
    }

    /// Idle → ReviewingCompleted.
    fn review_completed(&mut self) -> ScoutResult<InteractionState> {
        let mode = self.store.mode()?;
        let mut names = self.store.all(mode)?;
        if names.is_empty() {
            self.channel
                .send_text(&format!("No completed decks in {}.", mode.label()))?;
            return Ok(InteractionState::Idle);
        }

        names.sort();
        let buttons: Vec<OptionButton> = names
            .into_iter()
            .map(|name| {
                let payload = CallbackPayload::Restore(name.clone()).encode();
                OptionButton::new(name, payload)
            })
            .collect();
        self.channel.send_options(COMPLETED_TITLE, &buttons)?;
        Ok(InteractionState::ReviewingCompleted)
    }

    // ── Callbacks ────────────────────────────────────────────────────────

    fn on_callback(&mut self, source_title: &str, payload: &str) -> ScoutResult<InteractionState> {
        tracing::debug!(title = source_title, payload, "callback received");
        match CallbackPayload::parse(payload) {
            Some(CallbackPayload::Select(display_id)) => self.select(display_id),
            Some(CallbackPayload::Confirm(display_id)) => self.confirm(display_id),
            Some(CallbackPayload::Restore(name)) => self.restore(&name),
            None => {
                tracing::debug!(payload, "unknown callback payload");
                self.channel.send_text(REFRESH_NOTICE)?;
                Ok(InteractionState::Idle)
            }
        }
    }

    /// Offered → AwaitingConfirmation.
    fn select(&mut self, display_id: DisplayId) -> ScoutResult<InteractionState> {
        let name = self.session.resolve(display_id)?.to_string();
        let mode = self.store.mode()?;

        match self.source.reference_url(mode, &name) {
            Ok(url) => self.channel.send_text(&url)?,
            // The deck is still valid, only its link is missing.
            Err(e) => {
                tracing::warn!(error = %e, deck = %name, "reference lookup failed");
                self.channel
                    .send_text(&format!("Could not find the guide link: {e}"))?;
            }
        }

        let button = OptionButton::new(name, CallbackPayload::Confirm(display_id).encode());
        self.channel.send_options(CONFIRM_TITLE, &[button])?;
        Ok(InteractionState::AwaitingConfirmation { display_id })
    }

    /// AwaitingConfirmation → Idle. Resolves against the current mapping.
    fn confirm(&mut self, display_id: DisplayId) -> ScoutResult<InteractionState> {
        self.channel.edit_last_options(COMPLETED_LABEL)?;

        let name = match self.session.resolve(display_id) {
            Ok(name) => name.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "confirmation for unknown option ignored");
                return Ok(InteractionState::Idle);
            }
        };
        let mode = self.store.mode()?;
        self.store.save(mode, &name)?;
        tracing::info!(%mode, deck = %name, "deck completed");
        Ok(InteractionState::Idle)
    }

    /// ReviewingCompleted → Idle.
    fn restore(&mut self, name: &str) -> ScoutResult<InteractionState> {
        self.channel.edit_last_options(RESTORED_LABEL)?;

        let mode = self.store.mode()?;
        let existed = self.store.delete_by_name(mode, name)?;
        tracing::info!(%mode, deck = name, existed, "deck restored");
        Ok(InteractionState::Idle)
    }
}

impl fmt::Debug for InteractionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionController")
            .field("state", &self.state)
            .field("session", &self.session.len())
            .field("selector", &self.selector)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::source::SourceUrls;
    use crate::catalog::{CatalogExtractor, StaticFetcher};
    use crate::channel::{MemoryChannel, Outbound};
    use crate::mode::Mode;
    use crate::store::MemStore;

    fn page(names: &[&str]) -> String {
        let decks: Vec<serde_json::Value> = names
            .iter()
            .enumerate()
            .map(|(i, n)| serde_json::json!({ "name": n, "teamBuilderKey": format!("k{i}") }))
            .collect();
        let props = serde_json::json!({
            "props": { "pageProps": { "dehydratedState": { "queries": [
                { "state": { "data": { "guideDecks": decks } } }
            ] } } }
        });
        format!("<script>{props}</script>")
    }

    fn controller(
        names: &[&str],
        store: Arc<MemStore>,
    ) -> (InteractionController, MemoryChannel) {
        let urls = SourceUrls::default();
        let fetcher = StaticFetcher::new().with_page(urls.main.clone(), page(names));
        let source = CatalogSource::new(Box::new(fetcher), CatalogExtractor::default(), urls);
        let channel = MemoryChannel::new();
        let ctl = InteractionController::new(
            store,
            source,
            Box::new(channel.clone()),
            RecommendationSelector::default(),
        );
        (ctl, channel)
    }

    #[test]
    fn command_parsing() {
        assert_eq!(Command::parse("/update"), Some(Command::Update));
        assert_eq!(Command::parse("  /done@scout_bot  "), Some(Command::Done));
        assert_eq!(Command::parse("/reset now"), Some(Command::Reset));
        assert_eq!(Command::parse("update"), None);
        assert_eq!(Command::parse("/fix"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn help_lists_every_command() {
        let (mut ctl, channel) = controller(&[], Arc::new(MemStore::new()));
        ctl.handle_event(InboundEvent::command("/help"));
        let text = &channel.texts()[0];
        assert_eq!(text.lines().count(), Command::ALL.len());
        assert!(text.starts_with("/help - "));
    }

    #[test]
    fn unknown_command_keeps_state() {
        let (mut ctl, channel) = controller(&[], Arc::new(MemStore::new()));
        assert_eq!(ctl.handle_event(InboundEvent::command("hello")), InteractionState::Idle);
        assert!(channel.texts()[0].starts_with("Unknown command: hello"));
    }

    #[test]
    fn update_offers_ordinary_then_priority() {
        let (mut ctl, channel) = controller(&["[Aug] X", "Y", "[Aug] Z"], Arc::new(MemStore::new()));
        let state = ctl.handle_event(InboundEvent::command("/update"));
        assert_eq!(state, InteractionState::Offered);

        let sets = channel.option_sets();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].0, "Ordinary deck");
        assert_eq!(sets[0].1, vec![OptionButton::new("Y", "pick:2")]);
        assert_eq!(sets[1].0, "Priority decks");
        assert_eq!(
            sets[1].1,
            vec![
                OptionButton::new("[Aug] Z", "pick:3"),
                OptionButton::new("[Aug] X", "pick:1"),
            ]
        );
        assert_eq!(ctl.session().len(), 3);
    }

    #[test]
    fn update_with_everything_completed() {
        let store = Arc::new(MemStore::with_completed(Mode::Main, ["A", "B"]));
        let (mut ctl, channel) = controller(&["A", "B"], store);
        assert_eq!(ctl.handle_event(InboundEvent::command("/update")), InteractionState::Idle);
        assert!(channel.option_sets().is_empty());
        assert!(channel.texts()[0].contains("All main mode decks completed"));
    }

    #[test]
    fn fetch_failure_is_reported_and_idle() {
        // No page for the pbe url.
        let store = Arc::new(MemStore::new());
        store.save_mode(Mode::Pbe).unwrap();
        let (mut ctl, channel) = controller(&["A"], store);
        assert_eq!(ctl.handle_event(InboundEvent::command("/update")), InteractionState::Idle);
        assert!(channel.texts()[0].starts_with("Error: "));
        assert!(ctl.session().is_empty());
    }

    #[test]
    fn select_then_confirm() {
        let store = Arc::new(MemStore::new());
        let (mut ctl, channel) = controller(&["A", "B"], store.clone());
        ctl.handle_event(InboundEvent::command("/update"));
        channel.take_outbound();

        let state = ctl.handle_event(InboundEvent::callback("Ordinary deck", "pick:2"));
        let id: DisplayId = "2".parse().unwrap();
        assert_eq!(state, InteractionState::AwaitingConfirmation { display_id: id });
        assert_eq!(
            channel.take_outbound(),
            vec![
                Outbound::Text("https://lolchess.gg/builder/guide/k1".into()),
                Outbound::Options {
                    title: CONFIRM_TITLE.into(),
                    buttons: vec![OptionButton::new("B", "done:2")],
                },
            ]
        );

        let state = ctl.handle_event(InboundEvent::callback(CONFIRM_TITLE, "done:2"));
        assert_eq!(state, InteractionState::Idle);
        assert_eq!(
            channel.take_outbound(),
            vec![Outbound::Edit { label: COMPLETED_LABEL.into() }]
        );
        assert_eq!(store.all(Mode::Main).unwrap(), vec!["B"]);
    }

    #[test]
    fn select_unknown_id_expires() {
        let (mut ctl, channel) = controller(&["A"], Arc::new(MemStore::new()));
        let state = ctl.handle_event(InboundEvent::callback("Ordinary deck", "pick:7"));
        assert_eq!(state, InteractionState::Idle);
        assert!(channel.texts()[0].contains("session expired"));
    }

    #[test]
    fn confirm_unknown_id_only_acknowledges() {
        let store = Arc::new(MemStore::new());
        let (mut ctl, channel) = controller(&["A"], store.clone());
        let state = ctl.handle_event(InboundEvent::callback(CONFIRM_TITLE, "done:5"));
        assert_eq!(state, InteractionState::Idle);
        assert_eq!(
            channel.outbound(),
            vec![Outbound::Edit { label: COMPLETED_LABEL.into() }]
        );
        assert!(store.all(Mode::Main).unwrap().is_empty());
    }

    #[test]
    fn untagged_payload_gets_refresh_notice() {
        let (mut ctl, channel) = controller(&["A"], Arc::new(MemStore::new()));
        ctl.handle_event(InboundEvent::callback("Ordinary deck", "1"));
        assert_eq!(channel.texts(), vec![REFRESH_NOTICE]);
    }

    #[test]
    fn done_and_restore() {
        let store = Arc::new(MemStore::with_completed(Mode::Main, ["B", "A"]));
        let (mut ctl, channel) = controller(&["A", "B"], store.clone());

        let state = ctl.handle_event(InboundEvent::command("/done"));
        assert_eq!(state, InteractionState::ReviewingCompleted);
        let sets = channel.option_sets();
        assert_eq!(sets[0].0, COMPLETED_TITLE);
        assert_eq!(
            sets[0].1,
            vec![
                OptionButton::new("A", "undo:A"),
                OptionButton::new("B", "undo:B"),
            ]
        );

        let state = ctl.handle_event(InboundEvent::callback(COMPLETED_TITLE, "undo:A"));
        assert_eq!(state, InteractionState::Idle);
        assert_eq!(store.all(Mode::Main).unwrap(), vec!["B"]);
        assert_eq!(
            channel.outbound().last(),
            Some(&Outbound::Edit { label: RESTORED_LABEL.into() })
        );
    }

    #[test]
    fn done_with_empty_list() {
        let (mut ctl, channel) = controller(&[], Arc::new(MemStore::new()));
        assert_eq!(ctl.handle_event(InboundEvent::command("/done")), InteractionState::Idle);
        assert_eq!(channel.texts(), vec!["No completed decks in main mode."]);
    }

    #[test]
    fn switch_mode_and_reset() {
        let store = Arc::new(MemStore::with_completed(Mode::Pbe, ["P"]));
        let (mut ctl, channel) = controller(&[], store.clone());

        ctl.handle_event(InboundEvent::command("/switch"));
        assert_eq!(store.mode().unwrap(), Mode::Pbe);
        ctl.handle_event(InboundEvent::command("/mode"));
        ctl.handle_event(InboundEvent::command("/reset"));
        assert!(store.all(Mode::Pbe).unwrap().is_empty());

        assert_eq!(
            channel.texts(),
            vec![
                "Mode switched. Current mode: pbe mode",
                "Current mode: pbe mode",
                "Completed list of pbe mode cleared.",
            ]
        );
    }

    #[test]
    fn run_drains_until_closed() {
        let (mut ctl, channel) = controller(&["A"], Arc::new(MemStore::new()));
        channel.push_command("/update");
        channel.push_callback("Ordinary deck", "pick:1");
        channel.close();
        ctl.run().unwrap();
        assert_eq!(
            ctl.state(),
            InteractionState::AwaitingConfirmation { display_id: "1".parse().unwrap() }
        );
    }
}
