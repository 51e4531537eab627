use crate::client::RagClient;
use crate::config::Config;
use crate::endpoint::{self, LaunchContext, ResolvedEndpoint, SaveOutcome};
use crate::events::{AskOutcome, BusyState, ChatEntry, outcome_entries};
use crate::storage::StorageManager;
use crate::ui::conversation::commands::{ParsedCommand, SlashCommand, get_help_text, parse_slash_command};
use crate::ui::conversation::composer::{InputResult, TextInput};
use crate::ui::conversation::history::Transcript;
use crate::ui::conversation::status::StatusLine;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    widgets::Widget,
};
use tokio::sync::mpsc;

const SCROLL_STEP: usize = 5;

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
    /// A new endpoint was saved; rebuild from a fresh resolver run
    Reload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Query,
    Endpoint,
}

/// The chat controller: owns the transcript, both inputs, the busy state and
/// the client for the endpoint resolved at construction.
pub struct ConversationManager {
    transcript: Transcript,
    query_input: TextInput,
    endpoint_input: TextInput,
    focus: Focus,
    busy: BusyState,
    last_failed: bool,
    client: RagClient,
    resolved: ResolvedEndpoint,
    storage: StorageManager,
    outcome_tx: mpsc::UnboundedSender<AskOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<AskOutcome>,
}

impl ConversationManager {
    /// Resolve the endpoint and build a fresh controller around it
    pub fn new(config: &Config, launch: &LaunchContext) -> Self {
        let storage = StorageManager::new(config.storage_path());
        let resolved = endpoint::resolve_endpoint(config, launch, &storage);
        Self::with_endpoint(config, resolved, storage)
    }

    pub fn with_endpoint(config: &Config, resolved: ResolvedEndpoint, storage: StorageManager) -> Self {
        let client = RagClient::new(resolved.url.clone(), config.request.clone());

        let mut query_input = TextInput::new("Ask", "Type a question and press Enter...");
        query_input.set_focus(true);
        let mut endpoint_input = TextInput::new("API endpoint (Enter saves and reloads)", "http://host:port");
        endpoint_input.set_value(resolved.url.clone());

        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        Self {
            transcript: Transcript::new(config.ui.show_timestamps),
            query_input,
            endpoint_input,
            focus: Focus::Query,
            busy: BusyState::Idle,
            last_failed: false,
            client,
            resolved,
            storage,
            outcome_tx,
            outcome_rx,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn entries(&self) -> &[ChatEntry] {
        self.transcript.entries()
    }

    pub fn resolved_endpoint(&self) -> &ResolvedEndpoint {
        &self.resolved
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// Whether the most recently settled request failed
    pub fn last_request_failed(&self) -> bool {
        self.last_failed
    }

    /// Whether the submit control currently accepts Enter
    pub fn submit_enabled(&self) -> bool {
        !self.query_input.is_disabled()
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn query_text(&self) -> &str {
        self.query_input.value()
    }

    pub fn set_query_text(&mut self, text: impl Into<String>) {
        self.query_input.set_value(text);
    }

    pub fn endpoint_text(&self) -> &str {
        self.endpoint_input.value()
    }

    pub fn set_endpoint_text(&mut self, text: impl Into<String>) {
        self.endpoint_input.set_value(text);
    }

    /// Take the query from the input and enter the busy state. Returns
    /// `None`, with nothing changed, when the trimmed input is empty or a
    /// request is already in flight.
    pub fn begin_submit(&mut self) -> Option<String> {
        if self.busy.is_busy() {
            return None;
        }

        let query = self.query_input.value().trim().to_string();
        if query.is_empty() {
            return None;
        }

        self.transcript.add_user_message(query.clone());
        self.query_input.clear();
        self.set_busy(BusyState::Sending);

        tracing::info!(endpoint = %self.client.endpoint(), "submitting query");
        Some(query)
    }

    /// Render a settled request into the transcript and leave the busy state.
    pub fn finish_submit(&mut self, outcome: AskOutcome) {
        match &outcome {
            Ok(response) => tracing::info!(
                sources = response.sources.as_ref().map_or(0, Vec::len),
                "query answered"
            ),
            Err(e) => tracing::warn!(error = %e, "query failed"),
        }

        self.last_failed = outcome.is_err();
        for entry in outcome_entries(&outcome) {
            self.transcript.push(entry);
        }
        self.set_busy(BusyState::Idle);
    }

    /// Run the whole submit flow inline. Returns whether a request was made.
    pub async fn submit(&mut self) -> bool {
        let Some(query) = self.begin_submit() else {
            return false;
        };

        let outcome = self.client.ask(&query).await;
        self.finish_submit(outcome);
        true
    }

    /// Start the submit flow with the request running in the background.
    /// The outcome is applied by [`Self::process_responses`] or
    /// [`Self::wait_for_response`]. Must be called within a tokio runtime.
    pub fn spawn_submit(&mut self) -> bool {
        let Some(query) = self.begin_submit() else {
            return false;
        };

        let client = self.client.clone();
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let outcome = client.ask(&query).await;
            let _ = tx.send(outcome);
        });
        true
    }

    /// Apply any settled background requests (called from the main loop)
    pub fn process_responses(&mut self) {
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            self.finish_submit(outcome);
        }
    }

    /// Wait for the in-flight background request, if any, and apply it
    pub async fn wait_for_response(&mut self) {
        if !self.busy.is_busy() {
            return;
        }
        if let Some(outcome) = self.outcome_rx.recv().await {
            self.finish_submit(outcome);
        }
    }

    /// Save the endpoint field. Blank input is a no-op.
    pub fn save_endpoint(&mut self) -> ConversationAction {
        match endpoint::save_endpoint(&self.storage, self.endpoint_input.value()) {
            SaveOutcome::Reload(value) => {
                tracing::info!(endpoint = %value, "endpoint saved, reloading");
                ConversationAction::Reload
            }
            SaveOutcome::Ignored => ConversationAction::None,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        match key.code {
            KeyCode::Esc => return ConversationAction::Exit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return ConversationAction::Exit;
            }
            KeyCode::Tab | KeyCode::BackTab => {
                self.toggle_focus();
                return ConversationAction::None;
            }
            KeyCode::PageUp => {
                self.transcript.scroll_up(SCROLL_STEP);
                return ConversationAction::None;
            }
            KeyCode::PageDown => {
                self.transcript.scroll_down(SCROLL_STEP);
                return ConversationAction::None;
            }
            _ => {}
        }

        match self.focus {
            Focus::Query => match self.query_input.handle_key(key) {
                InputResult::Submitted(raw) => self.handle_query_submit(&raw),
                InputResult::None => ConversationAction::None,
            },
            Focus::Endpoint => match self.endpoint_input.handle_key(key) {
                InputResult::Submitted(_) => self.save_endpoint(),
                InputResult::None => ConversationAction::None,
            },
        }
    }

    fn handle_query_submit(&mut self, raw: &str) -> ConversationAction {
        // `//text` sends `/text` as a query
        if let Some(literal) = raw.trim_start().strip_prefix("//") {
            self.query_input.set_value(format!("/{}", literal));
            self.spawn_submit();
            return ConversationAction::None;
        }

        if let Some(command) = parse_slash_command(raw) {
            self.query_input.clear();
            return self.handle_slash_command(command);
        }

        self.spawn_submit();
        ConversationAction::None
    }

    /// Handle slash commands
    fn handle_slash_command(&mut self, command: ParsedCommand) -> ConversationAction {
        match command.command {
            SlashCommand::Api => match command.argument() {
                Some(url) => {
                    self.endpoint_input.set_value(url);
                    self.save_endpoint()
                }
                None => {
                    let notice = format!("Endpoint: {}", self.resolved);
                    self.transcript.add_system_message(notice);
                    ConversationAction::None
                }
            },
            SlashCommand::Bye => ConversationAction::Exit,
            SlashCommand::Help => {
                self.transcript.add_system_message(get_help_text());
                ConversationAction::None
            }
        }
    }

    fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Query => Focus::Endpoint,
            Focus::Endpoint => Focus::Query,
        };
        self.query_input.set_focus(self.focus == Focus::Query);
        self.endpoint_input.set_focus(self.focus == Focus::Endpoint);
    }

    fn set_busy(&mut self, busy: BusyState) {
        self.busy = busy;
        self.query_input.set_disabled(busy.is_busy());
    }
}

impl Widget for &ConversationManager {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),    // Transcript
                Constraint::Length(1), // Status
                Constraint::Length(3), // Query input
                Constraint::Length(3), // Endpoint input
            ])
            .split(area);

        self.transcript.render(chunks[0], buf);
        StatusLine {
            busy: self.busy,
            endpoint: self.client.endpoint(),
        }
        .render(chunks[1], buf);
        self.query_input.render(chunks[2], buf);
        self.endpoint_input.render(chunks[3], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RequestError;
    use crate::endpoint::EndpointSource;
    use crate::events::Author;
    use crate::storage::API_BASE_KEY;

    fn manager_in(dir: &tempfile::TempDir) -> ConversationManager {
        let config = Config {
            ragchat_home: dir.path().to_path_buf(),
            ..Config::default()
        };
        let resolved = ResolvedEndpoint {
            url: "http://127.0.0.1:1".to_string(),
            source: EndpointSource::Default,
        };
        ConversationManager::with_endpoint(&config, resolved, StorageManager::new(config.storage_path()))
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(manager: &mut ConversationManager, text: &str) {
        for c in text.chars() {
            manager.handle_key(press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn blank_query_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(&dir);
        manager.set_query_text("   ");

        assert_eq!(manager.begin_submit(), None);
        assert!(manager.entries().is_empty());
        assert!(!manager.is_busy());
        assert_eq!(manager.query_text(), "   ");
    }

    #[test]
    fn begin_submit_appends_user_entry_and_goes_busy() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(&dir);
        manager.set_query_text("  what is RAG?  ");

        assert_eq!(manager.begin_submit().as_deref(), Some("what is RAG?"));

        assert_eq!(manager.entries().len(), 1);
        assert_eq!(manager.entries()[0].author, Author::User);
        assert_eq!(manager.entries()[0].text, "what is RAG?");
        assert_eq!(manager.query_text(), "");
        assert!(manager.is_busy());
        assert!(!manager.submit_enabled());

        // a second submit while busy is swallowed
        manager.set_query_text("again");
        assert_eq!(manager.begin_submit(), None);
        assert_eq!(manager.entries().len(), 1);
    }

    #[test]
    fn finish_submit_always_leaves_busy_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(&dir);
        manager.set_query_text("q");
        manager.begin_submit();

        manager.finish_submit(Err(RequestError::Status {
            status: 500,
            message: "boom".to_string(),
        }));

        assert!(!manager.is_busy());
        assert!(manager.submit_enabled());
        assert!(manager.last_request_failed());
        assert_eq!(manager.entries().last().unwrap().text, "Error: boom");
    }

    #[test]
    fn endpoint_field_starts_with_resolved_value() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(&dir);
        assert_eq!(manager.endpoint_text(), "http://127.0.0.1:1");
    }

    #[test]
    fn saving_blank_endpoint_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(&dir);
        manager.set_endpoint_text("  ");

        assert_eq!(manager.save_endpoint(), ConversationAction::None);
        assert!(!dir.path().join("storage.json").exists());
    }

    #[test]
    fn enter_in_endpoint_field_saves_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(&dir);

        manager.handle_key(press(KeyCode::Tab));
        assert_eq!(manager.focus(), Focus::Endpoint);
        manager.handle_key(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        type_text(&mut manager, "http://rag:9000 ");

        assert_eq!(manager.handle_key(press(KeyCode::Enter)), ConversationAction::Reload);
        let storage = StorageManager::new(dir.path().join("storage.json"));
        assert_eq!(
            storage.get_item(API_BASE_KEY).unwrap().as_deref(),
            Some("http://rag:9000")
        );
    }

    #[test]
    fn api_command_saves_argument() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(&dir);
        type_text(&mut manager, "/api http://rag:7000");

        assert_eq!(manager.handle_key(press(KeyCode::Enter)), ConversationAction::Reload);
        assert!(manager.entries().is_empty());
        assert_eq!(manager.query_text(), "");
    }

    #[tokio::test]
    async fn double_slash_sends_literal_query() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(&dir);
        type_text(&mut manager, "//help me");

        assert_eq!(manager.handle_key(press(KeyCode::Enter)), ConversationAction::None);
        assert_eq!(manager.entries().len(), 1);
        assert_eq!(manager.entries()[0].author, Author::User);
        assert_eq!(manager.entries()[0].text, "/help me");
        assert!(manager.is_busy());
    }

    #[test]
    fn api_command_without_argument_reports_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(&dir);
        type_text(&mut manager, "/api");

        assert_eq!(manager.handle_key(press(KeyCode::Enter)), ConversationAction::None);
        assert_eq!(manager.entries().len(), 1);
        assert_eq!(manager.entries()[0].author, Author::System);
        assert_eq!(manager.entries()[0].text, "Endpoint: http://127.0.0.1:1 (default)");
    }

    #[test]
    fn esc_and_bye_exit() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(&dir);
        assert_eq!(manager.handle_key(press(KeyCode::Esc)), ConversationAction::Exit);

        type_text(&mut manager, "/bye");
        assert_eq!(manager.handle_key(press(KeyCode::Enter)), ConversationAction::Exit);
    }
}
