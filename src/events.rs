use crate::client::{AskResponse, RequestError};
use chrono::{DateTime, Local};

/// Text shown when the backend answers without an answer
pub const NO_ANSWER: &str = "(no answer)";
/// Prefix of assistant entries reporting a failed request
pub const ERROR_MARKER: &str = "Error: ";
/// Prefix of the citation summary line
pub const SOURCES_LABEL: &str = "Sources: ";
/// Separator between citations on the summary line
pub const SOURCES_DELIMITER: &str = " | ";

/// Who a transcript entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    User,
    Assistant,
    /// Local notices (help text, endpoint info); never from the backend
    System,
}

impl Author {
    pub fn tag(&self) -> &'static str {
        match self {
            Author::User => "user",
            Author::Assistant => "assistant",
            Author::System => "system",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Message,
    Sources,
}

/// One line of the chat transcript
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    pub author: Author,
    pub kind: EntryKind,
    pub text: String,
    pub timestamp: DateTime<Local>,
}

impl ChatEntry {
    pub fn message(author: Author, text: impl Into<String>) -> Self {
        Self {
            author,
            kind: EntryKind::Message,
            text: text.into(),
            timestamp: Local::now(),
        }
    }

    pub fn sources(text: impl Into<String>) -> Self {
        Self {
            author: Author::Assistant,
            kind: EntryKind::Sources,
            text: text.into(),
            timestamp: Local::now(),
        }
    }
}

/// Outcome of one submitted query, as delivered back to the UI loop
pub type AskOutcome = Result<AskResponse, RequestError>;

/// Entries to append for a settled request, in order.
pub fn outcome_entries(outcome: &AskOutcome) -> Vec<ChatEntry> {
    match outcome {
        Ok(response) => {
            let answer = response
                .answer
                .as_deref()
                .filter(|answer| !answer.is_empty())
                .unwrap_or(NO_ANSWER);
            let mut entries = vec![ChatEntry::message(Author::Assistant, answer)];

            if let Some(line) = sources_line(response) {
                entries.push(ChatEntry::sources(line));
            }
            entries
        }
        Err(error) => vec![ChatEntry::message(
            Author::Assistant,
            format!("{ERROR_MARKER}{error}"),
        )],
    }
}

/// Citation summary, or `None` when there is nothing to cite
pub fn sources_line(response: &AskResponse) -> Option<String> {
    let sources = response.sources.as_ref().filter(|sources| !sources.is_empty())?;
    let lines: Vec<String> = sources.iter().map(|source| source.summary()).collect();
    Some(format!("{SOURCES_LABEL}{}", lines.join(SOURCES_DELIMITER)))
}

/// Whether a request is outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusyState {
    #[default]
    Idle,
    Sending,
}

impl BusyState {
    pub fn is_busy(&self) -> bool {
        matches!(self, BusyState::Sending)
    }
}
