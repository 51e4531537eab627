//! Conversation UI components for the chat interface

pub mod commands;
pub mod composer;
pub mod history;
pub mod manager;
pub mod status;

pub use commands::{ParsedCommand, SlashCommand, get_help_text};
pub use composer::TextInput;
pub use history::Transcript;
pub use manager::{ConversationAction, ConversationManager, Focus};
pub use status::StatusLine;
