//! Terminal chat client for a retrieval-augmented generation backend.
//!
//! The client resolves a backend endpoint, posts each question to
//! `{endpoint}/ask`, and renders the answer with its source citations in a
//! scrolling transcript.

pub mod app;
pub mod client;
pub mod config;
pub mod endpoint;
pub mod events;
pub mod logging;
pub mod storage;
pub mod ui;

pub use client::{AskResponse, RagClient, RequestError, Source};
pub use config::Config;
pub use endpoint::{EndpointSource, LaunchContext, ResolvedEndpoint, resolve_endpoint};
pub use events::{Author, ChatEntry, EntryKind};
pub use storage::{StorageError, StorageManager};
pub use ui::conversation::{ConversationAction, ConversationManager};
