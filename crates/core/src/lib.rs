//! # DocChat Core
//!
//! Domain types, traits, and error definitions for DocChat.
//! This crate has **no HTTP or storage dependencies** — it defines the domain model
//! that the provider, document, gateway, and CLI crates implement against.
//!
//! ## Design Philosophy
//!
//! The two external collaborators (the hosted completion model and the
//! document text extractor) are traits here. Implementations live in their
//! respective crates. The only logic owned by this crate is:
//! - prompt composition ([`prompt::compose`])
//! - the session-scoped history log ([`history::HistoryStore`])
//! - the submission state machine ([`interaction::InteractionLoop`])

pub mod error;
pub mod message;
pub mod provider;
pub mod extractor;
pub mod prompt;
pub mod history;
pub mod session;
pub mod interaction;

// Re-export key types at crate root for ergonomics
pub use error::{CompletionError, DocumentReadError, Error, HistoryError, Result, SubmitError};
pub use message::{Message, Role};
pub use provider::{Completion, CompletionClient, CompletionRequest, Usage};
pub use extractor::{ContextExtractor, DocumentContext};
pub use prompt::compose;
pub use history::{HistoryEntry, HistoryStore, OrderingPolicy};
pub use session::{LoopState, Session, SessionId};
pub use interaction::{Answer, InteractionLoop};
