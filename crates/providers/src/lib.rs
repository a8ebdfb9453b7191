//! Completion client implementations for DocChat.
//!
//! All providers implement the `docchat_core::CompletionClient` trait.
//! The router builds the configured provider from `AppConfig`.

mod http;

pub mod gemini;
pub mod openai_compat;
pub mod router;

pub use gemini::GeminiProvider;
pub use http::DEFAULT_TIMEOUT;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
