//! Subcommand implementations and the wiring they share.

pub mod ask;
pub mod chat;
pub mod doctor;
pub mod onboard;
pub mod render;
pub mod serve;

use std::path::Path;

use docchat_config::AppConfig;
use docchat_core::error::{DocumentReadError, SubmitError};
use docchat_core::interaction::{Answer, InteractionLoop};
use docchat_core::session::Session;
use docchat_documents::{PdfExtractor, read_document};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Load config, or explain where it is expected.
pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Build the interaction loop for the configured provider.
///
/// A missing API key gets a readable explanation before the error.
pub fn build_chat(config: &AppConfig) -> Result<InteractionLoop, Box<dyn std::error::Error>> {
    if !config.has_api_key() && config.default_provider == "gemini" {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables (or put it in .env):");
        eprintln!("    GOOGLE_API_KEY=...    (Gemini, recommended)");
        eprintln!("    DOCCHAT_API_KEY=...   (generic)");
        eprintln!();
        eprintln!("  Or add api_key to your config file:");
        eprintln!("    {}", AppConfig::config_path().display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let router = docchat_providers::build_from_config(config)?;
    let client = router.default_client()?;
    debug!(provider = %client.name(), model = %config.effective_model(), "Completion client ready");

    let mut chat = InteractionLoop::new(client, config.effective_model(), config.default_temperature)
        .with_max_tokens(config.default_max_tokens);
    if let Some(prompt) = &config.system_prompt {
        chat = chat.with_system_prompt(prompt.as_str());
    }
    Ok(chat)
}

/// Attach a PDF from disk to the session, reporting what was loaded.
///
/// Any failure leaves the session without context.
pub async fn attach_pdf(
    chat: &InteractionLoop,
    session: &mut Session,
    extractor: &PdfExtractor,
    path: &Path,
) -> Result<(), DocumentReadError> {
    let (file_name, bytes) = match read_document(path).await {
        Ok(loaded) => loaded,
        Err(e) => {
            session.detach_document();
            return Err(e);
        }
    };

    let document = chat
        .attach_document(session, extractor, &file_name, &bytes)
        .await?;
    println!(
        "  Using {} ({} characters) as context.",
        document.file_name,
        document.chars()
    );
    Ok(())
}

/// Submit a question; Ctrl+C abandons the in-flight request.
pub async fn submit_interruptible(
    chat: &InteractionLoop,
    session: &mut Session,
    question: &str,
) -> Result<Answer, SubmitError> {
    let cancel = CancellationToken::new();
    let watcher = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let result = chat.submit_cancellable(session, question, &cancel).await;
    watcher.abort();
    result
}
