//! The interaction loop: validate, compose, complete, record.
//!
//! ```text
//! Idle ──submit──▶ Submitting ──ok──▶ record entry ──▶ Idle
//!   ▲                  │
//!   │                  └──CompletionError / cancelled──▶ Idle (nothing recorded)
//!   └── empty question: rejected before leaving Idle
//! ```
//!
//! Document upload runs independently through [`InteractionLoop::attach_document`];
//! a failed upload leaves the session without context but never blocks
//! text-only submissions.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{CompletionError, DocumentReadError, HistoryError, SubmitError};
use crate::extractor::{ContextExtractor, DocumentContext};
use crate::prompt::compose;
use crate::provider::{CompletionClient, CompletionRequest, Usage};
use crate::session::{LoopState, Session};

/// Result of a successful submission.
#[derive(Debug, Clone)]
pub struct Answer {
    /// Chronological index of the recorded history entry
    pub index: usize,
    /// The generated text, as displayed
    pub response: String,
    /// Whether a document context was embedded in the prompt
    pub used_context: bool,
    /// The model that answered
    pub model: String,
    pub usage: Option<Usage>,
}

/// Binds a completion client to sessions.
///
/// One loop is shared by every session; it holds only the client and the
/// per-request settings.
pub struct InteractionLoop {
    client: Arc<dyn CompletionClient>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    system_prompt: Option<String>,
}

/// Marks the session as `Submitting` for as long as it lives.
///
/// Dropping it (including when the submitting future is dropped mid-call)
/// puts the session back to `Idle`.
struct Submitting<'a>(&'a mut Session);

impl<'a> Submitting<'a> {
    fn enter(session: &'a mut Session) -> Self {
        session.state = LoopState::Submitting;
        session.touch();
        Self(session)
    }
}

impl Drop for Submitting<'_> {
    fn drop(&mut self) {
        self.0.state = LoopState::Idle;
    }
}

impl InteractionLoop {
    pub fn new(client: Arc<dyn CompletionClient>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
            max_tokens: None,
            system_prompt: None,
        }
    }

    /// Set the max tokens per response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Set a system instruction sent ahead of every prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        self.system_prompt = (!prompt.trim().is_empty()).then_some(prompt);
        self
    }

    pub fn client(&self) -> &Arc<dyn CompletionClient> {
        &self.client
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Submit a question for this session.
    ///
    /// On success the answer is recorded in the session history. On any
    /// error the history is left exactly as it was.
    pub async fn submit(&self, session: &mut Session, question: &str) -> Result<Answer, SubmitError> {
        if question.trim().is_empty() {
            debug!(session = %session.id(), "Rejected empty question");
            return Err(SubmitError::EmptyQuestion);
        }

        let prompt = compose(question, session.context());
        let used_context = session.context().is_some();
        let request = CompletionRequest::for_prompt(&self.model, prompt, self.system_prompt.as_deref())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let submitting = Submitting::enter(session);

        info!(
            session = %submitting.0.id(),
            client = %self.client.name(),
            model = %self.model,
            used_context,
            "Submitting question"
        );

        let completion = match self.client.complete(request).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!(session = %submitting.0.id(), error = %e, "Completion failed");
                return Err(SubmitError::Completion(e));
            }
        };

        let session = &mut *submitting.0;
        let (index, response) = session
            .history
            .record(question, completion.text)
            .map(|entry| (entry.index, entry.response.clone()))
            .map_err(|e| match e {
                HistoryError::EmptyQuestion => SubmitError::EmptyQuestion,
                HistoryError::EmptyResponse => SubmitError::Completion(CompletionError::EmptyResponse),
            })?;

        debug!(session = %session.id(), index, "Recorded history entry");

        Ok(Answer {
            index,
            response,
            used_context,
            model: completion.model,
            usage: completion.usage,
        })
    }

    /// Like [`submit`](Self::submit), but gives up with
    /// [`SubmitError::Cancelled`] as soon as `cancel` fires.
    pub async fn submit_cancellable(
        &self,
        session: &mut Session,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<Answer, SubmitError> {
        if cancel.is_cancelled() {
            return Err(SubmitError::Cancelled);
        }

        let id = session.id().clone();
        cancel
            .run_until_cancelled(self.submit(session, question))
            .await
            .unwrap_or_else(|| {
                info!(session = %id, "Submission cancelled");
                Err(SubmitError::Cancelled)
            })
    }

    /// Extract a document and attach it as the session's context.
    ///
    /// On failure the session's context is cleared: the failed upload
    /// replaces whatever was attached before.
    pub async fn attach_document<'s>(
        &self,
        session: &'s mut Session,
        extractor: &dyn ContextExtractor,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<&'s DocumentContext, DocumentReadError> {
        match extractor.extract(bytes).await {
            Ok(text) => {
                let document = DocumentContext::new(file_name, bytes.len(), text);
                info!(
                    session = %session.id(),
                    extractor = %extractor.name(),
                    file = %file_name,
                    bytes = document.bytes,
                    chars = document.chars(),
                    "Document attached"
                );
                session.touch();
                Ok(session.document.insert(document))
            }
            Err(e) => {
                warn!(session = %session.id(), file = %file_name, error = %e, "Document could not be read");
                session.detach_document();
                Err(e)
            }
        }
    }
}
