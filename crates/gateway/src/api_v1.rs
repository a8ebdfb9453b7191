//! HTTP API v1 — session-scoped question answering.
//!
//! Endpoints:
//!
//! - `POST   /v1/sessions`                — Start a session
//! - `GET    /v1/sessions/{id}`           — Session summary
//! - `DELETE /v1/sessions/{id}`           — End a session
//! - `GET    /v1/sessions/{id}/history`   — History in display order
//! - `POST   /v1/sessions/{id}/ask`       — Submit a question
//! - `POST   /v1/sessions/{id}/document`  — Upload a PDF as context
//! - `DELETE /v1/sessions/{id}/document`  — Detach the document

use axum::{
    Router,
    body::Bytes,
    extract::{
        Multipart, Path, State,
        multipart::MultipartError,
    },
    http::{HeaderMap, StatusCode, header},
    response::Json,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use docchat_core::error::{DocumentReadError, SubmitError};
use docchat_core::history::{HistoryEntry, OrderingPolicy};
use docchat_core::session::{LoopState, SessionId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::SharedState;
use crate::sessions::{DocumentSummary, SessionView, SharedSession};

/// Multipart field carrying the uploaded document.
const FILE_FIELD: &str = "file";

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/sessions", post(create_session_handler))
        .route(
            "/sessions/{id}",
            get(get_session_handler).delete(delete_session_handler),
        )
        .route("/sessions/{id}/history", get(history_handler))
        .route("/sessions/{id}/ask", post(ask_handler))
        .route(
            "/sessions/{id}/document",
            post(upload_document_handler).delete(detach_document_handler),
        )
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<T, ApiError>;

fn api_error(status: StatusCode, kind: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            kind: kind.to_string(),
        }),
    )
}

#[derive(Serialize)]
struct CreateSessionResponse {
    session_id: String,
    ordering: OrderingPolicy,
}

#[derive(Serialize)]
struct DocumentInfo {
    file_name: String,
    bytes: usize,
    chars: usize,
}

impl From<DocumentSummary> for DocumentInfo {
    fn from(d: DocumentSummary) -> Self {
        Self {
            file_name: d.file_name,
            bytes: d.bytes,
            chars: d.chars,
        }
    }
}

#[derive(Serialize)]
struct SessionSummary {
    session_id: String,
    ordering: OrderingPolicy,
    state: LoopState,
    history_count: usize,
    document: Option<DocumentInfo>,
    created_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
}

impl From<SessionView> for SessionSummary {
    fn from(view: SessionView) -> Self {
        Self {
            session_id: view.id.to_string(),
            ordering: view.ordering,
            state: view.state,
            history_count: view.history.len(),
            document: view.document.map(DocumentInfo::from),
            created_at: view.created_at,
            last_active: view.last_active,
        }
    }
}

#[derive(Serialize)]
struct HistoryResponse {
    entries: Vec<HistoryEntry>,
    count: usize,
    ordering: OrderingPolicy,
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    index: usize,
    response: String,
    used_context: bool,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn lookup(state: &SharedState, id: &str) -> ApiResult<SharedSession> {
    state
        .sessions
        .get(&SessionId::from(id))
        .await
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "not_found", format!("Session '{id}' not found")))
}

fn busy() -> ApiError {
    api_error(
        StatusCode::CONFLICT,
        "busy",
        "A request for this session is already in progress",
    )
}

fn document_error(id: &str, e: DocumentReadError) -> ApiError {
    warn!(session = %id, error = %e, "Document upload rejected");
    api_error(StatusCode::UNPROCESSABLE_ENTITY, "document", e.to_string())
}

async fn create_session_handler(
    State(state): State<SharedState>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let id = state.sessions.create().await;
    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: id.to_string(),
            ordering: state.sessions.ordering(),
        }),
    )
}

async fn get_session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionSummary>> {
    let handle = lookup(&state, &id).await?;
    Ok(Json(handle.view().into()))
}

async fn delete_session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.sessions.remove(&SessionId::from(&id)).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(api_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("Session '{id}' not found"),
        ))
    }
}

async fn history_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<HistoryResponse>> {
    let handle = lookup(&state, &id).await?;
    let view = handle.view();

    Ok(Json(HistoryResponse {
        count: view.history.len(),
        entries: view.history,
        ordering: view.ordering,
    }))
}

async fn ask_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<AskRequest>,
) -> ApiResult<Json<AskResponse>> {
    let handle = lookup(&state, &id).await?;
    let mut session = handle.try_update().ok_or_else(busy)?;

    info!(session = %id, question_len = payload.question.len(), "v1/ask request");

    if !payload.question.trim().is_empty() {
        session.mark_submitting();
    }

    match state.chat.submit(&mut session, &payload.question).await {
        Ok(answer) => Ok(Json(AskResponse {
            index: answer.index,
            response: answer.response,
            used_context: answer.used_context,
        })),
        Err(e) => {
            let status = match &e {
                SubmitError::EmptyQuestion => StatusCode::UNPROCESSABLE_ENTITY,
                SubmitError::Completion(_) => StatusCode::BAD_GATEWAY,
                SubmitError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            };
            Err(api_error(status, e.kind(), e.to_string()))
        }
    }
}

/// Pull the `file` field out of the form, if present.
async fn read_upload(multipart: &mut Multipart) -> Result<Option<(String, Bytes)>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("document.pdf").to_string();
        return Ok(Some((file_name, field.bytes().await?)));
    }
    Ok(None)
}

async fn upload_document_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Json<DocumentInfo>> {
    let handle = lookup(&state, &id).await?;

    let upload = match read_upload(&mut multipart).await {
        Ok(upload) => upload,
        Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            // An oversized upload replaces the current document like any other failed read.
            let mut session = handle.try_update().ok_or_else(busy)?;
            session.detach_document();
            let size = headers
                .get(header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(state.max_document_bytes.saturating_add(1));
            return Err(document_error(
                &id,
                DocumentReadError::TooLarge {
                    size,
                    limit: state.max_document_bytes,
                },
            ));
        }
        Err(e) => return Err(api_error(StatusCode::BAD_REQUEST, "multipart", e.body_text())),
    };

    let Some((file_name, bytes)) = upload else {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "multipart",
            format!("Missing multipart field '{FILE_FIELD}'"),
        ));
    };

    let mut session = handle.try_update().ok_or_else(busy)?;
    let document = state
        .chat
        .attach_document(&mut session, state.extractor.as_ref(), &file_name, &bytes)
        .await
        .map_err(|e| document_error(&id, e))?;

    Ok(Json(DocumentInfo {
        file_name: document.file_name.clone(),
        bytes: document.bytes,
        chars: document.chars(),
    }))
}

async fn detach_document_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let handle = lookup(&state, &id).await?;
    let mut session = handle.try_update().ok_or_else(busy)?;
    session.detach_document();
    Ok(StatusCode::NO_CONTENT)
}
