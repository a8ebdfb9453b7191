//! HTTP gateway for DocChat.
//!
//! Serves the single-page frontend and the v1 session API. Every browser
//! tab gets its own session: history, attached document, and submission
//! state live in the gateway's [`SessionStore`].
//!
//! Built on Axum for high performance async HTTP.

pub mod api_v1;
pub mod frontend;
pub mod sessions;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{Router, extract::State, response::Json, routing::get};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use docchat_config::AppConfig;
use docchat_core::extractor::ContextExtractor;
use docchat_core::interaction::InteractionLoop;
use docchat_documents::PdfExtractor;

pub use sessions::SessionStore;

/// Room for multipart framing on top of the document itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub chat: InteractionLoop,
    pub extractor: Arc<dyn ContextExtractor>,
    pub sessions: SessionStore,
    pub provider: String,
    pub max_document_bytes: usize,
    pub allowed_origins: Vec<String>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    /// Wire the gateway from configuration and an already-built client loop.
    pub fn new(config: &AppConfig, chat: InteractionLoop) -> Self {
        Self::with_extractor(
            config,
            chat,
            Arc::new(PdfExtractor::new(config.documents.max_bytes)),
        )
    }

    pub fn with_extractor(
        config: &AppConfig,
        chat: InteractionLoop,
        extractor: Arc<dyn ContextExtractor>,
    ) -> Self {
        Self {
            chat,
            extractor,
            sessions: SessionStore::new(config.history.ordering, config.gateway.max_sessions),
            provider: config.default_provider.clone(),
            max_document_bytes: config.documents.max_bytes,
            allowed_origins: config.gateway.allowed_origins.clone(),
        }
    }
}

/// Build the full router: health, v1 API, and the embedded frontend.
///
/// Layers applied:
/// - CORS limited to the configured origins (same-origin only by default)
/// - Request body limit sized to the document limit
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.allowed_origins);
    let body_limit = state.max_document_bytes.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/health", get(health_handler))
        .with_state(state.clone())
        .nest("/v1", api_v1::v1_router(state))
        .merge(frontend::frontend_router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
pub async fn start(
    config: AppConfig,
    chat: InteractionLoop,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = Arc::new(GatewayState::new(&config, chat));
    let app = build_router(state);

    info!(
        addr = %addr,
        provider = %config.default_provider,
        model = %config.effective_model(),
        ordering = %config.history.ordering,
        "Gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down gateway");
        })
        .await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    provider: String,
    model: String,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.provider.clone(),
        model: state.chat.model().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use docchat_core::error::{CompletionError, DocumentReadError};
    use docchat_core::provider::{Completion, CompletionClient, CompletionRequest};
    use docchat_core::session::SessionId;
    use http_body_util::BodyExt;
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::ServiceExt;

    /// Replies with queued results and records every prompt it was sent.
    #[derive(Default)]
    struct ScriptedClient {
        replies: Mutex<Vec<Result<String, CompletionError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn replying(replies: Vec<Result<String, CompletionError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                prompts: Mutex::default(),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError> {
            self.prompts
                .lock()
                .unwrap()
                .push(request.prompt().unwrap_or_default().to_string());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(CompletionError::EmptyResponse))?;
            Ok(Completion {
                text: reply,
                usage: None,
                model: request.model,
            })
        }
    }

    /// Treats the upload bytes as UTF-8 text; "broken" fails.
    struct StubExtractor;

    #[async_trait]
    impl ContextExtractor for StubExtractor {
        fn name(&self) -> &str {
            "stub"
        }

        async fn extract(&self, bytes: &[u8]) -> Result<String, DocumentReadError> {
            match std::str::from_utf8(bytes) {
                Ok("broken") | Err(_) => Err(DocumentReadError::Malformed("bad xref".into())),
                Ok(text) => Ok(text.to_string()),
            }
        }
    }

    /// Never answers.
    struct PendingClient;

    #[async_trait]
    impl CompletionClient for PendingClient {
        fn name(&self) -> &str {
            "pending"
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<Completion, CompletionError> {
            std::future::pending().await
        }
    }

    fn state_with(config: &AppConfig, client: Arc<dyn CompletionClient>) -> SharedState {
        let chat = InteractionLoop::new(client, "test-model", 0.7);
        Arc::new(GatewayState::with_extractor(config, chat, Arc::new(StubExtractor)))
    }

    fn test_state(client: Arc<ScriptedClient>) -> SharedState {
        state_with(&AppConfig::default(), client)
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    async fn create_session(app: &Router) -> String {
        let req = Request::post("/v1/sessions").body(Body::empty()).unwrap();
        let (status, json) = send(app, req).await;
        assert_eq!(status, StatusCode::CREATED);
        json["session_id"].as_str().unwrap().to_string()
    }

    fn ask(id: &str, question: &str) -> Request<Body> {
        Request::post(format!("/v1/sessions/{id}/ask"))
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({ "question": question }).to_string()))
            .unwrap()
    }

    fn upload(id: &str, field: &str, content: &str) -> Request<Body> {
        let boundary = "docchat-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"report.pdf\"\r\n\
             Content-Type: application/pdf\r\n\r\n\
             {content}\r\n\
             --{boundary}--\r\n"
        );
        Request::post(format!("/v1/sessions/{id}/document"))
            .header("content-type", format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: String) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(test_state(ScriptedClient::replying(vec![])));
        let (status, json) = send(&app, get("/health".into())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["provider"], "gemini");
        assert_eq!(json["model"], "test-model");
    }

    #[tokio::test]
    async fn create_session_reports_ordering() {
        let app = build_router(test_state(ScriptedClient::replying(vec![])));
        let req = Request::post("/v1/sessions").body(Body::empty()).unwrap();
        let (status, json) = send(&app, req).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["ordering"], "prepend");
    }

    #[tokio::test]
    async fn ask_records_history() {
        let client = ScriptedClient::replying(vec![Ok("4".into())]);
        let app = build_router(test_state(client.clone()));
        let id = create_session(&app).await;

        let (status, json) = send(&app, ask(&id, "What is 2+2?")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["index"], 1);
        assert_eq!(json["response"], "4");
        assert_eq!(json["used_context"], false);
        assert_eq!(client.prompts(), vec!["What is 2+2?"]);

        let (status, json) = send(&app, get(format!("/v1/sessions/{id}/history"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 1);
        assert_eq!(json["entries"][0]["question"], "What is 2+2?");
        assert_eq!(json["entries"][0]["response"], "4");
        assert_eq!(json["entries"][0]["index"], 1);
    }

    #[tokio::test]
    async fn history_is_listed_newest_first() {
        let client = ScriptedClient::replying(vec![Ok("one".into()), Ok("two".into())]);
        let app = build_router(test_state(client));
        let id = create_session(&app).await;

        send(&app, ask(&id, "first")).await;
        send(&app, ask(&id, "second")).await;

        let (_, json) = send(&app, get(format!("/v1/sessions/{id}/history"))).await;
        assert_eq!(json["entries"][0]["index"], 2);
        assert_eq!(json["entries"][0]["question"], "second");
        assert_eq!(json["entries"][1]["index"], 1);
    }

    #[tokio::test]
    async fn empty_question_is_rejected_without_a_call() {
        let client = ScriptedClient::replying(vec![Ok("unused".into())]);
        let app = build_router(test_state(client.clone()));
        let id = create_session(&app).await;

        let (status, json) = send(&app, ask(&id, "   ")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["kind"], "validation");
        assert_eq!(
            json["error"],
            "The input cannot be empty. Please enter a question."
        );
        assert!(client.prompts().is_empty());

        let (_, json) = send(&app, get(format!("/v1/sessions/{id}/history"))).await;
        assert_eq!(json["count"], 0);
    }

    #[tokio::test]
    async fn completion_failure_is_bad_gateway() {
        let client = ScriptedClient::replying(vec![Err(CompletionError::Network(
            "connection reset".into(),
        ))]);
        let app = build_router(test_state(client));
        let id = create_session(&app).await;

        let (status, json) = send(&app, ask(&id, "Hello?")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["kind"], "completion");

        let (_, json) = send(&app, get(format!("/v1/sessions/{id}/history"))).await;
        assert_eq!(json["count"], 0);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let app = build_router(test_state(ScriptedClient::replying(vec![])));
        let (status, json) = send(&app, ask("nope", "hi")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["kind"], "not_found");

        let (status, _) = send(&app, get("/v1/sessions/nope/history".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn uploaded_document_becomes_context() {
        let client = ScriptedClient::replying(vec![Ok("Revenue was $5M.".into())]);
        let app = build_router(test_state(client.clone()));
        let id = create_session(&app).await;

        let (status, json) = send(&app, upload(&id, "file", "Revenue: $5M")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["file_name"], "report.pdf");
        assert_eq!(json["chars"], 12);

        let (status, json) = send(&app, ask(&id, "Summarize")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["used_context"], true);

        let prompt = &client.prompts()[0];
        let q = prompt.find("Summarize").unwrap();
        let c = prompt.find("Revenue: $5M").unwrap();
        assert!(q < c);

        let (_, json) = send(&app, get(format!("/v1/sessions/{id}"))).await;
        assert_eq!(json["document"]["file_name"], "report.pdf");
        assert_eq!(json["history_count"], 1);
        assert_eq!(json["state"], "idle");
    }

    #[tokio::test]
    async fn failed_upload_clears_context() {
        let app = build_router(test_state(ScriptedClient::replying(vec![])));
        let id = create_session(&app).await;

        send(&app, upload(&id, "file", "Revenue: $5M")).await;
        let (status, json) = send(&app, upload(&id, "file", "broken")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["kind"], "document");

        let (_, json) = send(&app, get(format!("/v1/sessions/{id}"))).await;
        assert!(json["document"].is_null());
    }

    #[tokio::test]
    async fn upload_without_file_field_is_bad_request() {
        let app = build_router(test_state(ScriptedClient::replying(vec![])));
        let id = create_session(&app).await;

        let (status, json) = send(&app, upload(&id, "attachment", "text")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["kind"], "multipart");
    }

    #[tokio::test]
    async fn detach_document() {
        let app = build_router(test_state(ScriptedClient::replying(vec![])));
        let id = create_session(&app).await;
        send(&app, upload(&id, "file", "Revenue: $5M")).await;

        let req = Request::delete(format!("/v1/sessions/{id}/document"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, json) = send(&app, get(format!("/v1/sessions/{id}"))).await;
        assert!(json["document"].is_null());
    }

    #[tokio::test]
    async fn concurrent_submission_is_conflict() {
        let state = test_state(ScriptedClient::replying(vec![]));
        let app = build_router(state.clone());
        let id = create_session(&app).await;

        let handle = state.sessions.get(&SessionId::from(&id)).await.unwrap();
        let _in_flight = handle.try_update().unwrap();

        let (status, json) = send(&app, ask(&id, "hello")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["kind"], "busy");
    }

    #[tokio::test]
    async fn reads_do_not_wait_for_a_pending_answer() {
        let app = build_router(state_with(&AppConfig::default(), Arc::new(PendingClient)));
        let id = create_session(&app).await;

        let in_flight = tokio::spawn(app.clone().oneshot(ask(&id, "Will this ever return?")));

        let summary = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let (_, json) = send(&app, get(format!("/v1/sessions/{id}"))).await;
                if json["state"] == "submitting" {
                    break json;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("session summary should report the submission");
        assert_eq!(summary["history_count"], 0);

        let (status, json) = tokio::time::timeout(
            Duration::from_secs(2),
            send(&app, get(format!("/v1/sessions/{id}/history"))),
        )
        .await
        .expect("history should not block");
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 0);

        let (status, _) = send(&app, ask(&id, "second")).await;
        assert_eq!(status, StatusCode::CONFLICT);

        // Abandoning the request puts the session back to idle.
        in_flight.abort();
        let _ = in_flight.await;
        let (_, json) = send(&app, get(format!("/v1/sessions/{id}"))).await;
        assert_eq!(json["state"], "idle");
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected_and_clears_context() {
        let mut config = AppConfig::default();
        config.documents.max_bytes = 16;
        let app = build_router(state_with(&config, ScriptedClient::replying(vec![])));
        let id = create_session(&app).await;

        let (status, _) = send(&app, upload(&id, "file", "Revenue: $5M")).await;
        assert_eq!(status, StatusCode::OK);

        let oversized = "x".repeat(MULTIPART_OVERHEAD + 1024);
        let (status, json) = send(&app, upload(&id, "file", &oversized)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["kind"], "document");
        assert!(json["error"].as_str().unwrap().contains("limit is 16 bytes"));

        let (_, json) = send(&app, get(format!("/v1/sessions/{id}"))).await;
        assert!(json["document"].is_null());
    }

    #[tokio::test]
    async fn delete_session_discards_it() {
        let app = build_router(test_state(ScriptedClient::replying(vec![])));
        let id = create_session(&app).await;

        let req = Request::delete(format!("/v1/sessions/{id}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, get(format!("/v1/sessions/{id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
