use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{watch, Mutex};
use tracing::{error, warn};

use codecontext_core::{FetchError, GenerationError, TurnError, TurnPhase};
use codecontext_engine::{ApiKeyView, Session, SessionSnapshot};
use codecontext_logging::redact_error;
use codecontext_markdown::{render_pdf, ExportOptions, Renderer};

const INDEX_HTML: &str = include_str!("index.html");

/// Shared application state for API handlers.
///
/// One session per server. Turns queue on the mutex; the phase receiver
/// and the last published snapshot let status reads skip the lock while a
/// turn is running.
pub struct AppState {
    pub session: Mutex<Session>,
    pub phase_rx: watch::Receiver<TurnPhase>,
    last_snapshot: watch::Sender<SessionSnapshot>,
    pub export_options: ExportOptions,
}

impl AppState {
    pub fn new(session: Session, export_options: ExportOptions) -> Self {
        let phase_rx = session.subscribe_phase();
        let (last_snapshot, _) = watch::channel(session.snapshot());
        Self {
            session: Mutex::new(session),
            phase_rx,
            last_snapshot,
            export_options,
        }
    }

    /// Record the session state for readers that cannot take the lock.
    fn publish(&self, session: &Session) {
        self.last_snapshot.send_replace(session.snapshot());
    }

    /// Current session state. While a turn holds the lock this is the last
    /// published snapshot with the live phase.
    pub fn snapshot(&self) -> SessionSnapshot {
        if let Ok(session) = self.session.try_lock() {
            return session.snapshot();
        }
        let mut snapshot = self.last_snapshot.borrow().clone();
        let phase = *self.phase_rx.borrow();
        snapshot.phase = phase;
        snapshot.in_flight = phase.is_in_flight();
        snapshot
    }
}

/// Build the Axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/api/session", get(session_view))
        .route("/api/generate", post(generate))
        .route("/api/key", post(set_key))
        .route("/api/export", get(export))
        .with_state(state)
}

/// A failed turn, rendered as `{ "error": category, "message": text }`.
pub struct ApiError(pub TurnError);

pub fn status_for(error: &TurnError) -> StatusCode {
    match error {
        TurnError::Fetch(FetchError::NotFound { .. }) => StatusCode::NOT_FOUND,
        TurnError::Fetch(FetchError::RateLimited { .. }) => StatusCode::TOO_MANY_REQUESTS,
        TurnError::Generation(GenerationError::InvalidCredential { .. }) => StatusCode::UNAUTHORIZED,
        TurnError::Generation(GenerationError::NetworkFailure { .. }) => StatusCode::BAD_GATEWAY,
        TurnError::Fetch(FetchError::Unknown { .. })
        | TurnError::Generation(GenerationError::Unknown { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        warn!(
            status = status.as_u16(),
            category = self.0.category(),
            detail = %redact_error(&self.0),
            "Turn failed"
        );
        let body = json!({
            "error": self.0.category(),
            "message": self.0.user_message(),
        });
        (status, Json(body)).into_response()
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Health check endpoint.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "codecontext",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn session_view(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.snapshot())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    /// Omitted keeps the URL from the previous turn.
    #[serde(default)]
    github_url: Option<String>,
    #[serde(default)]
    prompt: String,
}

async fn generate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut session = state.session.lock().await;
    if let Some(url) = request.github_url {
        session.set_github_url(url);
    }
    session.set_user_prompt(request.prompt);
    state.publish(&session);

    let result = session.generate().await;
    state.publish(&session);
    let outcome = result.map_err(ApiError)?;

    Ok(Json(json!({
        "replyHtml": Renderer::to_html(&outcome.reply),
        "transcriptHtml": Renderer::to_html(&outcome.transcript),
        "reply": outcome.reply,
        "transcript": outcome.transcript,
        "fetched": outcome.fetched,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyRequest {
    #[serde(default)]
    api_key: String,
}

async fn set_key(State(state): State<Arc<AppState>>, Json(request): Json<KeyRequest>) -> Json<ApiKeyView> {
    let mut session = state.session.lock().await;
    session.api_key_mut().set_input(&request.api_key);
    state.publish(&session);
    Json(session.api_key().view())
}

/// The conversation as a PDF download. Nothing is exported before the
/// first reply.
async fn export(State(state): State<Arc<AppState>>) -> Response {
    let session = state.session.lock().await;
    let Some(reply) = session.latest_reply() else {
        return (
            StatusCode::CONFLICT,
            Json(json!({
                "error": "nothing_to_export",
                "message": "Generate a reply before exporting.",
            })),
        )
            .into_response();
    };

    match render_pdf(session.transcript().as_str(), reply, &state.export_options) {
        Ok(pdf) => {
            let disposition = format!("attachment; filename=\"{}\"", state.export_options.file_name);
            (
                [
                    (header::CONTENT_TYPE, "application/pdf".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                pdf,
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %redact_error(&e), "Export failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "export_failed",
                    "message": "Could not generate the PDF.",
                })),
            )
                .into_response()
        }
    }
}
