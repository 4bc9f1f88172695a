use anyhow::{Context, Result};
use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap, HeaderValue},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    serve, Json, Router,
};
use minijinja::{path_loader, Environment};
use minijinja_autoreload::AutoReloader;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::constants::PREVIEW_ROWS;
use crate::error::AppError;
use crate::gemini::GeminiClient;
use crate::router::{respond, ChatOutcome};
use crate::session::{ChatMessage, SessionStore};
use crate::table::{DataTable, TablePreview};

const SESSION_COOKIE: &str = "datachat_session";

// Shared application state
#[derive(Clone)]
pub struct AppState {
    templates: Arc<AutoReloader>,
    sessions: Arc<SessionStore>,
    // None when no API key was configured; chat degrades to a warning banner.
    model: Option<GeminiClient>,
}

impl AppState {
    pub fn new(model: Option<GeminiClient>) -> Result<Self> {
        let templates =
            create_minijinja_env().context("Failed to initialize template engine")?;
        Ok(Self {
            templates: Arc::new(templates),
            sessions: Arc::new(SessionStore::new()),
            model,
        })
    }
}

// Minijinja Environment setup
fn create_minijinja_env() -> Result<AutoReloader> {
    // Use AutoReloader for development convenience
    let reloader = AutoReloader::new(|notifier| {
        let loader = path_loader("templates");
        let mut env = Environment::new();
        env.set_loader(loader);
        // Watch the templates directory for changes
        notifier.watch_path("templates", true);
        Ok(env)
    });
    Ok(reloader)
}

fn session_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name == SESSION_COOKIE {
            Uuid::parse_str(value.trim()).ok()
        } else {
            None
        }
    })
}

/// Resolve the caller's session id, minting a fresh one (plus its Set-Cookie
/// value) when the browser does not carry one yet.
fn resolve_session(headers: &HeaderMap) -> (Uuid, Option<HeaderValue>) {
    match session_from_headers(headers) {
        Some(id) => (id, None),
        None => {
            let id = Uuid::new_v4();
            let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id);
            (id, HeaderValue::from_str(&cookie).ok())
        }
    }
}

fn with_session_cookie(mut response: Response, cookie: Option<HeaderValue>) -> Response {
    if let Some(value) = cookie {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

async fn index_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (_, cookie) = resolve_session(&headers);
    // Acquire env, get template, and render within the same block
    let rendered = state.templates.acquire_env().and_then(|env| {
        env.get_template("index.html").and_then(|tmpl| {
            let context = minijinja::context! {
                title => "My Chatbot and Data Analysis App",
                model_configured => state.model.is_some(),
                model_name => state.model.as_ref().map(|m| m.model().to_string()),
            };
            tmpl.render(context)
        })
    });
    match rendered {
        Ok(html) => with_session_cookie(Html(html).into_response(), cookie),
        Err(e) => {
            error!("Failed to get or render template: {}", e);
            AppError::from(e).into_response()
        }
    }
}

#[derive(Debug, Serialize)]
struct StateResponse {
    model_configured: bool,
    analysis_enabled: bool,
    transcript: Vec<ChatMessage>,
    table: Option<TablePreview>,
    dictionary: Option<TablePreview>,
}

async fn state_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (id, cookie) = resolve_session(&headers);
    let session = state.sessions.session(id).await;
    let session = session.lock().await;
    let body = StateResponse {
        model_configured: state.model.is_some(),
        analysis_enabled: session.analysis_enabled,
        transcript: session.transcript.clone(),
        table: session.table.as_ref().map(|t| t.preview(PREVIEW_ROWS)),
        dictionary: session.dictionary.as_ref().map(|t| t.preview(PREVIEW_ROWS)),
    };
    drop(session);
    with_session_cookie(Json(body).into_response(), cookie)
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

async fn chat_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Response {
    let (id, cookie) = resolve_session(&headers);
    if request.message.trim().is_empty() {
        let err = AppError::BadRequest("message must not be empty".to_string());
        return with_session_cookie(err.into_response(), cookie);
    }

    // Hold this session's own lock for the whole interaction, model call
    // included; other sessions are untouched while it is in flight.
    let session = state.sessions.session(id).await;
    let mut session = session.lock().await;
    let result = respond(&mut session, state.model.as_ref(), &request.message).await;
    drop(session);

    let response = match result {
        Ok(ChatOutcome::Reply(reply)) => Json(ChatResponse {
            reply: Some(reply),
            warning: None,
        })
        .into_response(),
        Ok(ChatOutcome::Warning(warning)) => {
            warn!("chat attempted without a configured model");
            Json(ChatResponse {
                reply: None,
                warning: Some(warning.to_string()),
            })
            .into_response()
        }
        Err(e) => AppError::from(e).into_response(),
    };
    with_session_cookie(response, cookie)
}

#[derive(Debug, Clone, Copy)]
enum UploadKind {
    Data,
    Dictionary,
}

async fn read_csv_field(multipart: &mut Multipart) -> Result<Vec<u8>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            return field
                .bytes()
                .await
                .map(|bytes| bytes.to_vec())
                .map_err(|e| AppError::BadRequest(e.to_string()));
        }
    }
    Err(AppError::BadRequest(
        "multipart upload must contain a 'file' field".to_string(),
    ))
}

async fn handle_upload(
    state: &AppState,
    headers: &HeaderMap,
    mut multipart: Multipart,
    kind: UploadKind,
) -> Response {
    let (id, cookie) = resolve_session(headers);
    let outcome = async {
        let bytes = read_csv_field(&mut multipart).await?;
        // Parse before touching the session, so a malformed upload leaves the
        // previously stored table in place.
        let table = DataTable::parse(&bytes)?;
        let preview = table.preview(PREVIEW_ROWS);
        let session = state.sessions.session(id).await;
        let mut session = session.lock().await;
        match kind {
            UploadKind::Data => session.set_table(table),
            UploadKind::Dictionary => session.set_dictionary(table),
        }
        Ok::<TablePreview, AppError>(preview)
    }
    .await;

    let response = match outcome {
        Ok(preview) => {
            info!(kind = ?kind, rows = preview.total_rows, "CSV upload accepted");
            Json(preview).into_response()
        }
        Err(e) => e.into_response(),
    };
    with_session_cookie(response, cookie)
}

async fn upload_data_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    handle_upload(&state, &headers, multipart, UploadKind::Data).await
}

async fn upload_dictionary_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    handle_upload(&state, &headers, multipart, UploadKind::Dictionary).await
}

#[derive(Debug, Deserialize)]
struct AnalysisRequest {
    enabled: bool,
}

async fn analysis_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AnalysisRequest>,
) -> Response {
    let (id, cookie) = resolve_session(&headers);
    let session = state.sessions.session(id).await;
    session.lock().await.analysis_enabled = request.enabled;
    info!(enabled = request.enabled, "analysis toggle updated");
    with_session_cookie(
        Json(serde_json::json!({ "enabled": request.enabled })).into_response(),
        cookie,
    )
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/state", get(state_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/upload/data", post(upload_data_handler))
        .route("/api/upload/dictionary", post(upload_dictionary_handler))
        .route("/api/analysis", post(analysis_handler))
        // Route for static files must be nested under a path like /static
        // or it will conflict with other routes.
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
        .layer(TraceLayer::new_for_http()) // Add request logging
}

pub async fn start_web_server(bind: &str, port: u16, model: Option<GeminiClient>) -> Result<()> {
    let state = AppState::new(model)?;
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .context("Invalid bind address")?;
    info!("Web server listening on http://{}", addr);

    // Bind using tokio::net::TcpListener
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    // Use axum::serve to run the application
    serve(listener, app.into_make_service())
        .await
        .context("Web server failed")?;

    Ok(())
}
