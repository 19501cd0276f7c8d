use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, FromRequestParts, Multipart, State},
    http::{header, request::Parts, HeaderValue},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::analysis::{AnalysisClient, AnalysisResult};
use crate::config::Config;
use crate::error::ErrorKind;
use crate::intake::{ImageSource, UploadedFile};
use crate::page;
use crate::proxy::{self, GatewayClient};
use crate::report;
use crate::session::{Notification, SessionId, SessionStore};

pub const SESSION_COOKIE: &str = "plant_doctor_session";

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub client: AnalysisClient,
}

impl AppState {
    pub fn new(client: AnalysisClient) -> Self {
        Self {
            sessions: SessionStore::new(),
            client,
        }
    }
}

/// The caller's session, taken from the session cookie. A missing or
/// unreadable cookie starts a new session.
pub struct Session {
    pub id: SessionId,
    fresh: bool,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let existing = parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok());

        Ok(match existing {
            Some(id) => Session { id, fresh: false },
            None => Session {
                id: Uuid::new_v4(),
                fresh: true,
            },
        })
    }
}

impl Session {
    /// Attaches `Set-Cookie` when this request started the session.
    fn respond(&self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();
        if self.fresh {
            let cookie = format!(
                "{}={}; Path=/; HttpOnly; SameSite=Lax",
                SESSION_COOKIE, self.id
            );
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }
        response
    }
}

async fn index(State(state): State<AppState>, session: Session) -> Response {
    let view = state.sessions.with(session.id, |ui| report::render(ui)).await;
    session.respond(Html(page::render_page(&view)))
}

async fn unreadable_upload(state: &AppState, session: &Session) -> Response {
    state
        .sessions
        .with(session.id, |ui| {
            ui.notify(Notification::error(
                ErrorKind::Validation,
                "The upload could not be read",
            ))
        })
        .await;
    session.respond(Redirect::to("/"))
}

async fn select_image(
    State(state): State<AppState>,
    session: Session,
    mut multipart: Multipart,
) -> Response {
    let mut file: Option<UploadedFile> = None;
    let mut dropped = false;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Malformed upload: {}", e);
                return unreadable_upload(&state, &session).await;
            }
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("origin") => {
                dropped = matches!(field.text().await.as_deref(), Ok("drop"));
            }
            Some("image") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let mime_type = field.content_type().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => {
                        file = Some(UploadedFile {
                            file_name,
                            mime_type,
                            bytes: bytes.to_vec(),
                        })
                    }
                    Err(e) => {
                        tracing::warn!("Failed to read uploaded file: {}", e);
                        return unreadable_upload(&state, &session).await;
                    }
                }
            }
            _ => {}
        }
    }

    state
        .sessions
        .with(session.id, |ui| match file {
            Some(file) => {
                let source = if dropped {
                    ImageSource::Drop(file)
                } else {
                    ImageSource::FilePicker(file)
                };
                if let Err(e) = ui.select(source) {
                    tracing::info!("Upload rejected: {}", e);
                }
            }
            None => ui.notify(Notification::error(
                ErrorKind::Validation,
                "No image uploaded",
            )),
        })
        .await;
    session.respond(Redirect::to("/"))
}

async fn analyze(State(state): State<AppState>, session: Session) -> Response {
    let id = session.id;
    let begun = state
        .sessions
        .with(id, |ui| match ui.begin_analysis() {
            Ok(image) => Some(image),
            Err(e) => {
                ui.notify(Notification::error(ErrorKind::Validation, e.to_string()));
                None
            }
        })
        .await;
    let Some(image) = begun else {
        return session.respond(Redirect::to("/"));
    };

    // Detached so the session leaves Analyzing even if the client goes away.
    let task = tokio::spawn({
        let sessions = state.sessions.clone();
        let client = state.client.clone();
        async move {
            let result = client.analyze(&image).await;
            sessions.with(id, |ui| ui.complete_analysis(result)).await;
        }
    });

    if let Err(e) = task.await {
        tracing::error!("Analysis task failed: {}", e);
        state
            .sessions
            .with(id, |ui| {
                ui.complete_analysis(AnalysisResult::failure(
                    ErrorKind::Upstream,
                    "Analysis failed unexpectedly",
                ))
            })
            .await;
    }
    session.respond(Redirect::to("/"))
}

async fn dismiss(State(state): State<AppState>, session: Session) -> Response {
    state
        .sessions
        .with(session.id, |ui| ui.dismiss_notification())
        .await;
    session.respond(Redirect::to("/"))
}

/// UI routes only, without the proxy or body limits.
pub fn ui_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/select", post(select_image))
        .route("/analyze", post(analyze))
        .route("/dismiss", post(dismiss))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

/// The full application: UI, proxy and request tracing. Uploads are capped
/// at `max_upload_bytes`; the proxy takes the same image base64-encoded.
pub fn app(config: &Config) -> Router {
    let state = AppState::new(AnalysisClient::new(config.backend.clone()));
    let gateway = Arc::new(GatewayClient::new(config.gateway.clone()));
    let proxy_limit = proxy::body_limit_for_upload(config.max_upload_bytes);

    ui_router(state)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .merge(proxy::router(gateway, proxy_limit))
        .layer(TraceLayer::new_for_http())
}
