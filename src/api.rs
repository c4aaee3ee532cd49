//! Webhook service: LINE events in, pipeline runs out.
//!
//! Routes:
//! - `POST /webhook`  verifies `X-Line-Signature`, dispatches text commands
//! - `GET  /health`   liveness JSON
//! - `GET  /metrics`  Prometheus exposition (when a handle is supplied)

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::metrics::Metrics;
use crate::notify::line::Messenger;
use crate::notify::DynSink;
use crate::pipeline::PipelineOrchestrator;
use crate::signature;

pub const SIGNATURE_HEADER: &str = "x-line-signature";
pub const STATUS_PENDING_MESSAGE: &str = "ステータス確認機能は開発中です";

/// Starts a pipeline run on behalf of a chat user without blocking the
/// webhook response.
pub trait PipelineLauncher: Send + Sync {
    fn launch(&self, recipient: String);
}

/// Spawns each run on the tokio runtime, notifying the requester through
/// `sink`.
pub struct SpawningLauncher {
    orchestrator: PipelineOrchestrator,
    sink: DynSink,
}

impl SpawningLauncher {
    pub fn new(orchestrator: PipelineOrchestrator, sink: DynSink) -> Self {
        Self { orchestrator, sink }
    }
}

impl PipelineLauncher for SpawningLauncher {
    fn launch(&self, recipient: String) {
        let orchestrator = self
            .orchestrator
            .for_recipient(self.sink.clone(), recipient.clone());
        tokio::spawn(async move {
            match orchestrator.run().await {
                Ok(run) => info!(run_id = %run.id, %recipient, "webhook run finished"),
                Err(e) => error!(run_id = %e.run.id, %recipient, error = %e, "webhook run failed"),
            }
        });
    }
}

#[derive(Clone)]
pub struct AppState {
    pub channel_secret: Arc<str>,
    pub messenger: Arc<dyn Messenger>,
    pub launcher: Arc<dyn PipelineLauncher>,
}

pub fn router(state: AppState, metrics: Option<&Metrics>) -> Router {
    let mut app = Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health));
    if let Some(m) = metrics {
        app = app.merge(m.router::<AppState>());
    }
    app.layer(TraceLayer::new_for_http()).with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "service": "daily-econ-shorts" }))
}

#[derive(Debug, Deserialize)]
struct WebhookBody {
    #[serde(default)]
    events: Vec<Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Event {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    reply_token: Option<String>,
    #[serde(default)]
    source: Option<EventSource>,
    #[serde(default)]
    message: Option<EventMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventSource {
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// A text message we can act on.
#[derive(Debug, PartialEq, Eq)]
struct TextEvent {
    reply_token: Option<String>,
    user_id: Option<String>,
    text: String,
}

impl Event {
    fn into_text(self) -> Option<TextEvent> {
        if self.kind != "message" {
            return None;
        }
        let msg = self.message?;
        if msg.kind != "text" {
            return None;
        }
        Some(TextEvent {
            reply_token: self.reply_token,
            user_id: self.source.and_then(|s| s.user_id),
            text: msg.text.unwrap_or_default(),
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Run,
    Status,
    Other,
}

/// Lowercased, trimmed message text; commands and echoes both use it.
fn normalize_command(text: &str) -> String {
    text.trim().to_lowercase()
}

fn classify(command: &str) -> Command {
    match command {
        "run" => Command::Run,
        "status" => Command::Status,
        _ => Command::Other,
    }
}

pub fn echo_reply(text: &str) -> String {
    format!("受信: {text}\n\nコマンド: 'run' または 'status'")
}

async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if state.channel_secret.is_empty()
        || !signature::verify(&state.channel_secret, &body, signature)
    {
        warn!("webhook rejected: bad signature");
        return (StatusCode::BAD_REQUEST, "Invalid signature").into_response();
    }

    let parsed: WebhookBody = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "webhook body is not a LINE event payload");
            return (StatusCode::BAD_REQUEST, "Invalid payload").into_response();
        }
    };

    for event in parsed.events.into_iter().filter_map(Event::into_text) {
        handle_text(&state, event).await;
    }
    Json(json!({ "status": "ok" })).into_response()
}

async fn handle_text(state: &AppState, event: TextEvent) {
    info!(user = ?event.user_id, text = %event.text, "webhook message");
    let command = normalize_command(&event.text);
    match classify(&command) {
        Command::Run => match event.user_id {
            Some(user) => state.launcher.launch(user),
            None => warn!("run requested without a user id; ignoring"),
        },
        Command::Status => {
            let Some(user) = event.user_id else {
                warn!("status requested without a user id; ignoring");
                return;
            };
            if let Err(e) = state.messenger.push(&user, STATUS_PENDING_MESSAGE).await {
                warn!(error = ?e, "status push failed");
            }
        }
        Command::Other => {
            let Some(token) = event.reply_token else {
                return;
            };
            if let Err(e) = state.messenger.reply(&token, &echo_reply(&command)).await {
                warn!(error = ?e, "echo reply failed");
            }
        }
    }
}
