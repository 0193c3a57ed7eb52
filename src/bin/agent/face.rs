use std::convert::Infallible;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::response::sse::{Event, Sse};
use axum::routing::{get, post};
use browser_pilot::{AgentLoop, BrowserConfig, GeminiClient, Goal, SessionEvent, SessionId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

pub struct AppState {
    pub agent: AgentLoop<GeminiClient>,
    pub browser: BrowserConfig,
    pub event_tx: broadcast::Sender<SessionEvent>,
}

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
    /// Id handed out by `/events`. Without one the session's progress
    /// reaches nobody.
    #[serde(default)]
    session: Option<SessionId>,
}

#[derive(Serialize)]
struct ChatResponse {
    reply: String,
    code: String,
}

fn to_sse_event(event: &SessionEvent) -> Event {
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    Event::default().event(event.name()).data(data)
}

/// Events of one session only, preceded by a `session` event carrying its id.
fn session_events(
    rx: broadcast::Receiver<SessionEvent>,
    session: SessionId,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let hello = Event::default()
        .event("session")
        .data(serde_json::json!({ "session": session }).to_string());
    let events = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) if event.belongs_to(&session) => Some(Ok(to_sse_event(&event))),
        _ => None,
    });
    tokio_stream::once(Ok(hello)).chain(events)
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/chat", post(chat_handler))
        .route("/events", get(sse_handler))
        .route("/favicon.ico", get(|| async { StatusCode::NO_CONTENT }))
        .with_state(state)
}

/// Serves the UI on the first free port in `port..port + 10`.
pub async fn serve(state: Arc<AppState>, port: u16) -> Result<()> {
    let mut listener = None;
    for p in port..port.saturating_add(10) {
        match tokio::net::TcpListener::bind(("127.0.0.1", p)).await {
            Ok(l) => {
                listener = Some(l);
                break;
            }
            Err(e) => warn!(port = p, "bind failed: {}", e),
        }
    }
    let listener = listener.with_context(|| {
        format!("could not bind any port in {port}..{}", port.saturating_add(10))
    })?;

    info!("Web UI running at http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .await
        .context("HTTP server failed")
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Runs one session per request.
///
/// If the client goes away this future is dropped, and the session's
/// Chrome process goes with it.
async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> (StatusCode, Json<ChatResponse>) {
    let goal = payload.message.trim();
    if goal.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ChatResponse {
                reply: "empty goal".to_string(),
                code: String::new(),
            }),
        );
    }

    let session = payload.session.unwrap_or_else(SessionId::random);
    info!(goal, session = %session, "POST /chat");
    let report = state
        .agent
        .run_in_chrome(&state.browser, session, Goal::new(goal))
        .await;

    (
        StatusCode::OK,
        Json(ChatResponse {
            reply: report.status_text(),
            code: report.transcript(),
        }),
    )
}

/// Each subscriber gets a fresh session id and sees only that session.
async fn sse_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session = SessionId::random();
    info!(session = %session, "GET /events");
    Sse::new(session_events(state.event_tx.subscribe(), session))
}

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>Browser Pilot</title>
<style>
  body { background: #0a0a0f; color: #e0e0e0; font-family: system-ui, sans-serif; margin: 0; }
  .main { max-width: 800px; margin: 0 auto; padding: 24px 32px; display: flex; flex-direction: column; gap: 12px; }
  h1 { font-size: 20px; color: #fff; }
  .entry { padding: 10px 14px; border-radius: 8px; font-size: 14px; white-space: pre-wrap; }
  .entry.user { background: #1a1a2e; border-left: 3px solid #6366f1; }
  .entry.step { background: #111118; border-left: 3px solid #3b82f6; font-family: monospace; }
  .entry.error { background: #1a0a0a; border-left: 3px solid #ef4444; color: #fca5a5; }
  .entry.done { background: #0a1a0a; border-left: 3px solid #22c55e; color: #86efac; }
  .entry.thinking { background: #111118; border-left: 3px solid #f59e0b; color: #fcd34d; }
  form { display: flex; gap: 8px; }
  #msg { flex: 1; background: #111118; border: 1px solid #222; border-radius: 8px; padding: 12px; color: #fff; }
  button { background: #6366f1; color: #fff; border: none; border-radius: 8px; padding: 12px 24px; cursor: pointer; }
  button:disabled { background: #333; }
  pre { background: #111118; padding: 12px; border-radius: 8px; }
</style>
</head>
<body>
<div class="main">
  <h1>Browser Pilot</h1>
  <p>Describe what you want done on the site, e.g. <i>Search for "RTX 4090" and sort by price high to low</i>.</p>
  <form id="chat-form">
    <input type="text" id="msg" placeholder="What should the agent do?" autofocus>
    <button type="submit" id="send">Send</button>
  </form>
  <div id="log"></div>
  <h3>Executed actions</h3>
  <pre id="code"></pre>
</div>
<script>
  const log = document.getElementById('log');
  let session = null;
  const esc = s => String(s).replace(/</g, '&lt;');

  function addEntry(cls, html) {
    const div = document.createElement('div');
    div.className = 'entry ' + cls;
    div.innerHTML = html;
    log.appendChild(div);
  }

  document.getElementById('chat-form').onsubmit = async (e) => {
    e.preventDefault();
    const msg = document.getElementById('msg').value.trim();
    if (!msg) return;
    const send = document.getElementById('send');
    send.disabled = true;
    addEntry('user', '<strong>Goal:</strong> ' + esc(msg));
    document.getElementById('code').innerText = '';
    const res = await fetch('/chat', {
      method: 'POST',
      headers: {'Content-Type': 'application/json'},
      body: JSON.stringify({message: msg, session}),
    });
    const data = await res.json();
    addEntry(res.ok ? 'done' : 'error', '<strong>Result:</strong> ' + esc(data.reply));
    document.getElementById('code').innerText = data.code || '';
    send.disabled = false;
  };

  const es = new EventSource('/events');
  es.addEventListener('session', e => { session = JSON.parse(e.data).session; });
  es.addEventListener('thinking', e => addEntry('thinking', 'Step ' + JSON.parse(e.data).step + ': thinking...'));
  es.addEventListener('step', e => {
    const d = JSON.parse(e.data);
    addEntry('step', 'Step ' + d.number + ': ' + esc(d.description));
  });
  es.addEventListener('step_error', e => addEntry('error', '<strong>Error:</strong> ' + esc(JSON.parse(e.data).message)));
</script>
</body>
</html>
"##;
