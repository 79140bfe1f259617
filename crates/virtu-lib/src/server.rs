//! HTTP + WebSocket API for the avatar frontend.
//!
//! ```text
//! GET /virtupy/ws           WebSocket: selections and turns
//! GET /virtupy/api/models   avatar catalog
//! GET /virtupy/api/voices   voice catalog + server default
//! GET /virtupy/api/llm      model ids + server default
//! ```
//!
//! Each WebSocket connection owns its [`Session`]. Frames are handled one at
//! a time: a turn runs to completion before the next frame is handled. A
//! background reader keeps watching the socket so a client leaving mid-turn
//! stops the turn.
//! CORS-permissive so a dev frontend on another port can call in.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{Instrument, debug, error, info, info_span};

use virtu_core::catalog::AvatarCatalog;
use virtu_core::protocol::{Frame, Inbound, Outbound};
use virtu_core::session::Session;
use virtu_core::types::Voice;

use crate::coordinator::TurnSink;
use crate::error::{Error, Result};
use crate::state::AppState;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Build the axum router. When `gui_dir` is given, unmatched paths are
/// served from it.
pub fn router(state: AppState, gui_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/virtupy/ws", get(ws_upgrade))
        .route("/virtupy/api/models", get(models))
        .route("/virtupy/api/voices", get(voices))
        .route("/virtupy/api/llm", get(llms));

    let app = match gui_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };

    app.layer(CorsLayer::permissive()).with_state(state)
}

async fn models(State(state): State<AppState>) -> Json<AvatarCatalog> {
    Json(state.catalogs.avatars.clone())
}

#[derive(serde::Serialize)]
struct VoicesResponse {
    available: BTreeMap<String, Vec<String>>,
    current: Voice,
}

async fn voices(State(state): State<AppState>) -> Json<VoicesResponse> {
    let voices = &state.catalogs.voices;
    Json(VoicesResponse {
        available: voices.available(),
        current: voices.default_voice().clone(),
    })
}

#[derive(serde::Serialize)]
struct LlmResponse {
    available: Vec<String>,
    current: String,
}

async fn llms(State(state): State<AppState>) -> Json<LlmResponse> {
    let llms = &state.catalogs.llms;
    Json(LlmResponse {
        available: llms.models().to_vec(),
        current: llms.default_model().to_string(),
    })
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = socket.split();
        run_session(receiver, sender, state).instrument(info_span!("session", id))
    })
}

/// Write half of a connection, as seen by the coordinator.
struct WsSink<W> {
    sender: W,
    /// Flips to `true` when the reader sees the client leave.
    closed: watch::Receiver<bool>,
}

#[async_trait]
impl<W> TurnSink for WsSink<W>
where
    W: Sink<Message> + Send + Unpin + 'static,
{
    async fn send(&mut self, message: Outbound) -> Result<()> {
        let message = match message.into_frame() {
            Frame::Text(text) => Message::Text(text.into()),
            Frame::Binary(bytes) => Message::Binary(bytes.into()),
        };
        self.sender
            .send(message)
            .await
            .map_err(|_| Error::Disconnected)
    }

    async fn closed(&mut self) {
        // A dropped sender means the reader is gone too.
        let _ = self.closed.wait_for(|gone| *gone).await;
    }
}

/// Serve one connection: frames from `incoming`, replies into `outgoing`.
async fn run_session<R, W, E>(incoming: R, outgoing: W, state: AppState)
where
    R: Stream<Item = std::result::Result<Message, E>> + Send + Unpin + 'static,
    W: Sink<Message> + Send + Unpin + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let (mut frames, closed, reader) = spawn_reader(incoming);
    let mut sink = WsSink {
        sender: outgoing,
        closed,
    };
    let mut session = Session::new(&state.catalogs);
    info!("connected");

    while let Some(raw) = frames.recv().await {
        match Inbound::parse(&raw) {
            Inbound::Control(control) => {
                if session.apply(&control, &state.catalogs) {
                    debug!("selected {control:?}");
                } else {
                    debug!("ignored invalid selection {control:?}");
                }
            }
            Inbound::Turn(text) => {
                let result = state
                    .coordinator
                    .run_turn(&mut session, &state.catalogs, &text, &mut sink)
                    .await;
                if let Err(e) = result {
                    if e.is_disconnect() {
                        debug!("client left mid-turn");
                    } else {
                        error!(
                            avatar = session.avatar_id(),
                            llm = session.llm(),
                            turns = session.history().len() / 2,
                            "turn failed: {e}"
                        );
                    }
                    break;
                }
            }
            Inbound::Ignored => debug!("ignored frame"),
        }
    }

    reader.abort();
    info!("disconnected");
}

/// Read the client's frames in the background so a close is seen even while
/// a turn is running. Text frames queue up for the session loop; the watch
/// flips once the client closes or the socket fails.
fn spawn_reader<R, E>(
    mut incoming: R,
) -> (
    mpsc::UnboundedReceiver<String>,
    watch::Receiver<bool>,
    JoinHandle<()>,
)
where
    R: Stream<Item = std::result::Result<Message, E>> + Send + Unpin + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let (frame_tx, frame_rx) = mpsc::unbounded_channel();
    let (closed_tx, closed_rx) = watch::channel(false);

    let reader = tokio::spawn(
        async move {
            while let Some(frame) = incoming.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if frame_tx.send(text.as_str().to_owned()).is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        debug!("receive failed: {e}");
                        break;
                    }
                }
            }
            let _ = closed_tx.send(true);
        }
        .in_current_span(),
    );

    (frame_rx, closed_rx, reader)
}
