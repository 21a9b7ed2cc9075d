//! HTTP API used by the dashboard.
//!
//! - `POST /announce` — speak the calibration report (throttled per period)
//! - `GET /status` — speech availability and last announced date per period
//! - `POST /cancel` — stop the current announcement

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::{info, warn};

use crate::models::AnnouncePayload;
use crate::narrator::{AnnounceOutcome, Narrator};
use crate::speech::HttpSpeechSink;
use crate::status::Period;

#[derive(Clone)]
pub struct ApiState {
    pub narrator: Arc<Narrator>,
    /// Present when speaking through a remote engine; probed before announcing.
    pub engine: Option<Arc<HttpSpeechSink>>,
}

#[derive(Serialize)]
struct LastAnnounced {
    morning: Option<String>,
    afternoon: Option<String>,
    night: Option<String>,
}

#[derive(Serialize)]
struct StatusResponse {
    speech_available: bool,
    last_announced: LastAnnounced,
}

#[derive(Serialize)]
struct SimpleResponse {
    status: String,
}

/// Build the axum router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/status", get(handle_status))
        .route("/announce", post(handle_announce))
        .route("/cancel", post(handle_cancel))
        .with_state(state)
}

/// Start the API server as a background tokio task.
pub async fn start_api(state: ApiState, port: u16) -> std::io::Result<()> {
    let addr = format!("127.0.0.1:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Calibration voice API listening on {addr}");

    let app = router(state);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!("API server error: {e}");
        }
    });
    Ok(())
}

// --- Handlers ---

async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    let narrator = &state.narrator;
    Json(StatusResponse {
        speech_available: narrator.is_speech_available(),
        last_announced: LastAnnounced {
            morning: narrator.last_announced(Period::Morning),
            afternoon: narrator.last_announced(Period::Afternoon),
            night: narrator.last_announced(Period::Night),
        },
    })
}

async fn handle_announce(
    State(state): State<ApiState>,
    Json(req): Json<AnnouncePayload>,
) -> Json<AnnounceOutcome> {
    info!(
        "HTTP /announce: {} items, force={}",
        req.items.len(),
        req.force
    );

    if let Some(engine) = &state.engine {
        engine.probe().await;
    }

    Json(
        state
            .narrator
            .announce(&req.name, &req.stats, &req.items, req.force),
    )
}

async fn handle_cancel(State(state): State<ApiState>) -> Json<SimpleResponse> {
    state.narrator.cancel();
    Json(SimpleResponse {
        status: "cancelled".into(),
    })
}
