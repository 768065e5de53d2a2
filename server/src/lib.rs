//! Narrator HTTP front end.
//!
//! `GET /tts?text=...&voice=...` answers with shaped WAV bytes on
//! success, or a JSON error object (`{"error": <kind>, "details": ...}`)
//! on failure. `GET /healthz` is a liveness probe.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use narrator_core::{Narrator, NarratorError, TtsRequest};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub narrator: Arc<Narrator>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/tts", get(tts_handler))
        .route("/healthz", get(healthz_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn healthz_handler() -> &'static str {
    "ok"
}

/// Query parameters for `/tts`. `text` is validated in the handler so a
/// missing value yields a structured 400 instead of a framework reject.
#[derive(Debug, Deserialize)]
struct TtsQuery {
    text: Option<String>,
    voice: Option<String>,
    length_scale: Option<f32>,
    noise_scale: Option<f32>,
    grit: Option<f32>,
    lowpass: Option<f32>,
    pitch: Option<f32>,
}

async fn tts_handler(State(state): State<AppState>, Query(q): Query<TtsQuery>) -> Response {
    let text = match q.text.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => return error_response(&NarratorError::MissingText),
    };
    // Query extraction already percent-decoded once; decode again for
    // clients that send double-encoded text.
    let text = match urlencoding::decode(&text) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => text,
    };

    let request = TtsRequest {
        text,
        voice: q.voice,
        length_scale: q.length_scale,
        noise_scale: q.noise_scale,
        grit: q.grit,
        lowpass: q.lowpass,
        pitch: q.pitch,
    };

    match state.narrator.narrate(&request).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "audio/wav")], bytes).into_response(),
        Err(err) => {
            warn!(target: "server", error = %err, "Request failed");
            error_response(&err)
        }
    }
}

fn error_response(err: &NarratorError) -> Response {
    let (status, body) = match err {
        NarratorError::MissingText => (
            StatusCode::BAD_REQUEST,
            json!({
                "error": "missing_text",
                "details": "text query parameter is required",
            }),
        ),
        NarratorError::VoiceDownloadFailed { voice, details } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({
                "error": "voice_download_failed",
                "voice": voice,
                "details": details,
            }),
        ),
        NarratorError::SynthesisFailed { voice, details } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({
                "error": "synthesis_failed",
                "voice": voice,
                "details": details,
            }),
        ),
        NarratorError::ShapingFailed { filter, details } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({
                "error": "shaping_failed",
                "filter": filter,
                "details": details,
            }),
        ),
        NarratorError::IoError(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({
                "error": "server_failed",
                "details": e.to_string(),
            }),
        ),
    };
    (status, Json(body)).into_response()
}
