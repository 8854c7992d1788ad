use std::path::Path;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rocket::fairing::AdHoc;
use rocket::fs::FileServer;
use rocket::http::{ContentType, Header, Status};
use rocket::response::{status, Redirect, Responder};
use rocket::serde::json::Json;
use rocket::{get, routes, Build, Rocket, State};
use serde::Serialize;

use common::Config;

use crate::snapshot::{SnapshotStatus, SnapshotStore};
use crate::tts::{SpeechOutput, SpeechSynthesizer};

/// Application state stored inside Rocket managed state.
#[derive(Clone)]
pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub snapshots: SnapshotStore,
    /// None when no speech backend could be initialized
    pub synthesizer: Option<SpeechSynthesizer>,
    pub feeds_count: usize,
    pub refresh_interval_seconds: u64,
}

impl AppState {
    pub fn new(config: &Config, snapshots: SnapshotStore, synthesizer: Option<SpeechSynthesizer>) -> Self {
        Self {
            started_at: Utc::now(),
            snapshots,
            synthesizer,
            feeds_count: config.feeds.urls.len(),
            refresh_interval_seconds: config.scheduler.interval_seconds,
        }
    }
}

#[derive(Serialize)]
struct NewsResponse {
    news: String,
}

/// Response structure for `/api/v1/status`.
#[derive(Serialize)]
struct StatusResponse {
    status: SnapshotStatus,
    updated_at: Option<DateTime<Utc>>,
    headline_count: usize,
    feeds: usize,
    refresh_interval_seconds: u64,
    uptime_seconds: i64,
    tts_backend: Option<&'static str>,
}

#[derive(Responder)]
enum TtsResponse {
    Redirect(Redirect),
    Audio((ContentType, Vec<u8>)),
}

/// Current headline text; always 200, placeholders included.
#[get("/news")]
fn news(state: &State<AppState>) -> Json<NewsResponse> {
    let snapshot = state.snapshots.read_current();
    Json(NewsResponse {
        news: snapshot.text.clone(),
    })
}

#[get("/tts")]
async fn tts(state: &State<AppState>) -> Result<TtsResponse, status::Custom<String>> {
    speak(state).await
}

#[get("/news-tts")]
async fn news_tts(state: &State<AppState>) -> Result<TtsResponse, status::Custom<String>> {
    speak(state).await
}

async fn speak(state: &AppState) -> Result<TtsResponse, status::Custom<String>> {
    let Some(synthesizer) = state.synthesizer.as_ref() else {
        return Err(status::Custom(
            Status::InternalServerError,
            "TTS unavailable".to_string(),
        ));
    };

    let snapshot = state.snapshots.read_current();
    match synthesizer.render(&snapshot.text).await {
        Ok(SpeechOutput::Redirect(url)) => Ok(TtsResponse::Redirect(Redirect::found(url))),
        Ok(SpeechOutput::Audio(audio)) => {
            tracing::debug!(bytes = audio.len(), "serving synthesized news audio");
            Ok(TtsResponse::Audio((ContentType::new("audio", "mpeg"), audio)))
        }
        Err(e) => {
            tracing::error!(error = %e, "TTS failed");
            Err(status::Custom(
                Status::InternalServerError,
                "TTS failed".to_string(),
            ))
        }
    }
}

#[get("/health")]
fn health() -> &'static str {
    "OK"
}

/// Status endpoint returning snapshot freshness and basic config info.
#[get("/api/v1/status")]
fn api_status(state: &State<AppState>) -> Json<StatusResponse> {
    let snapshot = state.snapshots.read_current();
    Json(StatusResponse {
        status: snapshot.status,
        updated_at: snapshot.updated_at,
        headline_count: snapshot.headline_count,
        feeds: state.feeds_count,
        refresh_interval_seconds: state.refresh_interval_seconds,
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
        tts_backend: state.synthesizer.as_ref().map(|s| s.backend_name()),
    })
}

/// Landing text used when no static directory is available.
#[get("/")]
fn index() -> &'static str {
    "newscast: GET /news for headlines, GET /tts for audio"
}

/// Adds the configured CORS headers to every response.
fn cors(allowed_origin: String) -> AdHoc {
    AdHoc::on_response("CORS", move |_req, res| {
        let origin = allowed_origin.clone();
        Box::pin(async move {
            res.set_header(Header::new("Access-Control-Allow-Origin", origin));
            res.set_header(Header::new("Access-Control-Allow-Methods", "GET"));
        })
    })
}

/// Build the Rocket instance with managed state and routes, bound to `server.bind`/`server.port`.
pub fn build_rocket(config: &Config, state: AppState) -> Rocket<Build> {
    let fig = rocket::Config::figment()
        .merge(("address", config.server.bind.clone()))
        .merge(("port", config.server.port));

    let rocket = rocket::custom(fig)
        .manage(state)
        .attach(cors(config.server.allowed_origin.clone()))
        .mount("/", routes![news, tts, news_tts, health, api_status]);

    match config.server.static_dir.as_deref().filter(|dir| Path::new(dir).is_dir()) {
        Some(dir) => rocket.mount("/", FileServer::from(dir)),
        None => rocket.mount("/", routes![index]),
    }
}

/// Launch the server; returns once Rocket shuts down (SIGINT/SIGTERM etc.).
pub async fn launch_rocket(rocket: Rocket<Build>) -> Result<()> {
    tracing::info!("Starting Rocket HTTP server");
    rocket
        .launch()
        .await
        .map_err(|e| anyhow!("Rocket failed: {}", e))?;

    tracing::info!("Rocket HTTP server has shut down");
    Ok(())
}
