use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderValue, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::audio::AudioAssets;
use crate::episode::{Episode, EpisodeStore, NewEpisode};
use crate::error::ApiError;
use crate::podcast::{ConfigUpdate, PodcastConfig};
use crate::rss;
use crate::tts::{SavedAudio, Synthesizer, VoiceInfo, voice_catalogue};

pub const SERVICE_NAME: &str = "podcast-tts";

#[derive(Clone)]
pub struct AppState {
    pub synthesizer: Synthesizer,
    pub episodes: EpisodeStore,
    pub podcast: Arc<RwLock<PodcastConfig>>,
}

impl AppState {
    pub fn new(synthesizer: Synthesizer, episodes: EpisodeStore, podcast: PodcastConfig) -> Self {
        Self {
            synthesizer,
            episodes,
            podcast: Arc::new(RwLock::new(podcast)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    pub text: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_rate")]
    pub rate: String,
}

fn default_voice() -> String {
    "xiaoxiao".to_string()
}

fn default_rate() -> String {
    "+0%".to_string()
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin.map(HeaderValue::from_str) {
        Some(Ok(value)) => layer.allow_origin(value),
        Some(Err(_)) => {
            warn!("Invalid CORS origin, allowing any origin");
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}

pub fn router(state: AppState, assets: &AudioAssets, cors_origin: Option<&str>) -> Router {
    Router::new()
        .route("/voices", get(list_voices))
        .route("/tts", post(text_to_speech))
        .route("/tts/save", post(text_to_speech_save))
        .route("/publish", post(publish))
        .route("/posts", get(list_posts))
        .route("/posts/:id", get(get_post).delete(delete_post))
        .route("/rss", get(feed))
        .route("/config", get(get_config).post(update_config))
        .route("/health", get(health))
        .nest_service("/audio", ServeDir::new(assets.dir()))
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(listener: TcpListener, app: Router) -> anyhow::Result<()> {
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn list_voices() -> Json<Vec<VoiceInfo>> {
    Json(voice_catalogue())
}

async fn text_to_speech(
    State(state): State<AppState>,
    body: Result<Json<TtsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let saved = state.synthesizer.synthesize(&req.text, &req.voice, &req.rate).await?;
    let disposition = format!("attachment; filename=\"tts_{}.mp3\"", req.voice);
    Ok((
        [
            (header::CONTENT_TYPE, "audio/mpeg".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        saved.bytes,
    ))
}

async fn text_to_speech_save(
    State(state): State<AppState>,
    body: Result<Json<TtsRequest>, JsonRejection>,
) -> Result<Json<SavedAudio>, ApiError> {
    let Json(req) = body?;
    let saved = state.synthesizer.synthesize(&req.text, &req.voice, &req.rate).await?;
    Ok(Json(saved))
}

async fn publish(
    State(state): State<AppState>,
    body: Result<Json<NewEpisode>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = body?;
    let post = state.episodes.create(req).await?;
    Ok(Json(json!({ "message": "published", "post": post })))
}

async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<Episode>>, ApiError> {
    Ok(Json(state.episodes.list().await?))
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Episode>, ApiError> {
    Ok(Json(state.episodes.get(&id).await?))
}

async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.episodes.delete(&id).await?;
    Ok(Json(json!({ "message": "deleted" })))
}

async fn feed(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let episodes = state.episodes.list().await?;
    let config = state.podcast.read().await.clone();
    let xml = rss::render_feed(&config, &episodes)?;
    Ok(([(header::CONTENT_TYPE, rss::CONTENT_TYPE)], xml))
}

async fn get_config(State(state): State<AppState>) -> Json<PodcastConfig> {
    Json(state.podcast.read().await.clone())
}

async fn update_config(
    State(state): State<AppState>,
    body: Result<Json<ConfigUpdate>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(update) = body?;
    let config = {
        let mut cfg = state.podcast.write().await;
        cfg.apply(update);
        cfg.clone()
    };
    info!("Podcast config updated: {:?}", config.title);
    Ok(Json(json!({ "message": "config updated", "config": config })))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": SERVICE_NAME }))
}
