use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use podcast_tts::args::Args;
use podcast_tts::audio::AudioAssets;
use podcast_tts::episode::{DirectoryRepository, EpisodeStore};
use podcast_tts::server::{self, AppState};
use podcast_tts::tts::{HttpSpeechEngine, Synthesizer};
use podcast_tts::utils::init_log;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_log();

    let args = Args::parse();
    info!("Starting {} on {}", server::SERVICE_NAME, args.bind_addr());

    let assets = AudioAssets::new(&args.audio_dir);
    assets.ensure_dir().await?;
    let repo = DirectoryRepository::new(&args.posts_dir);
    repo.ensure_dir().await?;
    info!(
        "Audio assets in {}, episodes in {}",
        assets.dir().display(),
        repo.dir().display()
    );

    if args.tts_key.is_empty() {
        warn!("No TTS key configured; synthesis requests will be rejected by the provider");
    }
    let engine = HttpSpeechEngine::new(&args.tts_endpoint, &args.tts_key, &args.tts_output_format);
    let synthesizer = Synthesizer::new(Arc::new(engine), assets.clone());
    let episodes = EpisodeStore::new(Arc::new(repo), assets.clone());
    let state = AppState::new(synthesizer, episodes, args.podcast_config());

    let cors_origin = Some(args.cors_origin.as_str()).filter(|o| *o != "*");
    let app = server::router(state, &assets, cors_origin);

    let listener = TcpListener::bind(args.bind_addr()).await?;
    server::serve(listener, app).await
}
