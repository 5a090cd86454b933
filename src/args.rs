use clap::Parser;
use std::path::PathBuf;

use crate::podcast::PodcastConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "podcast-tts", about = "Text-to-speech podcast publishing backend")]
pub struct Args {
    #[clap(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[clap(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    #[clap(long, env = "AUDIO_DIR", default_value = "audio_files")]
    pub audio_dir: PathBuf,

    #[clap(long, env = "POSTS_DIR", default_value = "posts")]
    pub posts_dir: PathBuf,

    #[clap(
        long,
        env = "TTS_ENDPOINT",
        default_value = "https://eastasia.tts.speech.microsoft.com/cognitiveservices/v1"
    )]
    pub tts_endpoint: String,

    #[clap(long, env = "TTS_KEY", default_value = "", hide_env_values = true)]
    pub tts_key: String,

    #[clap(long, env = "TTS_OUTPUT_FORMAT", default_value = "audio-24khz-48kbitrate-mono-mp3")]
    pub tts_output_format: String,

    #[clap(long, env = "CORS_ORIGIN", default_value = "http://localhost:3000")]
    pub cors_origin: String,

    #[clap(long, env = "PODCAST_TITLE", default_value = "TTS Podcast")]
    pub podcast_title: String,

    #[clap(long, env = "PODCAST_DESCRIPTION", default_value = "Narrated posts")]
    pub podcast_description: String,

    #[clap(long, env = "PODCAST_AUTHOR", default_value = "")]
    pub podcast_author: String,

    #[clap(long, env = "PODCAST_EMAIL", default_value = "")]
    pub podcast_email: String,

    #[clap(long, env = "PODCAST_LANGUAGE", default_value = "zh-cn")]
    pub podcast_language: String,

    #[clap(long, env = "PODCAST_IMAGE_URL", default_value = "")]
    pub podcast_image_url: String,

    #[clap(long, env = "BASE_URL", default_value = "http://localhost:8000")]
    pub base_url: String,
}

impl Args {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Initial podcast configuration; later changed only through `POST /config`.
    pub fn podcast_config(&self) -> PodcastConfig {
        PodcastConfig {
            title: self.podcast_title.clone(),
            description: self.podcast_description.clone(),
            author: self.podcast_author.clone(),
            email: self.podcast_email.clone(),
            language: self.podcast_language.clone(),
            image_url: self.podcast_image_url.clone(),
            base_url: self.base_url.clone(),
        }
    }
}
