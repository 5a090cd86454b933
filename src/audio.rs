use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;
use uuid::Uuid;

/// URL prefix under which audio files are served.
pub const AUDIO_PATH_PREFIX: &str = "/audio/";

fn plain_filename() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("valid regex"))
}

/// True for a bare file name that cannot escape the asset directory.
pub fn is_plain_filename(name: &str) -> bool {
    plain_filename().is_match(name) && !name.contains("..")
}

pub fn public_path(filename: &str) -> String {
    format!("{}{}", AUDIO_PATH_PREFIX, filename)
}

/// Directory of synthesized audio files, one per synthesis call.
///
/// Files are never removed; deleting an episode leaves its audio in place.
#[derive(Debug, Clone)]
pub struct AudioAssets {
    dir: PathBuf,
}

impl AudioAssets {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Writes `bytes` under a fresh random name and returns that name.
    pub async fn write(&self, bytes: &[u8]) -> std::io::Result<String> {
        let filename = format!("{}.mp3", Uuid::new_v4().simple());
        tokio::fs::write(self.dir.join(&filename), bytes).await?;
        debug!("Wrote {} bytes to audio asset {}", bytes.len(), filename);
        Ok(filename)
    }

    /// Size of the named asset, or 0 when the name is empty, unsafe, or missing.
    pub async fn size_of(&self, filename: &str) -> u64 {
        if filename.is_empty() || !is_plain_filename(filename) {
            return 0;
        }
        match tokio::fs::metadata(self.dir.join(filename)).await {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => 0,
        }
    }
}
