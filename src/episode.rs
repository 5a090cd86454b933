use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

use crate::audio::{AudioAssets, is_plain_filename, public_path};
use crate::error::StoreError;

pub const PUBLISHED: &str = "published";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub audio_filename: String,
    #[serde(default)]
    pub audio_url: String,
    #[serde(default)]
    pub file_size: u64,
    pub created_at: String,
    pub status: String,
}

impl Episode {
    /// `<YYYY-MM-DD>_<id>`; sorting keys descending gives newest-first by day only.
    pub fn storage_key(&self) -> String {
        let day: String = self.created_at.chars().take(10).collect();
        format!("{}_{}", day, self.id)
    }

    /// True when the episode references an asset inside the audio namespace.
    pub fn has_audio(&self) -> bool {
        !self.audio_filename.is_empty() && is_plain_filename(&self.audio_filename)
    }
}

/// Fields supplied by the client when publishing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEpisode {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub audio_filename: String,
}

/// Keyed episode storage. No locking or transactions.
#[async_trait]
pub trait EpisodeRepository: Send + Sync {
    async fn insert(&self, episode: &Episode) -> Result<(), StoreError>;

    /// All records, storage key descending.
    async fn list(&self) -> Result<Vec<Episode>, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Episode, StoreError> {
        self.list()
            .await?
            .into_iter()
            .find(|e| e.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

/// One pretty-printed JSON file per episode.
#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    dir: PathBuf,
}

impl DirectoryRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    async fn entry_names(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        let mut rd = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = rd.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(".json") {
                    names.push(name.to_string());
                }
            }
        }
        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names)
    }

    async fn read_entry(&self, name: &str) -> Result<Episode, StoreError> {
        let data = tokio::fs::read_to_string(self.dir.join(name)).await?;
        serde_json::from_str(&data).map_err(|source| StoreError::Corrupt {
            key: name.to_string(),
            source,
        })
    }

    fn path_for(&self, episode: &Episode) -> PathBuf {
        self.dir.join(format!("{}.json", episode.storage_key()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl EpisodeRepository for DirectoryRepository {
    async fn insert(&self, episode: &Episode) -> Result<(), StoreError> {
        let data = serde_json::to_string_pretty(episode).map_err(|source| StoreError::Corrupt {
            key: episode.storage_key(),
            source,
        })?;
        tokio::fs::write(self.path_for(episode), data).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Episode>, StoreError> {
        let mut episodes = Vec::new();
        for name in self.entry_names().await? {
            episodes.push(self.read_entry(&name).await?);
        }
        Ok(episodes)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        for name in self.entry_names().await? {
            if self.read_entry(&name).await?.id == id {
                tokio::fs::remove_file(self.dir.join(&name)).await?;
                debug!("Removed episode file {}", name);
                return Ok(());
            }
        }
        Err(StoreError::NotFound(id.to_string()))
    }
}

/// In-process key-value repository with the same ordering as the directory one.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    entries: Arc<Mutex<BTreeMap<String, Episode>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Episode>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl EpisodeRepository for MemoryRepository {
    async fn insert(&self, episode: &Episode) -> Result<(), StoreError> {
        self.entries().insert(episode.storage_key(), episode.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Episode>, StoreError> {
        Ok(self.entries().values().rev().cloned().collect())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut entries = self.entries();
        let key = entries
            .iter()
            .rev()
            .find(|(_, e)| e.id == id)
            .map(|(k, _)| k.clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        entries.remove(&key);
        Ok(())
    }
}

/// Episode operations over any repository plus the audio namespace.
#[derive(Clone)]
pub struct EpisodeStore {
    repo: Arc<dyn EpisodeRepository>,
    assets: AudioAssets,
}

impl EpisodeStore {
    pub fn new(repo: Arc<dyn EpisodeRepository>, assets: AudioAssets) -> Self {
        Self { repo, assets }
    }

    pub async fn create(&self, new: NewEpisode) -> Result<Episode, StoreError> {
        if !new.audio_filename.is_empty() && !is_plain_filename(&new.audio_filename) {
            return Err(StoreError::InvalidAudioFilename(new.audio_filename));
        }
        let id: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
        let file_size = self.assets.size_of(&new.audio_filename).await;
        let audio_url = if new.audio_filename.is_empty() {
            String::new()
        } else {
            public_path(&new.audio_filename)
        };

        let episode = Episode {
            id,
            title: new.title,
            content: new.content,
            summary: new.summary,
            tags: new.tags,
            audio_filename: new.audio_filename,
            audio_url,
            file_size,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            status: PUBLISHED.to_string(),
        };
        self.repo.insert(&episode).await?;
        info!("Published episode {} ({:?}, {} audio bytes)", episode.id, episode.title, file_size);
        Ok(episode)
    }

    pub async fn list(&self) -> Result<Vec<Episode>, StoreError> {
        self.repo.list().await
    }

    pub async fn get(&self, id: &str) -> Result<Episode, StoreError> {
        self.repo.get(id).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.repo.delete(id).await?;
        info!("Deleted episode {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, audio: &str) -> NewEpisode {
        NewEpisode {
            title: title.to_string(),
            content: format!("{} body", title),
            summary: String::new(),
            tags: vec!["daily".into(), "notes".into()],
            audio_filename: audio.to_string(),
        }
    }

    fn fixture(id: &str, created_at: &str) -> Episode {
        Episode {
            id: id.to_string(),
            title: id.to_string(),
            content: String::new(),
            summary: String::new(),
            tags: vec![],
            audio_filename: String::new(),
            audio_url: String::new(),
            file_size: 0,
            created_at: created_at.to_string(),
            status: PUBLISHED.to_string(),
        }
    }

    async fn exercise_crud(repo: Arc<dyn EpisodeRepository>, assets: AudioAssets) {
        let store = EpisodeStore::new(repo, assets.clone());
        let audio = assets.write(&[0u8; 42]).await.unwrap();

        let with_audio = store.create(draft("first", &audio)).await.unwrap();
        assert_eq!(with_audio.file_size, 42);
        assert_eq!(with_audio.audio_url, format!("/audio/{}", audio));
        assert_eq!(with_audio.status, "published");
        assert_eq!(with_audio.id.len(), 8);
        assert!(with_audio.created_at.ends_with('Z'));

        let without_audio = store.create(draft("second", "")).await.unwrap();
        assert_eq!(without_audio.file_size, 0);
        assert!(without_audio.audio_url.is_empty());

        let missing_audio = store.create(draft("third", "gone.mp3")).await.unwrap();
        assert_eq!(missing_audio.file_size, 0);
        assert_eq!(missing_audio.audio_url, "/audio/gone.mp3");

        assert_eq!(store.get(&with_audio.id).await.unwrap(), with_audio);
        assert_eq!(store.list().await.unwrap().len(), 3);

        store.delete(&without_audio.id).await.unwrap();
        assert!(matches!(
            store.get(&without_audio.id).await,
            Err(StoreError::NotFound(ref id)) if id == &without_audio.id
        ));
        assert!(matches!(
            store.delete(&without_audio.id).await,
            Err(StoreError::NotFound(_))
        ));

        let remaining: Vec<String> = store.list().await.unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.contains(&with_audio.id));
        assert!(remaining.contains(&missing_audio.id));
        let escaped = store.create(draft("fourth", "../../etc/passwd")).await;
        assert!(matches!(
            escaped,
            Err(StoreError::InvalidAudioFilename(ref name)) if name == "../../etc/passwd"
        ));
        assert_eq!(store.list().await.unwrap().len(), 2);

        // audio outlives its episode
        store.delete(&with_audio.id).await.unwrap();
        assert_eq!(assets.size_of(&audio).await, 42);
    }

    #[tokio::test]
    async fn directory_repository_crud() {
        let posts = tempfile::tempdir().unwrap();
        let audio = tempfile::tempdir().unwrap();
        let repo = DirectoryRepository::new(posts.path());
        exercise_crud(Arc::new(repo), AudioAssets::new(audio.path())).await;
    }

    #[tokio::test]
    async fn memory_repository_crud() {
        let audio = tempfile::tempdir().unwrap();
        exercise_crud(Arc::new(MemoryRepository::new()), AudioAssets::new(audio.path())).await;
    }

    #[tokio::test]
    async fn list_orders_by_storage_key_descending() {
        let posts = tempfile::tempdir().unwrap();
        let dir_repo = DirectoryRepository::new(posts.path());
        let mem_repo = MemoryRepository::new();
        let records = [
            fixture("aaaa0001", "2024-03-01T23:00:00Z"),
            fixture("ffff0002", "2024-03-01T01:00:00Z"),
            fixture("bbbb0003", "2024-03-02T00:00:00Z"),
        ];
        for r in &records {
            dir_repo.insert(r).await.unwrap();
            mem_repo.insert(r).await.unwrap();
        }
        // same-day records order by id, not time of day
        let expected = vec!["bbbb0003", "ffff0002", "aaaa0001"];
        let ids = |v: Vec<Episode>| v.into_iter().map(|e| e.id).collect::<Vec<_>>();
        assert_eq!(ids(dir_repo.list().await.unwrap()), expected);
        assert_eq!(ids(mem_repo.list().await.unwrap()), expected);
        assert!(posts.path().join("2024-03-02_bbbb0003.json").is_file());
    }

    #[tokio::test]
    async fn corrupt_entry_fails_the_scan() {
        let posts = tempfile::tempdir().unwrap();
        let repo = DirectoryRepository::new(posts.path());
        repo.insert(&fixture("aaaa0001", "2024-03-01T10:00:00Z")).await.unwrap();
        std::fs::write(posts.path().join("2024-03-05_broken.json"), "{not json").unwrap();
        std::fs::write(posts.path().join("notes.txt"), "ignored").unwrap();

        assert!(matches!(repo.list().await, Err(StoreError::Corrupt { .. })));
        assert!(matches!(repo.get("aaaa0001").await, Err(StoreError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn reads_legacy_records_without_file_size() {
        let posts = tempfile::tempdir().unwrap();
        let legacy = r#"{
  "id": "1a2b3c4d",
  "title": "旧文章",
  "content": "正文",
  "summary": "",
  "tags": [],
  "audio_filename": "",
  "audio_url": "",
  "created_at": "2024-02-10T08:30:00.123456",
  "status": "published"
}"#;
        std::fs::write(posts.path().join("2024-02-10_1a2b3c4d.json"), legacy).unwrap();
        let repo = DirectoryRepository::new(posts.path());
        let ep = repo.get("1a2b3c4d").await.unwrap();
        assert_eq!(ep.title, "旧文章");
        assert_eq!(ep.file_size, 0);
    }
}
