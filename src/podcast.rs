use serde::{Deserialize, Serialize};

/// Channel-level settings for the published feed. Held in memory only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodcastConfig {
    pub title: String,
    pub description: String,
    pub author: String,
    pub email: String,
    pub language: String,
    pub image_url: String,
    pub base_url: String,
}

impl Default for PodcastConfig {
    fn default() -> Self {
        Self {
            title: "TTS Podcast".to_string(),
            description: "Narrated posts".to_string(),
            author: String::new(),
            email: String::new(),
            language: "zh-cn".to_string(),
            image_url: String::new(),
            base_url: "http://localhost:8000".to_string(),
        }
    }
}

/// Partial update; missing and empty fields leave the current value alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub email: Option<String>,
    pub language: Option<String>,
    pub image_url: Option<String>,
    pub base_url: Option<String>,
}

fn overwrite(field: &mut String, value: Option<String>) {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        *field = v;
    }
}

impl PodcastConfig {
    pub fn apply(&mut self, update: ConfigUpdate) {
        overwrite(&mut self.title, update.title);
        overwrite(&mut self.description, update.description);
        overwrite(&mut self.author, update.author);
        overwrite(&mut self.email, update.email);
        overwrite(&mut self.language, update.language);
        overwrite(&mut self.image_url, update.image_url);
        overwrite(&mut self.base_url, update.base_url);
    }
}
