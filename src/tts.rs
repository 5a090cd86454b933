use async_trait::async_trait;
use quick_xml::escape::escape;
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};

use crate::audio::{AudioAssets, public_path};
use crate::error::SpeechError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Voice {
    Xiaoxiao,
    Xiaoyi,
    Yunjian,
    Yunxi,
    Yunxia,
    Xiaobei,
}

impl Voice {
    pub const ALL: [Voice; 6] = [
        Voice::Xiaoxiao,
        Voice::Xiaoyi,
        Voice::Yunjian,
        Voice::Yunxi,
        Voice::Yunxia,
        Voice::Xiaobei,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Voice::Xiaoxiao => "xiaoxiao",
            Voice::Xiaoyi => "xiaoyi",
            Voice::Yunjian => "yunjian",
            Voice::Yunxi => "yunxi",
            Voice::Yunxia => "yunxia",
            Voice::Xiaobei => "xiaobei",
        }
    }

    /// Provider-side voice name.
    pub fn code(self) -> &'static str {
        match self {
            Voice::Xiaoxiao => "zh-CN-XiaoxiaoNeural",
            Voice::Xiaoyi => "zh-CN-XiaoyiNeural",
            Voice::Yunjian => "zh-CN-YunjianNeural",
            Voice::Yunxi => "zh-CN-YunxiNeural",
            Voice::Yunxia => "zh-CN-YunxiaNeural",
            Voice::Xiaobei => "zh-CN-liaoning-XiaobeiNeural",
        }
    }
}

impl FromStr for Voice {
    type Err = SpeechError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Voice::ALL
            .into_iter()
            .find(|v| v.id() == s)
            .ok_or_else(|| SpeechError::UnknownVoice(s.to_string()))
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct VoiceInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub code: &'static str,
}

pub fn voice_catalogue() -> Vec<VoiceInfo> {
    Voice::ALL
        .into_iter()
        .map(|v| VoiceInfo {
            id: v.id(),
            name: v.id(),
            code: v.code(),
        })
        .collect()
}

/// External speech engine.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    async fn speak(&self, text: &str, voice: Voice, rate: &str) -> anyhow::Result<Vec<u8>>;
}

/// Neural TTS REST engine: POSTs an SSML document and reads back MP3 bytes.
pub struct HttpSpeechEngine {
    client: reqwest::Client,
    endpoint: String,
    key: String,
    output_format: String,
}

impl HttpSpeechEngine {
    pub fn new(endpoint: impl Into<String>, key: impl Into<String>, output_format: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            key: key.into(),
            output_format: output_format.into(),
        }
    }
}

pub fn ssml(text: &str, voice: Voice, rate: &str) -> String {
    format!(
        "<speak version=\"1.0\" xmlns=\"http://www.w3.org/2001/10/synthesis\" xml:lang=\"zh-CN\">\
         <voice name=\"{}\"><prosody rate=\"{}\">{}</prosody></voice></speak>",
        voice.code(),
        escape(rate),
        escape(text)
    )
}

#[async_trait]
impl SpeechEngine for HttpSpeechEngine {
    async fn speak(&self, text: &str, voice: Voice, rate: &str) -> anyhow::Result<Vec<u8>> {
        let body = ssml(text, voice, rate);
        let res = self
            .client
            .post(&self.endpoint)
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .header("X-Microsoft-OutputFormat", &self.output_format)
            .header(reqwest::header::CONTENT_TYPE, "application/ssml+xml")
            .header(reqwest::header::USER_AGENT, "podcast-tts/0.1")
            .body(body)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        if res.is_empty() {
            anyhow::bail!("engine returned no audio for voice {}", voice.code());
        }
        Ok(res.to_vec())
    }
}

/// Audio persisted under the asset namespace.
#[derive(Debug, Clone, Serialize)]
pub struct SavedAudio {
    pub filename: String,
    pub url: String,
    pub file_size: u64,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// Validates requests, calls the engine and stores the result.
#[derive(Clone)]
pub struct Synthesizer {
    engine: Arc<dyn SpeechEngine>,
    assets: AudioAssets,
}

impl Synthesizer {
    pub fn new(engine: Arc<dyn SpeechEngine>, assets: AudioAssets) -> Self {
        Self { engine, assets }
    }

    pub async fn synthesize(&self, text: &str, voice: &str, rate: &str) -> Result<SavedAudio, SpeechError> {
        let voice: Voice = voice.parse()?;
        if text.trim().is_empty() {
            return Err(SpeechError::EmptyInput);
        }

        info!("Synthesizing {} chars with voice {} at rate {}", text.chars().count(), voice.id(), rate);
        let bytes = self.engine.speak(text, voice, rate).await.map_err(|e| {
            error!("Speech engine failed for voice {}: {:#}", voice.id(), e);
            SpeechError::SynthesisFailed(format!("{:#}", e))
        })?;

        let filename = self
            .assets
            .write(&bytes)
            .await
            .map_err(|e| SpeechError::SynthesisFailed(format!("could not store audio: {}", e)))?;
        info!("Saved synthesized audio {} ({} bytes)", filename, bytes.len());

        Ok(SavedAudio {
            url: public_path(&filename),
            file_size: bytes.len() as u64,
            filename,
            bytes,
        })
    }
}
