use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use cohost_core::cfg::SpeechCfg;
use cohost_core::error::SpeechError;

use super::SpeechService;

/// Speech service that synthesizes, uploads and answers with the audio URL.
pub struct HttpSpeech {
    client: Client,
    url: String,
    voice: String,
}

/// Used when no speech endpoint is configured; every call fails with [`SpeechError::Disabled`].
pub struct NoSpeech;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_url: Option<String>,
}

impl HttpSpeech {
    pub fn new(base_url: &str, cfg: &SpeechCfg) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/synthesize", base_url.trim_end_matches('/')),
            voice: cfg.voice.clone(),
        })
    }
}

#[async_trait]
impl SpeechService for HttpSpeech {
    async fn synthesize(&self, text: &str) -> Result<String, SpeechError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&json!({ "text": text, "voice": self.voice }))
            .send()
            .await
            .map_err(|e| SpeechError::Request { reason: e.to_string() })?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SpeechError::Status { status: status.as_u16(), message });
        }
        let body: SynthesizeResponse = resp
            .json()
            .await
            .map_err(|e| SpeechError::Request { reason: e.to_string() })?;
        body.audio_url.filter(|u| !u.is_empty()).ok_or(SpeechError::MissingUrl)
    }
}

#[async_trait]
impl SpeechService for NoSpeech {
    async fn synthesize(&self, _text: &str) -> Result<String, SpeechError> {
        Err(SpeechError::Disabled)
    }
}
