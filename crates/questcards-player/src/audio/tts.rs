//! Remote text-to-speech
//!
//! Two backends produce the same thing, MPEG audio for one line of text:
//!   ElevenLabs — direct call to `/text-to-speech/{voice_id}` with the API key
//!   Proxy      — `POST {url} {"text": …}`, the key stays on the server
//!
//! Missing credentials disable the client; every request then reports
//! `NotConfigured` and the narration queue uses the local voice.

use std::time::Duration;

use reqwest::header::ACCEPT;
use serde_json::json;

use questcards_common::{NarrationConfig, ProviderKind};
use questcards_engine::narration::{NarrationError, NarrationProvider};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Backend {
    ElevenLabs {
        url: String,
        api_key: String,
        model_id: String,
    },
    Proxy {
        url: String,
    },
    Disabled,
}

pub struct TtsClient {
    client: reqwest::Client,
    backend: Backend,
    timeout: Duration,
}

impl TtsClient {
    pub fn from_config(config: &NarrationConfig) -> Self {
        let backend = match config.provider {
            ProviderKind::ElevenLabs => match config.credentials() {
                Some((voice_id, api_key)) => Backend::ElevenLabs {
                    url: format!(
                        "{}/text-to-speech/{}",
                        config.api_base.trim_end_matches('/'),
                        voice_id
                    ),
                    api_key: api_key.to_string(),
                    model_id: config.model_id.clone(),
                },
                None => {
                    tracing::warn!("VOICE_ID / ELEVENLABS_API_KEY missing, narration uses the local voice");
                    Backend::Disabled
                }
            },
            ProviderKind::Proxy => match config.proxy_url.as_deref().filter(|u| !u.trim().is_empty()) {
                Some(url) => Backend::Proxy { url: url.to_string() },
                None => {
                    tracing::warn!("Proxy provider selected without proxy_url, narration uses the local voice");
                    Backend::Disabled
                }
            },
            ProviderKind::None => Backend::Disabled,
        };
        tracing::info!("Narration provider: {}", backend.name());
        Self {
            client: reqwest::Client::new(),
            backend,
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Local voice only (`--mute`)
    pub fn disabled() -> Self {
        Self {
            client: reqwest::Client::new(),
            backend: Backend::Disabled,
            timeout: Duration::ZERO,
        }
    }
}

impl Backend {
    fn name(&self) -> &'static str {
        match self {
            Backend::ElevenLabs { .. } => "elevenlabs",
            Backend::Proxy { .. } => "proxy",
            Backend::Disabled => "none",
        }
    }
}

impl NarrationProvider for TtsClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, NarrationError> {
        let request = match &self.backend {
            Backend::Disabled => return Err(NarrationError::NotConfigured),
            Backend::ElevenLabs {
                url,
                api_key,
                model_id,
            } => self
                .client
                .post(url)
                .header("xi-api-key", api_key)
                .header(ACCEPT, "audio/mpeg")
                .json(&json!({ "text": text, "model_id": model_id })),
            Backend::Proxy { url } => self.client.post(url).json(&json!({ "text": text })),
        };

        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| NarrationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NarrationError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let audio = response
            .bytes()
            .await
            .map_err(|e| NarrationError::Transport(e.to_string()))?;
        tracing::debug!("TTS: {} bytes for {} chars", audio.len(), text.len());
        Ok(audio.to_vec())
    }
}
