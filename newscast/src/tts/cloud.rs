use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::SpeechBackend;
use crate::error::SynthesisError;

pub const DEFAULT_API_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

/// Input limit of `text:synthesize`, in bytes.
pub const MAX_INPUT_BYTES: usize = 5000;

/// Google Cloud Text-to-Speech REST backend, requesting MP3 output.
pub struct CloudTts {
    api_url: String,
    api_key: String,
    language: String,
    voice_name: Option<String>,
    speaking_rate: f32,
    client: reqwest::Client,
}

impl CloudTts {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        language: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            language: language.into(),
            voice_name: None,
            speaking_rate: 1.0,
            client,
        })
    }

    pub fn with_voice(mut self, voice_name: Option<String>) -> Self {
        self.voice_name = voice_name;
        self
    }

    pub fn with_slow(mut self, slow: bool) -> Self {
        self.speaking_rate = if slow { 0.75 } else { 1.0 };
        self
    }
}

#[async_trait]
impl SpeechBackend for CloudTts {
    fn name(&self) -> &'static str {
        "google-cloud"
    }

    fn max_input_bytes(&self) -> usize {
        MAX_INPUT_BYTES
    }

    async fn synthesize_chunk(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        let req_body = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: &self.language,
                name: self.voice_name.as_deref(),
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
                speaking_rate: self.speaking_rate,
            },
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("X-Goog-Api-Key", self.api_key.as_str())
            .json(&req_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let resp_body: SynthesizeResponse = response.json().await?;
        let audio = base64::engine::general_purpose::STANDARD
            .decode(resp_body.audio_content.as_bytes())
            .map_err(|e| SynthesisError::Decode(e.to_string()))?;
        if audio.is_empty() {
            return Err(SynthesisError::Decode("empty audioContent".to_string()));
        }
        Ok(audio)
    }
}

// text:synthesize request/response structures
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
    speaking_rate: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}
