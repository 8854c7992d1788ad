use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use super::SpeechBackend;
use crate::error::SynthesisError;

/// Longest text the translate_tts endpoint accepts per request.
pub const MAX_INPUT_BYTES: usize = 200;

/// Keyless Google Translate speech endpoint, returning MP3.
pub struct GoogleTranslateTts {
    host: String,
    language: String,
    slow: bool,
    client: Client,
}

impl GoogleTranslateTts {
    pub fn new(host: impl Into<String>, language: impl Into<String>, slow: bool, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self {
            host: host.into(),
            language: language.into(),
            slow,
            client,
        })
    }

    /// URL that streams `text` as MP3.
    pub fn request_url(&self, text: &str) -> Result<Url, url::ParseError> {
        let endpoint = format!("{}/translate_tts", self.host.trim_end_matches('/'));
        let textlen = text.chars().count().to_string();
        let speed = if self.slow { "0.24" } else { "1" };
        Url::parse_with_params(
            &endpoint,
            &[
                ("ie", "UTF-8"),
                ("q", text),
                ("tl", self.language.as_str()),
                ("total", "1"),
                ("idx", "0"),
                ("textlen", textlen.as_str()),
                ("client", "tw-ob"),
                ("prev", "input"),
                ("ttsspeed", speed),
            ],
        )
    }
}

#[async_trait]
impl SpeechBackend for GoogleTranslateTts {
    fn name(&self) -> &'static str {
        "google-translate"
    }

    fn max_input_bytes(&self) -> usize {
        MAX_INPUT_BYTES
    }

    async fn synthesize_chunk(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        let url = self
            .request_url(text)
            .map_err(|e| SynthesisError::Decode(format!("invalid TTS host: {}", e)))?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(SynthesisError::Decode("empty audio response".to_string()));
        }
        Ok(audio.to_vec())
    }

    fn audio_url(&self, text: &str) -> Option<String> {
        self.request_url(text).ok().map(String::from)
    }
}
