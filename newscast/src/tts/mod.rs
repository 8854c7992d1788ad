use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::SynthesisError;

pub mod cloud;
pub mod translate;

/// Text-to-speech provider producing MP3 audio for short texts.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Short identifier used in logs and the status endpoint
    fn name(&self) -> &'static str;

    /// Largest input, in UTF-8 bytes, accepted by a single request
    fn max_input_bytes(&self) -> usize;

    /// Synthesize one chunk of text
    async fn synthesize_chunk(&self, text: &str) -> Result<Vec<u8>, SynthesisError>;

    /// Backend-hosted URL that plays `text`, if the provider offers one
    fn audio_url(&self, _text: &str) -> Option<String> {
        None
    }
}

/// Result of [`SpeechSynthesizer::render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutput {
    Redirect(String),
    Audio(Vec<u8>),
}

/// Audio of the most recently rendered text.
struct CachedAudio {
    text: String,
    audio: Vec<u8>,
}

/// Splits text into backend-sized chunks and stitches the audio back together.
///
/// Clones share one render cache, so repeated requests for unchanged text
/// reuse the last stitched audio instead of calling the backend again.
#[derive(Clone)]
pub struct SpeechSynthesizer {
    backend: Arc<dyn SpeechBackend>,
    max_chunk_bytes: usize,
    concurrency: usize,
    redirect: bool,
    last_render: Arc<Mutex<Option<CachedAudio>>>,
}

impl SpeechSynthesizer {
    pub fn new(backend: Arc<dyn SpeechBackend>, max_chunk_bytes: usize, concurrency: usize) -> Self {
        Self {
            backend,
            max_chunk_bytes,
            concurrency: concurrency.max(1),
            redirect: false,
            last_render: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_redirect(mut self, redirect: bool) -> Self {
        self.redirect = redirect;
        self
    }

    pub fn from_config(config: &common::TtsConfig, backend: Arc<dyn SpeechBackend>) -> Self {
        Self::new(backend, config.max_chunk_bytes, config.concurrency).with_redirect(config.redirect)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Effective chunk size: the configured budget, capped by the backend limit.
    pub fn chunk_budget(&self) -> usize {
        self.max_chunk_bytes.min(self.backend.max_input_bytes())
    }

    /// Synthesize `text` into one contiguous audio buffer.
    ///
    /// Chunks are requested concurrently (up to `concurrency` at a time) but
    /// collected positionally, so the output is always chunk 0, chunk 1, ...
    /// Any failed chunk fails the whole call.
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        let chunks = split_into_chunks(text, self.chunk_budget());
        if chunks.is_empty() {
            return Err(SynthesisError::EmptyText);
        }
        debug!(
            backend = self.backend.name(),
            chunks = chunks.len(),
            bytes = text.len(),
            "synthesizing speech"
        );

        let backend = &self.backend;
        let owned: Vec<String> = chunks.into_iter().map(str::to_owned).collect();
        let parts: Vec<Vec<u8>> = stream::iter(owned.into_iter().enumerate())
            .map(|(idx, chunk): (usize, String)| async move {
                backend
                    .synthesize_chunk(&chunk)
                    .await
                    .map_err(|e| SynthesisError::Backend {
                        chunk: idx,
                        message: e.to_string(),
                    })
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let total = parts.iter().map(Vec::len).sum();
        let mut audio = Vec::with_capacity(total);
        for part in parts {
            audio.extend_from_slice(&part);
        }
        Ok(audio)
    }

    /// Produce either a redirect to hosted audio or the stitched audio bytes.
    ///
    /// Redirects are only used when enabled and the whole text fits in a
    /// single backend request; everything else goes through [`Self::synthesize`].
    /// Stitched audio is cached for the last text only, and failures are not
    /// cached. Concurrent renders wait for the one in progress.
    pub async fn render(&self, text: &str) -> Result<SpeechOutput, SynthesisError> {
        let trimmed = text.trim();
        if self.redirect && !trimmed.is_empty() && trimmed.len() <= self.backend.max_input_bytes() {
            if let Some(url) = self.backend.audio_url(trimmed) {
                return Ok(SpeechOutput::Redirect(url));
            }
        }

        let mut last = self.last_render.lock().await;
        if let Some(cached) = last.as_ref().filter(|c| c.text == text) {
            debug!(bytes = cached.audio.len(), "reusing cached speech audio");
            return Ok(SpeechOutput::Audio(cached.audio.clone()));
        }
        let audio = self.synthesize(text).await?;
        *last = Some(CachedAudio {
            text: text.to_string(),
            audio: audio.clone(),
        });
        Ok(SpeechOutput::Audio(audio))
    }
}

/// Build the configured speech backend.
pub fn build_backend(config: &common::TtsConfig) -> Result<Arc<dyn SpeechBackend>> {
    let timeout = Duration::from_secs(config.timeout_seconds);
    match config.backend.as_str() {
        "google-translate" => {
            let backend = translate::GoogleTranslateTts::new(&config.host, &config.language, config.slow, timeout)?;
            Ok(Arc::new(backend))
        }
        "google-cloud" => {
            let api_key_env = config
                .api_key_env
                .as_deref()
                .context("Missing tts.api_key_env for google-cloud backend")?;
            let api_key = std::env::var(api_key_env)
                .with_context(|| format!("TTS API key env var '{}' not set", api_key_env))?;
            let api_url = config
                .api_url
                .clone()
                .unwrap_or_else(|| cloud::DEFAULT_API_URL.to_string());
            let backend = cloud::CloudTts::new(api_url, api_key, &config.language, timeout)?
                .with_voice(config.voice_name.clone())
                .with_slow(config.slow);
            Ok(Arc::new(backend))
        }
        other => anyhow::bail!("Unknown TTS backend: {}", other),
    }
}

/// Split `text` into chunks of at most `max_bytes` UTF-8 bytes.
///
/// Chunks are subslices of `text` cut at whitespace: words are accumulated
/// greedily and the whitespace between two chunks belongs to neither. A
/// single word longer than `max_bytes` is cut at character boundaries.
///
/// A character is never split, so with a budget below 4 bytes a wide
/// character still forms its own chunk; `Config::validate` rejects such
/// budgets for this reason.
pub fn split_into_chunks(text: &str, max_bytes: usize) -> Vec<&str> {
    let max_bytes = max_bytes.max(1);
    let mut chunks = Vec::new();
    // Byte range of the chunk being built
    let mut current: Option<(usize, usize)> = None;

    for (start, end) in word_spans(text) {
        if let Some((chunk_start, _)) = current {
            if end - chunk_start <= max_bytes {
                current = Some((chunk_start, end));
                continue;
            }
        }
        if let Some((s, e)) = current.take() {
            chunks.push(&text[s..e]);
        }

        if end - start <= max_bytes {
            current = Some((start, end));
        } else {
            let mut pieces = split_long_word(text, start, end, max_bytes);
            // The tail stays open so following words can join it
            current = pieces.pop();
            chunks.extend(pieces.into_iter().map(|(s, e)| &text[s..e]));
        }
    }

    if let Some((s, e)) = current {
        chunks.push(&text[s..e]);
    }
    chunks
}

fn word_spans(text: &str) -> impl Iterator<Item = (usize, usize)> + '_ {
    let base = text.as_ptr() as usize;
    text.split_whitespace().map(move |word| {
        let start = word.as_ptr() as usize - base;
        (start, start + word.len())
    })
}

/// Cut `text[start..end]` into pieces of at most `max_bytes`, on char boundaries.
fn split_long_word(text: &str, start: usize, end: usize, max_bytes: usize) -> Vec<(usize, usize)> {
    let mut pieces = Vec::new();
    let mut piece_start = start;
    for (offset, ch) in text[start..end].char_indices() {
        let idx = start + offset;
        let next = idx + ch.len_utf8();
        // A lone char wider than the budget still forms its own piece
        if next - piece_start > max_bytes && idx > piece_start {
            pieces.push((piece_start, idx));
            piece_start = idx;
        }
    }
    pieces.push((piece_start, end));
    pieces
}
