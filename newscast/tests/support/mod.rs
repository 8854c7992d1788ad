#![allow(dead_code)]

use async_trait::async_trait;
use newscast::error::SynthesisError;
use newscast::ingestion::{HeadlineItem, HeadlineSource};
use newscast::tts::SpeechBackend;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn items(titles: &[&str]) -> Vec<HeadlineItem> {
    titles
        .iter()
        .map(|t| HeadlineItem {
            title: t.to_string(),
            link: None,
        })
        .collect()
}

/// What a scripted feed does when fetched.
#[derive(Clone)]
pub enum Script {
    Items { delay_ms: u64, titles: Vec<&'static str> },
    /// Broken feed: waits, then yields nothing (as FeedFetcher does on failure)
    Fail { delay_ms: u64 },
    Panic,
}

/// HeadlineSource answering from a fixed per-URL script.
pub struct ScriptedSource {
    scripts: HashMap<String, Script>,
}

impl ScriptedSource {
    pub fn new(scripts: Vec<(&str, Script)>) -> Self {
        Self {
            scripts: scripts.into_iter().map(|(u, s)| (u.to_string(), s)).collect(),
        }
    }
}

#[async_trait]
impl HeadlineSource for ScriptedSource {
    async fn fetch(&self, url: &str) -> Vec<HeadlineItem> {
        match self.scripts.get(url).cloned() {
            Some(Script::Items { delay_ms, titles }) => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                items(&titles)
            }
            Some(Script::Fail { delay_ms }) => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Vec::new()
            }
            Some(Script::Panic) => panic!("scripted source exploded"),
            None => Vec::new(),
        }
    }
}

/// HeadlineSource whose answer depends on how many times it was called.
/// Call `n` uses `rounds[n]` (the last entry repeats).
pub struct SequencedSource {
    rounds: Vec<Script>,
    calls: AtomicUsize,
}

impl SequencedSource {
    pub fn new(rounds: Vec<Script>) -> Self {
        Self {
            rounds,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HeadlineSource for SequencedSource {
    async fn fetch(&self, _url: &str) -> Vec<HeadlineItem> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let script = self.rounds[n.min(self.rounds.len() - 1)].clone();
        match script {
            Script::Items { delay_ms, titles } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                items(&titles)
            }
            Script::Fail { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Vec::new()
            }
            Script::Panic => panic!("sequenced source exploded"),
        }
    }
}

/// Speech backend returning `<chunk>` as audio bytes.
///
/// A chunk listed in `delays` sleeps that long; otherwise the k-th request
/// sleeps `(expected_calls - k) * step_ms`.
pub struct FakeBackend {
    pub max_input: usize,
    pub delays: HashMap<String, u64>,
    pub expected_calls: usize,
    pub step_ms: u64,
    pub fail_on: Option<&'static str>,
    pub hosted_url: Option<&'static str>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub completion_order: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new(max_input: usize) -> Self {
        Self {
            max_input,
            delays: HashMap::new(),
            expected_calls: 0,
            step_ms: 0,
            fail_on: None,
            hosted_url: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            completion_order: Mutex::new(Vec::new()),
        }
    }

    pub fn reversed(mut self, expected_calls: usize, step_ms: u64) -> Self {
        self.expected_calls = expected_calls;
        self.step_ms = step_ms;
        self
    }

    pub fn with_delay(mut self, chunk: &str, delay_ms: u64) -> Self {
        self.delays.insert(chunk.to_string(), delay_ms);
        self
    }

    pub fn failing_on(mut self, needle: &'static str) -> Self {
        self.fail_on = Some(needle);
        self
    }

    pub fn hosting(mut self, url: &'static str) -> Self {
        self.hosted_url = Some(url);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn audio_for(chunk: &str) -> Vec<u8> {
        format!("<{}>", chunk).into_bytes()
    }
}

#[async_trait]
impl SpeechBackend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn max_input_bytes(&self) -> usize {
        self.max_input
    }

    async fn synthesize_chunk(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        let k = self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self
            .delays
            .get(text)
            .copied()
            .unwrap_or_else(|| self.expected_calls.saturating_sub(k) as u64 * self.step_ms);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completion_order
            .lock()
            .expect("completion order lock")
            .push(text.to_string());

        if let Some(needle) = self.fail_on {
            if text.contains(needle) {
                return Err(SynthesisError::Status {
                    status: 503,
                    body: "backend unavailable".to_string(),
                });
            }
        }
        Ok(Self::audio_for(text))
    }

    fn audio_url(&self, text: &str) -> Option<String> {
        self.hosted_url.map(|base| format!("{}?q={}", base, text.len()))
    }
}
