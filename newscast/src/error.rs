//! Error types for the aggregation pipeline and speech synthesis.

/// Failure to obtain headlines from a single feed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed responded with status {0}")]
    Status(u16),

    #[error("feed parse error: {0}")]
    Parse(String),
}

/// Failure of a whole aggregation cycle.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("no headlines from any of {feeds} feeds")]
    NoHeadlines { feeds: usize },

    #[error("aggregation task panicked: {0}")]
    Panicked(String),
}

/// Failure to turn text into audio.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("nothing to synthesize")]
    EmptyText,

    #[error("chunk {chunk} failed: {message}")]
    Backend { chunk: usize, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid audio payload: {0}")]
    Decode(String),
}
