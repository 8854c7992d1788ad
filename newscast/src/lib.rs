// Library interface for newscast modules
// This allows tests and the diagnostic binaries to import modules

pub mod aggregator;
pub mod error;
pub mod ingestion;
pub mod server;
pub mod snapshot;
pub mod tts;
