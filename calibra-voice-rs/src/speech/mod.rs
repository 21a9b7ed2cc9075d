//! Speech output: the sink contract the narrator talks to.
//!
//! Components:
//! - `SpeechSink`: ordered, fire-and-forget utterance queue with cancel-all
//! - `LogSink`: writes utterances to the log (dry runs, speech disabled)
//! - `http`: client for a speech engine exposing `/status`, `/speak`, `/cancel`

pub mod http;

use thiserror::Error;
use tracing::{debug, info};

pub use http::HttpSpeechSink;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech queue is closed")]
    Closed,

    #[error("speech engine request failed")]
    Request(#[from] reqwest::Error),

    #[error("speech engine returned status {0}")]
    Status(reqwest::StatusCode),
}

/// Destination for utterances.
///
/// `enqueue` must not block on playback: it hands the text over and returns.
/// Utterances are played in the order they were enqueued.
pub trait SpeechSink: Send + Sync {
    fn enqueue(&self, text: &str) -> Result<(), SpeechError>;

    /// Drop everything queued and stop whatever is playing.
    fn cancel_all(&self);

    fn is_available(&self) -> bool {
        true
    }
}

pub struct LogSink;

impl SpeechSink for LogSink {
    fn enqueue(&self, text: &str) -> Result<(), SpeechError> {
        info!("Speak: {text}");
        Ok(())
    }

    fn cancel_all(&self) {
        debug!("Speech cancelled");
    }
}
