use std::sync::{Arc, Mutex};
use std::time::Duration;

use chat_logging::chat_debug;
use chatvoice_core::PlaybackOutcome;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("playback backend error: {0}")]
    Backend(String),
    #[error("playback backend unavailable")]
    Unavailable,
}

/// Everything the synthesizer needs for one utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice_uri: Option<String>,
    pub rate: f32,
    pub volume: f32,
    /// Unique per call; the backend echoes it in its logs.
    pub request_id: String,
}

/// External voice synthesis. `speak` resolves once per request with the
/// terminal event; `cancel_all` makes any outstanding `speak` resolve as
/// cancelled.
#[async_trait::async_trait]
pub trait PlaybackBackend: Send + Sync {
    async fn speak(&self, request: SpeechRequest) -> Result<PlaybackOutcome, PlaybackError>;

    async fn cancel_all(&self);
}

/// Stand-in synthesizer: every utterance takes a fixed time unless cancelled.
pub struct SimulatedPlayback {
    duration: Duration,
    cancel: Mutex<CancellationToken>,
    spoken: Mutex<Vec<SpeechRequest>>,
}

impl SimulatedPlayback {
    pub fn new(duration: Duration) -> Arc<Self> {
        Arc::new(Self {
            duration,
            cancel: Mutex::new(CancellationToken::new()),
            spoken: Mutex::new(Vec::new()),
        })
    }

    /// Requests that started playback, in order.
    pub fn spoken(&self) -> Vec<SpeechRequest> {
        self.spoken.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn current_token(&self) -> CancellationToken {
        match self.cancel.lock() {
            Ok(token) => token.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait::async_trait]
impl PlaybackBackend for SimulatedPlayback {
    async fn speak(&self, request: SpeechRequest) -> Result<PlaybackOutcome, PlaybackError> {
        let token = self.current_token();
        chat_debug!("Speaking [{}]: \"{}\"", request.request_id, request.text);
        let text = request.text.clone();
        if let Ok(mut spoken) = self.spoken.lock() {
            spoken.push(request);
        }

        tokio::select! {
            _ = token.cancelled() => Ok(PlaybackOutcome::Cancelled),
            _ = tokio::time::sleep(self.duration) => {
                chat_debug!("Finished speech: \"{}\"", text);
                Ok(PlaybackOutcome::Completed)
            }
        }
    }

    async fn cancel_all(&self) {
        let previous = match self.cancel.lock() {
            Ok(mut token) => std::mem::replace(&mut *token, CancellationToken::new()),
            Err(_) => return,
        };
        previous.cancel();
    }
}
