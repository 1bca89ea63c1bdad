use std::time::Duration;

use async_trait::async_trait;
use chat_logging::chat_debug;
use chatvoice_core::PlaybackOutcome;
use chatvoice_engine::{PlaybackBackend, PlaybackError, SpeechRequest};
use chrono::Local;

/// Prints each utterance with a timestamp and holds it for a time
/// proportional to its length at the requested rate.
pub(crate) struct ConsolePlayback {
    per_char: Duration,
}

impl ConsolePlayback {
    pub fn new(speech: Duration) -> Self {
        Self {
            per_char: speech / 20,
        }
    }

    fn duration_for(&self, request: &SpeechRequest) -> Duration {
        let chars = request.text.chars().count().max(1) as u32;
        let rate = request.rate.max(0.1);
        self.per_char.mul_f32(chars as f32 / rate)
    }
}

#[async_trait]
impl PlaybackBackend for ConsolePlayback {
    async fn speak(&self, request: SpeechRequest) -> Result<PlaybackOutcome, PlaybackError> {
        println!(
            "[{}] {}",
            Local::now().format("%H:%M:%S%.3f"),
            request.text
        );
        tokio::time::sleep(self.duration_for(&request)).await;
        chat_debug!("Console speech {} done", request.request_id);
        Ok(PlaybackOutcome::Completed)
    }

    async fn cancel_all(&self) {}
}
