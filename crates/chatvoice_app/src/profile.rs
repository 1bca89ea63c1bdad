use std::fs;
use std::path::Path;
use std::time::Duration;

use chat_logging::{chat_error, chat_info, chat_warn};
use chatvoice_engine::{AtomicFileWriter, CHAT_TEST_URL, MAX_MESSAGE_COUNT};
use serde::{Deserialize, Serialize};

/// Timing and page parameters for a transcript replay, stored as RON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct ReplayProfile {
    pub url: String,
    pub speech_millis: u64,
    pub interval_millis: u64,
    pub max_messages: usize,
    /// Time left for the queue to drain after the last line.
    pub linger_millis: u64,
}

impl Default for ReplayProfile {
    fn default() -> Self {
        Self {
            url: CHAT_TEST_URL.to_string(),
            speech_millis: 400,
            interval_millis: 250,
            max_messages: MAX_MESSAGE_COUNT,
            linger_millis: 2_000,
        }
    }
}

impl ReplayProfile {
    pub fn speech_duration(&self) -> Duration {
        Duration::from_millis(self.speech_millis)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_millis)
    }

    pub fn linger(&self) -> Duration {
        Duration::from_millis(self.linger_millis)
    }
}

pub(crate) fn load_profile(path: &Path) -> ReplayProfile {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return ReplayProfile::default();
        }
        Err(err) => {
            chat_warn!("Failed to read replay profile from {:?}: {}", path, err);
            return ReplayProfile::default();
        }
    };

    match ron::from_str(&content) {
        Ok(profile) => {
            chat_info!("Loaded replay profile from {:?}", path);
            profile
        }
        Err(err) => {
            chat_warn!("Failed to parse replay profile from {:?}: {}", path, err);
            ReplayProfile::default()
        }
    }
}

pub(crate) fn save_profile(path: &Path, profile: &ReplayProfile) {
    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(profile, pretty) {
        Ok(text) => text,
        Err(err) => {
            chat_error!("Failed to serialize replay profile: {}", err);
            return;
        }
    };

    let writer = AtomicFileWriter::new(path.to_path_buf());
    if let Err(err) = writer.write(&content) {
        chat_error!("Failed to write replay profile to {:?}: {}", path, err);
    }
}
