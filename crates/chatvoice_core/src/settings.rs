use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::template::DEFAULT_SPEECH_TEMPLATE;
use crate::FilterCollection;

pub const MIN_RATE: f32 = 0.1;
pub const MAX_RATE: f32 = 10.0;

/// A value persisted under a fixed key in the settings store.
pub trait StoredValue: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    const KEY: &'static str;
}

impl StoredValue for FilterCollection {
    const KEY: &'static str = "text-filter-key";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionEnabled {
    pub enabled: bool,
}

impl Default for ExtensionEnabled {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl ExtensionEnabled {
    pub fn toggled(self) -> Self {
        Self {
            enabled: !self.enabled,
        }
    }
}

impl StoredValue for ExtensionEnabled {
    const KEY: &'static str = "extension-enabled-key";
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpeechTemplate {
    pub template: Option<String>,
}

impl SpeechTemplate {
    /// The stored template, or the default when none is set.
    pub fn effective(&self) -> &str {
        self.template
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_SPEECH_TEMPLATE)
    }
}

impl StoredValue for SpeechTemplate {
    const KEY: &'static str = "speech-template-key";
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TtsRate {
    pub rate: f32,
}

impl TtsRate {
    pub fn new(rate: f32) -> Self {
        Self {
            rate: rate.clamp(MIN_RATE, MAX_RATE),
        }
    }
}

impl Default for TtsRate {
    fn default() -> Self {
        Self { rate: 1.0 }
    }
}

impl StoredValue for TtsRate {
    const KEY: &'static str = "tts-rate-key";
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TtsVolume {
    pub volume: f32,
}

impl TtsVolume {
    pub fn new(volume: f32) -> Self {
        Self {
            volume: volume.clamp(0.0, 1.0),
        }
    }
}

impl Default for TtsVolume {
    fn default() -> Self {
        Self { volume: 1.0 }
    }
}

impl StoredValue for TtsVolume {
    const KEY: &'static str = "tts-volume-key";
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TtsVoice {
    pub uri: Option<String>,
}

impl StoredValue for TtsVoice {
    const KEY: &'static str = "tts-voice-engine-key";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_and_volume_are_clamped() {
        assert_eq!(TtsRate::new(50.0).rate, MAX_RATE);
        assert_eq!(TtsRate::new(0.0).rate, MIN_RATE);
        assert_eq!(TtsVolume::new(1.5).volume, 1.0);
        assert_eq!(TtsVolume::new(-1.0).volume, 0.0);
    }

    #[test]
    fn empty_template_falls_back_to_default() {
        assert_eq!(SpeechTemplate::default().effective(), DEFAULT_SPEECH_TEMPLATE);
        let blank = SpeechTemplate {
            template: Some(String::new()),
        };
        assert_eq!(blank.effective(), DEFAULT_SPEECH_TEMPLATE);
        let custom = SpeechTemplate {
            template: Some("%(body)".into()),
        };
        assert_eq!(custom.effective(), "%(body)");
    }

    #[test]
    fn enabled_defaults_on() {
        assert!(ExtensionEnabled::default().enabled);
        assert!(!ExtensionEnabled::default().toggled().enabled);
    }
}
