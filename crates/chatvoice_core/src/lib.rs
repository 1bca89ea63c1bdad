//! Chatvoice core: filter engine, template formatting, site registry and the
//! pure speech-queue state machine.
mod effect;
mod fields;
mod filter;
mod filter_store;
mod message;
mod msg;
mod settings;
mod site_config;
mod state;
mod template;
mod update;

pub use effect::Effect;
pub use fields::ExtractedFields;
pub use filter::{
    apply_text_filters, build_matcher, validate_regex, Command, CommandOptions, CommandRule,
    FilterContext, FilterId, FilterOutcome, FilterRule, FilterTarget, Notification,
    NotificationSink, PatternRule, TextFilter,
};
pub use filter_store::{FilterCollection, FilterStoreError, FilterUpdate, NewFilter};
pub use message::{compose_message, ComposedMessage, Rejection};
pub use msg::{PlaybackOutcome, QueueMsg};
pub use settings::{
    ExtensionEnabled, SpeechTemplate, StoredValue, TtsRate, TtsVoice, TtsVolume, MAX_RATE,
    MIN_RATE,
};
pub use site_config::{
    find_in, find_site_config_by_url, is_test_page, FieldExtractor, SiteConfig, SITE_CONFIGS,
};
pub use state::{QueueState, RequestId};
pub use template::{canonical_key, format_text, normalize_whitespace, DEFAULT_SPEECH_TEMPLATE};
pub use update::update;
