//! Chatvoice engine: live document, monitors, speech queue runtime and settings IO.
mod decode;
mod dom;
mod extract;
mod filters;
mod harness;
mod lifecycle;
mod monitor;
mod notify;
mod persist;
mod pipeline;
mod playback;
mod queue;
mod store;
mod viewer;

pub use decode::{decode_page, DecodeError, DecodedPage};
pub use dom::{
    is_inclusive_ancestor, lineage, parse_selector, select_connected, DocumentObserver, DomError,
    LiveDocument, MutationRecord, ObserveOptions, ObserverId, SelectorError,
};
pub use extract::{find_self_or_descendant, matching_inclusive, SiteSelectors};
pub use filters::FilterRepository;
pub use harness::{ChatTestPage, CHAT_TEST_URL, MAX_MESSAGE_COUNT};
pub use lifecycle::{ContainerLifecycle, MonitorFactory};
pub use monitor::{
    MessageMonitor, MonitorObserver, MonitorOptions, MonitorPhase, DEFAULT_LOAD_SETTLE_DELAY,
};
pub use notify::{LogNotificationBackend, NotificationBackend, NotificationRequest, Notifier, NotifyError};
pub use persist::{
    ensure_dir, AtomicFileWriter, DebouncedWriter, PersistError, PersistentStore,
    DEFAULT_WRITE_WINDOW,
};
pub use pipeline::{attach, attach_site, PipelineDeps};
pub use playback::{PlaybackBackend, PlaybackError, SimulatedPlayback, SpeechRequest};
pub use queue::SpeechQueueHandle;
pub use store::{
    load, save, set_enabled, set_rate, set_speech_template, set_voice, set_volume,
    subscribe_typed, toggle_enabled, Listener, MemoryStore, SettingsCache, SettingsStore,
    StoreError, SubscriptionId,
};
pub use viewer::detect_viewer_name;

pub use ego_tree::NodeId;
