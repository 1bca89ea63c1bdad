//! Turns child-list mutation batches into spoken messages.

use std::sync::Arc;
use std::time::Duration;

use chat_logging::{chat_debug, set_site_context};
use chatvoice_core::{compose_message, FilterCollection, NotificationSink, SpeechTemplate};
use scraper::{ElementRef, Html};
use tokio::time::Instant;

use crate::dom::{DocumentObserver, MutationRecord};
use crate::extract::{find_self_or_descendant, matching_inclusive, SiteSelectors};
use crate::queue::SpeechQueueHandle;
use crate::store::{SettingsCache, SettingsStore};

pub const DEFAULT_LOAD_SETTLE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorOptions {
    /// Messages whose raw `name` field is listed here are never spoken.
    pub ignore_names: Vec<String>,
    /// Quiet period after the load marker appears.
    pub load_settle_delay: Duration,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            ignore_names: Vec::new(),
            load_settle_delay: DEFAULT_LOAD_SETTLE_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    AwaitingLoad,
    Settling { ready_at: Instant },
    Active,
}

pub struct MessageMonitor {
    selectors: Arc<SiteSelectors>,
    filters: SettingsCache<FilterCollection>,
    template: SettingsCache<SpeechTemplate>,
    notifier: Option<Arc<dyn NotificationSink>>,
    queue: SpeechQueueHandle,
    options: MonitorOptions,
    phase: MonitorPhase,
    last_key: Option<String>,
    disposed: bool,
}

impl MessageMonitor {
    pub fn new(
        selectors: Arc<SiteSelectors>,
        store: Arc<dyn SettingsStore>,
        queue: SpeechQueueHandle,
        notifier: Option<Arc<dyn NotificationSink>>,
        options: MonitorOptions,
    ) -> Self {
        let phase = if selectors.load_detection.is_some() {
            MonitorPhase::AwaitingLoad
        } else {
            MonitorPhase::Active
        };
        chat_debug!("{} monitoring started.", selectors.config.name);
        Self {
            filters: SettingsCache::new(store.clone()),
            template: SettingsCache::new(store),
            selectors,
            notifier,
            queue,
            options,
            phase,
            last_key: None,
            disposed: false,
        }
    }

    pub fn phase(&self) -> MonitorPhase {
        self.phase
    }

    pub fn queue(&self) -> &SpeechQueueHandle {
        &self.queue
    }

    /// Handles one batch; returns the texts that were enqueued, in order.
    pub fn process(&mut self, html: &Html, records: &[MutationRecord]) -> Vec<String> {
        if self.disposed {
            return Vec::new();
        }
        set_site_context(Some(self.selectors.config.id));
        let mut accepted = Vec::new();

        if let MonitorPhase::Settling { ready_at } = self.phase {
            if Instant::now() >= ready_at {
                chat_debug!("Load settle period over, speaking new messages");
                self.phase = MonitorPhase::Active;
            }
        }

        for record in records {
            for id in &record.added {
                let Some(element) = html.tree.get(*id).and_then(ElementRef::wrap) else {
                    continue;
                };
                match self.phase {
                    MonitorPhase::AwaitingLoad => {
                        if self.is_load_marker(element) {
                            chat_debug!("Chat loaded, starting message detection after settle delay");
                            self.phase = MonitorPhase::Settling {
                                ready_at: Instant::now() + self.options.load_settle_delay,
                            };
                            break;
                        }
                    }
                    MonitorPhase::Settling { .. } => {}
                    MonitorPhase::Active => {
                        for message in self.message_elements(element) {
                            if let Some(text) = self.handle_message(message) {
                                accepted.push(text);
                            }
                        }
                    }
                }
            }
        }

        set_site_context(None);
        accepted
    }

    fn is_load_marker(&self, element: ElementRef<'_>) -> bool {
        self.selectors
            .load_detection
            .as_ref()
            .is_some_and(|selector| find_self_or_descendant(element, selector).is_some())
    }

    /// The element itself and every message below it, in document order.
    fn message_elements<'a>(&self, element: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        matching_inclusive(element, &self.selectors.message)
    }

    fn handle_message(&mut self, element: ElementRef<'_>) -> Option<String> {
        let fields = self.selectors.extract_fields(element);
        let filters = self.filters.get();
        let template = self.template.get();

        let message = match compose_message(
            fields,
            &filters,
            template.effective(),
            self.notifier.as_deref(),
        ) {
            Ok(message) => message,
            Err(reason) => {
                chat_debug!("Dropped message: {}", reason);
                return None;
            }
        };

        let name = message.fields.get("name").unwrap_or_default();
        if self.options.ignore_names.iter().any(|ignored| ignored == name) {
            chat_debug!("Skipping message from user: {}", name);
            return None;
        }

        if self.last_key.as_deref() == Some(message.key.as_str()) {
            chat_debug!("Dropped duplicate message: \"{}\"", message.key);
            return None;
        }
        self.last_key = Some(message.key);

        self.queue.enqueue(message.text.clone());
        Some(message.text)
    }

    /// Stops processing, clears the queue and cancels the active utterance.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.queue.dispose();
        chat_debug!("{} monitoring stopped.", self.selectors.config.name);
    }
}

impl Drop for MessageMonitor {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Observer wrapper for platforms with a stable chat root.
pub struct MonitorObserver {
    monitor: MessageMonitor,
}

impl MonitorObserver {
    pub fn new(monitor: MessageMonitor) -> Self {
        Self { monitor }
    }
}

impl DocumentObserver for MonitorObserver {
    fn on_mutations(&mut self, html: &Html, records: &[MutationRecord]) {
        self.monitor.process(html, records);
    }

    fn disconnect(&mut self) {
        self.monitor.dispose();
    }
}
