//! Follows a chat container that the page destroys and recreates.
//!
//! The controller observes the whole document. While waiting it looks for a
//! container matching the site's selector; once one appears a fresh monitor
//! (with its own queue) is started against that exact node. Removal of the
//! container, directly or through an ancestor, disposes the monitor and the
//! controller goes back to waiting.

use std::sync::Arc;

use chat_logging::{chat_debug, chat_warn};
use chatvoice_core::NotificationSink;
use ego_tree::NodeId;
use scraper::{ElementRef, Html};

use crate::dom::{is_inclusive_ancestor, lineage, select_connected, DocumentObserver, MutationRecord};
use crate::extract::{find_self_or_descendant, SiteSelectors};
use crate::monitor::{MessageMonitor, MonitorOptions};
use crate::playback::PlaybackBackend;
use crate::queue::SpeechQueueHandle;
use crate::store::SettingsStore;

/// Everything needed to start one monitor instance.
#[derive(Clone)]
pub struct MonitorFactory {
    pub selectors: Arc<SiteSelectors>,
    pub store: Arc<dyn SettingsStore>,
    pub playback: Arc<dyn PlaybackBackend>,
    pub notifier: Option<Arc<dyn NotificationSink>>,
    pub options: MonitorOptions,
}

impl MonitorFactory {
    /// Starts a monitor with a new speech queue. Must be called inside a tokio runtime.
    pub fn create(&self) -> MessageMonitor {
        let queue = SpeechQueueHandle::spawn(self.store.clone(), self.playback.clone());
        MessageMonitor::new(
            self.selectors.clone(),
            self.store.clone(),
            queue,
            self.notifier.clone(),
            self.options.clone(),
        )
    }
}

enum Watch {
    Waiting,
    Watching {
        container: NodeId,
        /// The container and its ancestors when it was found. Nodes are never
        /// re-parented, so removing any of these disconnects the container.
        lineage: Vec<NodeId>,
        monitor: MessageMonitor,
    },
}

pub struct ContainerLifecycle {
    factory: MonitorFactory,
    state: Watch,
    instances: u64,
}

impl ContainerLifecycle {
    pub fn new(factory: MonitorFactory) -> Self {
        Self {
            factory,
            state: Watch::Waiting,
            instances: 0,
        }
    }

    /// Attaches to a container that is already in the document.
    pub fn start(&mut self, html: &Html) {
        let Some(selector) = self.factory.selectors.container.as_ref() else {
            chat_warn!("No container selector for {}", self.factory.selectors.config.name);
            return;
        };
        let found = select_connected(html, selector).next().map(|el| el.id());
        if let Some(container) = found {
            self.watch(html, container);
        }
    }

    pub fn instances(&self) -> u64 {
        self.instances
    }

    fn watch(&mut self, html: &Html, container: NodeId) {
        self.instances += 1;
        chat_debug!("Chat container found, starting monitor #{}", self.instances);
        let monitor = self.factory.create();
        self.state = Watch::Watching {
            container,
            lineage: lineage(&html.tree, container),
            monitor,
        };
    }

    fn release(&mut self) {
        if let Watch::Watching { mut monitor, .. } = std::mem::replace(&mut self.state, Watch::Waiting) {
            chat_debug!("Chat container removed, disposing monitor #{}", self.instances);
            monitor.dispose();
        }
    }

    fn find_new_container(&self, html: &Html, record: &MutationRecord) -> Option<NodeId> {
        let selector = self.factory.selectors.container.as_ref()?;
        let root = html.tree.root().id();
        record
            .added
            .iter()
            .filter_map(|id| html.tree.get(*id).and_then(ElementRef::wrap))
            .filter_map(|element| find_self_or_descendant(element, selector))
            .map(|container| container.id())
            .find(|id| is_inclusive_ancestor(&html.tree, root, *id))
    }
}

fn removes(record: &MutationRecord, container_lineage: &[NodeId]) -> bool {
    record
        .removed
        .iter()
        .any(|removed| container_lineage.contains(removed))
}

impl DocumentObserver for ContainerLifecycle {
    fn on_mutations(&mut self, html: &Html, records: &[MutationRecord]) {
        let mut index = 0;
        while index < records.len() {
            match &mut self.state {
                Watch::Watching {
                    container,
                    lineage,
                    monitor,
                } => {
                    let container = *container;
                    let start = index;
                    while index < records.len() && !removes(&records[index], lineage) {
                        index += 1;
                    }
                    let own: Vec<MutationRecord> = records[start..index]
                        .iter()
                        .filter(|r| r.target == container)
                        .cloned()
                        .collect();
                    if !own.is_empty() {
                        monitor.process(html, &own);
                    }
                    if index < records.len() {
                        self.release();
                        index += 1;
                    }
                }
                Watch::Waiting => {
                    let found = self.find_new_container(html, &records[index]);
                    index += 1;
                    if let Some(container) = found {
                        self.watch(html, container);
                        // Changes already in this batch predate the new monitor.
                        return;
                    }
                }
            }
        }
    }

    fn disconnect(&mut self) {
        self.release();
    }
}
