use std::sync::Arc;

use chat_logging::{chat_debug, chat_info};
use chatvoice_core::{find_site_config_by_url, NotificationSink, SiteConfig};

use crate::dom::{DomError, LiveDocument, ObserveOptions, ObserverId};
use crate::extract::SiteSelectors;
use crate::lifecycle::{ContainerLifecycle, MonitorFactory};
use crate::monitor::{MonitorObserver, MonitorOptions};
use crate::notify::{NotificationBackend, Notifier};
use crate::playback::PlaybackBackend;
use crate::store::SettingsStore;
use crate::viewer::detect_viewer_name;

/// Collaborators shared by every monitor of one page.
#[derive(Clone)]
pub struct PipelineDeps {
    pub store: Arc<dyn SettingsStore>,
    pub playback: Arc<dyn PlaybackBackend>,
    pub notifications: Option<Arc<dyn NotificationBackend>>,
    pub options: MonitorOptions,
}

/// Resolves the site for `url` and wires the pipeline into `doc`.
/// `Ok(None)` means no supported site matched and nothing was attached.
pub fn attach(
    doc: &mut LiveDocument,
    url: &str,
    deps: PipelineDeps,
) -> Result<Option<ObserverId>, DomError> {
    let Some(config) = find_site_config_by_url(url) else {
        chat_debug!("Running on URL: {} (no site configuration)", url);
        return Ok(None);
    };
    attach_site(doc, config, deps).map(Some)
}

/// Must be called inside a tokio runtime.
pub fn attach_site(
    doc: &mut LiveDocument,
    config: &'static SiteConfig,
    deps: PipelineDeps,
) -> Result<ObserverId, DomError> {
    chat_info!("Site configuration found: {}", config.name);
    let selectors = Arc::new(SiteSelectors::compile(config)?);

    let mut options = deps.options;
    if let Some(viewer) = detect_viewer_name(config.id, doc.html()) {
        chat_debug!("Ignoring messages from viewer {}", viewer);
        options.ignore_names.push(viewer);
    }

    let notifier = deps.notifications.map(|backend| {
        Arc::new(Notifier::new(backend, config.name)) as Arc<dyn NotificationSink>
    });
    let factory = MonitorFactory {
        selectors: selectors.clone(),
        store: deps.store,
        playback: deps.playback,
        notifier,
        options,
    };

    let subtree = ObserveOptions { subtree: true };
    if selectors.container.is_some() {
        let mut lifecycle = ContainerLifecycle::new(factory);
        lifecycle.start(doc.html());
        let root = doc.root();
        Ok(doc.observe(root, subtree, Box::new(lifecycle)))
    } else {
        let root = doc.body().unwrap_or_else(|| doc.root());
        let monitor = factory.create();
        Ok(doc.observe(root, subtree, Box::new(MonitorObserver::new(monitor))))
    }
}
