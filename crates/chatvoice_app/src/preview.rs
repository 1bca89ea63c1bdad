use std::sync::Arc;

use anyhow::anyhow;
use chatvoice_core::{
    compose_message, find_site_config_by_url, FilterCollection, NotificationSink, Rejection,
    SpeechTemplate,
};
use chatvoice_engine::{
    decode_page, load, select_connected, LiveDocument, LogNotificationBackend, Notifier,
    SettingsStore, SiteSelectors,
};

/// What the pipeline would do with one message element of a saved page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PreviewLine {
    Spoken(String),
    Dropped { name: String, reason: Rejection },
}

/// Runs every message already present in `bytes` through the stored filters
/// and template. Dedup and ignore lists are not applied.
pub(crate) fn preview_page(
    bytes: &[u8],
    url: &str,
    store: &dyn SettingsStore,
) -> anyhow::Result<Vec<PreviewLine>> {
    let config =
        find_site_config_by_url(url).ok_or_else(|| anyhow!("no supported chat site matches {url}"))?;
    let selectors = SiteSelectors::compile(config)?;
    let decoded = decode_page(bytes)?;
    let doc = LiveDocument::parse(&decoded.html);

    let filters: FilterCollection = load(store);
    let template: SpeechTemplate = load(store);
    let notifier = Notifier::new(Arc::new(LogNotificationBackend), config.name);

    let lines = select_connected(doc.html(), &selectors.message)
        .map(|element| {
            let fields = selectors.extract_fields(element);
            let name = fields.get("name").unwrap_or_default().to_string();
            match compose_message(
                fields,
                &filters,
                template.effective(),
                Some(&notifier as &dyn NotificationSink),
            ) {
                Ok(message) => PreviewLine::Spoken(message.text),
                Err(reason) => PreviewLine::Dropped { name, reason },
            }
        })
        .collect();
    Ok(lines)
}
