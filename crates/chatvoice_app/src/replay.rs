use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use chat_logging::{chat_info, chat_warn};
use chatvoice_engine::{
    attach, decode_page, ChatTestPage, LogNotificationBackend, MonitorOptions, NotificationBackend,
    PipelineDeps, PlaybackBackend, SettingsStore, SimulatedPlayback,
};

use crate::console::ConsolePlayback;
use crate::profile::ReplayProfile;
use crate::transcript::parse_transcript;

/// Feeds a transcript into the chat test page line by line, with the full
/// monitor pipeline attached.
pub(crate) async fn run_replay(
    transcript: &Path,
    profile: &ReplayProfile,
    store: Arc<dyn SettingsStore>,
    silent: bool,
) -> anyhow::Result<usize> {
    let bytes = fs::read(transcript).with_context(|| format!("reading {:?}", transcript))?;
    let decoded = decode_page(&bytes)?;
    chat_info!(
        "Replaying {:?} ({}) against {}",
        transcript,
        decoded.encoding_label,
        profile.url
    );
    let lines = parse_transcript(&decoded.html);

    let playback: Arc<dyn PlaybackBackend> = if silent {
        SimulatedPlayback::new(profile.speech_duration())
    } else {
        Arc::new(ConsolePlayback::new(profile.speech_duration()))
    };
    let deps = PipelineDeps {
        store,
        playback,
        notifications: Some(Arc::new(LogNotificationBackend) as Arc<dyn NotificationBackend>),
        options: MonitorOptions::default(),
    };

    let mut page = ChatTestPage::with_retention(profile.max_messages)?;
    if attach(page.document_mut(), &profile.url, deps)?.is_none() {
        bail!("no supported chat site matches {}", profile.url);
    }

    let mut added = 0;
    for line in &lines {
        if page.add_message(&line.name, &line.body)?.is_none() {
            chat_warn!("Skipping blank transcript line from {:?}", line.name);
            continue;
        }
        added += 1;
        page.flush();
        tokio::time::sleep(profile.interval()).await;
    }

    tokio::time::sleep(profile.linger()).await;
    chat_info!(
        "Replay finished: {} of {} lines posted, {} nodes held by the page",
        added,
        lines.len(),
        page.document().arena_len()
    );
    Ok(added)
}
