#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chatvoice_core::{Notification, NotificationSink, PlaybackOutcome};
use chatvoice_engine::{
    MemoryStore, MonitorOptions, PipelineDeps, PlaybackBackend, PlaybackError, SettingsStore,
    SpeechRequest,
};
use tokio::sync::oneshot;

type Reply = oneshot::Sender<Result<PlaybackOutcome, PlaybackError>>;

/// Playback whose utterances stay open until the test finishes them.
#[derive(Default)]
pub struct ScriptedPlayback {
    requests: Mutex<Vec<SpeechRequest>>,
    open: Mutex<VecDeque<Reply>>,
    cancels: AtomicUsize,
}

impl ScriptedPlayback {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn requests(&self) -> Vec<SpeechRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.text).collect()
    }

    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    pub fn complete_next(&self) {
        self.finish_next(Ok(PlaybackOutcome::Completed));
    }

    pub fn fail_next(&self, reason: &str) {
        self.finish_next(Err(PlaybackError::Backend(reason.to_string())));
    }

    fn finish_next(&self, result: Result<PlaybackOutcome, PlaybackError>) {
        let reply = self.open.lock().unwrap().pop_front().expect("no utterance in flight");
        let _ = reply.send(result);
    }

    pub async fn wait_for_started(&self, count: usize) {
        wait_for(|| self.requests.lock().unwrap().len() >= count).await;
    }
}

#[async_trait::async_trait]
impl PlaybackBackend for ScriptedPlayback {
    async fn speak(&self, request: SpeechRequest) -> Result<PlaybackOutcome, PlaybackError> {
        let (tx, rx) = oneshot::channel();
        self.requests.lock().unwrap().push(request);
        self.open.lock().unwrap().push_back(tx);
        rx.await.unwrap_or(Ok(PlaybackOutcome::Cancelled))
    }

    async fn cancel_all(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        for reply in self.open.lock().unwrap().drain(..) {
            let _ = reply.send(Ok(PlaybackOutcome::Cancelled));
        }
    }
}

#[derive(Default)]
pub struct RecordingSink {
    received: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn take(&self) -> Vec<Notification> {
        self.received.lock().unwrap().drain(..).collect()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) {
        self.received.lock().unwrap().push(notification);
    }
}

pub fn memory_store() -> Arc<dyn SettingsStore> {
    Arc::new(MemoryStore::new())
}

pub fn deps(store: Arc<dyn SettingsStore>, playback: Arc<ScriptedPlayback>) -> PipelineDeps {
    PipelineDeps {
        store,
        playback,
        notifications: None,
        options: MonitorOptions::default(),
    }
}

/// Lets spawned tasks run without advancing time.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

pub async fn wait_for(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}
