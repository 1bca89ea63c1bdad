//! Async runtime around the pure queue state machine.
//!
//! One worker task per monitor owns the `QueueState`. Messages arrive on an
//! unbounded channel: enqueue requests from the monitor, enabled-flag changes
//! from the settings store, and playback completions from the spawned
//! playback task. Effects are executed here.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chat_logging::{chat_debug, chat_warn};
use chatvoice_core::{
    update, Effect, ExtensionEnabled, PlaybackOutcome, QueueMsg, QueueState, RequestId, TtsRate,
    TtsVoice, TtsVolume,
};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::playback::{PlaybackBackend, SpeechRequest};
use crate::store::{load, subscribe_typed, SettingsStore, SubscriptionId};

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Owner side of a speech queue. Dropping it disposes the queue.
pub struct SpeechQueueHandle {
    tx: mpsc::UnboundedSender<QueueMsg>,
    state: watch::Receiver<QueueState>,
    store: Arc<dyn SettingsStore>,
    subscription: SubscriptionId,
}

impl SpeechQueueHandle {
    /// Starts the worker. Must be called inside a tokio runtime.
    pub fn spawn(store: Arc<dyn SettingsStore>, backend: Arc<dyn PlaybackBackend>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let enabled_tx = tx.clone();
        let subscription = subscribe_typed::<ExtensionEnabled, _>(store.as_ref(), move |value| {
            let _ = enabled_tx.send(QueueMsg::EnabledChanged(value.enabled));
        });

        let initial = QueueState::new(load::<ExtensionEnabled>(store.as_ref()).enabled);
        let (state_tx, state_rx) = watch::channel(initial.clone());

        let worker = QueueWorker {
            store: store.clone(),
            backend,
            tx: tx.clone(),
            state_tx,
            active: None,
        };
        tokio::spawn(worker.run(initial, rx));

        Self {
            tx,
            state: state_rx,
            store,
            subscription,
        }
    }

    pub fn enqueue(&self, text: impl Into<String>) {
        let _ = self.tx.send(QueueMsg::Enqueue(text.into()));
    }

    /// Clears pending text and cancels the active utterance. Later enqueues are ignored.
    pub fn dispose(&self) {
        let _ = self.tx.send(QueueMsg::Dispose);
    }

    /// Latest state published by the worker.
    pub fn state(&self) -> QueueState {
        self.state.borrow().clone()
    }

    /// Resolves once the published state satisfies `predicate`, or the worker exits.
    pub async fn wait_until(&self, predicate: impl FnMut(&QueueState) -> bool) {
        let mut state = self.state.clone();
        let _ = state.wait_for(predicate).await;
    }
}

impl Drop for SpeechQueueHandle {
    fn drop(&mut self) {
        self.store.unsubscribe(self.subscription);
        let _ = self.tx.send(QueueMsg::Dispose);
    }
}

struct QueueWorker {
    store: Arc<dyn SettingsStore>,
    backend: Arc<dyn PlaybackBackend>,
    tx: mpsc::UnboundedSender<QueueMsg>,
    state_tx: watch::Sender<QueueState>,
    active: Option<(RequestId, CancellationToken)>,
}

impl QueueWorker {
    async fn run(mut self, mut state: QueueState, mut rx: mpsc::UnboundedReceiver<QueueMsg>) {
        while let Some(msg) = rx.recv().await {
            let disposing = matches!(msg, QueueMsg::Dispose);
            let (next, effects) = update(state, msg);
            state = next;
            for effect in effects {
                self.execute(effect).await;
            }
            self.state_tx.send_replace(state.clone());
            if disposing {
                break;
            }
        }
        chat_debug!("Speech queue stopped");
    }

    async fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Speak { request_id, text } => {
                let request = self.build_request(text);
                chat_debug!("Start speech: \"{}\"", request.text);
                let token = CancellationToken::new();
                self.active = Some((request_id, token.clone()));

                let backend = self.backend.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = tokio::select! {
                        _ = token.cancelled() => Ok(PlaybackOutcome::Cancelled),
                        result = backend.speak(request) => result,
                    };
                    let outcome = result.unwrap_or_else(|err| PlaybackOutcome::Failed(err.to_string()));
                    let _ = tx.send(QueueMsg::PlaybackFinished {
                        request_id,
                        outcome,
                    });
                });
            }
            Effect::CancelSpeech { request_id } => {
                match self.active.take() {
                    Some((active_id, token)) if active_id == request_id => token.cancel(),
                    Some(other) => {
                        chat_warn!("Cancel for {} while {} is active", request_id, other.0);
                        self.active = Some(other);
                    }
                    None => {}
                }
                chat_debug!("Cancelling speech request {}", request_id);
                self.backend.cancel_all().await;
            }
        }
    }

    fn build_request(&self, text: String) -> SpeechRequest {
        let store = self.store.as_ref();
        SpeechRequest {
            text,
            voice_uri: load::<TtsVoice>(store).uri,
            rate: load::<TtsRate>(store).rate,
            volume: load::<TtsVolume>(store).volume,
            request_id: next_request_id(),
        }
    }
}

fn next_request_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let seq = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{millis}_{seq:04}")
}
