mod common;

use chatvoice_core::QueueState;
use chatvoice_engine::{set_enabled, set_rate, set_volume, SpeechQueueHandle};
use common::{memory_store, settle, ScriptedPlayback};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn speaks_in_order_one_at_a_time() {
    let store = memory_store();
    let backend = ScriptedPlayback::new();
    let queue = SpeechQueueHandle::spawn(store, backend.clone());

    queue.enqueue("First message");
    queue.enqueue("Second message");
    backend.wait_for_started(1).await;
    settle().await;
    assert_eq!(backend.started(), vec!["First message"]);

    backend.complete_next();
    backend.wait_for_started(2).await;
    assert_eq!(backend.started(), vec!["First message", "Second message"]);

    backend.complete_next();
    queue.wait_until(QueueState::is_idle).await;
    assert_eq!(backend.cancel_count(), 0);
}

#[tokio::test]
async fn failed_utterance_does_not_block_the_rest() {
    let backend = ScriptedPlayback::new();
    let queue = SpeechQueueHandle::spawn(memory_store(), backend.clone());

    queue.enqueue("one");
    queue.enqueue("two");
    backend.wait_for_started(1).await;
    backend.fail_next("synthesizer crashed");
    backend.wait_for_started(2).await;
    assert_eq!(backend.started(), vec!["one", "two"]);
}

#[tokio::test]
async fn disabling_cancels_current_and_drops_pending() {
    let store = memory_store();
    let backend = ScriptedPlayback::new();
    let queue = SpeechQueueHandle::spawn(store.clone(), backend.clone());

    queue.enqueue("A");
    queue.enqueue("B");
    backend.wait_for_started(1).await;

    set_enabled(store.as_ref(), false).unwrap();
    queue.wait_until(QueueState::is_idle).await;
    settle().await;
    assert_eq!(backend.started(), vec!["A"]);
    assert_eq!(backend.cancel_count(), 1);

    queue.enqueue("C");
    settle().await;
    assert_eq!(backend.started(), vec!["A"]);
    assert!(queue.state().is_idle());

    set_enabled(store.as_ref(), true).unwrap();
    queue.enqueue("D");
    backend.wait_for_started(2).await;
    assert_eq!(backend.started(), vec!["A", "D"]);
}

#[tokio::test]
async fn requests_carry_stored_voice_settings() {
    let store = memory_store();
    set_rate(store.as_ref(), 2.5).unwrap();
    set_volume(store.as_ref(), 3.0).unwrap();
    let backend = ScriptedPlayback::new();
    let queue = SpeechQueueHandle::spawn(store, backend.clone());

    queue.enqueue("hello");
    queue.enqueue("again");
    backend.wait_for_started(1).await;
    backend.complete_next();
    backend.wait_for_started(2).await;

    let requests = backend.requests();
    assert_eq!(requests[0].rate, 2.5);
    assert_eq!(requests[0].volume, 1.0);
    assert_eq!(requests[0].voice_uri, None);
    assert_ne!(requests[0].request_id, requests[1].request_id);
}

#[tokio::test]
async fn starting_disabled_ignores_enqueues() {
    let store = memory_store();
    set_enabled(store.as_ref(), false).unwrap();
    let backend = ScriptedPlayback::new();
    let queue = SpeechQueueHandle::spawn(store, backend.clone());

    queue.enqueue("quiet");
    settle().await;
    assert!(backend.started().is_empty());
    assert!(!queue.state().is_enabled());
}

#[tokio::test]
async fn dropping_the_handle_cancels_playback() {
    let backend = ScriptedPlayback::new();
    let queue = SpeechQueueHandle::spawn(memory_store(), backend.clone());

    queue.enqueue("long speech");
    queue.enqueue("never");
    backend.wait_for_started(1).await;
    drop(queue);
    common::wait_for(|| backend.cancel_count() == 1).await;
    settle().await;
    assert_eq!(backend.started(), vec!["long speech"]);
}
