use chat_logging::{chat_debug, chat_error};

use crate::{Effect, PlaybackOutcome, QueueMsg, QueueState};

/// Pure update function: applies a message to the queue and returns the
/// playback effects to run.
pub fn update(mut state: QueueState, msg: QueueMsg) -> (QueueState, Vec<Effect>) {
    let effects = match msg {
        QueueMsg::Enqueue(text) => {
            if state.is_disposed() {
                return (state, Vec::new());
            }
            if !state.is_enabled() {
                chat_debug!("Disabled, dropping message: \"{}\"", text);
                return (state, Vec::new());
            }
            chat_debug!("Adding message to queue: \"{}\"", text);
            state.push(text);
            state.start_next().into_iter().collect()
        }
        QueueMsg::PlaybackFinished {
            request_id,
            outcome,
        } => match state.finish(request_id) {
            Some(text) => {
                match outcome {
                    PlaybackOutcome::Completed => chat_debug!("Finished speech: \"{}\"", text),
                    PlaybackOutcome::Cancelled => chat_debug!("Cancelled speech: \"{}\"", text),
                    PlaybackOutcome::Failed(reason) => {
                        chat_error!("Error during speech: \"{}\": {}", text, reason)
                    }
                }
                state.start_next().into_iter().collect()
            }
            None => {
                chat_debug!("Ignoring stale playback event for request {}", request_id);
                Vec::new()
            }
        },
        QueueMsg::EnabledChanged(enabled) => {
            state.set_enabled(enabled);
            if enabled {
                state.start_next().into_iter().collect()
            } else {
                let dropped = state.clear_pending();
                chat_debug!("Disabled, canceling current speech ({} queued dropped)", dropped);
                state.cancel_in_flight().into_iter().collect()
            }
        }
        QueueMsg::Dispose => {
            state.mark_disposed();
            state.clear_pending();
            state.cancel_in_flight().into_iter().collect()
        }
    };

    (state, effects)
}
