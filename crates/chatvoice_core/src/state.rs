use std::collections::VecDeque;

use crate::Effect;

pub type RequestId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
struct InFlight {
    request_id: RequestId,
    text: String,
    cancel_requested: bool,
}

/// Per-monitor speech queue: FIFO of pending text plus the one utterance
/// that may be in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueState {
    pending: VecDeque<String>,
    in_flight: Option<InFlight>,
    enabled: bool,
    disposed: bool,
    next_request_id: RequestId,
}

impl Default for QueueState {
    fn default() -> Self {
        Self::new(true)
    }
}

impl QueueState {
    pub fn new(enabled: bool) -> Self {
        Self {
            pending: VecDeque::new(),
            in_flight: None,
            enabled,
            disposed: false,
            next_request_id: 1,
        }
    }

    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_speaking(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn speaking_text(&self) -> Option<&str> {
        self.in_flight.as_ref().map(|f| f.text.as_str())
    }

    pub fn speaking_request(&self) -> Option<RequestId> {
        self.in_flight.as_ref().map(|f| f.request_id)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Idle: nothing pending and nothing in flight.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.in_flight.is_none()
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn mark_disposed(&mut self) {
        self.disposed = true;
    }

    pub(crate) fn push(&mut self, text: String) {
        self.pending.push_back(text);
    }

    pub(crate) fn clear_pending(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    /// Takes the in-flight slot if `request_id` owns it.
    pub(crate) fn finish(&mut self, request_id: RequestId) -> Option<String> {
        match &self.in_flight {
            Some(flight) if flight.request_id == request_id => {
                self.in_flight.take().map(|f| f.text)
            }
            _ => None,
        }
    }

    /// Pops the next item when allowed to speak.
    pub(crate) fn start_next(&mut self) -> Option<Effect> {
        if self.disposed || !self.enabled || self.in_flight.is_some() {
            return None;
        }
        let text = self.pending.pop_front()?;
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.in_flight = Some(InFlight {
            request_id,
            text: text.clone(),
            cancel_requested: false,
        });
        Some(Effect::Speak { request_id, text })
    }

    /// Requests cancellation once; the slot stays occupied until the
    /// backend reports the terminal event.
    pub(crate) fn cancel_in_flight(&mut self) -> Option<Effect> {
        let flight = self.in_flight.as_mut()?;
        if flight.cancel_requested {
            return None;
        }
        flight.cancel_requested = true;
        Some(Effect::CancelSpeech {
            request_id: flight.request_id,
        })
    }
}
