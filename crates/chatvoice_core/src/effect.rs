use crate::RequestId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start playback; at most one is ever outstanding.
    Speak { request_id: RequestId, text: String },
    /// Cancel the outstanding playback.
    CancelSpeech { request_id: RequestId },
}
