use crate::RequestId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueMsg {
    /// A monitor accepted a message for speaking.
    Enqueue(String),
    /// The playback backend reported the terminal event for a request.
    PlaybackFinished {
        request_id: RequestId,
        outcome: PlaybackOutcome,
    },
    /// The global enabled flag changed.
    EnabledChanged(bool),
    /// The owning monitor is being torn down.
    Dispose,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed,
    Cancelled,
    Failed(String),
}
