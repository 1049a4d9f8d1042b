//! Inbox monitor state machine.

use serde::{Deserialize, Serialize};

/// State of the inbox monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    /// Not yet authenticated.
    Idle,
    /// Listing the inbox or between messages of a batch.
    Polling,
    /// Running one message through the pipeline.
    Processing,
    /// Batch exhausted, waiting for the next tick.
    Sleeping,
    /// Authentication or protocol failure. Terminal.
    Fatal,
}

impl MonitorState {
    /// Check if this state allows transitioning to another state.
    pub fn can_transition_to(&self, target: MonitorState) -> bool {
        use MonitorState::*;

        matches!(
            (self, target),
            (Idle, Polling) |
            (Polling, Processing) | (Polling, Sleeping) |
            (Processing, Polling) |
            (Sleeping, Polling) |
            // Any live state can fail
            (Idle, Fatal) | (Polling, Fatal) | (Processing, Fatal) | (Sleeping, Fatal)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Fatal)
    }
}

impl std::fmt::Display for MonitorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Polling => "polling",
            Self::Processing => "processing",
            Self::Sleeping => "sleeping",
            Self::Fatal => "fatal",
        };
        write!(f, "{s}")
    }
}
