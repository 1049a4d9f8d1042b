//! Inbox monitor: authenticate once, then poll the inbox on a fixed cadence
//! and feed every message through the pipeline, strictly one at a time.

pub mod scheduler;
pub mod state;

pub use scheduler::{FixedTicks, IntervalScheduler, Scheduler, ShutdownHandle};
pub use state::MonitorState;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::channels::channel::Inbox;
use crate::channels::email_types::RawEmail;
use crate::error::{ChannelError, MonitorError};
use crate::pipeline::{DispatchOutcome, MessagePipeline, PipelineOutcome, decode_message};

/// Counters for one poll cycle, or accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PollStats {
    pub polls: u64,
    pub messages: u64,
    pub undecodable: u64,
    pub already_replied: u64,
    pub replies_sent: u64,
    pub failures: u64,
}

impl PollStats {
    fn record(&mut self, outcome: &PipelineOutcome) {
        let dispatch = match outcome {
            PipelineOutcome::AlreadyReplied => {
                self.already_replied += 1;
                return;
            }
            PipelineOutcome::DocumentFailed { .. } => {
                self.failures += 1;
                return;
            }
            PipelineOutcome::Unsupported { dispatch }
            | PipelineOutcome::MissingFields { dispatch, .. }
            | PipelineOutcome::Completed { dispatch, .. } => dispatch,
        };
        match dispatch {
            DispatchOutcome::Sent { .. } => self.replies_sent += 1,
            DispatchOutcome::AlreadyProcessed => self.already_replied += 1,
            DispatchOutcome::Failed(_) => self.failures += 1,
        }
    }

    fn merge(&mut self, other: &PollStats) {
        self.polls += other.polls;
        self.messages += other.messages;
        self.undecodable += other.undecodable;
        self.already_replied += other.already_replied;
        self.replies_sent += other.replies_sent;
        self.failures += other.failures;
    }
}

/// Drives the pipeline from an inbox.
pub struct InboxMonitor<I: Inbox, S: Scheduler> {
    inbox: I,
    pipeline: MessagePipeline,
    scheduler: S,
    state: MonitorState,
    totals: PollStats,
}

impl<I: Inbox, S: Scheduler> InboxMonitor<I, S> {
    pub fn new(inbox: I, pipeline: MessagePipeline, scheduler: S) -> Self {
        Self {
            inbox,
            pipeline,
            scheduler,
            state: MonitorState::Idle,
            totals: PollStats::default(),
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn totals(&self) -> PollStats {
        self.totals
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Run until the scheduler says stop (`Ok`) or the inbox fails (`Err`).
    ///
    /// Authentication and listing/fetch failures are fatal; per-message
    /// pipeline failures are not.
    pub async fn run(&mut self) -> Result<PollStats, MonitorError> {
        info!("Connecting to inbox");
        if let Err(e) = self.inbox.connect().await {
            return Err(self.fail(e));
        }
        self.transition(MonitorState::Polling)?;

        loop {
            let poll = self.poll_once().await?;
            self.totals.merge(&poll);
            info!(
                messages = poll.messages,
                replies_sent = poll.replies_sent,
                already_replied = poll.already_replied,
                undecodable = poll.undecodable,
                failures = poll.failures,
                "Poll complete"
            );

            self.transition(MonitorState::Sleeping)?;
            if !self.scheduler.wait().await {
                break;
            }
            self.transition(MonitorState::Polling)?;
        }

        if let Err(e) = self.inbox.disconnect().await {
            debug!(error = %e, "Logout failed");
        }
        info!(polls = self.totals.polls, replies_sent = self.totals.replies_sent, "Inbox monitor stopped");
        Ok(self.totals)
    }

    /// One pass over the whole inbox. Expects to be in `Polling`.
    async fn poll_once(&mut self) -> Result<PollStats, MonitorError> {
        let mut stats = PollStats {
            polls: 1,
            ..Default::default()
        };

        let ids = match self.inbox.list_ids().await {
            Ok(ids) => ids,
            Err(e) => return Err(self.fail(e)),
        };
        debug!(count = ids.len(), "Listed inbox");

        for id in ids {
            self.transition(MonitorState::Processing)?;
            let raw = match self.inbox.fetch(&id).await {
                Ok(raw) => raw,
                Err(e) => return Err(self.fail(e)),
            };
            stats.messages += 1;
            self.handle(&raw, &mut stats).await;
            self.transition(MonitorState::Polling)?;
        }

        Ok(stats)
    }

    async fn handle(&self, raw: &RawEmail, stats: &mut PollStats) {
        let Some(msg) = decode_message(raw) else {
            stats.undecodable += 1;
            return;
        };
        let outcome = self.pipeline.process(&msg).await;
        match &outcome {
            PipelineOutcome::DocumentFailed { reason, .. } => {
                warn!(id = %raw.id, sender = %msg.sender, reason = %reason, "Message not answered");
            }
            other => debug!(id = %raw.id, outcome = other.label(), "Message handled"),
        }
        stats.record(&outcome);
    }

    fn transition(&mut self, to: MonitorState) -> Result<(), MonitorError> {
        if !self.state.can_transition_to(to) {
            return Err(MonitorError::InvalidTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        debug!(from = %self.state, to = %to, "Monitor transition");
        self.state = to;
        Ok(())
    }

    fn fail(&mut self, e: ChannelError) -> MonitorError {
        error!(state = %self.state, error = %e, "Inbox failure, stopping monitor");
        self.state = MonitorState::Fatal;
        MonitorError::Inbox(e)
    }
}
