//! Poll scheduling: a fixed tick interval plus a stop signal.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::info;

/// Decides when the monitor polls again.
#[async_trait]
pub trait Scheduler: Send {
    /// Wait for the next tick. Returns `false` when the monitor should stop.
    async fn wait(&mut self) -> bool;
}

/// Sleeps a fixed interval between polls until shut down.
pub struct IntervalScheduler {
    interval: Duration,
    shutdown: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

/// Stops an `IntervalScheduler`, waking it if it is sleeping.
#[derive(Clone)]
pub struct ShutdownHandle {
    shutdown: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.wake.notify_one();
    }

    pub fn is_triggered(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

impl IntervalScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            shutdown: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shutdown: Arc::clone(&self.shutdown),
            wake: Arc::clone(&self.wake),
        }
    }
}

#[async_trait]
impl Scheduler for IntervalScheduler {
    async fn wait(&mut self) -> bool {
        if self.shutdown.load(Ordering::Relaxed) {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(self.interval) => {}
            _ = self.wake.notified() => {}
        }
        if self.shutdown.load(Ordering::Relaxed) {
            info!("Inbox monitor shutting down");
            return false;
        }
        true
    }
}

/// Allows exactly `n` further polls, then stops. No real waiting.
#[derive(Debug, Clone)]
pub struct FixedTicks {
    remaining: usize,
    waited: usize,
}

impl FixedTicks {
    pub fn new(n: usize) -> Self {
        Self {
            remaining: n,
            waited: 0,
        }
    }

    /// How many times `wait` was called.
    pub fn waited(&self) -> usize {
        self.waited
    }
}

#[async_trait]
impl Scheduler for FixedTicks {
    async fn wait(&mut self) -> bool {
        self.waited += 1;
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}
