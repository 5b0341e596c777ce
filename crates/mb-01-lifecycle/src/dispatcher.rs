//! # Dispatcher Loop
//!
//! Drains the outbound queue one message per tick and keeps the announce
//! schedule. The first tick fires immediately.
//!
//! Failures are logged and never stop the loop. Send failures are not
//! retried here; the message's `try_propagation_on_fail` flag is the retry
//! intent handed to the transport.

use crate::domain::{AnnounceOutcome, AnnounceThrottler, LifecycleError, OutboundQueue};
use crate::ports::outbound::MeshTransport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// A message was handed to the transport successfully.
    pub dispatched: bool,
    /// A message was dequeued but the transport refused it.
    pub send_failed: bool,
    /// `None` if the announce check itself failed.
    pub announce: Option<AnnounceOutcome>,
}

pub struct Dispatcher {
    queue: Arc<OutboundQueue>,
    throttler: Arc<AnnounceThrottler>,
    transport: Arc<dyn MeshTransport>,
    interval: Duration,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<OutboundQueue>,
        throttler: Arc<AnnounceThrottler>,
        transport: Arc<dyn MeshTransport>,
        interval: Duration,
    ) -> Self {
        Self {
            queue,
            throttler,
            transport,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// One iteration: send at most one message, then check the announce.
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();

        if let Some(message) = self.queue.dequeue_one() {
            let destination = message.destination().pretty();
            match self.transport.send(message).await {
                Ok(()) => {
                    report.dispatched = true;
                    info!(
                        destination = %destination,
                        remaining = self.queue.depth(),
                        "Message dispatched"
                    );
                }
                Err(e) => {
                    report.send_failed = true;
                    let err = LifecycleError::TransportSendFailure(e);
                    error!(destination = %destination, error = %err, "Dispatch failed");
                }
            }
        }

        match self.throttler.maybe_announce().await {
            Ok(outcome) => report.announce = Some(outcome),
            Err(e) => warn!(error = %e, "Announce check failed"),
        }

        report
    }

    /// Tick until `shutdown` turns true or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = self.interval.as_secs(), "Dispatcher started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.tick().await;
                    debug!(?report, "Dispatcher tick");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Dispatcher stopped");
    }
}
