//! # Announce Throttler
//!
//! Announces the local identity at most once per interval, across restarts.
//!
//! The earliest time of the next announce is persisted under
//! [`ANNOUNCE_STATE_KEY`] as `{"next_announce": <unix secs>}`. A missing or
//! unreadable record means "announce now".
//!
//! ## Ordering
//!
//! The new deadline is written before the transport is asked to announce.
//! If the announce then fails, one broadcast is missed; the reverse order
//! could announce on every restart after a crash.

use crate::domain::config::DEFAULT_DISPLAY_NAME;
use crate::domain::errors::LifecycleError;
use crate::ports::outbound::{MeshTransport, StateStore, TimeSource};
use serde::{Deserialize, Serialize};
use shared_types::Timestamp;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Store key of the persisted deadline.
pub const ANNOUNCE_STATE_KEY: &str = "announce";

/// Deadline assumed when nothing usable is persisted. Always in the past.
const EXPIRED_DEADLINE: Timestamp = 1;

#[derive(Debug, Serialize, Deserialize)]
struct AnnounceRecord {
    next_announce: Timestamp,
}

/// Result of [`AnnounceThrottler::maybe_announce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceOutcome {
    /// Deadline not reached yet.
    Skipped { next: Timestamp },
    /// Announce sent; `next` is the new deadline.
    Announced { next: Timestamp },
}

pub struct AnnounceThrottler {
    transport: Arc<dyn MeshTransport>,
    store: Arc<dyn StateStore>,
    clock: Arc<dyn TimeSource>,
    interval_secs: u64,
    display_name: String,
    /// Serializes read-decide-write so concurrent callers cannot both see an
    /// expired deadline.
    gate: Mutex<()>,
}

impl AnnounceThrottler {
    pub fn new(
        transport: Arc<dyn MeshTransport>,
        store: Arc<dyn StateStore>,
        clock: Arc<dyn TimeSource>,
        interval_secs: u64,
    ) -> Self {
        Self {
            transport,
            store,
            clock,
            interval_secs,
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            gate: Mutex::new(()),
        }
    }

    /// Announce under `name` instead of the default.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Announce if the persisted deadline has passed.
    pub async fn maybe_announce(&self) -> Result<AnnounceOutcome, LifecycleError> {
        let _guard = self.gate.lock().await;

        let deadline = self.read_deadline()?;
        let now = self.clock.now();
        if now < deadline {
            debug!(next_announce = deadline, "Recent announcement");
            return Ok(AnnounceOutcome::Skipped { next: deadline });
        }

        let next = now.saturating_add(self.interval_secs);
        self.write_deadline(next)?;

        self.transport
            .announce(&self.display_name)
            .await
            .map_err(LifecycleError::Announce)?;

        info!(
            address = %self.transport.local_address().pretty(),
            name = %self.display_name,
            next_announce = next,
            interval_secs = self.interval_secs,
            "Announcement sent"
        );
        Ok(AnnounceOutcome::Announced { next })
    }

    /// Forget the persisted deadline so the next call announces.
    pub async fn reset(&self) -> Result<(), LifecycleError> {
        let _guard = self.gate.lock().await;
        self.store.delete(ANNOUNCE_STATE_KEY)?;
        info!("Announce timer reset");
        Ok(())
    }

    /// The persisted deadline, if a readable one exists.
    pub fn next_deadline(&self) -> Result<Option<Timestamp>, LifecycleError> {
        Ok(self
            .store
            .get(ANNOUNCE_STATE_KEY)?
            .and_then(|bytes| parse_record(&bytes)))
    }

    fn read_deadline(&self) -> Result<Timestamp, LifecycleError> {
        let Some(bytes) = self.store.get(ANNOUNCE_STATE_KEY)? else {
            return Ok(EXPIRED_DEADLINE);
        };
        match parse_record(&bytes) {
            Some(deadline) => Ok(deadline),
            None => {
                warn!(
                    key = ANNOUNCE_STATE_KEY,
                    "Unreadable announce deadline, announcing now"
                );
                Ok(EXPIRED_DEADLINE)
            }
        }
    }

    fn write_deadline(&self, next: Timestamp) -> Result<(), LifecycleError> {
        let record = AnnounceRecord {
            next_announce: next,
        };
        let bytes = serde_json::to_vec(&record)?;
        self.store.put(ANNOUNCE_STATE_KEY, &bytes)?;
        Ok(())
    }
}

/// Accepts the JSON record, or a bare integer as older deployments wrote it.
fn parse_record(bytes: &[u8]) -> Option<Timestamp> {
    if let Ok(record) = serde_json::from_slice::<AnnounceRecord>(bytes) {
        return Some(record.next_announce);
    }
    std::str::from_utf8(bytes).ok()?.trim().parse().ok()
}
