//! The snapshot store: single writer, many readers, copy-on-publish.
//!
//! Publishing swaps an `Arc<Snapshot>` behind a `tokio` RwLock, so a
//! reader observes either the previous snapshot in full or the new one
//! in full, never a mix. Readers clone the `Arc` and drop the lock;
//! the snapshot they hold stays valid after any number of later
//! publishes.

use crate::models::{Event, Snapshot};
use chrono::Utc;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// No snapshot has ever been published. The serving layer turns this
/// into a "collector not running" response, not a generic error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no snapshot has been published yet")]
pub struct NoDataYetError;

/// A published snapshot plus the metadata the serving layer needs for
/// cache validation.
#[derive(Debug, Clone)]
pub struct Published {
    pub snapshot: Arc<Snapshot>,
    pub content_hash: u64,
}

/// Outcome of a conditional read against a known version. The
/// not-modified arm still carries the validation metadata so callers
/// can emit a cache token without touching the payload.
#[derive(Debug, Clone)]
pub enum ReadOutcome {
    NotModified { version: u64, content_hash: u64 },
    Changed(Published),
}

#[derive(Debug, Default, Clone)]
pub struct SnapshotStore {
    current: Arc<RwLock<Option<Published>>>,
    last_version: Arc<AtomicU64>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new merged event list, assigning the next version.
    /// The snapshot and its hash are built outside the lock; the write
    /// lock is held only for the pointer swap.
    pub async fn publish(&self, events: Vec<Event>) -> u64 {
        let version = self.last_version.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Snapshot {
            version,
            generated_at: Utc::now(),
            events,
        };
        let published = Published {
            content_hash: content_hash(&snapshot.events),
            snapshot: Arc::new(snapshot),
        };

        *self.current.write().await = Some(published);
        version
    }

    /// Install a previously persisted snapshot, e.g. at warm start.
    /// Future publishes continue from its version.
    pub async fn restore(&self, snapshot: Snapshot) {
        self.last_version
            .fetch_max(snapshot.version, Ordering::SeqCst);
        let published = Published {
            content_hash: content_hash(&snapshot.events),
            snapshot: Arc::new(snapshot),
        };
        *self.current.write().await = Some(published);
    }

    /// The most recently fully-published snapshot. Does not wait for
    /// an in-progress publish beyond the lock handoff.
    pub async fn read(&self) -> Result<Published, NoDataYetError> {
        self.current.read().await.clone().ok_or(NoDataYetError)
    }

    /// Conditional read for cache validation: `NotModified` when the
    /// caller's version is current, otherwise the current snapshot.
    pub async fn read_since(&self, version: u64) -> Result<ReadOutcome, NoDataYetError> {
        let published = self.read().await?;
        if published.snapshot.version == version {
            Ok(ReadOutcome::NotModified {
                version,
                content_hash: published.content_hash,
            })
        } else {
            Ok(ReadOutcome::Changed(published))
        }
    }

    #[cfg(test)]
    pub(crate) async fn hold_write_for_test(
        &self,
    ) -> tokio::sync::OwnedRwLockWriteGuard<Option<Published>> {
        self.current.clone().write_owned().await
    }
}

/// Structural hash of the merged events, stable for equal content
/// within a process. Floats are hashed by bit pattern.
fn content_hash(events: &[Event]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for event in events {
        event.event_key.hash(&mut hasher);
        event.sport.hash(&mut hasher);
        event.league.hash(&mut hasher);
        event.start_time.timestamp().hash(&mut hasher);
        event.participants.hash(&mut hasher);
        for market in &event.markets {
            market.market_type.hash(&mut hasher);
            for selection in &market.selections {
                selection.name.hash(&mut hasher);
                selection.parameter.map(f64::to_bits).hash(&mut hasher);
                selection.decimal_odds.to_bits().hash(&mut hasher);
                for source in &selection.sources {
                    source.bookmaker_id.hash(&mut hasher);
                    source.decimal_odds.to_bits().hash(&mut hasher);
                    source.raw_identifiers.hash(&mut hasher);
                }
            }
        }
    }
    hasher.finish()
}
