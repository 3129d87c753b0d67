//! In-process record store.
//!
//! For testing and small single-process deployments. Stores without native
//! TTL notifications have to approximate them, and this backend does it the
//! straightforward way: a min-heap of `(expires_at, name)` polled by a
//! background sweep task, which removes due entries and pushes their names
//! to every subscribed expiration feed. Behaviorally equivalent to the
//! Redis backend at sweep-interval granularity.

use crate::codec;
use crate::error::{MetadataError, MetadataResult};
use crate::store::{ExpirationFeed, FEED_CAPACITY, RecordStore};
use async_trait::async_trait;
use ember_core::{FileName, FileRecord};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::debug;

struct Entry {
    value: String,
    expires_at: Option<i64>,
}

impl Entry {
    fn is_past(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    /// Pending expiries, earliest first. Entries can go stale when a key is
    /// deleted or re-created; the sweep revalidates against the live map
    /// before acting on one.
    expiries: BinaryHeap<Reverse<(i64, String)>>,
    subscribers: Vec<mpsc::Sender<String>>,
}

/// In-process record store with sweep-based TTL.
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    sweep: JoinHandle<()>,
}

impl MemoryStore {
    /// Create a store whose sweep runs at the given interval.
    pub fn new(sweep_interval: Duration) -> Self {
        let inner = Arc::new(Mutex::new(Inner::default()));
        let weak = Arc::downgrade(&inner);

        let sweep = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                Self::sweep_once(&inner).await;
            }
        });

        Self { inner, sweep }
    }

    async fn sweep_once(inner: &Mutex<Inner>) {
        let now = unix_now();

        // Collect due names under the lock, deliver after releasing it so a
        // full feed never blocks store operations.
        let (expired, subscribers) = {
            let mut guard = inner.lock().await;
            let mut expired = Vec::new();
            while let Some(Reverse((at, name))) = guard.expiries.peek().cloned() {
                if at > now {
                    break;
                }
                guard.expiries.pop();
                // Stale heap entries (key deleted or re-created since) carry
                // an expiry the live entry no longer has; skip those.
                let live = guard
                    .entries
                    .get(&name)
                    .is_some_and(|entry| entry.expires_at == Some(at));
                if live {
                    guard.entries.remove(&name);
                    expired.push(name);
                }
            }
            guard.subscribers.retain(|tx| !tx.is_closed());
            (expired, guard.subscribers.clone())
        };

        for name in &expired {
            debug!(name = %name, "record expired by ttl");
            for tx in &subscribers {
                // A receiver dropped mid-delivery is pruned next sweep.
                let _ = tx.send(name.clone()).await;
            }
        }
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        self.sweep.abort();
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create(&self, record: &FileRecord) -> MetadataResult<bool> {
        let now = unix_now();
        let value = codec::encode(record)?;
        let expires_at = record.expires_at();
        let name = record.name.as_str().to_string();

        let mut guard = self.inner.lock().await;
        // An entry past its TTL that the sweep has not reached yet is
        // logically gone; replacing it changes its expiry, which invalidates
        // the stale heap entry so no notification fires for the old record.
        let occupied = guard
            .entries
            .get(&name)
            .is_some_and(|entry| !entry.is_past(now));
        if occupied {
            return Ok(false);
        }

        guard.entries.insert(name.clone(), Entry { value, expires_at });
        if let Some(at) = expires_at {
            guard.expiries.push(Reverse((at, name)));
        }
        Ok(true)
    }

    async fn get(&self, name: &FileName) -> MetadataResult<Option<FileRecord>> {
        let now = unix_now();
        let guard = self.inner.lock().await;
        match guard.entries.get(name.as_str()) {
            Some(entry) if !entry.is_past(now) => Ok(Some(codec::decode(&entry.value)?)),
            _ => Ok(None),
        }
    }

    async fn update(&self, record: &FileRecord) -> MetadataResult<()> {
        let now = unix_now();
        let value = codec::encode(record)?;

        let mut guard = self.inner.lock().await;
        match guard.entries.get_mut(record.name.as_str()) {
            Some(entry) if !entry.is_past(now) => {
                // Preserve expires_at: the remaining lifespan survives the
                // overwrite, exactly like SET XX KEEPTTL.
                entry.value = value;
                Ok(())
            }
            _ => Err(MetadataError::NotFound(record.name.to_string())),
        }
    }

    async fn delete(&self, name: &FileName) -> MetadataResult<()> {
        let mut guard = self.inner.lock().await;
        guard.entries.remove(name.as_str());
        Ok(())
    }

    async fn subscribe_expirations(&self) -> MetadataResult<ExpirationFeed> {
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        let mut guard = self.inner.lock().await;
        guard.subscribers.push(tx);
        Ok(ExpirationFeed::new(rx))
    }

    async fn health_check(&self) -> MetadataResult<()> {
        Ok(())
    }
}

fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}
