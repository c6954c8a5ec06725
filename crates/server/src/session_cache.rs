//! Per-user session state: the last served result and every id served so far.
//!
//! `SessionCache` is the seam for the backing store. `InMemorySessionCache`
//! serves single-instance deployments; entries expire after an idle TTL
//! measured from their last write.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use data_loader::VideoId;
use sources::Recommendation;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionCacheEntry {
    /// Served verbatim on a non-refresh request
    pub last_served: Vec<Recommendation>,
    /// The count `last_served` was computed for
    pub requested: usize,
    /// Every id served this session; excluded on refresh
    pub previously_served: HashSet<VideoId>,
    pub updated_at: DateTime<Utc>,
}

impl SessionCacheEntry {
    fn new() -> Self {
        Self {
            last_served: Vec::new(),
            requested: 0,
            previously_served: HashSet::new(),
            updated_at: Utc::now(),
        }
    }

    /// A timestamp in the future (clock skew) never counts as expired
    pub fn is_expired(&self, ttl: Duration) -> bool {
        (Utc::now() - self.updated_at)
            .to_std()
            .is_ok_and(|idle| idle >= ttl)
    }
}

#[async_trait]
pub trait SessionCache: Send + Sync {
    async fn get(&self, username: &str) -> Option<SessionCacheEntry>;

    /// Overwrite the last served result and merge its ids into the
    /// previously-served set
    async fn record_served(&self, username: &str, served: &[Recommendation], requested: usize);

    /// Drop a user's entry; true if one existed
    async fn evict(&self, username: &str) -> bool;
}

pub struct InMemorySessionCache {
    entries: Mutex<HashMap<String, SessionCacheEntry>>,
    ttl: Duration,
}

impl InMemorySessionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl Default for InMemorySessionCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(1800))
    }
}

#[async_trait]
impl SessionCache for InMemorySessionCache {
    async fn get(&self, username: &str) -> Option<SessionCacheEntry> {
        let mut entries = self.entries.lock().await;
        if entries
            .get(username)
            .is_some_and(|entry| entry.is_expired(self.ttl))
        {
            debug!("Session for {} expired", username);
            entries.remove(username);
            return None;
        }
        entries.get(username).cloned()
    }

    async fn record_served(&self, username: &str, served: &[Recommendation], requested: usize) {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(self.ttl));
        if entries.len() < before {
            debug!("Reclaimed {} expired sessions", before - entries.len());
        }

        let entry = entries
            .entry(username.to_string())
            .or_insert_with(SessionCacheEntry::new);

        entry
            .previously_served
            .extend(served.iter().map(|r| r.item.video_id.clone()));
        entry.last_served = served.to_vec();
        entry.requested = requested;
        entry.updated_at = Utc::now();
    }

    async fn evict(&self, username: &str) -> bool {
        self.entries.lock().await.remove(username).is_some()
    }
}

/// One async mutex per username; same-user requests run one at a time.
#[derive(Default)]
pub struct UserLocks {
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, username: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Nobody else holds these; drop them so the map tracks live users only.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(username.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}
