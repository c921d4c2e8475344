//! Explicit list/query cache shared by list views, mutations and the
//! reference resolver.
//!
//! Entries are JSON strings keyed by entity kind and query. Each kind has an
//! epoch counter that moves forward on every invalidation, so readers holding
//! derived state (resolved references) can detect that it went stale.

use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::models::{EntityKind, PageRequest};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryScope {
    List(PageRequest),
    Detail(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub kind: EntityKind,
    pub scope: QueryScope,
}

impl QueryKey {
    pub fn list(kind: EntityKind, page: PageRequest) -> Self {
        Self {
            kind,
            scope: QueryScope::List(page),
        }
    }

    pub fn detail(kind: EntityKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            scope: QueryScope::Detail(key.into()),
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            QueryScope::List(page) => {
                write!(f, "{}:list:{}:{}", self.kind, page.page, page.limit)
            }
            QueryScope::Detail(key) => write!(f, "{}:detail:{}", self.kind, key),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: String, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|d| Instant::now() + d),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at
            .map(|expires_at| Instant::now() > expires_at)
            .unwrap_or(false)
    }
}

#[derive(Debug)]
pub struct QueryCache {
    store: DashMap<QueryKey, CacheEntry>,
    epochs: DashMap<EntityKind, u64>,
    ttl: Option<Duration>,
    enabled: bool,
}

impl QueryCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            store: DashMap::new(),
            epochs: DashMap::new(),
            ttl,
            enabled: true,
        }
    }

    /// A cache that never stores anything. Invalidation epochs still advance.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(None)
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        if config.enabled {
            Self::new(config.ttl_secs.map(Duration::from_secs))
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let raw = {
            let entry = self.store.get(key)?;
            if entry.is_expired() {
                None
            } else {
                Some(entry.value.clone())
            }
        };

        let Some(raw) = raw else {
            self.store.remove_if(key, |_, entry| entry.is_expired());
            debug!(key = %key, "cache entry expired");
            return None;
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key = %key, "cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key = %key, "dropping undecodable cache entry: {}", e);
                self.store.remove(key);
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: QueryKey, value: &T) -> Result<(), CacheError> {
        if !self.enabled {
            return Ok(());
        }
        let serialized = serde_json::to_string(value)?;
        self.store.insert(key, CacheEntry::new(serialized, self.ttl));
        Ok(())
    }

    /// Stores `value` only if no invalidation of its kind happened since
    /// `epoch` was read. Returns whether the epoch was still current.
    pub fn set_if_epoch<T: Serialize>(&self, key: QueryKey, value: &T, epoch: u64) -> Result<bool, CacheError> {
        let serialized = if self.enabled {
            Some(serde_json::to_string(value)?)
        } else {
            None
        };
        // Epoch entry stays locked until the insert is done.
        let current = self.epochs.entry(key.kind).or_insert(0);
        if *current != epoch {
            debug!(key = %key, read = epoch, current = *current, "result predates invalidation, not cached");
            return Ok(false);
        }
        if let Some(serialized) = serialized {
            self.store.insert(key, CacheEntry::new(serialized, self.ttl));
        }
        Ok(true)
    }

    /// Drops every entry of `kind` and advances its epoch.
    ///
    /// Reserved for successful mutations; returns the number of entries dropped.
    pub(crate) fn invalidate(&self, kind: EntityKind) -> usize {
        let mut epoch = self.epochs.entry(kind).or_insert(0);
        *epoch += 1;
        let before = self.store.len();
        self.store.retain(|key, _| key.kind != kind);
        let dropped = before.saturating_sub(self.store.len());
        let epoch = *epoch;
        debug!(kind = %kind, dropped, epoch, "cache invalidated");
        dropped
    }

    pub fn epoch(&self, kind: EntityKind) -> u64 {
        self.epochs.get(&kind).map(|e| *e).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(None)
    }
}
