//! In-process backend with the server semantics the core relies on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::debug;

use super::EntityRepository;
use crate::errors::{ServiceError, ServiceResult};
use crate::models::{EntityStatus, Page, PageRequest, Pagination, Record};

#[derive(Debug, Clone)]
struct Stored<E> {
    record: E,
    deleted_at: Option<DateTime<Utc>>,
}

/// Per-operation call counts, including failed calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list: usize,
    pub get: usize,
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub update_status: usize,
    pub duplicate: usize,
}

#[derive(Debug, Default)]
struct Counters {
    list: AtomicUsize,
    get: AtomicUsize,
    create: AtomicUsize,
    update: AtomicUsize,
    delete: AtomicUsize,
    update_status: AtomicUsize,
    duplicate: AtomicUsize,
}

/// Records live in insertion order; soft-deleted ones are hidden from every
/// read and answer `NotFound`.
#[derive(Debug)]
pub struct InMemoryRepository<E: Record> {
    records: RwLock<Vec<Stored<E>>>,
    sequence: AtomicU64,
    counters: Counters,
    latency: Option<Duration>,
    page_latency: HashMap<u64, Duration>,
    unavailable: AtomicBool,
}

impl<E: Record> InMemoryRepository<E> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            sequence: AtomicU64::new(0),
            counters: Counters::default(),
            latency: None,
            page_latency: HashMap::new(),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Delays every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Delays list calls for one page, overriding the general latency.
    pub fn with_page_latency(mut self, page: u64, latency: Duration) -> Self {
        self.page_latency.insert(page, latency);
        self
    }

    /// Seeds a record as if the server already held it.
    pub fn insert(&self, record: E) {
        let mut records = self.write();
        match records.iter_mut().find(|s| s.record.key() == record.key()) {
            Some(existing) => {
                existing.record = record;
                existing.deleted_at = None;
            }
            None => records.push(Stored {
                record,
                deleted_at: None,
            }),
        }
    }

    /// Makes every subsequent call fail with a network error until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn calls(&self) -> CallCounts {
        let c = &self.counters;
        CallCounts {
            list: c.list.load(Ordering::SeqCst),
            get: c.get.load(Ordering::SeqCst),
            create: c.create.load(Ordering::SeqCst),
            update: c.update.load(Ordering::SeqCst),
            delete: c.delete.load(Ordering::SeqCst),
            update_status: c.update_status.load(Ordering::SeqCst),
            duplicate: c.duplicate.load(Ordering::SeqCst),
        }
    }

    /// Live (not soft-deleted) records.
    pub fn len(&self) -> usize {
        self.read().iter().filter(|s| s.deleted_at.is_none()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Soft-delete timestamp of `key`, if the record exists and was deleted.
    pub fn deleted_at(&self, key: &str) -> Option<DateTime<Utc>> {
        self.read()
            .iter()
            .find(|s| s.record.key() == key)
            .and_then(|s| s.deleted_at)
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Stored<E>>> {
        self.records
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Stored<E>>> {
        self.records
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_key(&self) -> String {
        loop {
            let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
            let key = format!("{}-{:04}", E::KIND.key_prefix(), n);
            if !self.read().iter().any(|s| s.record.key() == key) {
                return key;
            }
        }
    }

    async fn enter(&self, counter: &AtomicUsize, page: Option<u64>) -> ServiceResult<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        let delay = page
            .and_then(|p| self.page_latency.get(&p).copied())
            .or(self.latency);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ServiceError::NetworkError(format!(
                "{} backend unreachable",
                E::KIND
            )));
        }
        Ok(())
    }

    fn with_live<T>(&self, key: &str, f: impl FnOnce(&mut E) -> T) -> ServiceResult<T> {
        let mut records = self.write();
        records
            .iter_mut()
            .find(|s| s.record.key() == key && s.deleted_at.is_none())
            .map(|s| f(&mut s.record))
            .ok_or_else(|| ServiceError::not_found(E::KIND, key))
    }
}

impl<E: Record> Default for InMemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Record> EntityRepository<E> for InMemoryRepository<E> {
    async fn list(&self, page: PageRequest) -> ServiceResult<Page<E>> {
        self.enter(&self.counters.list, Some(page.page)).await?;
        let records = self.read();
        let live: Vec<&E> = records
            .iter()
            .filter(|s| s.deleted_at.is_none())
            .map(|s| &s.record)
            .collect();
        let data = live
            .iter()
            .skip(page.offset())
            .take(usize::try_from(page.limit).unwrap_or(usize::MAX))
            .map(|r| (*r).clone())
            .collect();
        Ok(Page {
            data,
            pagination: Pagination::for_total(live.len() as u64, page),
        })
    }

    async fn get(&self, key: &str) -> ServiceResult<E> {
        self.enter(&self.counters.get, None).await?;
        self.read()
            .iter()
            .find(|s| s.record.key() == key && s.deleted_at.is_none())
            .map(|s| s.record.clone())
            .ok_or_else(|| ServiceError::not_found(E::KIND, key))
    }

    async fn create(&self, input: &E::Input) -> ServiceResult<E> {
        self.enter(&self.counters.create, None).await?;
        let record = E::build(self.next_key(), input.clone(), Utc::now());
        debug!(kind = %E::KIND, key = record.key(), "record created");
        self.write().push(Stored {
            record: record.clone(),
            deleted_at: None,
        });
        Ok(record)
    }

    async fn update(&self, key: &str, input: &E::Input) -> ServiceResult<E> {
        self.enter(&self.counters.update, None).await?;
        self.with_live(key, |record| {
            record.apply(input.clone(), Utc::now());
            record.clone()
        })
    }

    async fn delete(&self, key: &str) -> ServiceResult<()> {
        self.enter(&self.counters.delete, None).await?;
        let mut records = self.write();
        let stored = records
            .iter_mut()
            .find(|s| s.record.key() == key && s.deleted_at.is_none())
            .ok_or_else(|| ServiceError::not_found(E::KIND, key))?;
        stored.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn update_status(&self, key: &str, status: EntityStatus) -> ServiceResult<E> {
        self.enter(&self.counters.update_status, None).await?;
        self.with_live(key, |record| record.set_status(status).then(|| record.clone()))?
            .ok_or_else(|| {
                ServiceError::InvalidOperation(format!("{} {} has no status", E::KIND.label(), key))
            })
    }

    async fn duplicate(&self, key: &str) -> ServiceResult<E> {
        self.enter(&self.counters.duplicate, None).await?;
        let source = self.with_live(key, |record| record.clone())?;

        let mut value = serde_json::to_value(&source)?;
        if let Some(fields) = value.as_object_mut() {
            fields.insert(E::KEY_FIELD.to_string(), self.next_key().into());
            fields.insert("createdAt".to_string(), serde_json::to_value(Utc::now())?);
            fields.remove("updatedAt");
            fields.remove("deletedAt");
        }
        let mut copy: E = serde_json::from_value(value)?;
        copy.set_status(EntityStatus::InProgress);

        self.write().push(Stored {
            record: copy.clone(),
            deleted_at: None,
        });
        Ok(copy)
    }
}
