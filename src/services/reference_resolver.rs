//! Foreign-key lookups for list columns and print documents.
//!
//! Lookups are cached per `(kind, key)` and coalesced: concurrent callers for
//! the same key share one in-flight request. Every entry of a kind is dropped
//! as soon as the query cache reports an invalidation of that kind.

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::QueryCache;
use crate::errors::{ServiceError, ServiceResult};
use crate::models::{EntityKind, Record};
use crate::repositories::EntityRepository;

/// Placeholder rendered while a lookup has not completed.
pub const LOADING: &str = "Loading...";

/// Display strings of a referenced record, by wire field name.
pub type ReferenceFields = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(Arc<ReferenceFields>),
    NotFound,
    /// The lookup failed in transport; not cached, the next call retries.
    Unavailable(String),
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        match self {
            Resolution::Found(fields) => fields.get(name).map(String::as_str),
            _ => None,
        }
    }

    /// Column text: the field value, empty for a missing parent, the loading
    /// placeholder when the parent could not be reached.
    pub fn display(&self, field: &str) -> String {
        match self {
            Resolution::Found(fields) => fields.get(field).cloned().unwrap_or_default(),
            Resolution::NotFound => String::new(),
            Resolution::Unavailable(_) => LOADING.to_string(),
        }
    }

    /// Field value for a fully resolved document; transport failures propagate.
    pub fn require(&self, field: &str) -> ServiceResult<String> {
        match self {
            Resolution::Found(fields) => Ok(fields.get(field).cloned().unwrap_or_default()),
            Resolution::NotFound => Ok(String::new()),
            Resolution::Unavailable(message) => Err(ServiceError::NetworkError(message.clone())),
        }
    }
}

/// Where lookups for one entity kind go.
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    fn kind(&self) -> EntityKind;

    /// `Ok(None)` when the record does not exist.
    async fn fetch(&self, key: &str) -> ServiceResult<Option<ReferenceFields>>;
}

/// Looks references up through an entity repository.
pub struct RepositorySource<E: Record> {
    repository: Arc<dyn EntityRepository<E>>,
}

impl<E: Record> RepositorySource<E> {
    pub fn new(repository: Arc<dyn EntityRepository<E>>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl<E: Record> ReferenceSource for RepositorySource<E> {
    fn kind(&self) -> EntityKind {
        E::KIND
    }

    async fn fetch(&self, key: &str) -> ServiceResult<Option<ReferenceFields>> {
        match self.repository.get(key).await {
            Ok(record) => Ok(Some(reference_fields(&record)?)),
            Err(ServiceError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Key and reference fields of `record` as display strings.
pub fn reference_fields<E: Record>(record: &E) -> ServiceResult<ReferenceFields> {
    let value = serde_json::to_value(record)?;
    let mut fields = ReferenceFields::new();
    for name in std::iter::once(&E::KEY_FIELD).chain(E::REFERENCE_FIELDS.iter()) {
        let text = match value.get(*name) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => continue,
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(","),
            Some(other) => other.to_string(),
        };
        fields.insert((*name).to_string(), text);
    }
    Ok(fields)
}

type Lookup = Shared<BoxFuture<'static, Resolution>>;

struct Slot {
    id: u64,
    epoch: u64,
    lookup: Lookup,
}

pub struct ReferenceResolver {
    sources: HashMap<EntityKind, Arc<dyn ReferenceSource>>,
    cache: Arc<QueryCache>,
    entries: DashMap<(EntityKind, String), Slot>,
    seen_epochs: DashMap<EntityKind, u64>,
    next_slot: AtomicU64,
    fetches: Arc<AtomicUsize>,
}

impl ReferenceResolver {
    pub fn new(cache: Arc<QueryCache>) -> Self {
        Self {
            sources: HashMap::new(),
            cache,
            entries: DashMap::new(),
            seen_epochs: DashMap::new(),
            next_slot: AtomicU64::new(0),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_source(mut self, source: Arc<dyn ReferenceSource>) -> Self {
        self.sources.insert(source.kind(), source);
        self
    }

    /// Registers `repository` as the lookup source for `E`.
    pub fn register<E: Record>(self, repository: Arc<dyn EntityRepository<E>>) -> Self {
        self.with_source(Arc::new(RepositorySource::new(repository)))
    }

    /// Underlying fetches issued so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops the whole kind when the query cache moved to a new epoch.
    fn sync_epoch(&self, kind: EntityKind) -> u64 {
        let current = self.cache.epoch(kind);
        let stale = {
            let mut seen = self.seen_epochs.entry(kind).or_insert(current);
            let stale = *seen != current;
            *seen = current;
            stale
        };
        if stale {
            self.entries.retain(|(k, _), _| *k != kind);
            debug!(%kind, epoch = current, "reference cache wiped");
        }
        current
    }

    fn start_lookup(&self, source: Arc<dyn ReferenceSource>, key: String, epoch: u64) -> Slot {
        let fetches = Arc::clone(&self.fetches);
        let lookup = async move {
            fetches.fetch_add(1, Ordering::SeqCst);
            match source.fetch(&key).await {
                Ok(Some(fields)) => Resolution::Found(Arc::new(fields)),
                Ok(None) => Resolution::NotFound,
                Err(e) => {
                    warn!(kind = %source.kind(), %key, "reference lookup failed: {}", e);
                    Resolution::Unavailable(e.user_message())
                }
            }
        }
        .boxed()
        .shared();
        Slot {
            id: self.next_slot.fetch_add(1, Ordering::SeqCst),
            epoch,
            lookup,
        }
    }

    /// Resolves `key` of `kind`. Never fails: missing parents are `NotFound`,
    /// unreachable ones `Unavailable`.
    pub async fn resolve(&self, kind: EntityKind, key: &str) -> Resolution {
        if key.trim().is_empty() {
            return Resolution::NotFound;
        }
        let Some(source) = self.sources.get(&kind).cloned() else {
            warn!(%kind, "no reference source registered");
            return Resolution::Unavailable(format!("{} lookups are not configured", kind.label()));
        };
        let epoch = self.sync_epoch(kind);

        let (id, lookup) = {
            let mut slot = self
                .entries
                .entry((kind, key.to_string()))
                .or_insert_with(|| self.start_lookup(Arc::clone(&source), key.to_string(), epoch));
            if slot.epoch != epoch {
                *slot = self.start_lookup(source, key.to_string(), epoch);
            } else {
                debug!(%kind, %key, "reference lookup shared");
            }
            (slot.id, slot.lookup.clone())
        };

        let resolution = lookup.await;
        if matches!(resolution, Resolution::Unavailable(_)) {
            self.entries
                .remove_if(&(kind, key.to_string()), |_, slot| slot.id == id);
        }
        resolution
    }

    /// Resolves every key concurrently; the result lines up with `keys`.
    pub async fn resolve_many(&self, kind: EntityKind, keys: &[String]) -> Vec<Resolution> {
        join_all(keys.iter().map(|key| self.resolve(kind, key))).await
    }

    /// Completed resolution for `key`, without waiting.
    pub fn peek(&self, kind: EntityKind, key: &str) -> Option<Resolution> {
        let current = self.cache.epoch(kind);
        let slot = self.entries.get(&(kind, key.to_string()))?;
        if slot.epoch != current {
            return None;
        }
        slot.lookup.peek().cloned()
    }

    /// Column text right now: the resolved field or the loading placeholder.
    pub fn display_now(&self, kind: EntityKind, key: &str, field: &str) -> String {
        match self.peek(kind, key) {
            Some(resolution) => resolution.display(field),
            None => LOADING.to_string(),
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
