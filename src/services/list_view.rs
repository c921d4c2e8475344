//! Row set shown by a list screen: one server page narrowed by client-side
//! text, status and date filters.
//!
//! Filters only ever look at the page that was fetched; a search never
//! reaches rows on other pages.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, instrument, warn};

use crate::cache::{QueryCache, QueryKey};
use crate::errors::{ServiceError, ServiceResult};
use crate::models::{EntityStatus, Page, PageRequest, Pagination, Record, StatusFilter};
use crate::notifications::{Notification, Notifier};
use crate::repositories::EntityRepository;

/// How active filters combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterComposition {
    /// Text search wins over the status filter, which wins over the date range.
    #[default]
    Exclusive,
    /// Every active filter narrows the rows.
    Composed,
}

/// Inclusive range of creation dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub until: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, until: NaiveDate) -> ServiceResult<Self> {
        if from > until {
            return Err(ServiceError::InvalidOperation(format!(
                "period starts {} after it ends {}",
                from, until
            )));
        }
        Ok(Self { from, until })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        self.from <= day && day <= self.until
    }
}

/// Case-insensitive substring search over one wire field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFilter {
    pub field: String,
    pub value: String,
}

impl TextFilter {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    fn is_active(&self) -> bool {
        !self.value.is_empty()
    }

    fn matches<E: Record>(&self, row: &E) -> bool {
        let needle = self.value.to_lowercase();
        row.text_field(&self.field)
            .map(|text| text.to_lowercase().contains(&needle))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListFilters {
    pub text: Option<TextFilter>,
    pub status: StatusFilter,
    pub period: Option<DateRange>,
}

impl ListFilters {
    fn active_text(&self) -> Option<&TextFilter> {
        self.text.as_ref().filter(|t| t.is_active())
    }

    fn active_status<E: Record>(&self) -> Option<EntityStatus> {
        match self.status {
            StatusFilter::Only(status) if E::HAS_LIFECYCLE => Some(status),
            _ => None,
        }
    }
}

fn in_period<E: Record>(row: &E, period: &DateRange) -> bool {
    row.created_at().map(|at| period.contains(at)).unwrap_or(false)
}

/// Narrows `rows` with `filters`. The status filter is ignored for records
/// without lifecycle.
pub fn apply_filters<E: Record>(rows: &[E], filters: &ListFilters, mode: FilterComposition) -> Vec<E> {
    let text = filters.active_text();
    let status = filters.active_status::<E>();
    let period = filters.period.as_ref();

    let keep = |row: &E| -> bool {
        match mode {
            FilterComposition::Exclusive => {
                if let Some(text) = text {
                    text.matches(row)
                } else if let Some(status) = status {
                    row.status() == Some(status)
                } else if let Some(period) = period {
                    in_period(row, period)
                } else {
                    true
                }
            }
            FilterComposition::Composed => {
                text.map_or(true, |t| t.matches(row))
                    && status.map_or(true, |s| row.status() == Some(s))
                    && period.map_or(true, |p| in_period(row, p))
            }
        }
    };

    rows.iter().filter(|row| keep(row)).cloned().collect()
}

/// Refetches allowed when mutations keep landing while a page is in flight.
const STALE_REFETCHES: usize = 2;

/// One server page, served from the query cache when present.
///
/// A page fetched across a successful mutation of its kind is never cached;
/// it is fetched again so the result reflects the mutation.
pub(crate) async fn cached_page<E: Record>(
    repository: &dyn EntityRepository<E>,
    cache: &QueryCache,
    page: PageRequest,
) -> ServiceResult<Page<E>> {
    let key = QueryKey::list(E::KIND, page);
    if let Some(cached) = cache.get::<Page<E>>(&key) {
        return Ok(cached);
    }
    let mut refetches = 0;
    loop {
        let epoch = cache.epoch(E::KIND);
        let fresh = repository.list(page).await?;
        match cache.set_if_epoch(key.clone(), &fresh, epoch) {
            Ok(true) => return Ok(fresh),
            Ok(false) if refetches < STALE_REFETCHES => {
                refetches += 1;
                debug!(kind = %E::KIND, page = page.page, "list changed while loading, refetching");
            }
            Ok(false) => {
                warn!(kind = %E::KIND, page = page.page, "list kept changing while loading, page left uncached");
                return Ok(fresh);
            }
            Err(e) => {
                warn!(kind = %E::KIND, "failed to cache page: {}", e);
                return Ok(fresh);
            }
        }
    }
}

/// What the table renders.
#[derive(Debug, Clone, PartialEq)]
pub struct ListSnapshot<E> {
    pub rows: Vec<E>,
    /// Page the rows come from; `None` before the first successful load.
    pub page: Option<PageRequest>,
    pub pagination: Pagination,
    pub filters: ListFilters,
    pub loading: bool,
    /// Message of the last failed load while older rows stay displayed.
    pub error: Option<String>,
}

struct ListState<E> {
    requested: PageRequest,
    current: Option<Page<E>>,
    displayed: Option<PageRequest>,
    filters: ListFilters,
    loading: bool,
    error: Option<String>,
}

pub struct ListViewModel<E: Record> {
    repository: Arc<dyn EntityRepository<E>>,
    cache: Arc<QueryCache>,
    notifier: Arc<dyn Notifier>,
    mode: FilterComposition,
    generation: AtomicU64,
    state: Mutex<ListState<E>>,
}

impl<E: Record> ListViewModel<E> {
    pub fn new(
        repository: Arc<dyn EntityRepository<E>>,
        cache: Arc<QueryCache>,
        notifier: Arc<dyn Notifier>,
        page_size: u64,
    ) -> Self {
        Self {
            repository,
            cache,
            notifier,
            mode: FilterComposition::default(),
            generation: AtomicU64::new(0),
            state: Mutex::new(ListState {
                requested: PageRequest::first(page_size),
                current: None,
                displayed: None,
                filters: ListFilters::default(),
                loading: false,
                error: None,
            }),
        }
    }

    pub fn with_composition(mut self, mode: FilterComposition) -> Self {
        self.mode = mode;
        self
    }

    fn state(&self) -> MutexGuard<'_, ListState<E>> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fetches `page` and makes it the displayed page, unless a newer load
    /// was issued meanwhile. A mutation landing mid-flight makes the fetch
    /// start over. On failure the previous rows stay displayed.
    #[instrument(skip(self), fields(kind = %E::KIND))]
    pub async fn load_page(&self, page: PageRequest) -> ServiceResult<ListSnapshot<E>> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.state();
            state.requested = page;
            state.loading = true;
        }

        let result = cached_page(self.repository.as_ref(), &self.cache, page).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(page = page.page, "discarding response for superseded request");
            return Ok(self.snapshot());
        }

        match result {
            Ok(fresh) => {
                {
                    let mut state = self.state();
                    state.current = Some(fresh);
                    state.displayed = Some(page);
                    state.loading = false;
                    state.error = None;
                }
                Ok(self.snapshot())
            }
            Err(e) => {
                {
                    let mut state = self.state();
                    state.loading = false;
                    state.error = Some(e.user_message());
                }
                self.notifier.notify(Notification::failure(&e));
                Err(e)
            }
        }
    }

    /// Re-issues the last requested page.
    pub async fn refresh(&self) -> ServiceResult<ListSnapshot<E>> {
        let page = self.state().requested;
        self.load_page(page).await
    }

    /// Loads a 0-based table page index at the current page size.
    pub async fn go_to(&self, page_index: u64) -> ServiceResult<ListSnapshot<E>> {
        let limit = self.state().requested.limit;
        self.load_page(PageRequest::from_index(page_index, limit)).await
    }

    pub async fn next_page(&self) -> ServiceResult<ListSnapshot<E>> {
        let requested = self.state().requested;
        self.load_page(PageRequest::new(requested.page.saturating_add(1), requested.limit))
            .await
    }

    pub async fn previous_page(&self) -> ServiceResult<ListSnapshot<E>> {
        let requested = self.state().requested;
        self.load_page(PageRequest::new(requested.page.saturating_sub(1), requested.limit))
            .await
    }

    /// Changes the page size and goes back to the first page.
    pub async fn set_page_size(&self, limit: u64) -> ServiceResult<ListSnapshot<E>> {
        self.load_page(PageRequest::first(limit)).await
    }

    pub fn set_search(&self, field: impl Into<String>, value: impl Into<String>) -> ListSnapshot<E> {
        self.state().filters.text = Some(TextFilter::new(field, value));
        self.snapshot()
    }

    pub fn clear_search(&self) -> ListSnapshot<E> {
        self.state().filters.text = None;
        self.snapshot()
    }

    pub fn set_status_filter(&self, status: StatusFilter) -> ListSnapshot<E> {
        self.state().filters.status = status;
        self.snapshot()
    }

    pub fn set_period(&self, period: Option<DateRange>) -> ListSnapshot<E> {
        self.state().filters.period = period;
        self.snapshot()
    }

    pub fn filters(&self) -> ListFilters {
        self.state().filters.clone()
    }

    pub fn snapshot(&self) -> ListSnapshot<E> {
        let state = self.state();
        let (rows, pagination) = match &state.current {
            Some(page) => (apply_filters(&page.data, &state.filters, self.mode), page.pagination),
            None => (Vec::new(), Pagination::default()),
        };
        ListSnapshot {
            rows,
            page: state.displayed,
            pagination,
            filters: state.filters.clone(),
            loading: state.loading,
            error: state.error.clone(),
        }
    }

    pub fn rows(&self) -> Vec<E> {
        self.snapshot().rows
    }
}
