// Lifecycle rules
pub mod status_machine;

// Parent lookups for dependent columns
pub mod reference_resolver;

// List screens and mutations
pub mod list_view;
pub mod mutations;

// Joined rows and print documents
pub mod presentation;

// Service factory for dependency injection
pub mod factory;

use std::sync::Arc;
use tracing::instrument;

use crate::cache::QueryCache;
use crate::config::AppConfig;
use crate::errors::ServiceResult;
use crate::models::{EntityStatus, Lifecycle, Page, PageRequest, Record};
use crate::notifications::Notifier;
use crate::repositories::EntityRepository;

pub use factory::{AppServices, Backends, ServiceFactory};
pub use list_view::{apply_filters, DateRange, FilterComposition, ListFilters, ListSnapshot, ListViewModel, TextFilter};
pub use mutations::{AutoConfirm, ConfirmationPrompt, MutationCoordinator, MutationOutcome};
pub use presentation::{
    CustomerBlock, JobOrderDocument, JobOrderRow, JobOrderSummary, JocDocument, JocRow, QuotationDocument,
};
pub use reference_resolver::{ReferenceResolver, ReferenceSource, Resolution, LOADING};
pub use status_machine::{RowActions, StatusMachine};

/// What a page-level screen uses for one entity type.
pub struct EntityFacade<E: Record> {
    repository: Arc<dyn EntityRepository<E>>,
    cache: Arc<QueryCache>,
    notifier: Arc<dyn Notifier>,
    mutations: MutationCoordinator<E>,
    filter_mode: FilterComposition,
    page_size: u64,
}

impl<E: Record> EntityFacade<E> {
    pub fn new(
        repository: Arc<dyn EntityRepository<E>>,
        cache: Arc<QueryCache>,
        notifier: Arc<dyn Notifier>,
        config: &AppConfig,
    ) -> Self {
        let mut mutations = MutationCoordinator::new(repository.clone(), cache.clone(), notifier.clone());
        if let Some(user) = &config.acting_user {
            mutations = mutations.with_acting_user(user.clone());
        }
        Self {
            repository,
            cache,
            notifier,
            mutations,
            filter_mode: config.filter_mode,
            page_size: config.page_size(None),
        }
    }

    pub fn repository(&self) -> &Arc<dyn EntityRepository<E>> {
        &self.repository
    }

    /// A fresh list screen at the configured page size.
    pub fn list_view(&self) -> ListViewModel<E> {
        ListViewModel::new(self.repository.clone(), self.cache.clone(), self.notifier.clone(), self.page_size)
            .with_composition(self.filter_mode)
    }

    /// One server page narrowed by `filters`; pagination stays the server's.
    #[instrument(skip(self, filters), fields(kind = %E::KIND))]
    pub async fn list(&self, page: PageRequest, filters: &ListFilters) -> ServiceResult<Page<E>> {
        let mut page = list_view::cached_page(self.repository.as_ref(), &self.cache, page).await?;
        page.data = apply_filters(&page.data, filters, self.filter_mode);
        Ok(page)
    }

    pub async fn get(&self, key: &str) -> ServiceResult<E> {
        self.repository.get(key).await
    }

    pub async fn create(&self, input: E::Input) -> ServiceResult<E> {
        self.mutations.create(input).await
    }

    pub async fn update(&self, key: &str, input: E::Input) -> ServiceResult<E> {
        self.mutations.update_by_id(key, input).await
    }

    pub async fn delete(&self, key: &str, prompt: &dyn ConfirmationPrompt) -> ServiceResult<MutationOutcome<()>> {
        self.mutations.delete_by_id(key, prompt).await
    }

    pub async fn copy(&self, key: &str) -> ServiceResult<E> {
        self.mutations.copy_by_id(key).await
    }
}

impl<E: Lifecycle> EntityFacade<E> {
    pub async fn set_status(
        &self,
        key: &str,
        status: EntityStatus,
        prompt: &dyn ConfirmationPrompt,
    ) -> ServiceResult<MutationOutcome<E>> {
        self.mutations.update_status_by_id(key, status, prompt).await
    }
}
