use std::sync::Arc;
use tracing::info;

use crate::{
    cache::QueryCache,
    config::AppConfig,
    errors::ServiceResult,
    models::{Cost, Customer, EntityKind, JobOrder, JobOrderInput, Joc, PageRequest, Port, Quotation, Record},
    notifications::NotificationCenter,
    repositories::{build_client, EntityRepository, InMemoryRepository, RestRepository},
    services::{
        list_view::ListFilters,
        presentation::{self, JobOrderDocument, JobOrderRow, JocDocument, JocRow, QuotationDocument},
        reference_resolver::{ReferenceResolver, Resolution},
        EntityFacade,
    },
};

/// One repository per entity type.
#[derive(Clone)]
pub struct Backends {
    pub quotations: Arc<dyn EntityRepository<Quotation>>,
    pub job_orders: Arc<dyn EntityRepository<JobOrder>>,
    pub jocs: Arc<dyn EntityRepository<Joc>>,
    pub customers: Arc<dyn EntityRepository<Customer>>,
    pub ports: Arc<dyn EntityRepository<Port>>,
    pub costs: Arc<dyn EntityRepository<Cost>>,
}

impl Backends {
    /// In-process backends, empty.
    pub fn in_memory() -> Self {
        Self {
            quotations: Arc::new(InMemoryRepository::<Quotation>::new()),
            job_orders: Arc::new(InMemoryRepository::<JobOrder>::new()),
            jocs: Arc::new(InMemoryRepository::<Joc>::new()),
            customers: Arc::new(InMemoryRepository::<Customer>::new()),
            ports: Arc::new(InMemoryRepository::<Port>::new()),
            costs: Arc::new(InMemoryRepository::<Cost>::new()),
        }
    }

    /// REST gateways sharing one HTTP client.
    pub fn rest(config: &AppConfig) -> ServiceResult<Self> {
        let client = build_client(config)?;
        Ok(Self {
            quotations: Arc::new(RestRepository::<Quotation>::from_config(client.clone(), config)?),
            job_orders: Arc::new(RestRepository::<JobOrder>::from_config(client.clone(), config)?),
            jocs: Arc::new(RestRepository::<Joc>::from_config(client.clone(), config)?),
            customers: Arc::new(RestRepository::<Customer>::from_config(client.clone(), config)?),
            ports: Arc::new(RestRepository::<Port>::from_config(client.clone(), config)?),
            costs: Arc::new(RestRepository::<Cost>::from_config(client, config)?),
        })
    }
}

/// Factory for creating service instances with shared dependencies
pub struct ServiceFactory {
    config: Arc<AppConfig>,
    cache: Arc<QueryCache>,
    notifications: Arc<NotificationCenter>,
}

impl ServiceFactory {
    pub fn new(config: AppConfig) -> Self {
        Self {
            cache: Arc::new(QueryCache::from_config(&config.cache)),
            notifications: Arc::new(NotificationCenter::new(config.notification_capacity)),
            config: Arc::new(config),
        }
    }

    /// Facade for one entity type over `repository`
    pub fn facade<E: Record>(&self, repository: Arc<dyn EntityRepository<E>>) -> EntityFacade<E> {
        EntityFacade::new(
            repository,
            self.cache.clone(),
            self.notifications.clone(),
            &self.config,
        )
    }

    /// Resolver with a lookup source for every entity type
    pub fn resolver(&self, backends: &Backends) -> ReferenceResolver {
        ReferenceResolver::new(self.cache.clone())
            .register::<Quotation>(backends.quotations.clone())
            .register::<JobOrder>(backends.job_orders.clone())
            .register::<Joc>(backends.jocs.clone())
            .register::<Customer>(backends.customers.clone())
            .register::<Port>(backends.ports.clone())
            .register::<Cost>(backends.costs.clone())
    }

    pub fn config(&self) -> &Arc<AppConfig> {
        &self.config
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn notifications(&self) -> &Arc<NotificationCenter> {
        &self.notifications
    }
}

/// Service container holding all service instances
#[derive(Clone)]
pub struct AppServices {
    pub quotations: Arc<EntityFacade<Quotation>>,
    pub job_orders: Arc<EntityFacade<JobOrder>>,
    pub jocs: Arc<EntityFacade<Joc>>,
    pub customers: Arc<EntityFacade<Customer>>,
    pub ports: Arc<EntityFacade<Port>>,
    pub costs: Arc<EntityFacade<Cost>>,
    pub resolver: Arc<ReferenceResolver>,
    pub notifications: Arc<NotificationCenter>,
    cache: Arc<QueryCache>,
    config: Arc<AppConfig>,
}

impl AppServices {
    pub fn new(factory: &ServiceFactory, backends: Backends) -> Self {
        Self {
            resolver: Arc::new(factory.resolver(&backends)),
            quotations: Arc::new(factory.facade(backends.quotations)),
            job_orders: Arc::new(factory.facade(backends.job_orders)),
            jocs: Arc::new(factory.facade(backends.jocs)),
            customers: Arc::new(factory.facade(backends.customers)),
            ports: Arc::new(factory.facade(backends.ports)),
            costs: Arc::new(factory.facade(backends.costs)),
            notifications: factory.notifications().clone(),
            cache: factory.cache().clone(),
            config: factory.config().clone(),
        }
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(&ServiceFactory::new(config), Backends::in_memory())
    }

    /// Services over the REST backend named in `config`.
    pub fn connect(config: AppConfig) -> ServiceResult<Self> {
        let backends = Backends::rest(&config)?;
        info!(api = %config.api_base_url, "using REST backend");
        Ok(Self::new(&ServiceFactory::new(config), backends))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub async fn resolve_reference(&self, kind: EntityKind, key: &str) -> Resolution {
        self.resolver.resolve(kind, key).await
    }

    /// Job order input pre-filled from quotation `quo_no`.
    pub async fn job_order_input_for(&self, quo_no: &str) -> ServiceResult<JobOrderInput> {
        let quotation = self.quotations.get(quo_no).await?;
        Ok(JobOrderInput::from_quotation(&quotation))
    }

    pub async fn job_order_rows(&self, page: PageRequest, filters: &ListFilters) -> ServiceResult<Vec<JobOrderRow>> {
        let page = self.job_orders.list(page, filters).await?;
        Ok(presentation::job_order_rows(&self.resolver, &page.data).await)
    }

    pub async fn joc_rows(&self, page: PageRequest, filters: &ListFilters) -> ServiceResult<Vec<JocRow>> {
        let page = self.jocs.list(page, filters).await?;
        Ok(presentation::joc_rows(&self.resolver, &page.data).await)
    }

    pub async fn print_quotation(&self, quo_no: &str) -> ServiceResult<QuotationDocument> {
        let quotation = self.quotations.get(quo_no).await?;
        QuotationDocument::assemble(quotation, &self.resolver).await
    }

    pub async fn print_job_order(&self, jo_no: &str) -> ServiceResult<JobOrderDocument> {
        let job_order = self.job_orders.get(jo_no).await?;
        JobOrderDocument::assemble(job_order, &self.resolver).await
    }

    pub async fn print_joc(&self, joc_no: &str) -> ServiceResult<JocDocument> {
        let joc = self.jocs.get(joc_no).await?;
        JocDocument::assemble(joc, &self.resolver).await
    }
}
