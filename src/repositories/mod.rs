//! Paginated CRUD gateways, one per entity type. No business rules live here.

use async_trait::async_trait;

use crate::errors::{ServiceError, ServiceResult};
use crate::models::{EntityStatus, Page, PageRequest, Record};

pub mod memory;
pub mod rest;

pub use memory::{CallCounts, InMemoryRepository};
pub use rest::{build_client, RestRepository};

#[async_trait]
pub trait EntityRepository<E: Record>: Send + Sync {
    async fn list(&self, page: PageRequest) -> ServiceResult<Page<E>>;

    async fn get(&self, key: &str) -> ServiceResult<E>;

    async fn create(&self, input: &E::Input) -> ServiceResult<E>;

    async fn update(&self, key: &str, input: &E::Input) -> ServiceResult<E>;

    async fn delete(&self, key: &str) -> ServiceResult<()>;

    async fn update_status(&self, key: &str, status: EntityStatus) -> ServiceResult<E> {
        let _ = status;
        Err(ServiceError::InvalidOperation(format!(
            "{} {} has no status",
            E::KIND.label(),
            key
        )))
    }

    /// Server-side copy of a record under a new key.
    async fn duplicate(&self, key: &str) -> ServiceResult<E> {
        Err(ServiceError::InvalidOperation(format!(
            "{} {} cannot be copied",
            E::KIND.label(),
            key
        )))
    }
}
