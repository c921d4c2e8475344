//! Freight Desk
//!
//! Back-office core for a freight forwarder: quotations, job orders, job
//! order consolidations, customers and ports, their status rules, list
//! screens, parent lookups and mutations over the back-office REST API.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod cache;
pub mod config;
pub mod errors;
pub mod models;
pub mod notifications;
pub mod repositories;
pub mod services;

/// Common imports for screens and tools built on the core.
pub mod prelude {
    pub use crate::cache::{QueryCache, QueryKey};
    pub use crate::config::{load_config, AppConfig};
    pub use crate::errors::{ErrorSurface, ServiceError, ServiceResult};
    pub use crate::models::{
        Customer, CustomerInput, EntityKind, EntityStatus, JobOrder, JobOrderInput, Joc, JocInput, Lifecycle,
        Page, PageRequest, Pagination, Port, PortInput, Quotation, QuotationInput, Record, StatusAction,
        StatusFilter,
    };
    pub use crate::notifications::{Notification, NotificationCenter, NotificationLevel, Notifier};
    pub use crate::repositories::{EntityRepository, InMemoryRepository, RestRepository};
    pub use crate::services::{
        AppServices, AutoConfirm, ConfirmationPrompt, DateRange, EntityFacade, FilterComposition, ListFilters,
        ListViewModel, MutationCoordinator, MutationOutcome, ReferenceResolver, Resolution, RowActions,
        StatusMachine,
    };
}
