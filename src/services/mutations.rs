//! Create, update, delete and status changes with cache invalidation and
//! operator notifications.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use super::status_machine::StatusMachine;
use crate::cache::QueryCache;
use crate::errors::{ErrorSurface, ServiceError, ServiceResult};
use crate::models::{EntityStatus, Lifecycle, Record, StatusAction};
use crate::notifications::{messages, Notification, Notifier};
use crate::repositories::EntityRepository;

/// Result of a mutation that needed operator confirmation.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome<T> {
    Applied(T),
    /// The operator declined; no request was issued.
    Declined,
}

impl<T> MutationOutcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, MutationOutcome::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            MutationOutcome::Applied(value) => Some(value),
            MutationOutcome::Declined => None,
        }
    }
}

/// Asks the operator before a destructive or status-changing call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfirmationPrompt: Send + Sync {
    async fn confirm(&self, question: &str) -> bool;
}

/// Confirms everything; for scripted use.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

#[async_trait]
impl ConfirmationPrompt for AutoConfirm {
    async fn confirm(&self, _question: &str) -> bool {
        true
    }
}

pub struct MutationCoordinator<E: Record> {
    repository: Arc<dyn EntityRepository<E>>,
    cache: Arc<QueryCache>,
    notifier: Arc<dyn Notifier>,
    acting_user: Option<String>,
}

impl<E: Record> MutationCoordinator<E> {
    pub fn new(
        repository: Arc<dyn EntityRepository<E>>,
        cache: Arc<QueryCache>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            repository,
            cache,
            notifier,
            acting_user: None,
        }
    }

    /// User stamped into `createdBy` of new records.
    pub fn with_acting_user(mut self, user: impl Into<String>) -> Self {
        self.acting_user = Some(user.into());
        self
    }

    fn succeeded(&self, message: String) {
        let dropped = self.cache.invalidate(E::KIND);
        info!(kind = %E::KIND, dropped, "list cache invalidated");
        self.notifier.notify(Notification::success(message));
    }

    fn failed(&self, err: ServiceError) -> ServiceError {
        match err.surface() {
            ErrorSurface::Inline | ErrorSurface::Suppressed => {}
            ErrorSurface::Page | ErrorSurface::Notification => {
                warn!(kind = %E::KIND, error = %err, "mutation failed");
                self.notifier.notify(Notification::failure(&err));
            }
        }
        err
    }

    fn report<T>(&self, result: ServiceResult<T>, message: impl FnOnce() -> String) -> ServiceResult<T> {
        match result {
            Ok(value) => {
                self.succeeded(message());
                Ok(value)
            }
            Err(e) => Err(self.failed(e)),
        }
    }

    /// Current lifecycle status of `key`, or `None` for records without one.
    async fn current_status(&self, key: &str) -> ServiceResult<Option<EntityStatus>> {
        if !E::HAS_LIFECYCLE {
            return Ok(None);
        }
        let current = self.repository.get(key).await?;
        Ok(current.status())
    }

    async fn guard(&self, key: &str, action: StatusAction) -> ServiceResult<()> {
        if let Some(status) = self.current_status(key).await? {
            StatusMachine::transition(status, action)?;
        }
        Ok(())
    }

    /// Validates locally, then creates the record.
    #[instrument(skip(self, input), fields(kind = %E::KIND))]
    pub async fn create(&self, mut input: E::Input) -> ServiceResult<E> {
        if let Some(user) = &self.acting_user {
            E::stamp_creator(&mut input, user);
        }
        let result = match input.validate() {
            Ok(()) => self.repository.create(&input).await,
            Err(e) => Err(e.into()),
        };
        self.report(result, || messages::added(E::KIND))
    }

    /// Validates locally, then overwrites `key`. Records with a lifecycle
    /// must still allow editing.
    #[instrument(skip(self, input), fields(kind = %E::KIND))]
    pub async fn update_by_id(&self, key: &str, input: E::Input) -> ServiceResult<E> {
        let result = async {
            input.validate()?;
            self.guard(key, StatusAction::Edit).await?;
            self.repository.update(key, &input).await
        }
        .await;
        self.report(result, || messages::updated(E::KIND))
    }

    #[instrument(skip(self, prompt), fields(kind = %E::KIND))]
    pub async fn delete_by_id(
        &self,
        key: &str,
        prompt: &dyn ConfirmationPrompt,
    ) -> ServiceResult<MutationOutcome<()>> {
        if let Err(e) = self.guard(key, StatusAction::Delete).await {
            return Err(self.failed(e));
        }
        let question = format!("Delete {} {}?", E::KIND.label(), key);
        if !prompt.confirm(&question).await {
            info!(kind = %E::KIND, key, "deletion declined");
            return Ok(MutationOutcome::Declined);
        }
        let result = self.repository.delete(key).await;
        self.report(result, || messages::deleted(E::KIND))
            .map(MutationOutcome::Applied)
    }

    /// Server-side copy under a new key.
    #[instrument(skip(self), fields(kind = %E::KIND))]
    pub async fn copy_by_id(&self, key: &str) -> ServiceResult<E> {
        let result = self.repository.duplicate(key).await;
        self.report(result, messages::status_changed)
    }
}

impl<E: Lifecycle> MutationCoordinator<E> {
    /// Moves `key` to `target` when the status table allows it.
    #[instrument(skip(self, prompt), fields(kind = %E::KIND))]
    pub async fn update_status_by_id(
        &self,
        key: &str,
        target: EntityStatus,
        prompt: &dyn ConfirmationPrompt,
    ) -> ServiceResult<MutationOutcome<E>> {
        let checked = async {
            let current = self.repository.get(key).await?;
            StatusMachine::action_towards(current.lifecycle(), target)
        }
        .await;
        let action = match checked {
            Ok(action) => action,
            Err(e) => return Err(self.failed(e)),
        };

        let question = format!("{} {} {}?", action, E::KIND.label(), key);
        if !prompt.confirm(&question).await {
            info!(kind = %E::KIND, key, %action, "status change declined");
            return Ok(MutationOutcome::Declined);
        }
        let result = self.repository.update_status(key, target).await;
        self.report(result, messages::status_changed)
            .map(MutationOutcome::Applied)
    }
}
