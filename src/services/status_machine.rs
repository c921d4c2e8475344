//! Lifecycle rules shared by quotations and consolidations.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::warn;

use crate::errors::{ServiceError, ServiceResult};
use crate::models::{EntityStatus, StatusAction};

/// Actions a list row may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RowActions {
    pub edit: bool,
    pub delete: bool,
    pub execute: bool,
    pub cancel: bool,
    pub print: bool,
}

impl RowActions {
    pub fn allows(&self, action: StatusAction) -> bool {
        match action {
            StatusAction::Edit => self.edit,
            StatusAction::Delete => self.delete,
            StatusAction::Execute => self.execute,
            StatusAction::Cancel => self.cancel,
        }
    }
}

pub struct StatusMachine;

impl StatusMachine {
    /// `InProgress` allows everything, `Executed` nothing, `Cancel` only deletion.
    pub fn is_allowed(status: EntityStatus, action: StatusAction) -> bool {
        match (status, action) {
            (EntityStatus::InProgress, _) => true,
            (EntityStatus::Cancel, StatusAction::Delete) => true,
            (EntityStatus::Executed, _) | (EntityStatus::Cancel, _) => false,
        }
    }

    /// Status after `action`. Edit and Delete leave the status as it is.
    pub fn transition(status: EntityStatus, action: StatusAction) -> ServiceResult<EntityStatus> {
        if !Self::is_allowed(status, action) {
            warn!(%status, %action, "refused status action");
            return Err(ServiceError::InvalidTransition { status, action });
        }
        Ok(match action {
            StatusAction::Execute => EntityStatus::Executed,
            StatusAction::Cancel => EntityStatus::Cancel,
            StatusAction::Edit | StatusAction::Delete => status,
        })
    }

    /// Action that moves `current` into `target`, checked against the table.
    pub fn action_towards(current: EntityStatus, target: EntityStatus) -> ServiceResult<StatusAction> {
        let action = StatusAction::for_target(target).ok_or_else(|| {
            ServiceError::InvalidOperation(format!("no action leads back to {}", target))
        })?;
        Self::transition(current, action)?;
        Ok(action)
    }

    pub fn allowed_actions(status: EntityStatus) -> Vec<StatusAction> {
        StatusAction::iter()
            .filter(|action| Self::is_allowed(status, *action))
            .collect()
    }

    /// Cancelled records are never printed.
    pub fn is_printable(status: EntityStatus) -> bool {
        status != EntityStatus::Cancel
    }

    /// Row actions for a record; `None` is a record without lifecycle.
    pub fn row_actions(status: Option<EntityStatus>) -> RowActions {
        match status {
            Some(status) => RowActions {
                edit: Self::is_allowed(status, StatusAction::Edit),
                delete: Self::is_allowed(status, StatusAction::Delete),
                execute: Self::is_allowed(status, StatusAction::Execute),
                cancel: Self::is_allowed(status, StatusAction::Cancel),
                print: Self::is_printable(status),
            },
            None => RowActions {
                edit: true,
                delete: true,
                execute: false,
                cancel: false,
                print: true,
            },
        }
    }
}
