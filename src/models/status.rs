use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Lifecycle state shared by quotations and consolidations.
///
/// `InProgress` is the only state records are created in; `Executed` and
/// `Cancel` are terminal.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
pub enum EntityStatus {
    InProgress,
    Executed,
    Cancel,
}

impl EntityStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, EntityStatus::InProgress)
    }
}

impl Default for EntityStatus {
    fn default() -> Self {
        EntityStatus::InProgress
    }
}

/// Row-level actions gated by [`EntityStatus`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
pub enum StatusAction {
    Edit,
    Delete,
    Execute,
    Cancel,
}

impl StatusAction {
    /// The action that moves a record into `target`, if any.
    ///
    /// Nothing moves a record back to `InProgress`.
    pub fn for_target(target: EntityStatus) -> Option<StatusAction> {
        match target {
            EntityStatus::Executed => Some(StatusAction::Execute),
            EntityStatus::Cancel => Some(StatusAction::Cancel),
            EntityStatus::InProgress => None,
        }
    }

    pub fn changes_status(&self) -> bool {
        matches!(self, StatusAction::Execute | StatusAction::Cancel)
    }
}

/// Status filter offered by the list screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusFilter {
    #[default]
    All,
    Only(EntityStatus),
}

impl std::str::FromStr for StatusFilter {
    type Err = strum::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        s.parse::<EntityStatus>().map(StatusFilter::Only)
    }
}
