//! Entities exchanged with the back-office REST backend.
//!
//! Wire names follow the backend (`quo_no`, `createdAt`, ...); the Rust
//! side uses snake_case everywhere.

use std::borrow::Cow;
use std::fmt::Debug;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use validator::{Validate, ValidationError, ValidationErrors};

pub mod auth;
pub mod cost;
pub mod customer;
pub mod job_order;
pub mod joc;
pub mod port;
pub mod quotation;
pub mod status;

pub use auth::Credentials;
pub use cost::{Cost, CostInput, Currency};
pub use customer::{Customer, CustomerInput};
pub use job_order::{JobOrder, JobOrderInput};
pub use joc::{Joc, JocInput};
pub use port::{Port, PortInput};
pub use quotation::{DeliveryMode, Quotation, QuotationInput, QuotationType};
pub use status::{EntityStatus, StatusAction, StatusFilter};

/// Every entity type the back office manages.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    Quotation,
    JobOrder,
    Joc,
    Customer,
    Port,
    Cost,
}

impl EntityKind {
    /// REST resource segment, e.g. `/quotation`.
    pub fn resource(&self) -> &'static str {
        match self {
            EntityKind::Quotation => "quotation",
            EntityKind::JobOrder => "jo",
            EntityKind::Joc => "joc",
            EntityKind::Customer => "customer",
            EntityKind::Port => "port",
            EntityKind::Cost => "cost",
        }
    }

    /// Prefix of server-assigned keys.
    pub fn key_prefix(&self) -> &'static str {
        match self {
            EntityKind::Quotation => "QUO",
            EntityKind::JobOrder => "JO",
            EntityKind::Joc => "JOC",
            EntityKind::Customer => "CUST",
            EntityKind::Port => "PORT",
            EntityKind::Cost => "COST",
        }
    }

    /// Human label used in notifications.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Quotation => "Quotation",
            EntityKind::JobOrder => "Job Order",
            EntityKind::Joc => "JOC",
            EntityKind::Customer => "Customer",
            EntityKind::Port => "Port",
            EntityKind::Cost => "Cost",
        }
    }
}

/// A record type served by the backend.
///
/// `build` and `apply` describe what the server does with an input; the
/// in-memory backend relies on them, the REST gateway does not.
pub trait Record: Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static {
    type Input: Validate + Serialize + Clone + Debug + Send + Sync + 'static;

    const KIND: EntityKind;
    /// Wire name of the identity field.
    const KEY_FIELD: &'static str;
    /// Fields a dependent list column may display through reference resolution.
    const REFERENCE_FIELDS: &'static [&'static str];
    const HAS_LIFECYCLE: bool = false;

    fn key(&self) -> &str;

    fn created_at(&self) -> Option<DateTime<Utc>>;

    fn status(&self) -> Option<EntityStatus> {
        None
    }

    /// Returns false when the record has no lifecycle.
    fn set_status(&mut self, _status: EntityStatus) -> bool {
        false
    }

    fn build(key: String, input: Self::Input, now: DateTime<Utc>) -> Self;

    /// Overwrites the editable fields; identity, status and creation stamps stay.
    fn apply(&mut self, input: Self::Input, now: DateTime<Utc>);

    /// Stamps the acting user into a create input, when the entity records one.
    fn stamp_creator(_input: &mut Self::Input, _user: &str) {}

    /// String value of a wire field, as the list screens search it.
    ///
    /// Non-string fields yield `None` and therefore never match a text search.
    fn text_field(&self, field: &str) -> Option<String> {
        let value = serde_json::to_value(self).ok()?;
        value.get(field)?.as_str().map(str::to_owned)
    }
}

/// Marker for records carrying the InProgress/Executed/Cancel lifecycle.
pub trait Lifecycle: Record {
    fn lifecycle(&self) -> EntityStatus {
        self.status().unwrap_or_default()
    }
}

/// Server-side page request. `page` is 1-based, as the backend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// From a 0-based table page index.
    pub fn from_index(page_index: u64, page_size: u64) -> Self {
        Self::new(page_index.saturating_add(1), page_size)
    }

    pub fn first(limit: u64) -> Self {
        Self::new(1, limit)
    }

    /// Rows before this page; saturates instead of overflowing.
    pub fn offset(&self) -> usize {
        let rows = self.page.saturating_sub(1).saturating_mul(self.limit);
        usize::try_from(rows).unwrap_or(usize::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pagination {
    pub total: u64,
    pub total_page: u64,
    pub current_page: u64,
}

impl Pagination {
    pub fn for_total(total: u64, request: PageRequest) -> Self {
        Self {
            total,
            total_page: total.div_ceil(request.limit.max(1)),
            current_page: request.page,
        }
    }
}

/// One server page of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn empty(request: PageRequest) -> Self {
        Self {
            data: Vec::new(),
            pagination: Pagination::for_total(0, request),
        }
    }
}

/// Response envelope used by every backend endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

impl<T> ApiEnvelope<T> {
    pub fn wrap(data: T) -> Self {
        Self {
            status: Some("success".to_string()),
            code: Some(200),
            data,
            pagination: None,
            error: None,
        }
    }
}

/// `{ "status": ... }` body of the update-status endpoints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UpdateStatusInput {
    pub status: EntityStatus,
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Parses the date formats the entry forms produce.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

pub(crate) fn validate_decimal(value: &str) -> Result<(), ValidationError> {
    if parse_decimal(value).is_some() {
        return Ok(());
    }
    let mut err = ValidationError::new("decimal");
    err.message = Some(Cow::from("must be a number"));
    err.add_param(Cow::from("value"), &value);
    Err(err)
}

/// Parses amounts as typed into the forms, tolerating thousands separators.
pub fn parse_decimal(value: &str) -> Option<Decimal> {
    let cleaned: String = value.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

pub(crate) fn validate_date(value: &str) -> Result<(), ValidationError> {
    if parse_date(value).is_some() {
        return Ok(());
    }
    let mut err = ValidationError::new("date");
    err.message = Some(Cow::from("must be a valid date"));
    err.add_param(Cow::from("value"), &value);
    Err(err)
}

/// Builds a single-field validation failure.
pub fn validation_failure(
    field: &'static str,
    code: &'static str,
    message: impl Into<Cow<'static, str>>,
) -> ValidationErrors {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    let mut errors = ValidationErrors::new();
    errors.add(field, err);
    errors
}

/// Accepts a JSON array of strings or a comma-separated string.
pub(crate) mod string_or_seq {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        One(String),
        Many(Vec<String>),
        Nothing(()),
    }

    pub fn serialize<S>(values: &[String], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&values.join(","))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let values = match Raw::deserialize(deserializer)? {
            Raw::One(joined) => joined
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_owned)
                .collect(),
            Raw::Many(values) => values,
            Raw::Nothing(()) => Vec::new(),
        };
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_is_one_based() {
        let request = PageRequest::from_index(0, 15);
        assert_eq!(request.page, 1);
        assert_eq!(request.offset(), 0);
        assert_eq!(PageRequest::new(3, 10).offset(), 20);
        assert_eq!(PageRequest::new(0, 0), PageRequest::new(1, 1));
    }

    #[test]
    fn pagination_rounds_up_pages() {
        let p = Pagination::for_total(31, PageRequest::new(2, 15));
        assert_eq!(p.total_page, 3);
        assert_eq!(p.current_page, 2);
        assert_eq!(Pagination::for_total(0, PageRequest::first(10)).total_page, 0);
    }

    #[test]
    fn page_arithmetic_saturates() {
        let last = PageRequest::from_index(u64::MAX, 10);
        assert_eq!(last.page, u64::MAX);
        assert_eq!(last.offset(), usize::MAX);
        assert_eq!(PageRequest::new(u64::MAX / 2, 100).offset(), usize::MAX);

        let unclamped: PageRequest = serde_json::from_str(r#"{"page":0,"limit":0}"#).unwrap();
        assert_eq!(unclamped.offset(), 0);
        assert_eq!(Pagination::for_total(5, unclamped).total_page, 5);
    }

    #[test]
    fn dates_accept_form_formats() {
        assert!(parse_date("2024-03-01").is_some());
        assert!(parse_date("01/03/2024").is_some());
        assert!(parse_date("2024-03-01T10:00:00Z").is_some());
        assert!(parse_date("next week").is_none());
        assert!(validate_date("").is_err());
    }

    #[test]
    fn decimals_tolerate_separators() {
        assert_eq!(parse_decimal("15,250.50"), Decimal::from_str("15250.50").ok());
        assert!(parse_decimal("  ").is_none());
        assert!(validate_decimal("abc").is_err());
    }

    #[test]
    fn envelope_tolerates_missing_metadata() {
        let envelope: ApiEnvelope<Vec<u8>> =
            serde_json::from_str(r#"{"data":[1,2],"pagination":{"total":2,"total_page":1,"current_page":1}}"#)
                .unwrap();
        assert_eq!(envelope.data, vec![1, 2]);
        assert_eq!(envelope.pagination.unwrap().total, 2);
        assert!(envelope.error.is_none());
    }

    #[test]
    fn kinds_map_to_backend_resources() {
        assert_eq!(EntityKind::JobOrder.resource(), "jo");
        assert_eq!(EntityKind::Joc.to_string(), "joc");
        assert_eq!(EntityKind::Quotation.label(), "Quotation");
    }
}
