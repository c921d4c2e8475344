use std::borrow::Cow;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use validator::{Validate, ValidationError};

use super::{parse_decimal, validate_decimal, EntityKind, EntityStatus, Lifecycle, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
pub enum QuotationType {
    Import,
    Export,
    Domestik,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
pub enum DeliveryMode {
    #[strum(serialize = "FCL")]
    Fcl,
    #[strum(serialize = "LCL")]
    Lcl,
}

/// A priced offer to a customer, precursor of job orders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Quotation {
    pub quo_no: String,
    pub customer: String,
    pub customer_code: String,
    pub sales: String,
    pub subject: String,
    pub attn: String,
    #[serde(rename = "type")]
    pub quotation_type: String,
    pub delivery: String,
    pub loading: String,
    pub discharge: String,
    pub kurs: String,
    pub status: EntityStatus,
    pub valheader: Option<String>,
    pub valfooter: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "deletedAt", skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Quotation {
    pub fn kind(&self) -> Option<QuotationType> {
        self.quotation_type.parse().ok()
    }

    pub fn delivery_mode(&self) -> Option<DeliveryMode> {
        self.delivery.parse().ok()
    }

    /// Exchange rate as a number; `None` when the backend sent something unparseable.
    pub fn kurs_rate(&self) -> Option<Decimal> {
        parse_decimal(&self.kurs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct QuotationInput {
    #[validate(length(min = 1, message = "Sales is required"))]
    pub sales: String,
    #[validate(length(min = 1, message = "Subject is required"))]
    pub subject: String,
    #[validate(length(min = 1, message = "Customer is required"))]
    pub customer: String,
    #[validate(length(min = 1, message = "Attn is required"))]
    pub attn: String,
    #[serde(rename = "type")]
    #[validate(custom = "validate_quotation_type")]
    pub quotation_type: String,
    #[validate(custom = "validate_delivery")]
    pub delivery: String,
    #[validate(length(min = 1, message = "Loading is required"))]
    pub loading: String,
    #[validate(length(min = 1, message = "Discharge is required"))]
    pub discharge: String,
    #[validate(custom = "validate_decimal")]
    pub kurs: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_code: Option<String>,
    #[serde(default)]
    pub valheader: Option<String>,
    #[serde(default)]
    pub valfooter: Option<String>,
}

impl From<&Quotation> for QuotationInput {
    fn from(q: &Quotation) -> Self {
        Self {
            sales: q.sales.clone(),
            subject: q.subject.clone(),
            customer: q.customer.clone(),
            attn: q.attn.clone(),
            quotation_type: q.quotation_type.clone(),
            delivery: q.delivery.clone(),
            loading: q.loading.clone(),
            discharge: q.discharge.clone(),
            kurs: q.kurs.clone(),
            customer_code: Some(q.customer_code.clone()).filter(|c| !c.is_empty()),
            valheader: q.valheader.clone(),
            valfooter: q.valfooter.clone(),
        }
    }
}

fn one_of(value: &str, allowed: &[&str], code: &'static str, message: &'static str) -> Result<(), ValidationError> {
    if allowed.contains(&value) {
        return Ok(());
    }
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::from(message));
    err.add_param(Cow::from("value"), &value);
    Err(err)
}

fn validate_quotation_type(value: &str) -> Result<(), ValidationError> {
    one_of(
        value,
        &["Import", "Export", "Domestik"],
        "quotation_type",
        "Type must be Import, Export or Domestik",
    )
}

fn validate_delivery(value: &str) -> Result<(), ValidationError> {
    one_of(value, &["FCL", "LCL"], "delivery", "Delivery must be FCL or LCL")
}

impl Record for Quotation {
    type Input = QuotationInput;

    const KIND: EntityKind = EntityKind::Quotation;
    const KEY_FIELD: &'static str = "quo_no";
    const REFERENCE_FIELDS: &'static [&'static str] =
        &["sales", "customer", "type", "delivery", "loading", "discharge", "subject"];
    const HAS_LIFECYCLE: bool = true;

    fn key(&self) -> &str {
        &self.quo_no
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn status(&self) -> Option<EntityStatus> {
        Some(self.status)
    }

    fn set_status(&mut self, status: EntityStatus) -> bool {
        self.status = status;
        true
    }

    fn build(key: String, input: QuotationInput, now: DateTime<Utc>) -> Self {
        let mut quotation = Quotation {
            quo_no: key,
            status: EntityStatus::InProgress,
            created_at: Some(now),
            ..Default::default()
        };
        quotation.apply(input, now);
        quotation.updated_at = None;
        quotation
    }

    fn apply(&mut self, input: QuotationInput, now: DateTime<Utc>) {
        self.sales = input.sales;
        self.subject = input.subject;
        self.customer = input.customer;
        self.attn = input.attn;
        self.quotation_type = input.quotation_type;
        self.delivery = input.delivery;
        self.loading = input.loading;
        self.discharge = input.discharge;
        self.kurs = input.kurs;
        if let Some(code) = input.customer_code {
            self.customer_code = code;
        }
        self.valheader = input.valheader;
        self.valfooter = input.valfooter;
        self.updated_at = Some(now);
    }
}

impl Lifecycle for Quotation {}
