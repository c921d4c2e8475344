use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{EntityKind, Record};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Customer {
    pub customer_code: String,
    pub partner_name: String,
    pub unit: String,
    pub address: String,
    #[serde(rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "deletedAt", skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct CustomerInput {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Partner name must be between 1 and 255 characters"
    ))]
    pub partner_name: String,
    #[validate(length(min = 1, message = "Unit is required"))]
    pub unit: String,
    #[serde(default)]
    pub address: String,
}

impl Record for Customer {
    type Input = CustomerInput;

    const KIND: EntityKind = EntityKind::Customer;
    const KEY_FIELD: &'static str = "customer_code";
    const REFERENCE_FIELDS: &'static [&'static str] = &["partner_name", "unit", "address"];

    fn key(&self) -> &str {
        &self.customer_code
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn build(key: String, input: CustomerInput, now: DateTime<Utc>) -> Self {
        Customer {
            customer_code: key,
            partner_name: input.partner_name,
            unit: input.unit,
            address: input.address,
            created_at: Some(now),
            ..Default::default()
        }
    }

    fn apply(&mut self, input: CustomerInput, now: DateTime<Utc>) {
        self.partner_name = input.partner_name;
        self.unit = input.unit;
        self.address = input.address;
        self.updated_at = Some(now);
    }
}
