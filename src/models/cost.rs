use std::borrow::Cow;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use validator::{Validate, ValidationError};

use super::{parse_decimal, validate_decimal, EntityKind, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
pub enum Currency {
    #[strum(serialize = "IDR")]
    Idr,
    #[strum(serialize = "USD")]
    Usd,
}

/// Cost line item of a quotation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cost {
    pub item_cost: String,
    pub quo_no: Option<String>,
    pub item_name: String,
    pub qty: String,
    pub unit: String,
    pub mata_uang: String,
    pub price: String,
    pub note: String,
    #[serde(rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "deletedAt", skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Cost {
    pub fn currency(&self) -> Option<Currency> {
        self.mata_uang.parse().ok()
    }

    /// `qty * price`, when both are numeric.
    pub fn amount(&self) -> Option<Decimal> {
        Some(parse_decimal(&self.qty)? * parse_decimal(&self.price)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct CostInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quo_no: Option<String>,
    #[validate(length(min = 1, message = "Item name is required"))]
    pub item_name: String,
    #[validate(custom = "validate_decimal")]
    pub qty: String,
    #[validate(length(min = 1, message = "Unit is required"))]
    pub unit: String,
    #[validate(custom = "validate_currency")]
    pub mata_uang: String,
    #[validate(custom = "validate_decimal")]
    pub price: String,
    #[serde(default)]
    pub note: String,
}

fn validate_currency(value: &str) -> Result<(), ValidationError> {
    if value.parse::<Currency>().is_ok() {
        return Ok(());
    }
    let mut err = ValidationError::new("currency");
    err.message = Some(Cow::from("Currency must be IDR or USD"));
    Err(err)
}

impl Record for Cost {
    type Input = CostInput;

    const KIND: EntityKind = EntityKind::Cost;
    const KEY_FIELD: &'static str = "item_cost";
    const REFERENCE_FIELDS: &'static [&'static str] =
        &["item_name", "qty", "unit", "mata_uang", "price", "note"];

    fn key(&self) -> &str {
        &self.item_cost
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn build(key: String, input: CostInput, now: DateTime<Utc>) -> Self {
        let mut cost = Cost {
            item_cost: key,
            created_at: Some(now),
            ..Default::default()
        };
        cost.apply(input, now);
        cost.updated_at = None;
        cost
    }

    fn apply(&mut self, input: CostInput, now: DateTime<Utc>) {
        if input.quo_no.is_some() {
            self.quo_no = input.quo_no;
        }
        self.item_name = input.item_name;
        self.qty = input.qty;
        self.unit = input.unit;
        self.mata_uang = input.mata_uang;
        self.price = input.price;
        self.note = input.note;
        self.updated_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn amount_multiplies_quantity_and_price() {
        let cost = Cost {
            qty: "2".into(),
            price: "1,250,000".into(),
            mata_uang: "IDR".into(),
            ..Default::default()
        };
        assert_eq!(cost.amount(), Some(dec!(2500000)));
        assert_eq!(cost.currency(), Some(Currency::Idr));
    }

    #[test]
    fn currency_is_restricted() {
        let input = CostInput {
            item_name: "Trucking".into(),
            qty: "1".into(),
            unit: "trip".into(),
            mata_uang: "EUR".into(),
            price: "100".into(),
            ..Default::default()
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("mata_uang"));
    }
}
