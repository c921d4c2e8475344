use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{validate_date, EntityKind, Quotation, Record};

/// Shipment execution record raised against a quotation.
///
/// Job orders carry no status of their own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobOrder {
    pub jo_no: String,
    pub jo_date: Option<String>,
    pub quo_no: String,
    pub customer_code: String,
    pub port_code: Option<String>,
    pub shipper: String,
    pub consignee: String,
    pub hbl: String,
    pub mbl: String,
    pub etd: String,
    pub eta: String,
    pub vessel: String,
    pub qty: String,
    pub gross_weight: String,
    pub volume: String,
    pub name_of_goods: String,
    #[serde(rename = "createdBy")]
    pub created_by: String,
    #[serde(rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "deletedAt", skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct JobOrderInput {
    #[validate(length(min = 1, message = "Quotation is required"))]
    pub quo_no: String,
    #[validate(length(min = 1, message = "Customer is required"))]
    pub customer_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jo_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_code: Option<String>,
    #[validate(length(min = 1, message = "Shipper is required"))]
    pub shipper: String,
    #[validate(length(min = 1, message = "Consignee is required"))]
    pub consignee: String,
    #[validate(length(min = 1, message = "HBL is required"))]
    pub hbl: String,
    #[validate(length(min = 1, message = "MBL is required"))]
    pub mbl: String,
    #[validate(custom = "validate_date")]
    pub etd: String,
    #[validate(custom = "validate_date")]
    pub eta: String,
    #[validate(length(min = 1, message = "Vessel is required"))]
    pub vessel: String,
    #[validate(length(min = 1, message = "Qty is required"))]
    pub qty: String,
    #[validate(length(min = 1, message = "Gross weight is required"))]
    pub gross_weight: String,
    #[validate(length(min = 1, message = "Volume is required"))]
    pub volume: String,
    #[validate(length(min = 1, message = "Name of goods is required"))]
    pub name_of_goods: String,
    #[serde(rename = "createdBy", default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl JobOrderInput {
    /// Blank job order bound to `quotation`, as raised from a quotation row.
    pub fn from_quotation(quotation: &Quotation) -> Self {
        Self {
            quo_no: quotation.quo_no.clone(),
            customer_code: quotation.customer_code.clone(),
            ..Default::default()
        }
    }
}

impl From<&JobOrder> for JobOrderInput {
    fn from(jo: &JobOrder) -> Self {
        Self {
            quo_no: jo.quo_no.clone(),
            customer_code: jo.customer_code.clone(),
            jo_date: jo.jo_date.clone(),
            port_code: jo.port_code.clone(),
            shipper: jo.shipper.clone(),
            consignee: jo.consignee.clone(),
            hbl: jo.hbl.clone(),
            mbl: jo.mbl.clone(),
            etd: jo.etd.clone(),
            eta: jo.eta.clone(),
            vessel: jo.vessel.clone(),
            qty: jo.qty.clone(),
            gross_weight: jo.gross_weight.clone(),
            volume: jo.volume.clone(),
            name_of_goods: jo.name_of_goods.clone(),
            created_by: Some(jo.created_by.clone()).filter(|u| !u.is_empty()),
        }
    }
}

impl Record for JobOrder {
    type Input = JobOrderInput;

    const KIND: EntityKind = EntityKind::JobOrder;
    const KEY_FIELD: &'static str = "jo_no";
    const REFERENCE_FIELDS: &'static [&'static str] = &[
        "quo_no",
        "customer_code",
        "shipper",
        "consignee",
        "vessel",
        "hbl",
        "mbl",
        "etd",
        "eta",
    ];

    fn key(&self) -> &str {
        &self.jo_no
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn build(key: String, input: JobOrderInput, now: DateTime<Utc>) -> Self {
        let mut jo = JobOrder {
            jo_no: key,
            created_by: input.created_by.clone().unwrap_or_default(),
            created_at: Some(now),
            ..Default::default()
        };
        jo.apply(input, now);
        jo.updated_at = None;
        jo
    }

    fn apply(&mut self, input: JobOrderInput, now: DateTime<Utc>) {
        self.quo_no = input.quo_no;
        self.customer_code = input.customer_code;
        if input.jo_date.is_some() {
            self.jo_date = input.jo_date;
        }
        if input.port_code.is_some() {
            self.port_code = input.port_code;
        }
        self.shipper = input.shipper;
        self.consignee = input.consignee;
        self.hbl = input.hbl;
        self.mbl = input.mbl;
        self.etd = input.etd;
        self.eta = input.eta;
        self.vessel = input.vessel;
        self.qty = input.qty;
        self.gross_weight = input.gross_weight;
        self.volume = input.volume;
        self.name_of_goods = input.name_of_goods;
        self.updated_at = Some(now);
    }

    fn stamp_creator(input: &mut JobOrderInput, user: &str) {
        if input.created_by.as_deref().map_or(true, str::is_empty) {
            input.created_by = Some(user.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> JobOrderInput {
        JobOrderInput {
            quo_no: "QUO-0001".into(),
            customer_code: "CUST-0001".into(),
            shipper: "PT Maju Jaya".into(),
            consignee: "Sing Logistics Pte".into(),
            hbl: "HBL-1".into(),
            mbl: "MBL-1".into(),
            etd: "2024-06-01".into(),
            eta: "2024-06-04".into(),
            vessel: "KMTC Jakarta".into(),
            qty: "2".into(),
            gross_weight: "18000".into(),
            volume: "56".into(),
            name_of_goods: "Coffee beans".into(),
            ..Default::default()
        }
    }

    #[test]
    fn dates_must_parse() {
        assert!(input().validate().is_ok());
        let mut bad = input();
        bad.etd = "soon".into();
        bad.eta = String::new();
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("etd"));
        assert!(errors.field_errors().contains_key("eta"));
    }

    #[test]
    fn prefill_from_quotation_binds_parent_keys() {
        let quotation = Quotation {
            quo_no: "QUO-0009".into(),
            customer_code: "CUST-0003".into(),
            ..Default::default()
        };
        let prefilled = JobOrderInput::from_quotation(&quotation);
        assert_eq!(prefilled.quo_no, "QUO-0009");
        assert_eq!(prefilled.customer_code, "CUST-0003");
        assert!(prefilled.validate().is_err());
    }

    #[test]
    fn creator_is_stamped_only_when_missing() {
        let mut fresh = input();
        JobOrder::stamp_creator(&mut fresh, "ops@desk");
        assert_eq!(fresh.created_by.as_deref(), Some("ops@desk"));

        let mut owned = input();
        owned.created_by = Some("sales@desk".into());
        JobOrder::stamp_creator(&mut owned, "ops@desk");
        assert_eq!(owned.created_by.as_deref(), Some("sales@desk"));
    }

    #[test]
    fn built_record_reflects_input() {
        let jo = JobOrder::build("JO-0001".into(), input(), Utc::now());
        assert_eq!(jo.jo_no, "JO-0001");
        assert_eq!(JobOrderInput::from(&jo), input());
        assert!(jo.status().is_none());
    }
}
