use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{validate_date, EntityKind, EntityStatus, Lifecycle, Record};

/// Job order consolidation: several job orders shipped under one master bill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Joc {
    pub joc_no: String,
    pub no_mbl: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub joc_type: Option<String>,
    pub status: EntityStatus,
    pub agent: String,
    pub vessel: String,
    pub no_container: String,
    pub loading: String,
    pub discharge: String,
    pub etd: String,
    pub eta: String,
    pub quo_no: Option<String>,
    /// Member job orders. The backend sends a comma-separated string.
    #[serde(with = "super::string_or_seq")]
    pub jo_no: Vec<String>,
    pub customer_code: Option<String>,
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
pub struct JocInput {
    #[validate(length(min = 1, message = "No MBL is required"))]
    pub no_mbl: String,
    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "Type is required"))]
    pub joc_type: String,
    #[validate(length(min = 1, message = "Agent is required"))]
    pub agent: String,
    #[validate(length(min = 1, message = "Vessel is required"))]
    pub vessel: String,
    #[validate(length(min = 1, message = "No container is required"))]
    pub no_container: String,
    #[validate(length(min = 1, message = "Loading is required"))]
    pub loading: String,
    #[validate(length(min = 1, message = "Discharge is required"))]
    pub discharge: String,
    #[validate(custom = "validate_date")]
    pub etd: String,
    #[validate(custom = "validate_date")]
    pub eta: String,
    #[serde(with = "super::string_or_seq")]
    #[validate(length(min = 1, message = "At least one job order is required"))]
    pub jo_no: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quo_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_code: Option<String>,
    #[serde(rename = "createdBy", default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl From<&Joc> for JocInput {
    fn from(joc: &Joc) -> Self {
        Self {
            no_mbl: joc.no_mbl.clone(),
            joc_type: joc.joc_type.clone().unwrap_or_default(),
            agent: joc.agent.clone(),
            vessel: joc.vessel.clone(),
            no_container: joc.no_container.clone(),
            loading: joc.loading.clone(),
            discharge: joc.discharge.clone(),
            etd: joc.etd.clone(),
            eta: joc.eta.clone(),
            jo_no: joc.jo_no.clone(),
            quo_no: joc.quo_no.clone(),
            customer_code: joc.customer_code.clone(),
            created_by: Some(joc.created_by.clone()).filter(|u| !u.is_empty()),
        }
    }
}

impl Record for Joc {
    type Input = JocInput;

    const KIND: EntityKind = EntityKind::Joc;
    const KEY_FIELD: &'static str = "joc_no";
    const REFERENCE_FIELDS: &'static [&'static str] =
        &["no_mbl", "vessel", "agent", "no_container", "loading", "discharge", "etd", "eta"];
    const HAS_LIFECYCLE: bool = true;

    fn key(&self) -> &str {
        &self.joc_no
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

    fn build(key: String, input: JocInput, now: DateTime<Utc>) -> Self {
        let mut joc = Joc {
            joc_no: key,
            status: EntityStatus::InProgress,
            created_by: input.created_by.clone().unwrap_or_default(),
            created_at: Some(now),
            ..Default::default()
        };
        joc.apply(input, now);
        joc.updated_at = None;
        joc
    }

    fn apply(&mut self, input: JocInput, now: DateTime<Utc>) {
        self.no_mbl = input.no_mbl;
        self.joc_type = Some(input.joc_type).filter(|t| !t.is_empty());
        self.agent = input.agent;
        self.vessel = input.vessel;
        self.no_container = input.no_container;
        self.loading = input.loading;
        self.discharge = input.discharge;
        self.etd = input.etd;
        self.eta = input.eta;
        self.jo_no = input.jo_no;
        if input.quo_no.is_some() {
            self.quo_no = input.quo_no;
        }
        if input.customer_code.is_some() {
            self.customer_code = input.customer_code;
        }
        self.updated_at = Some(now);
    }

    fn stamp_creator(input: &mut JocInput, user: &str) {
        if input.created_by.as_deref().map_or(true, str::is_empty) {
            input.created_by = Some(user.to_string());
        }
    }
}

impl Lifecycle for Joc {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_job_orders_accept_string_or_array() {
        let joined: Joc =
            serde_json::from_value(serde_json::json!({"joc_no": "JOC-1", "jo_no": "JO-1, JO-2"}))
                .unwrap();
        assert_eq!(joined.jo_no, vec!["JO-1", "JO-2"]);

        let listed: Joc =
            serde_json::from_value(serde_json::json!({"joc_no": "JOC-1", "jo_no": ["JO-3"]}))
                .unwrap();
        assert_eq!(listed.jo_no, vec!["JO-3"]);

        let missing: Joc =
            serde_json::from_value(serde_json::json!({"joc_no": "JOC-1", "jo_no": null})).unwrap();
        assert!(missing.jo_no.is_empty());
    }

    #[test]
    fn member_job_orders_serialize_joined() {
        let joc = Joc {
            joc_no: "JOC-1".into(),
            jo_no: vec!["JO-1".into(), "JO-2".into()],
            ..Default::default()
        };
        let value = serde_json::to_value(&joc).unwrap();
        assert_eq!(value["jo_no"], "JO-1,JO-2");
        assert_eq!(joc.text_field("jo_no").as_deref(), Some("JO-1,JO-2"));
    }

    #[test]
    fn consolidation_needs_members() {
        let input = JocInput {
            no_mbl: "MBL-9".into(),
            joc_type: "Export".into(),
            agent: "Sing Agency".into(),
            vessel: "KMTC Jakarta".into(),
            no_container: "TGHU1234567".into(),
            loading: "Surabaya".into(),
            discharge: "Singapore".into(),
            etd: "2024-06-01".into(),
            eta: "2024-06-04".into(),
            ..Default::default()
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("jo_no"));

        let joc = Joc::build(
            "JOC-0001".into(),
            JocInput {
                jo_no: vec!["JO-0001".into()],
                ..input
            },
            Utc::now(),
        );
        assert_eq!(joc.status, EntityStatus::InProgress);
        assert_eq!(joc.lifecycle(), EntityStatus::InProgress);
    }
}
