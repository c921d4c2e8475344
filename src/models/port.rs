use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{EntityKind, Record};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Port {
    pub port_code: String,
    pub port_name: String,
    pub caption: String,
    #[serde(rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "deletedAt", skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct PortInput {
    #[validate(length(min = 1, max = 100, message = "Port name must be between 1 and 100 characters"))]
    pub port_name: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub caption: String,
}

impl Record for Port {
    type Input = PortInput;

    const KIND: EntityKind = EntityKind::Port;
    const KEY_FIELD: &'static str = "port_code";
    const REFERENCE_FIELDS: &'static [&'static str] = &["port_name", "caption"];

    fn key(&self) -> &str {
        &self.port_code
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn build(key: String, input: PortInput, now: DateTime<Utc>) -> Self {
        Port {
            port_code: key,
            port_name: input.port_name,
            caption: input.caption,
            created_at: Some(now),
            ..Default::default()
        }
    }

    fn apply(&mut self, input: PortInput, now: DateTime<Utc>) {
        self.port_name = input.port_name;
        self.caption = input.caption;
        self.updated_at = Some(now);
    }
}
