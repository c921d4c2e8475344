//! Joined list rows and print-ready documents.
//!
//! Rows tolerate missing or unreachable parents; documents only tolerate
//! missing ones, since the printer performs no lookups of its own.

use futures::future::join;
use rust_decimal::Decimal;
use serde::Serialize;

use super::reference_resolver::{ReferenceResolver, Resolution};
use super::status_machine::{RowActions, StatusMachine};
use crate::errors::{ServiceError, ServiceResult};
use crate::models::{Customer, EntityKind, JobOrder, Joc, Quotation, Record};

/// Member job order as listed under a consolidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobOrderSummary {
    pub jo_no: String,
    pub shipper: String,
    pub consignee: String,
    pub vessel: String,
    pub hbl: String,
}

impl JobOrderSummary {
    fn shown(jo_no: &str, r: &Resolution) -> Self {
        Self {
            jo_no: jo_no.to_string(),
            shipper: r.display("shipper"),
            consignee: r.display("consignee"),
            vessel: r.display("vessel"),
            hbl: r.display("hbl"),
        }
    }

    fn required(jo_no: &str, r: &Resolution) -> ServiceResult<Self> {
        Ok(Self {
            jo_no: jo_no.to_string(),
            shipper: r.require("shipper")?,
            consignee: r.require("consignee")?,
            vessel: r.require("vessel")?,
            hbl: r.require("hbl")?,
        })
    }
}

/// Job order list row with its quotation and customer columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobOrderRow {
    pub job_order: JobOrder,
    pub sales: String,
    #[serde(rename = "type")]
    pub quotation_type: String,
    pub loading: String,
    pub discharge: String,
    pub customer_name: String,
    pub actions: RowActions,
}

impl JobOrderRow {
    fn joined(job_order: &JobOrder, quotation: &Resolution, customer: &Resolution) -> Self {
        Self {
            job_order: job_order.clone(),
            sales: quotation.display("sales"),
            quotation_type: quotation.display("type"),
            loading: quotation.display("loading"),
            discharge: quotation.display("discharge"),
            customer_name: customer.display("partner_name"),
            actions: StatusMachine::row_actions(job_order.status()),
        }
    }
}

/// Consolidation list row with its member job orders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JocRow {
    pub joc: Joc,
    pub members: Vec<JobOrderSummary>,
    pub actions: RowActions,
}

/// Resolution already at hand, or `None` while the lookup is in flight.
fn settled(resolver: &ReferenceResolver, kind: EntityKind, key: &str) -> Option<Resolution> {
    if key.trim().is_empty() {
        return Some(Resolution::NotFound);
    }
    resolver.peek(kind, key)
}

fn pending_or(resolution: Option<Resolution>) -> Resolution {
    resolution.unwrap_or_else(|| Resolution::Unavailable("lookup in flight".to_string()))
}

/// Joins job orders with their quotation and customer, awaiting every lookup.
pub async fn job_order_rows(resolver: &ReferenceResolver, job_orders: &[JobOrder]) -> Vec<JobOrderRow> {
    let quo_keys: Vec<String> = job_orders.iter().map(|jo| jo.quo_no.clone()).collect();
    let customer_keys: Vec<String> = job_orders.iter().map(|jo| jo.customer_code.clone()).collect();
    let (quotations, customers) = join(
        resolver.resolve_many(EntityKind::Quotation, &quo_keys),
        resolver.resolve_many(EntityKind::Customer, &customer_keys),
    )
    .await;

    job_orders
        .iter()
        .zip(quotations.iter().zip(customers.iter()))
        .map(|(jo, (quotation, customer))| JobOrderRow::joined(jo, quotation, customer))
        .collect()
}

/// Same rows without waiting; columns still loading show the placeholder.
pub fn job_order_rows_now(resolver: &ReferenceResolver, job_orders: &[JobOrder]) -> Vec<JobOrderRow> {
    job_orders
        .iter()
        .map(|jo| {
            let quotation = pending_or(settled(resolver, EntityKind::Quotation, &jo.quo_no));
            let customer = pending_or(settled(resolver, EntityKind::Customer, &jo.customer_code));
            JobOrderRow::joined(jo, &quotation, &customer)
        })
        .collect()
}

pub async fn joc_rows(resolver: &ReferenceResolver, jocs: &[Joc]) -> Vec<JocRow> {
    let mut rows = Vec::with_capacity(jocs.len());
    for joc in jocs {
        let members = resolver.resolve_many(EntityKind::JobOrder, &joc.jo_no).await;
        rows.push(JocRow {
            joc: joc.clone(),
            members: joc
                .jo_no
                .iter()
                .zip(members.iter())
                .map(|(jo_no, r)| JobOrderSummary::shown(jo_no, r))
                .collect(),
            actions: StatusMachine::row_actions(joc.status()),
        });
    }
    rows
}

fn refuse_cancelled<E: Record>(record: &E) -> ServiceResult<()> {
    match record.status() {
        Some(status) if !StatusMachine::is_printable(status) => Err(ServiceError::InvalidOperation(
            format!("{} {} is {} and cannot be printed", E::KIND.label(), record.key(), status),
        )),
        _ => Ok(()),
    }
}

/// Customer block printed on every document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CustomerBlock {
    pub customer_code: String,
    pub partner_name: String,
    pub unit: String,
    pub address: String,
}

impl CustomerBlock {
    fn required(code: &str, r: &Resolution) -> ServiceResult<Self> {
        Ok(Self {
            customer_code: code.to_string(),
            partner_name: r.require("partner_name")?,
            unit: r.require("unit")?,
            address: r.require("address")?,
        })
    }

    pub fn from_customer(customer: &Customer) -> Self {
        Self {
            customer_code: customer.customer_code.clone(),
            partner_name: customer.partner_name.clone(),
            unit: customer.unit.clone(),
            address: customer.address.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotationDocument {
    pub quotation: Quotation,
    pub customer: CustomerBlock,
    pub kurs: Option<Decimal>,
}

impl QuotationDocument {
    pub async fn assemble(quotation: Quotation, resolver: &ReferenceResolver) -> ServiceResult<Self> {
        refuse_cancelled(&quotation)?;
        let customer = resolver
            .resolve(EntityKind::Customer, &quotation.customer_code)
            .await;
        Ok(Self {
            customer: CustomerBlock::required(&quotation.customer_code, &customer)?,
            kurs: quotation.kurs_rate(),
            quotation,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobOrderDocument {
    pub job_order: JobOrder,
    pub sales: String,
    #[serde(rename = "type")]
    pub quotation_type: String,
    pub delivery: String,
    pub loading: String,
    pub discharge: String,
    pub subject: String,
    pub customer: CustomerBlock,
    pub port_name: String,
}

impl JobOrderDocument {
    pub async fn assemble(job_order: JobOrder, resolver: &ReferenceResolver) -> ServiceResult<Self> {
        let port_code = job_order.port_code.clone().unwrap_or_default();
        let (quotation, (customer, port)) = join(
            resolver.resolve(EntityKind::Quotation, &job_order.quo_no),
            join(
                resolver.resolve(EntityKind::Customer, &job_order.customer_code),
                resolver.resolve(EntityKind::Port, &port_code),
            ),
        )
        .await;
        Ok(Self {
            sales: quotation.require("sales")?,
            quotation_type: quotation.require("type")?,
            delivery: quotation.require("delivery")?,
            loading: quotation.require("loading")?,
            discharge: quotation.require("discharge")?,
            subject: quotation.require("subject")?,
            customer: CustomerBlock::required(&job_order.customer_code, &customer)?,
            port_name: port.require("port_name")?,
            job_order,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JocDocument {
    pub joc: Joc,
    pub members: Vec<JobOrderSummary>,
    pub customer: CustomerBlock,
}

impl JocDocument {
    pub async fn assemble(joc: Joc, resolver: &ReferenceResolver) -> ServiceResult<Self> {
        refuse_cancelled(&joc)?;
        let customer_code = joc.customer_code.clone().unwrap_or_default();
        let (members, customer) = join(
            resolver.resolve_many(EntityKind::JobOrder, &joc.jo_no),
            resolver.resolve(EntityKind::Customer, &customer_code),
        )
        .await;
        let members = joc
            .jo_no
            .iter()
            .zip(members.iter())
            .map(|(jo_no, r)| JobOrderSummary::required(jo_no, r))
            .collect::<ServiceResult<Vec<_>>>()?;
        Ok(Self {
            members,
            customer: CustomerBlock::required(&customer_code, &customer)?,
            joc,
        })
    }
}
