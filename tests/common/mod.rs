#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use freight_desk::config::AppConfig;
use freight_desk::models::{
    Cost, Customer, EntityStatus, JobOrder, JobOrderInput, Joc, Port, Quotation, QuotationInput,
};
use freight_desk::repositories::InMemoryRepository;
use freight_desk::services::{AppServices, Backends, ServiceFactory};

/// In-memory back office with direct access to every backend for seeding
/// and call counting.
pub struct TestDesk {
    pub quotations: Arc<InMemoryRepository<Quotation>>,
    pub job_orders: Arc<InMemoryRepository<JobOrder>>,
    pub jocs: Arc<InMemoryRepository<Joc>>,
    pub customers: Arc<InMemoryRepository<Customer>>,
    pub ports: Arc<InMemoryRepository<Port>>,
    pub costs: Arc<InMemoryRepository<Cost>>,
    pub services: AppServices,
}

impl TestDesk {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self::with_quotations(config, InMemoryRepository::new())
    }

    /// Uses `quotations` as the quotation backend, e.g. one with latency.
    pub fn with_quotations(config: AppConfig, quotations: InMemoryRepository<Quotation>) -> Self {
        let quotations = Arc::new(quotations);
        let job_orders = Arc::new(InMemoryRepository::<JobOrder>::new());
        let jocs = Arc::new(InMemoryRepository::<Joc>::new());
        let customers = Arc::new(InMemoryRepository::<Customer>::new());
        let ports = Arc::new(InMemoryRepository::<Port>::new());
        let costs = Arc::new(InMemoryRepository::<Cost>::new());
        let backends = Backends {
            quotations: quotations.clone(),
            job_orders: job_orders.clone(),
            jocs: jocs.clone(),
            customers: customers.clone(),
            ports: ports.clone(),
            costs: costs.clone(),
        };
        let services = AppServices::new(&ServiceFactory::new(config), backends);
        Self {
            quotations,
            job_orders,
            jocs,
            customers,
            ports,
            costs,
            services,
        }
    }
}

pub fn quotation_input() -> QuotationInput {
    QuotationInput {
        sales: "Budi Santoso".into(),
        subject: "Coffee beans to Rotterdam".into(),
        customer: "PT Maju Jaya".into(),
        attn: "Ibu Sari".into(),
        quotation_type: "Export".into(),
        delivery: "FCL".into(),
        loading: "Surabaya".into(),
        discharge: "Rotterdam".into(),
        kurs: "15,500".into(),
        customer_code: Some("CUST-0001".into()),
        valheader: Some("Valid 30 days".into()),
        valfooter: None,
    }
}

pub fn quotation(quo_no: &str, customer: &str, status: EntityStatus) -> Quotation {
    Quotation {
        quo_no: quo_no.into(),
        customer: customer.into(),
        customer_code: "CUST-0001".into(),
        sales: "Budi Santoso".into(),
        quotation_type: "Export".into(),
        delivery: "FCL".into(),
        loading: "Surabaya".into(),
        discharge: "Rotterdam".into(),
        status,
        created_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()),
        ..Default::default()
    }
}

pub fn customer(code: &str, name: &str) -> Customer {
    Customer {
        customer_code: code.into(),
        partner_name: name.into(),
        unit: "Logistics".into(),
        address: "Jl. Rungkut Industri 12, Surabaya".into(),
        ..Default::default()
    }
}

pub fn job_order(jo_no: &str, quo_no: &str) -> JobOrder {
    JobOrder {
        jo_no: jo_no.into(),
        quo_no: quo_no.into(),
        customer_code: "CUST-0001".into(),
        shipper: "PT Ekspor Kopi".into(),
        consignee: "Rotterdam Roasters BV".into(),
        hbl: "HBL-778".into(),
        mbl: "MBL-991".into(),
        vessel: "KM Meratus Jayakarta".into(),
        ..Default::default()
    }
}

pub fn job_order_input(quo_no: &str) -> JobOrderInput {
    JobOrderInput {
        quo_no: quo_no.into(),
        customer_code: "CUST-0001".into(),
        shipper: "PT Ekspor Kopi".into(),
        consignee: "Rotterdam Roasters BV".into(),
        hbl: "HBL-778".into(),
        mbl: "MBL-991".into(),
        etd: "2024-03-04".into(),
        eta: "2024-04-02".into(),
        vessel: "KM Meratus Jayakarta".into(),
        qty: "2".into(),
        gross_weight: "38000".into(),
        volume: "66".into(),
        name_of_goods: "Green coffee beans".into(),
        ..Default::default()
    }
}
