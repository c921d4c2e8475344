//! Parent lookups behind the job order and consolidation screens.

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use common::{customer, job_order, quotation, TestDesk};
use freight_desk::config::AppConfig;
use freight_desk::errors::ServiceError;
use freight_desk::models::{EntityKind, EntityStatus, PageRequest};
use freight_desk::repositories::InMemoryRepository;
use freight_desk::services::{AutoConfirm, ListFilters, Resolution, LOADING};
use futures::future::join_all;

fn seeded(desk: &TestDesk) {
    desk.quotations
        .insert(quotation("Q-001", "PT Maju Jaya", EntityStatus::InProgress));
    desk.customers.insert(customer("CUST-0001", "PT Maju Jaya"));
    desk.job_orders.insert(job_order("JO-0001", "Q-001"));
    desk.job_orders.insert(job_order("JO-0002", "Q-001"));
}

#[tokio::test]
async fn rows_sharing_a_quotation_fetch_it_once() {
    let desk = TestDesk::new();
    seeded(&desk);

    let rows = desk
        .services
        .job_order_rows(PageRequest::first(10), &ListFilters::default())
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert_eq!(row.sales, "Budi Santoso");
        assert_eq!(row.quotation_type, "Export");
        assert_eq!(row.loading, "Surabaya");
        assert_eq!(row.customer_name, "PT Maju Jaya");
        assert!(row.actions.edit);
    }
    assert_eq!(desk.quotations.calls().get, 1);
    assert_eq!(desk.customers.calls().get, 1);
}

#[tokio::test]
async fn concurrent_callers_share_one_request() {
    let slow = InMemoryRepository::new().with_latency(Duration::from_millis(50));
    let desk = TestDesk::with_quotations(AppConfig::default(), slow);
    desk.quotations
        .insert(quotation("Q-001", "PT Maju Jaya", EntityStatus::InProgress));

    let lookups = (0..12).map(|_| desk.services.resolve_reference(EntityKind::Quotation, "Q-001"));
    let results = join_all(lookups).await;

    assert!(results.iter().all(|r| r.field("sales") == Some("Budi Santoso")));
    assert_eq!(desk.quotations.calls().get, 1);
    assert_eq!(desk.services.resolver.fetch_count(), 1);
}

#[tokio::test]
async fn missing_parent_renders_empty_columns() {
    let desk = TestDesk::new();
    desk.job_orders.insert(job_order("JO-0001", "Q-404"));

    let rows = desk
        .services
        .job_order_rows(PageRequest::first(10), &ListFilters::default())
        .await
        .unwrap();

    assert_eq!(rows[0].sales, "");
    assert_eq!(rows[0].discharge, "");
    assert_eq!(rows[0].customer_name, "");
    assert_eq!(
        desk.services
            .resolve_reference(EntityKind::Quotation, "")
            .await,
        Resolution::NotFound
    );
}

#[tokio::test]
async fn unreachable_parent_shows_loading_and_is_retried() {
    let desk = TestDesk::new();
    seeded(&desk);
    desk.quotations.set_unavailable(true);

    let rows = desk
        .services
        .job_order_rows(PageRequest::first(10), &ListFilters::default())
        .await
        .unwrap();
    assert_eq!(rows[0].sales, LOADING);
    assert_eq!(rows[0].customer_name, "PT Maju Jaya");

    desk.quotations.set_unavailable(false);
    let resolved = desk
        .services
        .resolve_reference(EntityKind::Quotation, "Q-001")
        .await;
    assert_eq!(resolved.field("sales"), Some("Budi Santoso"));
}

#[tokio::test]
async fn quotation_mutation_refreshes_dependent_columns() {
    let desk = TestDesk::new();
    seeded(&desk);
    let filters = ListFilters::default();

    desk.services
        .job_order_rows(PageRequest::first(10), &filters)
        .await
        .unwrap();
    let before = desk.quotations.calls().get;
    desk.services
        .job_order_rows(PageRequest::first(10), &filters)
        .await
        .unwrap();
    assert_eq!(desk.quotations.calls().get, before);

    let mut edit = common::quotation_input();
    edit.sales = "Sari Dewi".into();
    desk.services.quotations.update("Q-001", edit).await.unwrap();

    let before = desk.quotations.calls().get;
    let rows = desk
        .services
        .job_order_rows(PageRequest::first(10), &filters)
        .await
        .unwrap();
    assert_eq!(desk.quotations.calls().get, before + 1);
    assert!(rows.iter().all(|row| row.sales == "Sari Dewi"));
    assert_eq!(desk.customers.calls().get, 1);
}

#[tokio::test]
async fn consolidation_rows_list_their_members() {
    let desk = TestDesk::new();
    seeded(&desk);
    desk.services
        .jocs
        .create(freight_desk::models::JocInput {
            no_mbl: "MBL-991".into(),
            joc_type: "Export".into(),
            agent: "Kuehne Nagel".into(),
            vessel: "KM Meratus Jayakarta".into(),
            no_container: "MRKU1234567".into(),
            loading: "Surabaya".into(),
            discharge: "Rotterdam".into(),
            etd: "2024-03-04".into(),
            eta: "2024-04-02".into(),
            jo_no: vec!["JO-0001".into(), "JO-0404".into()],
            ..Default::default()
        })
        .await
        .unwrap();

    let rows = desk
        .services
        .joc_rows(PageRequest::first(10), &ListFilters::default())
        .await
        .unwrap();
    let members = &rows[0].members;
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].shipper, "PT Ekspor Kopi");
    assert_eq!(members[0].hbl, "HBL-778");
    assert_eq!(members[1].jo_no, "JO-0404");
    assert_eq!(members[1].shipper, "");
}

#[tokio::test]
async fn documents_need_reachable_parents() {
    let desk = TestDesk::new();
    seeded(&desk);

    let document = desk.services.print_job_order("JO-0001").await.unwrap();
    assert_eq!(document.sales, "Budi Santoso");
    assert_eq!(document.customer.partner_name, "PT Maju Jaya");
    assert_eq!(document.port_name, "");

    desk.customers.set_unavailable(true);
    desk.services.resolver.clear();
    assert_matches!(
        desk.services.print_job_order("JO-0001").await,
        Err(ServiceError::NetworkError(_))
    );

    desk.quotations
        .insert(quotation("Q-009", "PT Maju Jaya", EntityStatus::Cancel));
    assert_matches!(
        desk.services.print_quotation("Q-009").await,
        Err(ServiceError::InvalidOperation(_))
    );
}
