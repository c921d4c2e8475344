//! End-to-end lifecycle of quotations and consolidations through the
//! service facades.

mod common;

use assert_matches::assert_matches;
use common::{quotation, quotation_input, TestDesk};
use freight_desk::errors::{ErrorSurface, ServiceError};
use freight_desk::models::{EntityStatus, JocInput, PortInput, QuotationInput, StatusAction};
use freight_desk::notifications::NotificationLevel;
use freight_desk::repositories::EntityRepository;
use freight_desk::services::{AutoConfirm, MutationOutcome};
use rust_decimal_macros::dec;

#[tokio::test]
async fn executed_quotation_is_frozen() {
    let desk = TestDesk::new();
    desk.quotations
        .insert(quotation("Q-001", "PT Maju Jaya", EntityStatus::InProgress));
    let quotations = &desk.services.quotations;

    let executed = quotations
        .set_status("Q-001", EntityStatus::Executed, &AutoConfirm)
        .await
        .unwrap();
    assert_matches!(executed, MutationOutcome::Applied(ref q) if q.status == EntityStatus::Executed);

    let edit = quotations.update("Q-001", quotation_input()).await;
    assert_matches!(
        edit,
        Err(ServiceError::InvalidTransition {
            status: EntityStatus::Executed,
            action: StatusAction::Edit
        })
    );

    let delete = quotations.delete("Q-001", &AutoConfirm).await;
    assert_matches!(
        delete,
        Err(ServiceError::InvalidTransition {
            status: EntityStatus::Executed,
            action: StatusAction::Delete
        })
    );
    assert_eq!(desk.quotations.calls().update, 0);
    assert_eq!(desk.quotations.calls().delete, 0);
    assert!(desk.quotations.deleted_at("Q-001").is_none());
}

#[tokio::test]
async fn created_quotation_reads_back_as_entered() {
    let desk = TestDesk::new();
    let input = quotation_input();
    let created = desk.services.quotations.create(input.clone()).await.unwrap();
    assert_eq!(created.status, EntityStatus::InProgress);

    let fetched = desk.services.quotations.get(&created.quo_no).await.unwrap();
    assert_eq!(QuotationInput::from(&fetched), input);
    assert_eq!(fetched.kurs_rate(), Some(dec!(15500)));
    assert!(fetched.created_at.is_some());

    let latest = desk.services.notifications.latest().unwrap();
    assert_eq!(latest.level, NotificationLevel::Success);
    assert_eq!(latest.message, "Success, Quotation has been added.");
}

#[tokio::test]
async fn second_delete_is_not_found() {
    let desk = TestDesk::new();
    let ports = &desk.services.ports;
    let port = ports
        .create(PortInput {
            port_name: "Tanjung Perak".into(),
            caption: "Surabaya".into(),
        })
        .await
        .unwrap();

    let first = ports.delete(&port.port_code, &AutoConfirm).await.unwrap();
    assert!(first.is_applied());
    let second = ports.delete(&port.port_code, &AutoConfirm).await;
    assert_matches!(second, Err(ServiceError::NotFound(_)));

    let desk = TestDesk::new();
    desk.quotations
        .insert(quotation("Q-002", "PT Maju Jaya", EntityStatus::Cancel));
    let quotations = &desk.services.quotations;
    quotations.delete("Q-002", &AutoConfirm).await.unwrap();
    let err = quotations.delete("Q-002", &AutoConfirm).await.unwrap_err();
    assert_eq!(err.surface(), ErrorSurface::Page);
}

#[tokio::test]
async fn invalid_input_is_reported_per_field() {
    let desk = TestDesk::new();
    let mut input = quotation_input();
    input.sales.clear();
    input.loading.clear();
    input.kurs = "lima belas".into();

    let err = desk.services.quotations.create(input).await.unwrap_err();
    assert_eq!(err.surface(), ErrorSurface::Inline);
    assert_eq!(err.invalid_fields(), vec!["kurs", "loading", "sales"]);
    assert_eq!(desk.quotations.calls().create, 0);
    assert!(desk.services.notifications.is_empty());
}

#[tokio::test]
async fn copy_starts_a_fresh_quotation() {
    let desk = TestDesk::new();
    desk.quotations
        .insert(quotation("Q-001", "PT Maju Jaya", EntityStatus::Executed));

    let copy = desk.services.quotations.copy("Q-001").await.unwrap();
    assert_ne!(copy.quo_no, "Q-001");
    assert_eq!(copy.status, EntityStatus::InProgress);
    assert_eq!(copy.customer, "PT Maju Jaya");
    assert_eq!(
        desk.services.notifications.latest().unwrap().message,
        "Status successfully changed"
    );
}

#[tokio::test]
async fn cancelled_quotation_keeps_its_job_orders_editable() {
    let desk = TestDesk::new();
    desk.quotations
        .insert(quotation("Q-001", "PT Maju Jaya", EntityStatus::InProgress));
    let jo = desk
        .services
        .job_orders
        .create(common::job_order_input("Q-001"))
        .await
        .unwrap();

    desk.services
        .quotations
        .set_status("Q-001", EntityStatus::Cancel, &AutoConfirm)
        .await
        .unwrap();

    let mut edit = common::job_order_input("Q-001");
    edit.vessel = "KM Tanto Bersatu".into();
    let updated = desk.services.job_orders.update(&jo.jo_no, edit).await.unwrap();
    assert_eq!(updated.vessel, "KM Tanto Bersatu");
}

#[tokio::test]
async fn consolidation_follows_the_same_table() {
    let desk = TestDesk::new();
    let jocs = &desk.services.jocs;
    let input = JocInput {
        no_mbl: "MBL-991".into(),
        joc_type: "Export".into(),
        agent: "Kuehne Nagel".into(),
        vessel: "KM Meratus Jayakarta".into(),
        no_container: "MRKU1234567".into(),
        loading: "Surabaya".into(),
        discharge: "Rotterdam".into(),
        etd: "2024-03-04".into(),
        eta: "2024-04-02".into(),
        jo_no: vec!["JO-0001".into(), "JO-0002".into()],
        ..Default::default()
    };
    let joc = jocs.create(input).await.unwrap();
    assert_eq!(joc.status, EntityStatus::InProgress);

    jocs.set_status(&joc.joc_no, EntityStatus::Cancel, &AutoConfirm)
        .await
        .unwrap();
    assert_matches!(
        jocs.set_status(&joc.joc_no, EntityStatus::Cancel, &AutoConfirm).await,
        Err(ServiceError::InvalidTransition { .. })
    );
    assert!(jocs.delete(&joc.joc_no, &AutoConfirm).await.unwrap().is_applied());
    assert_matches!(
        desk.jocs.get(&joc.joc_no).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn backend_outage_reaches_the_operator() {
    let desk = TestDesk::new();
    desk.quotations
        .insert(quotation("Q-001", "PT Maju Jaya", EntityStatus::InProgress));
    desk.quotations.set_unavailable(true);

    let err = desk
        .services
        .quotations
        .set_status("Q-001", EntityStatus::Executed, &AutoConfirm)
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    let toast = desk.services.notifications.latest().unwrap();
    assert_eq!(toast.level, NotificationLevel::Error);
    assert_eq!(toast.message, "Error, Unable to reach the server");
}
