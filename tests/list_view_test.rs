//! List screen behaviour: page-local filtering, overlapping loads and
//! refresh after mutations.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{quotation, TestDesk};
use freight_desk::cache::QueryCache;
use freight_desk::config::AppConfig;
use freight_desk::errors::ServiceResult;
use freight_desk::models::{EntityKind, EntityStatus, Page, PageRequest, Port, PortInput, StatusFilter};
use freight_desk::notifications::NotificationCenter;
use freight_desk::repositories::{EntityRepository, InMemoryRepository};
use freight_desk::services::{
    AutoConfirm, DateRange, EntityFacade, FilterComposition, ListFilters, ListViewModel, MutationCoordinator,
    TextFilter,
};

/// Port backend whose list reads the rows on arrival and answers later.
struct LaggingPorts {
    rows: Arc<InMemoryRepository<Port>>,
    lag: Duration,
}

#[async_trait]
impl EntityRepository<Port> for LaggingPorts {
    async fn list(&self, page: PageRequest) -> ServiceResult<Page<Port>> {
        let read = self.rows.list(page).await;
        tokio::time::sleep(self.lag).await;
        read
    }

    async fn get(&self, key: &str) -> ServiceResult<Port> {
        self.rows.get(key).await
    }

    async fn create(&self, input: &PortInput) -> ServiceResult<Port> {
        self.rows.create(input).await
    }

    async fn update(&self, key: &str, input: &PortInput) -> ServiceResult<Port> {
        self.rows.update(key, input).await
    }

    async fn delete(&self, key: &str) -> ServiceResult<()> {
        self.rows.delete(key).await
    }
}

fn lagging_ports() -> (Arc<InMemoryRepository<Port>>, Arc<dyn EntityRepository<Port>>) {
    let rows = Arc::new(InMemoryRepository::<Port>::new());
    let wire = Arc::new(LaggingPorts {
        rows: rows.clone(),
        lag: Duration::from_millis(100),
    });
    (rows, wire)
}

fn belawan() -> PortInput {
    PortInput {
        port_name: "Belawan".into(),
        caption: "Medan".into(),
    }
}

fn seed_thirty(desk: &TestDesk) {
    for i in 1..=30 {
        let customer = if i <= 15 { "PT Maju Jaya" } else { "CV Samudra Biru" };
        desk.quotations
            .insert(quotation(&format!("Q-{:03}", i), customer, EntityStatus::InProgress));
    }
}

#[tokio::test]
async fn search_only_sees_the_fetched_page() {
    let desk = TestDesk::new();
    seed_thirty(&desk);
    let view = desk.services.quotations.list_view();

    let first = view.set_page_size(15).await.unwrap();
    assert_eq!(first.rows.len(), 15);
    assert_eq!(first.pagination.total, 30);
    assert_eq!(first.pagination.total_page, 2);

    let searched = view.set_search("customer", "samudra");
    assert!(searched.rows.is_empty());
    assert_eq!(desk.quotations.calls().list, 1);

    let second = view.next_page().await.unwrap();
    assert_eq!(second.rows.len(), 15);
    assert!(second.rows.iter().all(|q| q.customer == "CV Samudra Biru"));

    let cleared = view.clear_search();
    assert_eq!(cleared.rows.len(), 15);
}

#[tokio::test]
async fn late_response_for_an_old_page_is_discarded() {
    let slow_first_page = InMemoryRepository::new().with_page_latency(1, Duration::from_millis(200));
    let desk = TestDesk::with_quotations(AppConfig::default(), slow_first_page);
    seed_thirty(&desk);
    let view = desk.services.quotations.list_view();

    let (old, new) = tokio::join!(view.load_page(PageRequest::new(1, 15)), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        view.load_page(PageRequest::new(2, 15)).await
    });
    assert!(old.is_ok());
    assert_eq!(new.unwrap().page, Some(PageRequest::new(2, 15)));

    let shown = view.snapshot();
    assert_eq!(shown.page, Some(PageRequest::new(2, 15)));
    assert_eq!(shown.rows[0].quo_no, "Q-016");
    assert!(!shown.loading);
}

#[tokio::test]
async fn failed_page_keeps_the_rows_on_screen() {
    let desk = TestDesk::new();
    seed_thirty(&desk);
    let view = desk.services.quotations.list_view();
    view.set_page_size(15).await.unwrap();

    desk.quotations.set_unavailable(true);
    assert!(view.next_page().await.is_err());

    let shown = view.snapshot();
    assert_eq!(shown.rows.len(), 15);
    assert_eq!(shown.rows[0].quo_no, "Q-001");
    assert_eq!(shown.error.as_deref(), Some("Unable to reach the server"));
    assert_eq!(
        desk.services.notifications.latest().unwrap().message,
        "Error, Unable to reach the server"
    );

    desk.quotations.set_unavailable(false);
    let retried = view.refresh().await.unwrap();
    assert_eq!(retried.rows[0].quo_no, "Q-016");
    assert!(retried.error.is_none());
}

#[tokio::test]
async fn mutation_makes_the_next_load_refetch() {
    let desk = TestDesk::new();
    seed_thirty(&desk);
    let view = desk.services.quotations.list_view();

    view.set_page_size(15).await.unwrap();
    view.refresh().await.unwrap();
    assert_eq!(desk.quotations.calls().list, 1);

    desk.services
        .quotations
        .set_status("Q-001", EntityStatus::Executed, &AutoConfirm)
        .await
        .unwrap();
    let refreshed = view.refresh().await.unwrap();
    assert_eq!(desk.quotations.calls().list, 2);
    assert_eq!(refreshed.rows[0].status, EntityStatus::Executed);
}

#[tokio::test]
async fn status_filter_wins_over_period_unless_composed() {
    let march = DateRange::new(
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
    )
    .unwrap();
    let april = DateRange::new(
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
    )
    .unwrap();

    let desk = TestDesk::new();
    desk.quotations
        .insert(quotation("Q-001", "PT Maju Jaya", EntityStatus::Executed));
    desk.quotations
        .insert(quotation("Q-002", "PT Maju Jaya", EntityStatus::Cancel));
    let view = desk.services.quotations.list_view();
    view.refresh().await.unwrap();

    view.set_status_filter(StatusFilter::Only(EntityStatus::Executed));
    let exclusive = view.set_period(Some(april));
    assert_eq!(exclusive.rows.len(), 1);

    let mut config = AppConfig::default();
    config.filter_mode = FilterComposition::Composed;
    let composed_desk = TestDesk::with_config(config);
    composed_desk
        .quotations
        .insert(quotation("Q-001", "PT Maju Jaya", EntityStatus::Executed));
    let filters = ListFilters {
        text: Some(TextFilter::new("customer", "maju")),
        status: StatusFilter::Only(EntityStatus::Executed),
        period: Some(april),
    };
    let page = composed_desk
        .services
        .quotations
        .list(PageRequest::first(10), &filters)
        .await
        .unwrap();
    assert!(page.data.is_empty());
    assert_eq!(page.pagination.total, 1);

    let in_march = ListFilters {
        period: Some(march),
        ..filters
    };
    let page = composed_desk
        .services
        .quotations
        .list(PageRequest::first(10), &in_march)
        .await
        .unwrap();
    assert_eq!(page.data.len(), 1);
}

#[tokio::test]
async fn create_during_a_slow_load_is_not_hidden_by_the_cache() {
    let (rows, wire) = lagging_ports();
    let cache = Arc::new(QueryCache::default());
    let notifications = Arc::new(NotificationCenter::default());
    let view = ListViewModel::new(wire.clone(), cache.clone(), notifications.clone(), 10);
    let ports = MutationCoordinator::new(wire, cache.clone(), notifications);

    let (loaded, created) = tokio::join!(view.load_page(PageRequest::first(10)), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        ports.create(belawan()).await
    });
    let created = created.unwrap();
    assert_eq!(cache.epoch(EntityKind::Port), 1);
    assert_eq!(loaded.unwrap().rows, vec![created.clone()]);
    assert_eq!(rows.calls().list, 2);

    let refreshed = view.refresh().await.unwrap();
    assert_eq!(refreshed.rows, vec![created]);
    assert_eq!(refreshed.pagination.total, 1);
    assert_eq!(rows.calls().list, 2);
}

#[tokio::test]
async fn facade_list_refetches_after_a_concurrent_create() {
    let (rows, wire) = lagging_ports();
    let cache = Arc::new(QueryCache::default());
    let facade = EntityFacade::new(
        wire,
        cache,
        Arc::new(NotificationCenter::default()),
        &AppConfig::default(),
    );
    let filters = ListFilters::default();

    let (listed, created) = tokio::join!(facade.list(PageRequest::first(10), &filters), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        facade.create(belawan()).await
    });
    created.unwrap();
    assert_eq!(listed.unwrap().data.len(), 1);

    let again = facade.list(PageRequest::first(10), &filters).await.unwrap();
    assert_eq!(again.data.len(), 1);
    assert_eq!(rows.calls().list, 2);
}
