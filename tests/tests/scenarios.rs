mod utils;
#[allow(unused)]
use utils::*;

use mock_service::Behavior;
use orderload::prelude::*;
use std::time::Duration;
use tokio::time::timeout;

async fn run(config: RunConfig) -> RunReport {
    let controller = RunController::new(config).unwrap();
    timeout(RUN_DEADLINE, controller.run_until(std::future::pending()))
        .await
        .expect("run did not finish in time")
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn healthy_mixed_run() {
    let server = mock(Behavior::Healthy {
        fixed_id: Some("X".to_string()),
    })
    .await;

    let report = run(quick_config(&server.base_url(), TestType::Mixed)).await;
    let snapshot = &report.snapshot;

    assert!(!report.interrupted);
    assert!(snapshot.total > 0);
    assert_eq!(snapshot.failed, 0);
    assert_eq!(snapshot.success, snapshot.total);
    assert_eq!(snapshot.success_rate(), 100.);
    assert_eq!(snapshot.status_codes_sorted(), vec![(200, snapshot.total)]);
    assert!(snapshot.errors.is_empty());

    let hits = server.state.hits();
    assert_eq!(
        hits.create + hits.pay + hits.get + hits.calculate,
        snapshot.total
    );
    // The seeded mix covers both dependent operations.
    assert!(hits.pay > 0);
    assert!(hits.get > 0);
    assert_eq!(hits.paid_ids.len() as u64, hits.pay);
    assert_eq!(hits.fetched_ids.len() as u64, hits.get);
    assert!(hits.paid_ids.iter().all(|id| id == "X"));
    assert!(hits.fetched_ids.iter().all(|id| id == "X"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pay_creates_an_order_first() {
    let server = mock(Behavior::Healthy { fixed_id: None }).await;

    let report = run(quick_config(&server.base_url(), TestType::PayOrder)).await;
    let hits = server.state.hits();

    assert_eq!(report.snapshot.failed, 0);
    assert!(hits.create >= 1);
    assert!(hits.pay >= 1);
    assert_eq!(hits.get, 0);
    assert_eq!(hits.calculate, 0);
    // Sequential ids from the mock, so every paid id was created first.
    assert!(hits
        .paid_ids
        .iter()
        .all(|id| id.parse::<u64>().map_or(false, |id| id <= hits.create)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn server_errors_are_counted() {
    let server = mock(Behavior::Status(500)).await;

    let report = run(quick_config(&server.base_url(), TestType::CreateOrder)).await;
    let snapshot = &report.snapshot;

    assert!(snapshot.total > 0);
    assert_eq!(snapshot.success, 0);
    assert_eq!(snapshot.failed, snapshot.total);
    assert_eq!(snapshot.success_rate(), 0.);
    assert_eq!(snapshot.status_codes_sorted(), vec![(500, snapshot.total)]);
    assert_eq!(snapshot.top_errors(10), vec![("mock failure", snapshot.total)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn application_errors_use_the_message() {
    let server = mock(Behavior::ApplicationError {
        code: 4001,
        message: "Store closed".to_string(),
    })
    .await;

    let report = run(quick_config(&server.base_url(), TestType::CalculatePrice)).await;
    let snapshot = &report.snapshot;

    assert!(snapshot.total > 0);
    assert_eq!(snapshot.failed, snapshot.total);
    assert_eq!(snapshot.status_codes_sorted(), vec![(200, snapshot.total)]);
    assert_eq!(snapshot.top_errors(10), vec![("Store closed", snapshot.total)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn malformed_bodies_use_the_raw_text() {
    let server = mock(Behavior::Malformed).await;

    let report = run(quick_config(&server.base_url(), TestType::CreateOrder)).await;
    let snapshot = &report.snapshot;

    assert!(snapshot.total > 0);
    assert_eq!(snapshot.failed, snapshot.total);
    assert_eq!(
        snapshot.top_errors(10),
        vec![("<html>upstream hiccup</html>", snapshot.total)]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unreachable_target_still_completes() {
    init();

    let report = run(quick_config("http://127.0.0.1:1", TestType::Mixed)).await;
    let snapshot = &report.snapshot;

    assert!(snapshot.total > 0);
    assert_eq!(snapshot.success, 0);
    assert_eq!(snapshot.failed, snapshot.total);
    assert!(snapshot.status_codes.is_empty());
    assert!(!snapshot.errors.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_target_records_full_latency() {
    init();
    let server = mock_service::spawn(
        mock_service::MockState::new(Behavior::Healthy { fixed_id: None })
            .with_delay(Duration::from_millis(50)),
    )
    .await
    .unwrap();

    let report = run(quick_config(&server.base_url(), TestType::CreateOrder)).await;
    let latency = &report.snapshot.latency;

    assert!(report.snapshot.total > 0);
    assert!(latency.min >= 50.);
    assert!(latency.min <= latency.p50);
    assert!(latency.p50 <= latency.p95);
    assert!(latency.p95 <= latency.p99);
    assert!(latency.p99 <= latency.max);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn external_stop_ends_run_early() {
    let server = mock(Behavior::Healthy { fixed_id: None }).await;

    let config = quick_config(&server.base_url(), TestType::GetOrder)
        .with_duration(Duration::from_secs(60));
    let controller = RunController::new(config).unwrap();
    let stop = controller.stop_signal();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(800)).await;
        stop.stop();
    });

    let report = timeout(RUN_DEADLINE, controller.run_until(std::future::pending()))
        .await
        .expect("run did not stop")
        .unwrap();

    assert!(!report.interrupted);
    assert!(report.elapsed < Duration::from_secs(10));
}
