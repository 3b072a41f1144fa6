mod utils;
#[allow(unused)]
use utils::*;

use mock_service::Behavior;
use orderload::core::OrderId;
use orderload::prelude::*;
use rand::{rngs::SmallRng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;

async fn client_for(behavior: Behavior) -> (mock_service::MockServer, OperationClient) {
    let server = mock(behavior).await;
    let config = RunConfig::new(&server.base_url()).with_request_timeout(Duration::from_secs(5));
    let client = OperationClient::new(&config, Arc::new(StatsAggregator::new())).unwrap();
    (server, client)
}

#[tokio::test]
async fn create_then_pay_and_get() {
    let (server, client) = client_for(Behavior::Healthy {
        fixed_id: Some("ORD-42".to_string()),
    })
    .await;
    let mut rng = SmallRng::seed_from_u64(1);
    let order = RequestFactory::default().order_request(&mut rng);

    let id = client.create_order(&order).await.unwrap();
    assert_eq!(id, Some(OrderId::from("ORD-42")));

    let id = id.unwrap();
    client
        .pay_order(&id, &RequestFactory::default().pay_request())
        .await
        .unwrap();
    client.get_order(&id).await.unwrap();
    client.calculate_price(&order).await.unwrap();

    let hits = server.state.hits();
    assert_eq!((hits.create, hits.pay, hits.get, hits.calculate), (1, 1, 1, 1));
    assert_eq!(hits.paid_ids, vec!["ORD-42".to_string()]);
    assert_eq!(hits.fetched_ids, vec!["ORD-42".to_string()]);

    let snapshot = client.stats().snapshot();
    assert_eq!(snapshot.total, 4);
    assert_eq!(snapshot.success, 4);
}

#[tokio::test]
async fn numeric_ids_are_read_as_text() {
    let (_server, client) = client_for(Behavior::Healthy { fixed_id: None }).await;
    let mut rng = SmallRng::seed_from_u64(2);
    let order = RequestFactory::default().order_request(&mut rng);

    let first = client.create_order(&order).await.unwrap();
    let second = client.create_order(&order).await.unwrap();

    assert_eq!(first, Some(OrderId::from("1")));
    assert_eq!(second, Some(OrderId::from("2")));
}

#[tokio::test]
async fn each_call_is_recorded_once() {
    let (_server, client) = client_for(Behavior::Status(503)).await;
    let mut rng = SmallRng::seed_from_u64(3);
    let order = RequestFactory::default().order_request(&mut rng);

    let err = client.create_order(&order).await.unwrap_err();
    assert!(matches!(err, CallError::Protocol { status: 503, .. }));
    assert!(client.get_order(&OrderId::from("9")).await.is_err());

    let snapshot = client.stats().snapshot();
    assert_eq!(snapshot.total, 2);
    assert_eq!(snapshot.failed, 2);
    assert_eq!(snapshot.status_codes_sorted(), vec![(503, 2)]);
}
