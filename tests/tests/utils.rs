use mock_service::{Behavior, MockServer, MockState};
use orderload::prelude::*;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::FmtSubscriber;

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        FmtSubscriber::builder()
            .with_env_filter("orderload=debug,mock_service=debug,axum::rejection=trace")
            .with_test_writer()
            .init();
    });
}

#[allow(unused)]
pub async fn mock(behavior: Behavior) -> MockServer {
    init();
    mock_service::spawn(MockState::new(behavior))
        .await
        .expect("mock service failed to bind")
}

/// Short seeded run against `base_url`, sized so a test finishes in a few
/// seconds.
#[allow(unused)]
pub fn quick_config(base_url: &str, test_type: TestType) -> RunConfig {
    RunConfig::new(base_url)
        .with_workers(4)
        .with_duration(Duration::from_secs(2))
        .with_ramp_up(Duration::from_millis(400))
        .with_report_interval(Duration::from_secs(1))
        .with_request_timeout(Duration::from_secs(2))
        .with_shutdown_grace(Duration::from_secs(2))
        .with_test_type(test_type)
        .with_seed(7)
}

/// Upper bound for a whole quick run, shutdown included.
#[allow(unused)]
pub const RUN_DEADLINE: Duration = Duration::from_secs(20);
