use mock_service::{Behavior, MockState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter("mock_service=info,tower_http=warn")
        .init();

    let addr: SocketAddr = std::env::var("MOCK_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        .parse()?;
    let state = Arc::new(MockState::new(Behavior::Healthy { fixed_id: None }));

    tokio::spawn(mock_service::rate_printer(state.clone()));

    tracing::info!("Mock order API listening on {addr}");
    mock_service::run(addr, state).await
}
