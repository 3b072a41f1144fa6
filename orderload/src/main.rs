use clap::Parser;
use orderload::cli::OrderloadCli;
use orderload::RunController;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("orderload=info"));
    FmtSubscriber::builder().with_env_filter(filter).init();

    let config = OrderloadCli::parse().into_config()?;
    let report = RunController::new(config)?.run().await?;

    if report.interrupted {
        tracing::warn!("Run was interrupted before the configured duration.");
    }
    Ok(())
}
