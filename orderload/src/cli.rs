//! Command line arguments of the `orderload` binary. (requires `cli` feature)
use clap::Parser;
use orderload_core::{
    ConfigError, RunConfig, TestType, DEFAULT_BASE_URL, DEFAULT_DURATION, DEFAULT_RAMP_UP,
    DEFAULT_REPORT_INTERVAL, DEFAULT_REQUEST_TIMEOUT, DEFAULT_WORKERS,
};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(version, about = "Load test an HTTP order-processing API")]
pub struct OrderloadCli {
    /// Base URL of the target service
    #[arg(short, long, default_value = DEFAULT_BASE_URL)]
    pub url: String,

    /// Number of concurrent workers
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    pub threads: usize,

    /// Run duration in seconds
    #[arg(short, long, default_value_t = DEFAULT_DURATION.as_secs())]
    pub duration: u64,

    /// Window in seconds over which workers are started
    #[arg(short, long = "ramp-up", default_value_t = DEFAULT_RAMP_UP.as_secs())]
    pub ramp_up: u64,

    /// Workload to run
    #[arg(long = "type", value_enum, default_value_t = TestType::CreateOrder)]
    pub test_type: TestType,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Seconds between progress lines
    #[arg(long, default_value_t = DEFAULT_REPORT_INTERVAL.as_secs())]
    pub report_interval: u64,

    /// Seed for the random sources, for reproducible workloads
    #[arg(long)]
    pub seed: Option<u64>,
}

impl OrderloadCli {
    pub fn into_config(self) -> Result<RunConfig, ConfigError> {
        let mut config = RunConfig::new(&self.url)
            .with_workers(self.threads)
            .with_duration(Duration::from_secs(self.duration))
            .with_ramp_up(Duration::from_secs(self.ramp_up))
            .with_test_type(self.test_type)
            .with_request_timeout(Duration::from_secs(self.timeout))
            .with_report_interval(Duration::from_secs(self.report_interval));
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        config.validate()?;
        Ok(config)
    }
}
