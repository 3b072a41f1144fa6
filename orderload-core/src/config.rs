use crate::constants::*;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Workload policy applied by every worker of a run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[cfg_attr(feature = "cli", value(rename_all = "snake_case"))]
pub enum TestType {
    #[default]
    CreateOrder,
    PayOrder,
    GetOrder,
    CalculatePrice,
    Mixed,
}

impl TestType {
    pub const ALL: [TestType; 5] = [
        TestType::CreateOrder,
        TestType::PayOrder,
        TestType::GetOrder,
        TestType::CalculatePrice,
        TestType::Mixed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::CreateOrder => "create_order",
            TestType::PayOrder => "pay_order",
            TestType::GetOrder => "get_order",
            TestType::CalculatePrice => "calculate_price",
            TestType::Mixed => "mixed",
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TestType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownTestType(s.to_string()))
    }
}

/// Parameters of a single load-test run.
///
/// Fixed once the run starts. Use the `with_*` setters to build one up from
/// [`RunConfig::new`] and call [`RunConfig::validate`] before handing it to
/// the controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub base_url: String,
    pub workers: usize,
    pub duration: Duration,
    pub ramp_up: Duration,
    pub test_type: TestType,
    pub request_timeout: Duration,
    pub report_interval: Duration,
    pub shutdown_grace: Duration,
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl RunConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            workers: DEFAULT_WORKERS,
            duration: DEFAULT_DURATION,
            ramp_up: DEFAULT_RAMP_UP,
            test_type: TestType::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            report_interval: DEFAULT_REPORT_INTERVAL,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            seed: None,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_ramp_up(mut self, ramp_up: Duration) -> Self {
        self.ramp_up = ramp_up;
        self
    }

    pub fn with_test_type(mut self, test_type: TestType) -> Self {
        self.test_type = test_type;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.duration.is_zero() {
            return Err(ConfigError::ZeroDuration);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroRequestTimeout);
        }
        if self.report_interval.is_zero() {
            return Err(ConfigError::ZeroReportInterval);
        }

        let url = url::Url::parse(&self.base_url)?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
    }

    /// Delay between two successive worker launches during ramp-up.
    pub fn ramp_up_step(&self) -> Duration {
        match u32::try_from(self.workers) {
            Ok(0) => Duration::ZERO,
            Ok(workers) => self.ramp_up / workers,
            Err(_) => Duration::ZERO,
        }
    }
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "target={}, type={}, workers={}, duration={}, ramp_up={}",
            self.base_url,
            self.test_type,
            self.workers,
            humantime::format_duration(self.duration),
            humantime::format_duration(self.ramp_up),
        )
    }
}
