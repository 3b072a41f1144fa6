use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_DURATION: Duration = Duration::from_secs(60);
pub const DEFAULT_RAMP_UP: Duration = Duration::from_secs(5);

/// Every call is abandoned (and recorded as a failure) after this long.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Cadence of progress lines while a run is active.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// How long the controller waits for in-flight calls after raising the stop signal.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Pause between two iterations of a worker, drawn uniformly from this range.
pub const THINK_TIME_MIN: Duration = Duration::from_millis(100);
pub const THINK_TIME_MAX: Duration = Duration::from_millis(500);

/// Backoff after an iteration blew up unexpectedly.
pub const ITERATION_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// The application-level `code` the order API uses for success.
pub const SUCCESS_CODE: i64 = 200;

pub const ERROR_LABEL_MAX_CHARS: usize = 100;

/// Number of error labels listed in the final report.
pub const TOP_ERROR_COUNT: usize = 10;

pub const PHONE_PREFIX: &str = "138";
pub const PHONE_SUFFIX_DIGITS: usize = 8;

pub const MAX_ORDER_ITEMS: usize = 3;
pub const MAX_ITEM_QUANTITY: u32 = 3;
