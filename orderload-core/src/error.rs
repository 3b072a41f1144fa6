use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Worker count must be greater than zero.")]
    NoWorkers,

    #[error("Run duration must be greater than zero.")]
    ZeroDuration,

    #[error("Request timeout must be greater than zero.")]
    ZeroRequestTimeout,

    #[error("Report interval must be greater than zero.")]
    ZeroReportInterval,

    #[error("Invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unsupported URL scheme `{0}` (expected http or https)")]
    UnsupportedScheme(String),

    #[error("Value pool `{0}` is empty")]
    EmptyPool(&'static str),

    #[error("Unknown test type `{0}`")]
    UnknownTestType(String),
}
