use orderload_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid run configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Unable to build the HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
