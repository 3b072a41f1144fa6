mod config;
mod constants;
mod error;
mod metrics;
mod request;
mod stats;

pub use config::*;
pub use constants::*;
pub use error::*;
pub use metrics::*;
pub use request::*;
pub use stats::*;
