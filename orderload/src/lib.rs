#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod client;
pub mod controller;
pub mod worker;

#[cfg(feature = "cli")]
#[doc(hidden)]
pub mod cli;

mod error;
mod report;

pub use controller::{RunController, RunReport};
pub use error::RunError;
pub use orderload_core as core;

pub mod prelude {
    pub use crate::client::{CallError, OperationClient};
    pub use crate::controller::{RunController, RunReport};
    pub use crate::error::RunError;
    pub use crate::worker::{StopSignal, WorkerPool, WorkerState};

    pub use orderload_core::{
        RequestFactory, RunConfig, StatsAggregator, StatsSnapshot, TestType, ValuePools,
    };
}
