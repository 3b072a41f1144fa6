//! Run orchestration: ramp-up, timed run, progress lines, shutdown, report.
use crate::client::OperationClient;
use crate::error::RunError;
use crate::report::{Banner, FinalReport, ProgressLine};
use crate::worker::{StopSignal, WorkerPool};
use orderload_core::{RequestFactory, RunConfig, StatsAggregator, StatsSnapshot};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::{sleep, Instant};
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn};

/// Outcome of a whole run, handed back after the final report is printed.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub snapshot: StatsSnapshot,
    pub elapsed: Duration,
    pub interrupted: bool,
}

/// Drives a single load-test run.
///
/// # Example
/// ```no_run
/// use orderload::prelude::*;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), RunError> {
///     let config = RunConfig::new("http://localhost:8080")
///         .with_workers(20)
///         .with_duration(Duration::from_secs(120))
///         .with_test_type(TestType::Mixed);
///
///     let report = RunController::new(config)?.run().await?;
///     println!("{} requests", report.snapshot.total);
///     Ok(())
/// }
/// ```
pub struct RunController {
    config: RunConfig,
    factory: Arc<RequestFactory>,
    stats: Arc<StatsAggregator>,
    stop: StopSignal,
}

impl RunController {
    pub fn new(config: RunConfig) -> Result<Self, RunError> {
        config.validate()?;
        Ok(Self {
            config,
            factory: Arc::new(RequestFactory::default()),
            stats: Arc::new(StatsAggregator::new()),
            stop: StopSignal::new(),
        })
    }

    /// Replaces the default value pools used for request bodies.
    pub fn with_factory(mut self, factory: RequestFactory) -> Self {
        self.factory = Arc::new(factory);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn stats(&self) -> Arc<StatsAggregator> {
        self.stats.clone()
    }

    /// Handle for stopping the run from elsewhere; raising it ends the run
    /// early without marking it interrupted.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Runs until the configured duration elapses or Ctrl-C is received.
    pub async fn run(self) -> Result<RunReport, RunError> {
        self.run_until(ctrl_c()).await
    }

    /// Like [`RunController::run`], with `interrupt` standing in for Ctrl-C.
    /// The final report is produced in both cases.
    #[instrument(name = "run", skip_all, fields(test_type = %self.config.test_type))]
    pub async fn run_until<F>(self, interrupt: F) -> Result<RunReport, RunError>
    where
        F: Future<Output = ()>,
    {
        let client = OperationClient::new(&self.config, self.stats.clone())?;
        let mut pool = WorkerPool::new(
            &self.config,
            client,
            self.factory.clone(),
            self.stop.clone(),
        );

        println!("{}", Banner(&self.config));
        info!("Running load test with {}", self.config);

        let start = Instant::now();
        let interrupted = tokio::select! {
            _ = self.drive(&mut pool) => false,
            _ = interrupt => {
                warn!("Interrupted by operator, stopping workers.");
                true
            }
        };

        self.stop.stop();
        let aborted = pool.shutdown(self.config.shutdown_grace).await;
        debug!("Shutdown complete, {aborted} workers aborted.");

        let report = RunReport {
            snapshot: self.stats.snapshot(),
            elapsed: start.elapsed(),
            interrupted,
        };
        println!("{}", FinalReport(&report));
        info!(
            "Load test complete: {} requests, {:.2}% success",
            report.snapshot.total,
            report.snapshot.success_rate()
        );

        Ok(report)
    }

    async fn drive(&self, pool: &mut WorkerPool) {
        pool.start().await;

        let started = Instant::now();
        let interval = self.config.report_interval;
        let mut last_print = started;

        while started.elapsed() < self.config.duration {
            let remaining = self.config.duration.saturating_sub(started.elapsed());
            tokio::select! {
                _ = sleep(interval.min(remaining)) => {}
                _ = self.stop.stopped() => {
                    info!("Stop signal raised, ending run early.");
                    break;
                }
            }

            if last_print.elapsed() >= interval {
                let snapshot = self.stats.snapshot();
                println!(
                    "{}",
                    ProgressLine {
                        at: SystemTime::now(),
                        snapshot: &snapshot,
                    }
                );
                last_print = Instant::now();
            }
        }
    }
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
}
