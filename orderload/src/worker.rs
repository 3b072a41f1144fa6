//! Worker pool and the per-worker request loop.
use crate::client::OperationClient;
use futures_util::FutureExt;
use orderload_core::{
    Operation, OrderId, RequestFactory, RunConfig, TestType, ITERATION_ERROR_BACKOFF,
    THINK_TIME_MAX, THINK_TIME_MIN,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout_at, Instant};
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

/// Pool-wide cooperative stop flag.
///
/// Workers look at it once per iteration, before picking the next operation.
/// A call that is already in flight is never interrupted by it.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<StopInner>);

#[derive(Debug, Default)]
struct StopInner {
    stopped: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.stopped.store(true, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.0.stopped.load(Ordering::SeqCst)
    }

    /// Resolves once [`StopSignal::stop`] has been called.
    pub async fn stopped(&self) {
        let notified = self.0.notify.notified();
        tokio::pin!(notified);
        // Register before the check so a concurrent `stop` is not missed.
        notified.as_mut().enable();
        if self.is_stopped() {
            return;
        }
        notified.await;
    }
}

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Idle = 0,
    Running = 1,
    Stopping = 2,
    Stopped = 3,
}

impl From<u8> for WorkerState {
    fn from(value: u8) -> Self {
        match value {
            0 => WorkerState::Idle,
            1 => WorkerState::Running,
            2 => WorkerState::Stopping,
            _ => WorkerState::Stopped,
        }
    }
}

#[derive(Clone, Debug)]
struct StateCell(Arc<AtomicU8>);

impl StateCell {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(WorkerState::Idle as u8)))
    }

    fn set(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::Release);
    }

    fn get(&self) -> WorkerState {
        self.0.load(Ordering::Acquire).into()
    }
}

struct Worker {
    id: usize,
    test_type: TestType,
    client: OperationClient,
    factory: Arc<RequestFactory>,
    stop: StopSignal,
    state: StateCell,
    rng: SmallRng,
    // Orders created by this worker only.
    created_orders: Vec<OrderId>,
    // Number of upcoming iterations that panic before doing anything.
    #[cfg(test)]
    faults: Arc<std::sync::atomic::AtomicUsize>,
}

impl Worker {
    #[instrument(name = "worker", skip_all, fields(id = self.id))]
    async fn run(mut self) {
        self.state.set(WorkerState::Running);
        trace!("Worker running.");

        while !self.stop.is_stopped() {
            let iteration = AssertUnwindSafe(self.iteration()).catch_unwind().await;
            if let Err(panic) = iteration {
                error!("Worker iteration failed: {}", panic_message(&*panic));
                sleep(ITERATION_ERROR_BACKOFF).await;
                continue;
            }

            let think_time = self.rng.gen_range(THINK_TIME_MIN..=THINK_TIME_MAX);
            sleep(think_time).await;
        }

        self.state.set(WorkerState::Stopping);
        trace!(
            "Worker stopping with {} known orders.",
            self.created_orders.len()
        );
        self.state.set(WorkerState::Stopped);
    }

    async fn iteration(&mut self) {
        #[cfg(test)]
        if self
            .faults
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            panic!("injected iteration fault");
        }

        let operation = match self.test_type {
            TestType::CreateOrder => Operation::CreateOrder,
            TestType::PayOrder => Operation::PayOrder,
            TestType::GetOrder => Operation::GetOrder,
            TestType::CalculatePrice => Operation::CalculatePrice,
            TestType::Mixed => Operation::ALL[self.rng.gen_range(0..Operation::ALL.len())],
        };
        self.perform(operation).await;
    }

    async fn perform(&mut self, operation: Operation) {
        match operation {
            Operation::CreateOrder => {
                self.create_order().await;
            }
            Operation::CalculatePrice => {
                let order = self.factory.order_request(&mut self.rng);
                if let Err(err) = self.client.calculate_price(&order).await {
                    debug!("calculate_price failed: {err}");
                }
            }
            Operation::PayOrder | Operation::GetOrder => {
                let id = match self.known_order() {
                    Some(id) => id,
                    // Nothing to act on yet, so make an order first.
                    None => match self.create_order().await {
                        Some(id) => id,
                        None => return,
                    },
                };

                let result = if operation == Operation::PayOrder {
                    self.client.pay_order(&id, &self.factory.pay_request()).await
                } else {
                    self.client.get_order(&id).await
                };
                if let Err(err) = result {
                    debug!("{operation} for order {id} failed: {err}");
                }
            }
        }
    }

    async fn create_order(&mut self) -> Option<OrderId> {
        let order = self.factory.order_request(&mut self.rng);
        match self.client.create_order(&order).await {
            Ok(Some(id)) => {
                self.created_orders.push(id.clone());
                Some(id)
            }
            Ok(None) => None,
            Err(err) => {
                debug!("create_order failed: {err}");
                None
            }
        }
    }

    fn known_order(&mut self) -> Option<OrderId> {
        if self.created_orders.is_empty() {
            return None;
        }
        let idx = self.rng.gen_range(0..self.created_orders.len());
        Some(self.created_orders[idx].clone())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

struct WorkerHandle {
    id: usize,
    started_at: Instant,
    state: StateCell,
    task: Option<JoinHandle<()>>,
}

/// Fixed set of workers sharing one client and one stop signal.
pub struct WorkerPool {
    size: usize,
    ramp_up_step: Duration,
    test_type: TestType,
    seed: Option<u64>,
    client: OperationClient,
    factory: Arc<RequestFactory>,
    stop: StopSignal,
    workers: Vec<WorkerHandle>,
}

impl WorkerPool {
    pub fn new(
        config: &RunConfig,
        client: OperationClient,
        factory: Arc<RequestFactory>,
        stop: StopSignal,
    ) -> Self {
        Self {
            size: config.workers,
            ramp_up_step: config.ramp_up_step(),
            test_type: config.test_type,
            seed: config.seed,
            client,
            factory,
            stop,
            workers: Vec::with_capacity(config.workers),
        }
    }

    /// Launches the workers one by one, `ramp_up / workers` apart.
    ///
    /// Returns once the last worker has been launched, or early when the stop
    /// signal is raised during ramp-up.
    #[instrument(name = "ramp_up", skip_all, fields(workers = self.size))]
    pub async fn start(&mut self) {
        debug!(
            "Launching a worker every {}",
            humantime::format_duration(self.ramp_up_step)
        );

        for id in self.workers.len()..self.size {
            if id > 0 && !self.ramp_up_step.is_zero() {
                sleep(self.ramp_up_step).await;
            }
            if self.stop.is_stopped() {
                warn!("Stopped during ramp-up with {id} of {} workers launched.", self.size);
                return;
            }
            self.launch(id);
        }
        info!("All {} workers running.", self.size);
    }

    fn launch(&mut self, id: usize) {
        let rng = match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(id as u64)),
            None => SmallRng::from_entropy(),
        };
        let state = StateCell::new();
        let worker = Worker {
            id,
            test_type: self.test_type,
            client: self.client.clone(),
            factory: self.factory.clone(),
            stop: self.stop.clone(),
            state: state.clone(),
            rng,
            created_orders: vec![],
            #[cfg(test)]
            faults: Default::default(),
        };

        let task = tokio::spawn(worker.run().in_current_span());
        self.workers.push(WorkerHandle {
            id,
            started_at: Instant::now(),
            state,
            task: Some(task),
        });
    }

    /// Number of launched workers.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn states(&self) -> Vec<WorkerState> {
        self.workers.iter().map(|w| w.state.get()).collect()
    }

    pub fn start_times(&self) -> Vec<Instant> {
        self.workers.iter().map(|w| w.started_at).collect()
    }

    /// Raises the stop signal and waits for every worker to leave its loop.
    ///
    /// In-flight calls get until `grace` runs out to complete (and be
    /// recorded); workers still busy after that are aborted. Returns the number
    /// of aborted workers.
    #[instrument(name = "shutdown", skip_all)]
    pub async fn shutdown(&mut self, grace: Duration) -> usize {
        self.stop.stop();
        let deadline = Instant::now() + grace;
        let mut aborted = 0;

        for worker in &mut self.workers {
            let Some(mut task) = worker.task.take() else {
                continue;
            };
            match timeout_at(deadline, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!("Worker {} ended abnormally: {err}", worker.id);
                    worker.state.set(WorkerState::Stopped);
                }
                Err(_) => {
                    task.abort();
                    worker.state.set(WorkerState::Stopped);
                    aborted += 1;
                }
            }
        }

        if aborted > 0 {
            warn!(
                "{aborted} workers still busy after {}; their in-flight calls were dropped.",
                humantime::format_duration(grace)
            );
        } else {
            debug!("All workers stopped.");
        }
        aborted
    }
}
