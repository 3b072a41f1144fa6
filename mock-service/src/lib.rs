//! Stand-in for the order API, used by the end-to-end tests and for local
//! smoke runs of the load generator.
use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, PoisonError,
};
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// How the mock answers every request.
#[derive(Clone, Debug)]
pub enum Behavior {
    /// Every call succeeds. Created orders get `fixed_id` when set, otherwise
    /// sequential numeric ids.
    Healthy { fixed_id: Option<String> },
    /// Every call fails with this HTTP status.
    Status(u16),
    /// HTTP 200 carrying an application error code.
    ApplicationError { code: i64, message: String },
    /// HTTP 200 with a body that is not JSON.
    Malformed,
}

/// What the mock has seen so far.
#[derive(Clone, Debug, Default)]
pub struct Hits {
    pub create: u64,
    pub pay: u64,
    pub get: u64,
    pub calculate: u64,
    pub paid_ids: Vec<String>,
    pub fetched_ids: Vec<String>,
}

#[derive(Debug)]
pub struct MockState {
    behavior: Behavior,
    delay: Duration,
    next_id: AtomicU64,
    requests: AtomicU64,
    hits: Mutex<Hits>,
}

impl MockState {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            next_id: AtomicU64::new(1),
            requests: AtomicU64::new(0),
            hits: Mutex::new(Hits::default()),
        }
    }

    /// Adds a fixed delay before every response.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn hits(&self) -> Hits {
        self.hits.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn track(&self, f: impl FnOnce(&mut Hits)) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        f(&mut self.hits.lock().unwrap_or_else(PoisonError::into_inner));
    }

    async fn respond(&self, data: impl FnOnce() -> Value) -> Response {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.behavior {
            Behavior::Healthy { .. } => (
                StatusCode::OK,
                Json(json!({ "code": 200, "message": "success", "data": data() })),
            )
                .into_response(),
            Behavior::Status(status) => {
                let status =
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (
                    status,
                    Json(json!({ "code": status.as_u16(), "message": "mock failure" })),
                )
                    .into_response()
            }
            Behavior::ApplicationError { code, message } => (
                StatusCode::OK,
                Json(json!({ "code": code, "message": message })),
            )
                .into_response(),
            Behavior::Malformed => (StatusCode::OK, "<html>upstream hiccup</html>").into_response(),
        }
    }

    fn order_id(&self) -> Value {
        match &self.behavior {
            Behavior::Healthy {
                fixed_id: Some(id),
            } => json!(id),
            _ => json!(self.next_id.fetch_add(1, Ordering::Relaxed)),
        }
    }
}

/// The subset of the order body the mock insists on.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBody {
    pub merchant_id: String,
    pub user_id: u64,
    pub order_items: Vec<OrderItemBody>,
    pub receiver_phone: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemBody {
    pub product_id: u64,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayBody {
    pub payment_method: String,
    pub amount: Option<f64>,
}

pub fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/api/orders", post(create_order))
        .route("/api/orders/calculate-price", post(calculate_price))
        .route("/api/orders/:id", get(get_order))
        .route("/api/orders/:id/pay", post(pay_order))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serves the mock on `addr` until the process exits.
pub async fn run(addr: SocketAddr, state: Arc<MockState>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Handle to a mock served in the background.
pub struct MockServer {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockServer {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Binds an ephemeral local port and serves the mock from a background task.
pub async fn spawn(state: MockState) -> anyhow::Result<MockServer> {
    let state = Arc::new(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let app = router(state.clone());
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!("Mock service stopped: {err}");
        }
    });
    debug!("Mock service listening on {addr}");

    Ok(MockServer { addr, state })
}

#[debug_handler]
async fn create_order(
    State(state): State<Arc<MockState>>,
    Json(order): Json<OrderBody>,
) -> Response {
    debug!(
        "create_order merchant={} user={} items={} phone={}",
        order.merchant_id,
        order.user_id,
        order.order_items.len(),
        order.receiver_phone
    );
    state.track(|hits| hits.create += 1);
    state
        .respond(|| json!({ "order": { "id": state.order_id(), "status": "PENDING" } }))
        .await
}

#[debug_handler]
async fn pay_order(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
    Json(pay): Json<PayBody>,
) -> Response {
    debug!("pay_order {id} via {} ({:?})", pay.payment_method, pay.amount);
    state.track(|hits| {
        hits.pay += 1;
        hits.paid_ids.push(id.clone());
    });
    state
        .respond(|| json!({ "orderId": id, "status": "PAID" }))
        .await
}

#[debug_handler]
async fn get_order(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    state.track(|hits| {
        hits.get += 1;
        hits.fetched_ids.push(id.clone());
    });
    state.respond(|| json!({ "id": id, "status": "PENDING" })).await
}

#[debug_handler]
async fn calculate_price(
    State(state): State<Arc<MockState>>,
    Json(order): Json<OrderBody>,
) -> Response {
    state.track(|hits| hits.calculate += 1);
    let quantity: u32 = order.order_items.iter().map(|item| item.quantity).sum();
    state
        .respond(|| json!({ "totalAmount": f64::from(quantity) * 12.5 }))
        .await
}

/// Prints the number of requests served each second.
pub async fn rate_printer(state: Arc<MockState>) {
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let requests = state.requests.swap(0, Ordering::Relaxed);
        println!("{requests} req/s");
    }
}
