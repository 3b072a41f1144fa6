//! One HTTP round trip per logical operation.
//!
//! Every call made through [`OperationClient`] is timed, classified and
//! recorded into the shared [`StatsAggregator`] exactly once, whatever the
//! result. Failures come back as [`CallError`] so the caller can decide what
//! to do next; nothing is retried here.
use orderload_core::{
    OrderId, OrderRequest, Operation, PayRequest, RequestOutcome, RunConfig, StatsAggregator,
    ERROR_LABEL_MAX_CHARS, SUCCESS_CODE,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn};

#[derive(Debug, Error)]
pub enum CallError {
    #[error("{label}")]
    Transport {
        label: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status}: {label}")]
    Protocol { status: u16, label: String },

    #[error("Application code {code:?}: {label}")]
    Application { code: Option<i64>, label: String },

    #[error("Malformed response: {label}")]
    Malformed { label: String },
}

impl CallError {
    /// Short description used as the error histogram key.
    pub fn label(&self) -> &str {
        match self {
            CallError::Transport { label, .. }
            | CallError::Protocol { label, .. }
            | CallError::Application { label, .. }
            | CallError::Malformed { label } => label,
        }
    }

    /// HTTP status of the response, if one arrived.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            CallError::Transport { .. } => None,
            CallError::Protocol { status, .. } => Some(*status),
            CallError::Application { .. } | CallError::Malformed { .. } => {
                Some(StatusCode::OK.as_u16())
            }
        }
    }
}

/// Response envelope of the order API.
#[derive(Debug, Deserialize)]
struct Envelope {
    code: Option<i64>,
    message: Option<String>,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Clone, Debug)]
pub struct OperationClient {
    http: Client,
    base_url: String,
    stats: Arc<StatsAggregator>,
}

impl OperationClient {
    pub fn new(config: &RunConfig, stats: Arc<StatsAggregator>) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            stats,
        })
    }

    pub fn stats(&self) -> &Arc<StatsAggregator> {
        &self.stats
    }

    /// `POST /api/orders`. Returns the id of the created order when the
    /// response carries one.
    pub async fn create_order(&self, order: &OrderRequest) -> Result<Option<OrderId>, CallError> {
        let request = self
            .http
            .post(format!("{}/api/orders", self.base_url))
            .json(order);
        let envelope = self.execute(Operation::CreateOrder, request).await?;

        let id = envelope.data.pointer("/order/id").and_then(order_id);
        if id.is_none() {
            debug!("Order created without an id in the response.");
        }
        Ok(id)
    }

    /// `POST /api/orders/{id}/pay`
    pub async fn pay_order(&self, id: &OrderId, payment: &PayRequest) -> Result<(), CallError> {
        let request = self
            .http
            .post(format!("{}/api/orders/{id}/pay", self.base_url))
            .json(payment);
        self.execute(Operation::PayOrder, request).await?;
        Ok(())
    }

    /// `GET /api/orders/{id}`
    pub async fn get_order(&self, id: &OrderId) -> Result<(), CallError> {
        let request = self.http.get(format!("{}/api/orders/{id}", self.base_url));
        self.execute(Operation::GetOrder, request).await?;
        Ok(())
    }

    /// `POST /api/orders/calculate-price`
    pub async fn calculate_price(&self, order: &OrderRequest) -> Result<(), CallError> {
        let request = self
            .http
            .post(format!("{}/api/orders/calculate-price", self.base_url))
            .json(order);
        self.execute(Operation::CalculatePrice, request).await?;
        Ok(())
    }

    #[instrument(level = "trace", skip_all, fields(operation = %operation))]
    async fn execute(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> Result<Envelope, CallError> {
        let start = Instant::now();
        let response = send(request).await;
        let latency_ms = start.elapsed().as_secs_f64() * 1_000.;

        let result = match response {
            Ok((status, body)) => classify(status, &body),
            Err(err) => Err(CallError::Transport {
                label: truncate(&err.to_string()),
                source: err,
            }),
        };

        let outcome = match &result {
            Ok(_) => RequestOutcome::success(latency_ms, StatusCode::OK.as_u16()),
            Err(err) => {
                trace!("{operation} failed after {latency_ms:.2}ms: {err}");
                RequestOutcome::failure(latency_ms, err.status_code(), err.label())
            }
        };
        observe(operation, &outcome);
        self.stats.record(outcome);

        result
    }
}

/// Sends the request and reads the whole body, so the measured latency covers
/// the full response.
async fn send(request: RequestBuilder) -> Result<(StatusCode, Vec<u8>), reqwest::Error> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.bytes().await?;
    Ok((status, body.to_vec()))
}

fn classify(status: StatusCode, body: &[u8]) -> Result<Envelope, CallError> {
    if status != StatusCode::OK {
        return Err(CallError::Protocol {
            status: status.as_u16(),
            label: body_label(body).unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
        });
    }

    let envelope: Envelope = serde_json::from_slice(body).map_err(|_| CallError::Malformed {
        label: body_label(body).unwrap_or_else(|| "Empty response body".to_string()),
    })?;

    if envelope.code != Some(SUCCESS_CODE) {
        let label = match &envelope.message {
            Some(message) => truncate(message),
            None => body_label(body).unwrap_or_else(|| format!("code {:?}", envelope.code)),
        };
        return Err(CallError::Application {
            code: envelope.code,
            label,
        });
    }

    Ok(envelope)
}

/// Best-effort label from a response body: its `message` field, else the raw
/// text.
fn body_label(body: &[u8]) -> Option<String> {
    if let Ok(ErrorBody {
        message: Some(message),
    }) = serde_json::from_slice(body)
    {
        return Some(truncate(&message));
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(truncate(text))
    }
}

fn order_id(value: &Value) -> Option<OrderId> {
    match value {
        Value::String(id) => Some(OrderId::from(id.as_str())),
        Value::Number(id) => Some(OrderId::from(id.to_string())),
        _ => None,
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(ERROR_LABEL_MAX_CHARS).collect()
}

#[cfg(feature = "metrics")]
fn observe(operation: Operation, outcome: &RequestOutcome) {
    let labels = operation.labels();
    metrics::histogram!(labels.latency).record(outcome.latency_ms);
    if outcome.success {
        metrics::counter!(labels.success).increment(1);
    } else {
        metrics::counter!(labels.error).increment(1);
    }
}

#[cfg(not(feature = "metrics"))]
fn observe(_operation: Operation, _outcome: &RequestOutcome) {}

#[cfg(test)]
mod tests {
    use super::*;
    use orderload_core::StatsAggregator;
    use serde_json::json;
    use std::time::Duration;

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn success_envelope() {
        let envelope = classify(
            StatusCode::OK,
            &body(json!({ "code": 200, "data": { "order": { "id": "X" } } })),
        )
        .unwrap();
        let id = envelope.data.pointer("/order/id").and_then(order_id);
        assert_eq!(id, Some(OrderId::from("X")));
    }

    #[test]
    fn numeric_order_id() {
        assert_eq!(order_id(&json!(123456789)), Some(OrderId::from("123456789")));
        assert_eq!(order_id(&json!(null)), None);
    }

    #[test]
    fn non_200_status_prefers_message() {
        let err = classify(
            StatusCode::INTERNAL_SERVER_ERROR,
            &body(json!({ "code": 500, "message": "database down" })),
        )
        .unwrap_err();
        assert!(matches!(err, CallError::Protocol { status: 500, .. }));
        assert_eq!(err.label(), "database down");
        assert_eq!(err.status_code(), Some(500));
    }

    #[test]
    fn non_200_status_without_body() {
        let err = classify(StatusCode::BAD_GATEWAY, b"").unwrap_err();
        assert_eq!(err.label(), "HTTP 502");
    }

    #[test]
    fn application_error() {
        let err = classify(
            StatusCode::OK,
            &body(json!({ "code": 4001, "message": "insufficient stock" })),
        )
        .unwrap_err();
        assert!(matches!(err, CallError::Application { code: Some(4001), .. }));
        assert_eq!(err.label(), "insufficient stock");
        assert_eq!(err.status_code(), Some(200));
    }

    #[test]
    fn malformed_body_is_truncated() {
        let raw = "<html>".repeat(50);
        let err = classify(StatusCode::OK, raw.as_bytes()).unwrap_err();
        assert!(matches!(err, CallError::Malformed { .. }));
        assert_eq!(err.label().chars().count(), ERROR_LABEL_MAX_CHARS);
        assert!(raw.starts_with(err.label()));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let label = truncate(&"库存不足".repeat(40));
        assert_eq!(label.chars().count(), ERROR_LABEL_MAX_CHARS);
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn unreachable_target_records_one_failure() {
        let stats = Arc::new(StatsAggregator::new());
        let config = RunConfig::new("http://127.0.0.1:1").with_request_timeout(Duration::from_secs(5));
        let client = OperationClient::new(&config, stats.clone()).unwrap();

        let err = client.get_order(&OrderId::from("1")).await.unwrap_err();
        assert!(matches!(err, CallError::Transport { .. }));
        assert!(!err.label().is_empty());
        assert!(err.label().chars().count() <= ERROR_LABEL_MAX_CHARS);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total, 1);
        assert_eq!(snapshot.failed, 1);
        assert!(snapshot.status_codes.is_empty());
        assert_eq!(snapshot.errors.get(err.label()), Some(&1));
    }
}
