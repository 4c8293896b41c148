//! Upstream request dispatcher.
//!
//! # Responsibilities
//! - Build upstream headers (API key, content negotiation, idempotency key)
//! - Execute attempts through the transport and classify each outcome
//! - Retry transient conditions with jittered backoff within a deadline
//!
//! # State Machine
//! ```text
//! INIT → ATTEMPTING → SUCCESS                    (terminal status / success)
//!                   → RETRY_WAIT → ATTEMPTING    (retryable, attempts remain)
//!                   → EXHAUSTED_WITH_RESPONSE    (returns last retryable response)
//!                   → EXHAUSTED_WITH_ERROR       (returns last transport error)
//! ```
//!
//! # Design Decisions
//! - The request (headers included) is built once, so every attempt of one
//!   logical call carries the same idempotency key
//! - A dispatch snapshots the retry policy at start; reloads affect new calls
//! - Terminal upstream statuses are results, not errors

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use uuid::Uuid;

use crate::bridge::transport::{
    HttpTransport, OutboundRequest, Transport, TransportError, TransportErrorKind,
};
use crate::bridge::types::{DispatchError, DispatchOptions, DispatchRequest, DispatchResult, Method};
use crate::config::{GatewayConfig, UpstreamConfig};
use crate::observability::metrics;
use crate::resilience::{AttemptOutcome, Deadline, RetryPolicy};

pub const API_KEY_HEADER: &str = "api-key";
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Dispatcher for calls to the upstream financial API.
///
/// Cheap to clone; clones share the transport and the retry policy slot.
#[derive(Clone)]
pub struct BridgeClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    api_key: String,
    policy: Arc<ArcSwap<RetryPolicy>>,
}

impl fmt::Debug for BridgeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("policy", &self.policy.load())
            .finish()
    }
}

impl BridgeClient {
    pub fn new(upstream: &UpstreamConfig, policy: RetryPolicy, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            base_url: upstream.base_url.trim_end_matches('/').to_string(),
            api_key: upstream.api_key.clone(),
            policy: Arc::new(ArcSwap::from_pointee(policy)),
        }
    }

    /// Build a dispatcher with the production HTTP transport.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(&config.upstream)?;
        Ok(Self::new(
            &config.upstream,
            RetryPolicy::from_config(&config.retries),
            Arc::new(transport),
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current retry policy snapshot.
    pub fn retry_policy(&self) -> Arc<RetryPolicy> {
        self.policy.load_full()
    }

    /// Replace the policy used by dispatches that start after this call.
    pub fn set_retry_policy(&self, policy: RetryPolicy) {
        self.policy.store(Arc::new(policy));
    }

    /// Dispatch one logical call.
    ///
    /// Returns a result for every received response, including terminal 4xx/5xx
    /// and retryable statuses left over after exhaustion. Fails only when no
    /// response was ever received.
    pub async fn dispatch(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: DispatchOptions,
    ) -> Result<DispatchResult, DispatchError> {
        self.dispatch_request(DispatchRequest {
            method,
            path: path.to_string(),
            body,
            options,
        })
        .await
    }

    pub async fn dispatch_request(&self, request: DispatchRequest) -> Result<DispatchResult, DispatchError> {
        let policy = self.policy.load_full();
        let started = Instant::now();
        let deadline = Deadline::starting_now(policy.deadline());
        let method = request.method;

        let outbound = self.build_request(request).map_err(|source| {
            metrics::record_dispatch(method.as_str(), None, 0, started);
            DispatchError::Transport { source, attempts: 0 }
        })?;
        let url = outbound.url.as_str();
        let max_retries = policy.max_retries();

        let mut attempts = 0;
        let mut last_response: Option<DispatchResult> = None;
        let mut last_error: Option<TransportError> = None;

        for attempt in 0..=max_retries {
            if attempt > 0 {
                let delay = policy.delay(attempt - 1);
                tracing::info!(
                    attempt,
                    max_retries,
                    delay_ms = delay.as_millis() as u64,
                    url,
                    "Retrying upstream request"
                );
                if deadline.run(tokio::time::sleep(delay)).await.is_err() {
                    break;
                }
            }

            attempts = attempt + 1;
            tracing::debug!(
                method = %method,
                url,
                has_body = outbound.body.is_some(),
                attempt = attempts,
                "Upstream request"
            );

            let sent = match deadline.run(self.transport.send(&outbound)).await {
                Ok(sent) => sent,
                Err(_) => break,
            };

            match sent {
                Ok(raw) => {
                    let result = DispatchResult::new(raw.status, &raw.body, attempts);
                    if policy.is_retryable(AttemptOutcome::Status(raw.status))
                        && policy.has_attempts_left(attempt)
                    {
                        tracing::warn!(status = raw.status, attempt = attempts, url, "Retryable upstream status");
                        metrics::record_upstream_attempt(method.as_str(), "retryable_status");
                        last_response = Some(result);
                        continue;
                    }

                    if result.ok {
                        metrics::record_upstream_attempt(method.as_str(), "success");
                        tracing::debug!(status = result.status, url, attempts, "Upstream response");
                    } else if policy.is_retryable(AttemptOutcome::Status(raw.status)) {
                        metrics::record_upstream_attempt(method.as_str(), "retryable_status");
                        tracing::error!(status = result.status, url, attempts, "Upstream failed after retries");
                    } else {
                        metrics::record_upstream_attempt(method.as_str(), "terminal_status");
                        tracing::debug!(status = result.status, url, attempts, "Upstream response");
                    }
                    metrics::record_dispatch(method.as_str(), Some(result.status), attempts, started);
                    return Ok(result);
                }
                Err(error) => {
                    let message = error.to_string();
                    if policy.is_retryable(AttemptOutcome::Error(&message))
                        && policy.has_attempts_left(attempt)
                    {
                        tracing::warn!(error = %message, attempt = attempts, url, "Retryable transport error");
                        metrics::record_upstream_attempt(method.as_str(), "retryable_error");
                        last_error = Some(error);
                        continue;
                    }

                    tracing::error!(error = %message, url, attempts, "Upstream request failed");
                    metrics::record_upstream_attempt(method.as_str(), "error");
                    metrics::record_dispatch(method.as_str(), None, attempts, started);
                    return Err(DispatchError::Transport { source: error, attempts });
                }
            }
        }

        // Only the deadline leaves the loop without returning.
        let budget_ms = deadline.budget().map(|b| b.as_millis() as u64).unwrap_or_default();
        if let Some(mut response) = last_response {
            tracing::error!(status = response.status, url, attempts, budget_ms, "Upstream deadline reached, returning last response");
            response.attempts = attempts;
            metrics::record_dispatch(method.as_str(), Some(response.status), attempts, started);
            return Ok(response);
        }

        tracing::error!(
            url,
            attempts,
            budget_ms,
            last_error = ?last_error,
            "Upstream deadline exceeded"
        );
        metrics::record_dispatch(method.as_str(), None, attempts, started);
        Err(DispatchError::DeadlineExceeded { budget_ms, attempts })
    }

    fn build_request(&self, request: DispatchRequest) -> Result<OutboundRequest, TransportError> {
        let DispatchRequest { method, path, body, options } = request;
        let url = if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(API_KEY_HEADER), header_value(&self.api_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let body = if method.is_mutating() {
            let key = idempotency_key(&options);
            headers.insert(HeaderName::from_static(IDEMPOTENCY_KEY_HEADER), header_value(&key)?);
            body.map(|b| b.to_string())
        } else {
            None
        };

        Ok(OutboundRequest { method, url, headers, body })
    }
}

fn idempotency_key(options: &DispatchOptions) -> String {
    options
        .idempotency_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn header_value(value: &str) -> Result<HeaderValue, TransportError> {
    HeaderValue::from_str(value)
        .map_err(|e| TransportError::new(TransportErrorKind::InvalidRequest, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::transport::RawResponse;
    use crate::config::RetryConfig;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    type Step = Result<RawResponse, TransportError>;

    /// Plays back a script of outcomes, repeating the last one forever.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Step>>,
        last: Mutex<Option<Step>>,
        delay: Duration,
        seen: Mutex<Vec<OutboundRequest>>,
    }

    impl ScriptedTransport {
        fn new(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(steps.into()),
                last: Mutex::new(None),
                delay: Duration::ZERO,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn slow(steps: Vec<Step>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(steps.into()),
                last: Mutex::new(None),
                delay,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }

        fn seen(&self) -> Vec<OutboundRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: &OutboundRequest) -> Result<RawResponse, TransportError> {
            self.seen.lock().unwrap().push(request.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let next = self.script.lock().unwrap().pop_front();
            let mut last = self.last.lock().unwrap();
            match next {
                Some(step) => {
                    *last = Some(step.clone());
                    step
                }
                None => last.clone().expect("script must not be empty"),
            }
        }
    }

    fn ok(status: u16, body: &str) -> Step {
        Ok(RawResponse::new(status, body))
    }

    fn fail(kind: TransportErrorKind) -> Step {
        Err(TransportError::new(kind, "simulated"))
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::from_config(&RetryConfig {
            max_retries,
            base_delay_ms: 0,
            max_delay_ms: 0,
            ..RetryConfig::default()
        })
    }

    fn client(transport: Arc<ScriptedTransport>, policy: RetryPolicy) -> BridgeClient {
        let upstream = UpstreamConfig {
            base_url: "https://upstream.test/v0/".into(),
            api_key: "sk-test".into(),
            ..UpstreamConfig::default()
        };
        BridgeClient::new(&upstream, policy, transport)
    }

    #[tokio::test]
    async fn test_exhausts_on_retryable_status_without_error() {
        let transport = ScriptedTransport::new(vec![ok(503, r#"{"error":"unavailable"}"#)]);
        let bridge = client(transport.clone(), fast_policy(3));

        let result = bridge
            .dispatch(Method::Get, "/customers", None, DispatchOptions::default())
            .await
            .unwrap();

        assert_eq!(result.status, 503);
        assert!(!result.ok);
        assert_eq!(result.attempts, 4);
        assert_eq!(result.data, json!({"error": "unavailable"}));
        assert_eq!(transport.calls(), 4);
    }

    #[tokio::test]
    async fn test_network_errors_then_success_reuse_idempotency_key() {
        let transport = ScriptedTransport::new(vec![
            fail(TransportErrorKind::ConnectionReset),
            fail(TransportErrorKind::Timeout),
            ok(201, r#"{"id":"tr_1"}"#),
        ]);
        let bridge = client(transport.clone(), fast_policy(3));

        let result = bridge
            .dispatch(Method::Post, "/transfers", Some(json!({"amount": "10.00"})), DispatchOptions::default())
            .await
            .unwrap();

        assert_eq!(result.status, 201);
        assert!(result.ok);
        assert_eq!(result.attempts, 3);

        let seen = transport.seen();
        assert_eq!(seen.len(), 3);
        let keys: Vec<_> = seen
            .iter()
            .map(|r| r.headers.get(IDEMPOTENCY_KEY_HEADER).unwrap().clone())
            .collect();
        assert!(!keys[0].is_empty());
        assert!(keys.iter().all(|k| *k == keys[0]));
    }

    #[tokio::test]
    async fn test_terminal_status_returns_immediately() {
        let transport = ScriptedTransport::new(vec![ok(404, r#"{"code":"not_found"}"#)]);
        let bridge = client(transport.clone(), fast_policy(3));

        let result = bridge
            .dispatch(Method::Get, "/customers/nope", None, DispatchOptions::default())
            .await
            .unwrap();

        assert_eq!(result.status, 404);
        assert!(!result.ok);
        assert_eq!(result.attempts, 1);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_non_retryable_error_propagates_after_one_attempt() {
        let transport = ScriptedTransport::new(vec![fail(TransportErrorKind::InvalidRequest)]);
        let bridge = client(transport.clone(), fast_policy(3));

        let err = bridge
            .dispatch(Method::Post, "/customers", Some(json!({})), DispatchOptions::default())
            .await
            .unwrap_err();

        match err {
            DispatchError::Transport { source, attempts } => {
                assert_eq!(attempts, 1);
                assert_eq!(source.kind(), TransportErrorKind::InvalidRequest);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_exhausts_on_transport_errors() {
        let transport = ScriptedTransport::new(vec![fail(TransportErrorKind::DnsFailure)]);
        let bridge = client(transport.clone(), fast_policy(2));

        let err = bridge
            .dispatch(Method::Get, "/lists/chains", None, DispatchOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.attempts(), 3);
        assert!(err.to_string().contains("ENOTFOUND"));
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_mixed_retryable_conditions() {
        let transport = ScriptedTransport::new(vec![
            ok(502, "bad gateway"),
            fail(TransportErrorKind::FetchFailed),
            ok(200, r#"{"data":[]}"#),
        ]);
        let bridge = client(transport.clone(), fast_policy(3));

        let result = bridge
            .dispatch(Method::Get, "/transfers", None, DispatchOptions::default())
            .await
            .unwrap();
        assert_eq!(result.attempts, 3);
        assert_eq!(result.data, json!({"data": []}));
    }

    #[tokio::test]
    async fn test_raw_text_fallback() {
        let transport = ScriptedTransport::new(vec![ok(200, "not json")]);
        let bridge = client(transport, fast_policy(0));

        let result = bridge
            .dispatch(Method::Get, "/lists/countries", None, DispatchOptions::default())
            .await
            .unwrap();
        assert_eq!(result.data, json!({"raw": "not json"}));
    }

    #[tokio::test]
    async fn test_headers_and_body_for_mutating_methods() {
        let transport = ScriptedTransport::new(vec![ok(200, "{}")]);
        let bridge = client(transport.clone(), fast_policy(0));

        bridge
            .dispatch(
                Method::Put,
                "customers/c1",
                Some(json!({"first_name": "Ada"})),
                DispatchOptions::with_idempotency_key("caller-key-1"),
            )
            .await
            .unwrap();

        let seen = transport.seen();
        let request = &seen[0];
        assert_eq!(request.url, "https://upstream.test/v0/customers/c1");
        assert_eq!(request.headers.get(API_KEY_HEADER).unwrap(), "sk-test");
        assert_eq!(request.headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(request.headers.get(ACCEPT).unwrap(), "application/json");
        assert_eq!(request.headers.get(IDEMPOTENCY_KEY_HEADER).unwrap(), "caller-key-1");
        assert_eq!(request.body.as_deref(), Some(r#"{"first_name":"Ada"}"#));
    }

    #[tokio::test]
    async fn test_read_methods_carry_no_key_or_body() {
        let transport = ScriptedTransport::new(vec![ok(200, "{}")]);
        let bridge = client(transport.clone(), fast_policy(0));

        for method in [Method::Get, Method::Delete] {
            bridge
                .dispatch(method, "/cards/c1", Some(json!({"ignored": true})), DispatchOptions::default())
                .await
                .unwrap();
        }

        for request in transport.seen() {
            assert!(request.headers.get(IDEMPOTENCY_KEY_HEADER).is_none());
            assert!(request.body.is_none());
        }
    }

    #[tokio::test]
    async fn test_each_dispatch_gets_its_own_key() {
        let transport = ScriptedTransport::new(vec![ok(200, "{}")]);
        let bridge = client(transport.clone(), fast_policy(0));

        for _ in 0..2 {
            bridge
                .dispatch(Method::Post, "/kyc_links", None, DispatchOptions::default())
                .await
                .unwrap();
        }
        let seen = transport.seen();
        assert_ne!(
            seen[0].headers.get(IDEMPOTENCY_KEY_HEADER),
            seen[1].headers.get(IDEMPOTENCY_KEY_HEADER)
        );
    }

    #[tokio::test]
    async fn test_policy_swap_applies_to_new_dispatches() {
        let transport = ScriptedTransport::new(vec![ok(503, "{}")]);
        let bridge = client(transport.clone(), fast_policy(3));
        bridge.set_retry_policy(fast_policy(0));

        let result = bridge
            .dispatch(Method::Get, "/customers", None, DispatchOptions::default())
            .await
            .unwrap();
        assert_eq!(result.attempts, 1);
        assert_eq!(bridge.retry_policy().max_retries(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_without_response_is_error() {
        let transport = ScriptedTransport::slow(vec![ok(200, "{}")], Duration::from_secs(10));
        let policy = RetryPolicy::from_config(&RetryConfig {
            deadline_ms: 1_000,
            ..RetryConfig::default()
        });
        let bridge = client(transport.clone(), policy);

        let err = bridge
            .dispatch(Method::Get, "/customers", None, DispatchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::DeadlineExceeded { budget_ms: 1_000, attempts: 1 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_during_backoff_returns_last_response() {
        let transport = ScriptedTransport::new(vec![ok(503, r#"{"busy":true}"#)]);
        let policy = RetryPolicy::from_config(&RetryConfig {
            base_delay_ms: 5_000,
            max_delay_ms: 5_000,
            deadline_ms: 1_000,
            ..RetryConfig::default()
        });
        let bridge = client(transport.clone(), policy);

        let result = bridge
            .dispatch(Method::Get, "/customers", None, DispatchOptions::default())
            .await
            .unwrap();
        assert_eq!(result.status, 503);
        assert_eq!(result.attempts, 1);
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let bridge = client(ScriptedTransport::new(vec![ok(200, "{}")]), fast_policy(0));
        let debug = format!("{bridge:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("sk-test"));
    }
}
