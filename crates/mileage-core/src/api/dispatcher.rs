//! Endpoint negotiation.
//!
//! A logical operation is tried against every configured URL convention, in
//! order, until one attempt succeeds at the transport level. Writes try each
//! body encoding of a convention before moving to the next one. Every attempt
//! is bounded by its own timeout.

use std::time::Duration;

use futures::future::{self, FutureExt};
use reqwest::{Method, Url};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::candidates::{build_candidates, parse_base_url, BodyEncoding, RouteStyle};
use super::transport::{HttpRequest, HttpResponse, Transport};
use super::{AttemptError, SyncError};
use crate::config::Config;

/// Per-attempt timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(25_000);

/// Upper bound for the startup warm-up ping.
pub const DEFAULT_WARM_UP_TIMEOUT: Duration = Duration::from_millis(4_000);

/// Message used when a tagged failure carries no error text.
const DEFAULT_FAILURE_MESSAGE: &str = "request failed";

/// Query parameters for reads, or the logical body for writes.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Query(Vec<(String, String)>),
    Body(Value),
}

impl Payload {
    pub fn none() -> Self {
        Payload::Query(Vec::new())
    }

    pub fn query<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Payload::Query(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Result of walking the candidate list.
enum Outcome {
    Success(HttpResponse),
    Failure(AttemptError),
}

pub struct Dispatcher<T> {
    transport: T,
    base: Url,
    routes: Vec<RouteStyle>,
    encodings: Vec<BodyEncoding>,
    timeout: Duration,
    warm_up_timeout: Duration,
}

impl<T: Transport> Dispatcher<T> {
    /// Dispatcher with the default conventions and timeouts.
    pub fn new(transport: T, base_url: &str) -> Result<Self, SyncError> {
        let base = parse_base_url(base_url).map_err(SyncError::Config)?;
        Ok(Self {
            transport,
            base,
            routes: RouteStyle::defaults(),
            encodings: BodyEncoding::defaults(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            warm_up_timeout: DEFAULT_WARM_UP_TIMEOUT,
        })
    }

    pub fn from_config(transport: T, config: &Config) -> Result<Self, SyncError> {
        let base = config.api_base_url.as_deref().unwrap_or_default();
        let dispatcher = Self::new(transport, base)?
            .with_routes(config.routes.clone())?
            .with_encodings(config.write_encodings.clone())?
            .with_timeout(config.request_timeout())
            .with_warm_up_timeout(config.warm_up_timeout());
        Ok(dispatcher)
    }

    pub fn with_routes(mut self, routes: Vec<RouteStyle>) -> Result<Self, SyncError> {
        if routes.is_empty() {
            return Err(SyncError::Config("at least one route style is required".to_string()));
        }
        self.routes = routes;
        Ok(self)
    }

    pub fn with_encodings(mut self, encodings: Vec<BodyEncoding>) -> Result<Self, SyncError> {
        if encodings.is_empty() {
            return Err(SyncError::Config("at least one write encoding is required".to_string()));
        }
        self.encodings = encodings;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_warm_up_timeout(mut self, timeout: Duration) -> Self {
        self.warm_up_timeout = timeout;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn get(&self, op: &str, payload: Payload) -> Result<Value, SyncError> {
        self.call(op, Method::GET, payload).await
    }

    pub async fn post(&self, op: &str, body: Value) -> Result<Value, SyncError> {
        self.call(op, Method::POST, Payload::Body(body)).await
    }

    /// Run `op` against the candidate list and return the decoded body.
    ///
    /// Fails with `SyncError::Transport` only after every candidate failed,
    /// or with `SyncError::Application` when the first successful response
    /// is a tagged failure.
    pub async fn call(&self, op: &str, method: Method, payload: Payload) -> Result<Value, SyncError> {
        let (query, body): (&[(String, String)], Option<&Value>) = match &payload {
            Payload::Query(pairs) => (pairs.as_slice(), None),
            Payload::Body(value) => (&[][..], Some(value)),
        };
        let candidates = build_candidates(
            &self.base,
            &self.routes,
            &self.encodings,
            op,
            &method,
            query,
            body,
        );

        match self.first_success(op, &candidates).await {
            Outcome::Success(response) => unwrap_envelope(op, decode_body(&response.body)),
            Outcome::Failure(last) => {
                warn!(operation = op, attempts = candidates.len(), error = %last, "All endpoint styles failed");
                Err(SyncError::Transport {
                    operation: op.to_string(),
                    last,
                })
            }
        }
    }

    async fn first_success(&self, op: &str, candidates: &[HttpRequest]) -> Outcome {
        let mut last = AttemptError::Network("no candidates".to_string());
        for (index, candidate) in candidates.iter().enumerate() {
            match self.attempt(candidate).await {
                Ok(response) => {
                    debug!(operation = op, url = %candidate.url, attempt = index + 1, "Candidate succeeded");
                    return Outcome::Success(response);
                }
                Err(e) => {
                    debug!(operation = op, url = %candidate.url, attempt = index + 1, error = %e, "Candidate failed");
                    last = e;
                }
            }
        }
        Outcome::Failure(last)
    }

    async fn attempt(&self, request: &HttpRequest) -> Result<HttpResponse, AttemptError> {
        let response = tokio::time::timeout(self.timeout, self.transport.send(request))
            .await
            .map_err(|_| AttemptError::Timeout(self.timeout))??;

        if response.is_success() {
            Ok(response)
        } else {
            Err(AttemptError::from_status(response.status, &response.body))
        }
    }

    /// Fire GETs at every `ping` candidate and the bare base address at once
    /// so a sleeping backend starts waking up. Returns on the first
    /// completion or after the warm-up timeout; never fails.
    pub async fn warm_up(&self) {
        let mut requests: Vec<HttpRequest> = self
            .routes
            .iter()
            .map(|route| HttpRequest::get(route.url(&self.base, "ping", &[])))
            .collect();
        requests.push(HttpRequest::get(self.base.as_str()));

        let pings = requests
            .iter()
            .map(|request| self.transport.send(request).boxed_local());

        match tokio::time::timeout(self.warm_up_timeout, future::select_all(pings)).await {
            Ok((result, index, _)) => {
                debug!(url = %requests[index].url, ok = result.is_ok(), "Warm-up ping completed")
            }
            Err(_) => debug!("Warm-up ping timed out"),
        };
    }
}

/// Decode a response body: empty means no data, JSON is parsed, anything else
/// is passed through as text.
pub fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Unwrap a tagged `{ok, error?, data?}` envelope. Anything without a
/// boolean `ok` passes through untouched.
pub fn unwrap_envelope(op: &str, value: Value) -> Result<Value, SyncError> {
    let mut map: Map<String, Value> = match value {
        Value::Object(map) if map.get("ok").is_some_and(Value::is_boolean) => map,
        other => return Ok(other),
    };

    if map.get("ok") == Some(&Value::Bool(true)) {
        if let Some(data) = map.remove("data") {
            return Ok(data);
        }
        map.remove("ok");
        map.remove("error");
        return Ok(if map.is_empty() { Value::Null } else { Value::Object(map) });
    }

    let message = ["error", "message"]
        .iter()
        .filter_map(|k| map.get(*k))
        .find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());

    Err(SyncError::Application {
        operation: op.to_string(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RequestBody;
    use crate::test_harness::{FakeTransport, Reply};
    use serde_json::json;

    const BASE: &str = "https://api.test/";

    fn dispatcher(transport: FakeTransport) -> Dispatcher<FakeTransport> {
        Dispatcher::new(transport, BASE).unwrap()
    }

    #[tokio::test]
    async fn test_returns_first_success_without_further_attempts() {
        let transport = FakeTransport::new()
            .reply("https://api.test/week?weekId=2024-W01", Reply::status(404, "Not Found"))
            .reply("https://api.test/?action=week&weekId=2024-W01", Reply::network("connection reset"))
            .reply("https://api.test/?route=week&weekId=2024-W01", Reply::ok(r#"{"entries": []}"#))
            .reply("https://api.test/?op=week&weekId=2024-W01", Reply::ok(r#"{"wrong": true}"#));
        let dispatcher = dispatcher(transport);

        let value = dispatcher
            .get("week", Payload::query([("weekId", "2024-W01")]))
            .await
            .unwrap();

        assert_eq!(value, json!({"entries": []}));
        assert_eq!(dispatcher.transport().request_count(), 3);
        assert_eq!(
            dispatcher.transport().urls().last().map(String::as_str),
            Some("https://api.test/?route=week&weekId=2024-W01")
        );
    }

    #[tokio::test]
    async fn test_first_candidate_success_is_single_attempt() {
        let transport = FakeTransport::new().fallback(Reply::ok("[1, 2]"));
        let dispatcher = dispatcher(transport);
        let value = dispatcher.get("weeks", Payload::none()).await.unwrap();
        assert_eq!(value, json!([1, 2]));
        assert_eq!(dispatcher.transport().urls(), vec!["https://api.test/weeks"]);
    }

    #[tokio::test]
    async fn test_all_candidates_fail_reports_last_error() {
        let transport = FakeTransport::new()
            .reply("https://api.test/?op=config", Reply::status(500, "boom"))
            .fallback(Reply::status(404, ""));
        let dispatcher = dispatcher(transport);

        let err = dispatcher.get("config", Payload::none()).await.unwrap_err();
        assert_eq!(
            err,
            SyncError::Transport {
                operation: "config".to_string(),
                last: AttemptError::Status {
                    status: 500,
                    body: "boom".to_string()
                },
            }
        );
        assert_eq!(dispatcher.transport().request_count(), 4);
    }

    #[tokio::test]
    async fn test_write_falls_back_to_form_encoding() {
        let transport = FakeTransport::new()
            .reply_form("https://api.test/entry", Reply::ok(r#"{"ok": true}"#))
            .fallback(Reply::status(415, "Unsupported Media Type"));
        let dispatcher = dispatcher(transport);

        let value = dispatcher.post("entry", json!({"miles": 3})).await.unwrap();
        assert_eq!(value, Value::Null);

        let requests = dispatcher.transport().requests();
        assert_eq!(requests.len(), 2);
        assert!(matches!(requests[0].body, RequestBody::Json(_)));
        assert!(matches!(requests[1].body, RequestBody::Form(_)));
        assert!(requests.iter().all(|r| r.method == Method::POST));
    }

    #[tokio::test]
    async fn test_write_exhausts_both_encodings_of_every_candidate() {
        let transport = FakeTransport::new().fallback(Reply::network("offline"));
        let dispatcher = dispatcher(transport);
        let err = dispatcher.post("entry", json!({})).await.unwrap_err();
        assert!(matches!(err, SyncError::Transport { .. }));
        assert_eq!(dispatcher.transport().request_count(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_candidate_failure() {
        let transport = FakeTransport::new()
            .reply("https://api.test/config", Reply::Hang)
            .fallback(Reply::ok(r#"{"people": ["Kai"]}"#));
        let dispatcher = dispatcher(transport).with_timeout(Duration::from_secs(25));

        let value = dispatcher.get("config", Payload::none()).await.unwrap();
        assert_eq!(value, json!({"people": ["Kai"]}));
        assert_eq!(dispatcher.transport().request_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_attempt_timing_out_fails_the_call() {
        let transport = FakeTransport::new().fallback(Reply::Hang);
        let dispatcher = dispatcher(transport).with_timeout(Duration::from_millis(100));
        let err = dispatcher.get("weeks", Payload::none()).await.unwrap_err();
        match err {
            SyncError::Transport { last, .. } => {
                assert_eq!(last, AttemptError::Timeout(Duration::from_millis(100)))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tagged_failure_becomes_application_error() {
        let transport = FakeTransport::new()
            .fallback(Reply::ok(r#"{"ok": false, "error": "sheet locked"}"#));
        let dispatcher = dispatcher(transport);
        let err = dispatcher.post("entry", json!({})).await.unwrap_err();
        assert_eq!(
            err,
            SyncError::Application {
                operation: "entry".to_string(),
                message: "sheet locked".to_string()
            }
        );
        assert_eq!(dispatcher.transport().request_count(), 1);
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(""), Value::Null);
        assert_eq!(decode_body("  \n"), Value::Null);
        assert_eq!(decode_body("{\"a\":1}"), json!({"a": 1}));
        assert_eq!(decode_body("OK"), Value::String("OK".to_string()));
    }

    #[test]
    fn test_unwrap_envelope() {
        assert_eq!(unwrap_envelope("x", json!({"ok": true, "data": [1]})).unwrap(), json!([1]));
        assert_eq!(unwrap_envelope("x", json!({"ok": true})).unwrap(), Value::Null);
        assert_eq!(
            unwrap_envelope("x", json!({"ok": true, "people": ["Kai"]})).unwrap(),
            json!({"people": ["Kai"]})
        );
        // Not a tagged envelope: passed through
        assert_eq!(unwrap_envelope("x", json!({"ok": "yes"})).unwrap(), json!({"ok": "yes"}));
        assert_eq!(
            unwrap_envelope("x", json!({"ok": false})).unwrap_err(),
            SyncError::Application {
                operation: "x".to_string(),
                message: "request failed".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_warm_up_never_fails_or_blocks() {
        let transport = FakeTransport::new().fallback(Reply::Hang);
        let dispatcher = dispatcher(transport);
        dispatcher.warm_up().await;
        let urls = dispatcher.transport().urls();
        assert_eq!(urls.len(), 5);
        assert_eq!(urls[0], "https://api.test/ping");
        assert_eq!(urls[4], "https://api.test/");
    }

    #[test]
    fn test_empty_route_list_is_rejected() {
        let result = Dispatcher::new(FakeTransport::new(), BASE).and_then(|d| d.with_routes(vec![]));
        assert!(matches!(result, Err(SyncError::Config(_))));
    }
}
