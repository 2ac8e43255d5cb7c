//! Candidate request shapes for a logical operation.
//!
//! The backend may route `week` as `/week`, `?action=week`, `?route=week` or
//! `?op=week`. The order is configurable so a deployment that knows its
//! convention can pin a single style.

use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};

use super::transport::{HttpRequest, RequestBody};

/// How the operation name is placed in the URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStyle {
    /// `<base>/<op>`
    Path,
    /// `<base>?<param>=<op>`
    Query(String),
}

impl RouteStyle {
    pub fn defaults() -> Vec<RouteStyle> {
        vec![
            RouteStyle::Path,
            RouteStyle::Query("action".to_string()),
            RouteStyle::Query("route".to_string()),
            RouteStyle::Query("op".to_string()),
        ]
    }

    /// Build the URL for `op` with extra query pairs appended after the
    /// routing parameter.
    pub fn url(&self, base: &Url, op: &str, query: &[(String, String)]) -> String {
        let mut url = base.clone();
        match self {
            RouteStyle::Path => {
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments.pop_if_empty().push(op);
                }
            }
            RouteStyle::Query(param) => {
                url.query_pairs_mut().append_pair(param, op);
            }
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url.into()
    }
}

/// How a write payload is encoded in the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyEncoding {
    Json,
    /// Form body repeating the operation under `op`, `action` and `route`,
    /// with the JSON payload as text under `payload`.
    Form,
}

impl BodyEncoding {
    pub fn defaults() -> Vec<BodyEncoding> {
        vec![BodyEncoding::Json, BodyEncoding::Form]
    }

    pub fn encode(&self, op: &str, payload: &serde_json::Value) -> RequestBody {
        match self {
            BodyEncoding::Json => RequestBody::Json(payload.clone()),
            BodyEncoding::Form => RequestBody::Form(vec![
                ("op".to_string(), op.to_string()),
                ("action".to_string(), op.to_string()),
                ("route".to_string(), op.to_string()),
                ("payload".to_string(), payload.to_string()),
            ]),
        }
    }
}

/// Parse and check a configured base address.
pub fn parse_base_url(base: &str) -> Result<Url, String> {
    let trimmed = base.trim();
    if trimmed.is_empty() {
        return Err("API base URL not set".to_string());
    }
    let url = Url::parse(trimmed).map_err(|e| format!("Invalid API base URL {trimmed:?}: {e}"))?;
    if url.cannot_be_a_base() {
        return Err(format!("API base URL {trimmed:?} cannot carry a path"));
    }
    Ok(url)
}

/// Ordered candidates for one call. Reads yield one request per route style;
/// writes yield every encoding of a route style before moving to the next.
pub fn build_candidates(
    base: &Url,
    routes: &[RouteStyle],
    encodings: &[BodyEncoding],
    op: &str,
    method: &Method,
    query: &[(String, String)],
    body: Option<&serde_json::Value>,
) -> Vec<HttpRequest> {
    let mut candidates = Vec::new();
    for route in routes {
        let url = route.url(base, op, query);
        match body {
            None => candidates.push(HttpRequest {
                method: method.clone(),
                url,
                body: RequestBody::Empty,
            }),
            Some(payload) => {
                for encoding in encodings {
                    candidates.push(HttpRequest {
                        method: method.clone(),
                        url: url.clone(),
                        body: encoding.encode(op, payload),
                    });
                }
            }
        }
    }
    candidates
}
