//! Scripted transport and fixtures shared by the unit tests.

use std::sync::Mutex;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::api::{AttemptError, Dispatcher, HttpRequest, HttpResponse, RequestBody, Transport};
use crate::cache::CacheManager;
use crate::loader::{Loader, Update};

pub const BASE_URL: &str = "https://api.test/";

/// What the fake returns for a request.
#[derive(Debug, Clone)]
pub enum Reply {
    Respond { status: u16, body: String },
    Fail(AttemptError),
    /// Never completes; only a timeout ends it.
    Hang,
}

impl Reply {
    pub fn ok(body: &str) -> Self {
        Reply::Respond {
            status: 200,
            body: body.to_string(),
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Reply::Respond {
            status,
            body: body.to_string(),
        }
    }

    pub fn network(message: &str) -> Self {
        Reply::Fail(AttemptError::Network(message.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BodyKind {
    Any,
    Form,
}

struct Rule {
    url: String,
    kind: BodyKind,
    reply: Reply,
}

/// Transport answering from a URL table and recording every request.
pub struct FakeTransport {
    rules: Mutex<Vec<Rule>>,
    fallback: Mutex<Reply>,
    log: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            fallback: Mutex::new(Reply::network("no route")),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(self, url: &str, reply: Reply) -> Self {
        self.push(url, BodyKind::Any, reply);
        self
    }

    /// Reply only to form-encoded requests for `url`.
    pub fn reply_form(self, url: &str, reply: Reply) -> Self {
        self.push(url, BodyKind::Form, reply);
        self
    }

    pub fn fallback(self, reply: Reply) -> Self {
        self.set_fallback(reply);
        self
    }

    fn push(&self, url: &str, kind: BodyKind, reply: Reply) {
        self.rules.lock().unwrap().push(Rule {
            url: url.to_string(),
            kind,
            reply,
        });
    }

    /// Add a rule after the transport has been handed to a dispatcher.
    /// It takes precedence over earlier rules for the same URL.
    pub fn add_reply(&self, url: &str, reply: Reply) {
        self.rules.lock().unwrap().insert(
            0,
            Rule {
                url: url.to_string(),
                kind: BodyKind::Any,
                reply,
            },
        );
    }

    pub fn set_fallback(&self, reply: Reply) {
        *self.fallback.lock().unwrap() = reply;
    }

    /// Drop every URL rule so only the fallback answers.
    pub fn clear_rules(&self) {
        self.rules.lock().unwrap().clear();
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.log.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }

    pub fn request_count(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub fn clear_log(&self) {
        self.log.lock().unwrap().clear();
    }

    fn lookup(&self, request: &HttpRequest) -> Reply {
        let is_form = matches!(request.body, RequestBody::Form(_));
        let rules = self.rules.lock().unwrap();
        rules
            .iter()
            .find(|rule| {
                rule.url == request.url && (rule.kind == BodyKind::Any || is_form)
            })
            .map(|rule| rule.reply.clone())
            .unwrap_or_else(|| self.fallback.lock().unwrap().clone())
    }
}

impl Transport for FakeTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, AttemptError> {
        self.log.lock().unwrap().push(request.clone());
        match self.lookup(request) {
            Reply::Respond { status, body } => Ok(HttpResponse { status, body }),
            Reply::Fail(e) => Err(e),
            Reply::Hang => std::future::pending().await,
        }
    }
}

/// Loader over a fake transport and an in-memory cache.
pub fn loader(transport: FakeTransport) -> (Loader<FakeTransport>, UnboundedReceiver<Update>) {
    loader_with_cache(transport, CacheManager::in_memory())
}

pub fn loader_with_cache(
    transport: FakeTransport,
    cache: CacheManager,
) -> (Loader<FakeTransport>, UnboundedReceiver<Update>) {
    let dispatcher = Dispatcher::new(transport, BASE_URL).unwrap();
    Loader::new(dispatcher, cache)
}

/// Drain every update currently queued.
pub fn drain(rx: &mut UnboundedReceiver<Update>) -> Vec<Update> {
    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    updates
}

pub const CONFIG_JSON: &str =
    r#"{"year": 2024, "goal": 1000, "people": ["Kai", "Lee"], "categories": ["Walk", "Bike"]}"#;

pub const WEEKS_JSON: &str = r#"[
    {"weekId": "2024-W01", "weekNum": 1, "startDate": "2024-01-01", "endDate": "2024-01-07"},
    {"weekId": "2024-W02", "weekNum": 2, "startDate": "2024-01-08", "endDate": "2024-01-14"}
]"#;

pub fn week_url(week_id: &str, person: &str) -> String {
    format!("https://api.test/week?weekId={}&person={}", week_id, person)
}
