//! A server that gives the same answer to every request and remembers what
//! it was asked.
//!
//! Client tests use it to script a single service reply (a success envelope,
//! an HTTP 500 failure, a non-JSON body) and then inspect the method, path,
//! query, credentials, and body the client actually sent.

use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Shared log of requests a canned server received, oldest first.
#[derive(Debug, Clone, Default)]
pub struct RequestLog(Arc<Mutex<Vec<RecordedRequest>>>);

impl RequestLog {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.0.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn push(&self, request: RecordedRequest) {
        self.0.lock().unwrap_or_else(|p| p.into_inner()).push(request);
    }
}

#[derive(Clone)]
struct Canned {
    status: StatusCode,
    body: Arc<str>,
    log: RequestLog,
}

/// Answer every request with `status` and `body` serialized as JSON.
pub fn canned(status: StatusCode, body: Value) -> (Router, RequestLog) {
    canned_raw(status, body.to_string())
}

/// Answer every request with `status` and `body` verbatim.
pub fn canned_raw(status: StatusCode, body: impl Into<String>) -> (Router, RequestLog) {
    let log = RequestLog::default();
    let body: String = body.into();
    let state = Canned {
        status,
        body: Arc::from(body),
        log: log.clone(),
    };
    (Router::new().fallback(reply).with_state(state), log)
}

async fn reply(
    State(canned): State<Canned>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    canned.log.push(RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
    (
        canned.status,
        [(header::CONTENT_TYPE, "application/json")],
        canned.body.to_string(),
    )
        .into_response()
}
