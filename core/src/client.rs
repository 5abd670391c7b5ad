//! Stateless HTTP request builder and envelope parser for the MemoBase API.
//!
//! # Design
//! `MemoBaseClient` holds only a `base_url` and an `api_key`. Each operation
//! is split into a `build_*` method that produces an `HttpRequest` and a
//! `parse_*` method that consumes an `HttpResponse`. The network round-trip
//! happens elsewhere (see `transport`), so this file is deterministic and
//! tested without sockets.
//!
//! Every response is a `{errno, errmsg, data}` envelope. `check_envelope`
//! decides success once for all operations: a non-zero `errno` fails as
//! `Service` whatever the status, a non-2xx status fails as `HttpError`, and
//! a 2xx body that is not an envelope fails as `DeserializationError`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    Blob, BlobData, BlobType, Envelope, IdData, IdsData, ProfilesData, UserBody, UserData,
    UserProfile,
};

const API_PREFIX: &str = "/api/v1";

/// Synchronous, stateless client for the MemoBase API.
#[derive(Debug, Clone)]
pub struct MemoBaseClient {
    base_url: String,
    api_key: String,
}

impl MemoBaseClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.base_url)
    }

    fn request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest {
            method,
            url: self.url(path),
            headers: vec![("authorization".to_string(), format!("Bearer {}", self.api_key))],
            body: None,
        }
    }

    fn json_request<B: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        body: &B,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(body)
            .map_err(|e| ApiError::SerializationError(e.to_string()))?;
        let mut req = self.request(method, path);
        req.headers
            .push(("content-type".to_string(), "application/json".to_string()));
        req.body = Some(body);
        Ok(req)
    }

    // --- blobs ---

    pub fn build_insert(&self, user_id: &str, blob: &Blob) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, &format!("/blobs/insert/{user_id}"), blob)
    }

    pub fn build_get_all(
        &self,
        user_id: &str,
        blob_type: BlobType,
        page: u32,
        page_size: u32,
    ) -> HttpRequest {
        self.request(
            HttpMethod::Get,
            &format!("/users/blobs/{user_id}/{blob_type}?page={page}&page_size={page_size}"),
        )
    }

    pub fn build_get_blob(&self, user_id: &str, blob_id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/blobs/{user_id}/{blob_id}"))
    }

    pub fn build_delete_blob(&self, user_id: &str, blob_id: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, &format!("/blobs/{user_id}/{blob_id}"))
    }

    pub fn parse_insert(&self, response: HttpResponse) -> Result<String, ApiError> {
        let data: IdData = require_data(response)?;
        Ok(data.id)
    }

    pub fn parse_get_all(&self, response: HttpResponse) -> Result<Vec<String>, ApiError> {
        let data: IdsData = require_data(response)?;
        Ok(data.ids)
    }

    pub fn parse_get_blob(&self, response: HttpResponse) -> Result<BlobData, ApiError> {
        require_data(response)
    }

    pub fn parse_delete_blob(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_envelope(response).map(|_| ())
    }

    // --- profile and buffer ---

    pub fn build_profile(&self, user_id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/users/profile/{user_id}"))
    }

    pub fn build_flush(&self, user_id: &str, blob_type: BlobType) -> HttpRequest {
        self.request(HttpMethod::Post, &format!("/users/buffer/{user_id}/{blob_type}"))
    }

    pub fn parse_profile(&self, response: HttpResponse) -> Result<Vec<UserProfile>, ApiError> {
        let data: ProfilesData = require_data(response)?;
        Ok(data.profiles)
    }

    pub fn parse_flush(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_envelope(response).map(|_| ())
    }

    // --- users ---

    pub fn build_ping(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/healthcheck")
    }

    pub fn build_add_user(&self, data: Option<&Value>) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/users", &UserBody { data })
    }

    pub fn build_get_user(&self, user_id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/users/{user_id}"))
    }

    pub fn build_update_user(&self, user_id: &str, data: &Value) -> Result<HttpRequest, ApiError> {
        self.json_request(
            HttpMethod::Put,
            &format!("/users/{user_id}"),
            &UserBody { data: Some(data) },
        )
    }

    pub fn build_delete_user(&self, user_id: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, &format!("/users/{user_id}"))
    }

    pub fn parse_ping(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_envelope(response).map(|_| ())
    }

    pub fn parse_add_user(&self, response: HttpResponse) -> Result<String, ApiError> {
        let data: IdData = require_data(response)?;
        Ok(data.id)
    }

    pub fn parse_get_user(&self, response: HttpResponse) -> Result<UserData, ApiError> {
        require_data(response)
    }

    pub fn parse_update_user(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_envelope(response).map(|_| ())
    }

    pub fn parse_delete_user(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_envelope(response).map(|_| ())
    }
}

/// Decode the envelope and classify failures. Returns the successful envelope.
fn check_envelope(response: HttpResponse) -> Result<Envelope<Value>, ApiError> {
    let parsed = serde_json::from_str::<Envelope<Value>>(&response.body);

    if let Ok(envelope) = &parsed {
        if envelope.errno != 0 {
            tracing::debug!(
                status = response.status,
                errno = envelope.errno,
                errmsg = %envelope.errmsg,
                "service returned failure envelope"
            );
            return Err(ApiError::Service {
                errno: envelope.errno,
                errmsg: envelope.errmsg.clone(),
            });
        }
    }
    if !response.is_success() {
        tracing::warn!(status = response.status, "non-2xx response without failure envelope");
        return Err(ApiError::HttpError {
            status: response.status,
            body: response.body,
        });
    }
    parsed.map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// `check_envelope`, then decode `data` into `T`. Missing or null `data` on
/// success is a decoding failure.
fn require_data<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    check_envelope(response)?
        .decode_data()
        .map_err(|e| ApiError::DeserializationError(e.to_string()))?
        .ok_or_else(|| ApiError::DeserializationError("response envelope has no data".to_string()))
}
