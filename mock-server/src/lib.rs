//! In-memory stand-in for the MemoBase HTTP API.
//!
//! Every route answers with the service's `{errno, errmsg, data}` envelope.
//! Lookups of unknown users or blobs answer HTTP 200 with `errno 404`, the
//! way the real service does; a rejected access token answers HTTP 401.
//! Profiles are seeded through `ServerState::set_profiles`, since deriving
//! them from blobs is the real backend's job.

pub mod canned;

use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_PORT: u16 = 8019;
const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub port: u16,
    /// When set, every request must carry `authorization: Bearer <token>`.
    pub access_token: Option<String>,
}

impl ServerConfig {
    /// Reads `PORT` and `ACCESS_TOKEN`.
    pub fn from_env() -> Result<Self, std::io::Error> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|e| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("invalid PORT {raw:?}: {e}"),
                )
            })?,
            Err(_) => DEFAULT_PORT,
        };
        let access_token = std::env::var("ACCESS_TOKEN").ok().filter(|t| !t.is_empty());
        Ok(Self { port, access_token })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobType {
    Chat,
    Doc,
    Image,
    Code,
    Transcript,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    pub errno: i64,
    pub errmsg: String,
    pub data: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub updated_at: String,
    pub topic: String,
    pub sub_topic: String,
    pub content: String,
}

#[derive(Clone, Debug)]
struct StoredBlob {
    id: String,
    blob_type: BlobType,
    blob_data: Value,
    fields: Option<Value>,
    created_at: String,
    buffered: bool,
}

#[derive(Clone, Debug)]
struct UserRecord {
    data: Option<Value>,
    created_at: String,
    updated_at: String,
    blobs: Vec<StoredBlob>,
    profiles: Vec<Profile>,
}

#[derive(Deserialize)]
pub struct UserBody {
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Deserialize)]
pub struct InsertBlob {
    pub blob_type: BlobType,
    #[serde(default)]
    pub blob_data: Option<Value>,
    #[serde(default)]
    pub fields: Option<Value>,
}

#[derive(Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

type Db = Arc<RwLock<HashMap<String, UserRecord>>>;

#[derive(Clone, Default)]
pub struct ServerState {
    db: Db,
    access_token: Option<Arc<str>>,
}

impl ServerState {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            db: Db::default(),
            access_token: config.access_token.as_deref().map(Arc::from),
        }
    }

    /// Replace a user's profiles. Returns false if the user does not exist.
    pub async fn set_profiles(&self, user_id: &str, profiles: Vec<Profile>) -> bool {
        match self.db.write().await.get_mut(user_id) {
            Some(user) => {
                user.profiles = profiles;
                true
            }
            None => false,
        }
    }

    /// Number of blobs of `blob_type` still waiting for a flush.
    pub async fn buffered(&self, user_id: &str, blob_type: BlobType) -> usize {
        self.db.read().await.get(user_id).map_or(0, |user| {
            user.blobs
                .iter()
                .filter(|b| b.buffered && b.blob_type == blob_type)
                .count()
        })
    }
}

type Reply = (StatusCode, Json<Envelope>);

fn ok(data: Value) -> Reply {
    (
        StatusCode::OK,
        Json(Envelope {
            errno: 0,
            errmsg: String::new(),
            data: if data.is_null() { None } else { Some(data) },
        }),
    )
}

fn fail(status: StatusCode, errno: i64, errmsg: impl Into<String>) -> Reply {
    (
        status,
        Json(Envelope {
            errno,
            errmsg: errmsg.into(),
            data: None,
        }),
    )
}

fn not_found(what: &str) -> Reply {
    fail(StatusCode::OK, 404, format!("{what} not found"))
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Router over a fresh state with no access token.
pub fn app() -> Router {
    app_with_state(ServerState::default())
}

pub fn app_with_state(state: ServerState) -> Router {
    Router::new()
        .route("/api/v1/healthcheck", get(healthcheck))
        .route("/api/v1/users", post(create_user))
        .route(
            "/api/v1/users/{user_id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/api/v1/users/blobs/{user_id}/{blob_type}", get(list_blobs))
        .route("/api/v1/users/profile/{user_id}", get(get_profile))
        .route("/api/v1/users/buffer/{user_id}/{blob_type}", post(flush_buffer))
        .route("/api/v1/blobs/insert/{user_id}", post(insert_blob))
        .route(
            "/api/v1/blobs/{user_id}/{blob_id}",
            get(get_blob).delete(delete_blob),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_token))
        .with_state(state)
}

pub async fn run(listener: TcpListener, config: ServerConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(ServerState::new(&config))).await
}

/// Serve `router` on an ephemeral localhost port from a background thread
/// with its own runtime. Lets blocking clients talk to a live server.
pub fn serve_in_background(router: Router) -> Result<SocketAddr, std::io::Error> {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = std_listener.local_addr()?;
    std_listener.set_nonblocking(true)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    std::thread::spawn(move || {
        let result = runtime.block_on(async move {
            let listener = TcpListener::from_std(std_listener)?;
            axum::serve(listener, router).await
        });
        if let Err(e) = result {
            warn!(error = %e, "background server stopped");
        }
    });
    Ok(addr)
}

async fn require_token(State(state): State<ServerState>, request: Request, next: Next) -> Response {
    if let Some(token) = &state.access_token {
        let presented = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if presented != Some(token.as_ref()) {
            warn!(uri = %request.uri(), "rejected request with bad access token");
            return fail(StatusCode::UNAUTHORIZED, 401, "invalid or missing access token")
                .into_response();
        }
    }
    next.run(request).await
}

async fn healthcheck() -> Reply {
    ok(Value::Null)
}

async fn create_user(State(state): State<ServerState>, Json(input): Json<UserBody>) -> Reply {
    let id = Uuid::new_v4().to_string();
    let ts = now();
    state.db.write().await.insert(
        id.clone(),
        UserRecord {
            data: input.data,
            created_at: ts.clone(),
            updated_at: ts,
            blobs: Vec::new(),
            profiles: Vec::new(),
        },
    );
    info!(user_id = %id, "created user");
    ok(json!({ "id": id }))
}

async fn get_user(State(state): State<ServerState>, Path(user_id): Path<String>) -> Reply {
    let db = state.db.read().await;
    match db.get(&user_id) {
        Some(user) => ok(json!({
            "data": user.data,
            "created_at": user.created_at,
            "updated_at": user.updated_at,
        })),
        None => not_found("user"),
    }
}

async fn update_user(
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
    Json(input): Json<UserBody>,
) -> Reply {
    let mut db = state.db.write().await;
    let Some(user) = db.get_mut(&user_id) else {
        return not_found("user");
    };
    user.data = input.data;
    user.updated_at = now();
    debug!(%user_id, "updated user");
    ok(json!({ "id": user_id }))
}

async fn delete_user(State(state): State<ServerState>, Path(user_id): Path<String>) -> Reply {
    match state.db.write().await.remove(&user_id) {
        Some(_) => {
            info!(%user_id, "deleted user");
            ok(Value::Null)
        }
        None => not_found("user"),
    }
}

async fn insert_blob(
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
    Json(input): Json<InsertBlob>,
) -> Reply {
    let mut db = state.db.write().await;
    let Some(user) = db.get_mut(&user_id) else {
        return not_found("user");
    };
    let id = Uuid::new_v4().to_string();
    user.blobs.push(StoredBlob {
        id: id.clone(),
        blob_type: input.blob_type,
        blob_data: input.blob_data.unwrap_or_else(|| json!({})),
        fields: input.fields,
        created_at: now(),
        buffered: input.blob_type == BlobType::Chat,
    });
    debug!(%user_id, blob_id = %id, blob_type = ?input.blob_type, "inserted blob");
    ok(json!({ "id": id }))
}

async fn get_blob(
    State(state): State<ServerState>,
    Path((user_id, blob_id)): Path<(String, String)>,
) -> Reply {
    let db = state.db.read().await;
    let blob = db
        .get(&user_id)
        .and_then(|user| user.blobs.iter().find(|b| b.id == blob_id));
    match blob {
        Some(blob) => ok(json!({
            "blob_type": blob.blob_type,
            "blob_data": blob.blob_data,
            "fields": blob.fields,
            "created_at": blob.created_at,
            "updated_at": blob.created_at,
        })),
        None => not_found("blob"),
    }
}

async fn delete_blob(
    State(state): State<ServerState>,
    Path((user_id, blob_id)): Path<(String, String)>,
) -> Reply {
    let mut db = state.db.write().await;
    let Some(user) = db.get_mut(&user_id) else {
        return not_found("user");
    };
    let before = user.blobs.len();
    user.blobs.retain(|b| b.id != blob_id);
    if user.blobs.len() == before {
        return not_found("blob");
    }
    ok(Value::Null)
}

async fn list_blobs(
    State(state): State<ServerState>,
    Path((user_id, blob_type)): Path<(String, BlobType)>,
    Query(params): Query<PageParams>,
) -> Reply {
    let db = state.db.read().await;
    let Some(user) = db.get(&user_id) else {
        return not_found("user");
    };
    let ids: Vec<&str> = user
        .blobs
        .iter()
        .filter(|b| b.blob_type == blob_type)
        .skip(params.page.saturating_mul(params.page_size))
        .take(params.page_size)
        .map(|b| b.id.as_str())
        .collect();
    ok(json!({ "ids": ids }))
}

async fn get_profile(State(state): State<ServerState>, Path(user_id): Path<String>) -> Reply {
    let db = state.db.read().await;
    match db.get(&user_id) {
        Some(user) => ok(json!({ "profiles": user.profiles })),
        None => not_found("user"),
    }
}

async fn flush_buffer(
    State(state): State<ServerState>,
    Path((user_id, blob_type)): Path<(String, BlobType)>,
) -> Reply {
    let mut db = state.db.write().await;
    let Some(user) = db.get_mut(&user_id) else {
        return not_found("user");
    };
    let mut flushed = 0;
    for blob in user.blobs.iter_mut().filter(|b| b.blob_type == blob_type) {
        if blob.buffered {
            blob.buffered = false;
            flushed += 1;
        }
    }
    info!(%user_id, ?blob_type, flushed, "flushed buffer");
    ok(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serializes_null_data() {
        let (status, Json(env)) =
            fail(StatusCode::INTERNAL_SERVER_ERROR, 500, "internal server error");
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(
            json,
            json!({"errno": 500, "errmsg": "internal server error", "data": null})
        );
    }

    #[test]
    fn ok_drops_null_payload() {
        let (status, Json(env)) = ok(Value::Null);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(env.errno, 0);
        assert!(env.data.is_none());
    }

    #[test]
    fn insert_blob_accepts_flattened_fields() {
        let input: InsertBlob =
            serde_json::from_str(r#"{"blob_type":"chat","test":"value"}"#).unwrap();
        assert_eq!(input.blob_type, BlobType::Chat);
        assert!(input.blob_data.is_none());
    }

    #[test]
    fn insert_blob_rejects_unknown_type() {
        let result: Result<InsertBlob, _> = serde_json::from_str(r#"{"blob_type":"video"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn page_params_default() {
        let params: PageParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.page, 0);
        assert_eq!(params.page_size, DEFAULT_PAGE_SIZE);
    }
}
