//! Executing clients: `ProjectClient` pairs a `MemoBaseClient` with a
//! `Transport`, and `User` scopes calls to one user id.
//!
//! Every method is build → execute → parse, one round-trip, no retry.

use serde_json::Value;

use crate::client::MemoBaseClient;
use crate::error::ApiError;
use crate::transport::Transport;
use crate::types::{Blob, BlobData, BlobType, UserData, UserProfile};

#[cfg(feature = "ureq")]
use crate::config::ClientConfig;
#[cfg(feature = "ureq")]
use crate::transport::UreqTransport;

#[derive(Debug, Clone)]
pub struct ProjectClient<T> {
    client: MemoBaseClient,
    transport: T,
}

#[cfg(feature = "ureq")]
impl ProjectClient<UreqTransport> {
    pub fn connect(base_url: &str, api_key: &str) -> Self {
        Self::with_transport(MemoBaseClient::new(base_url, api_key), UreqTransport::default())
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::with_transport(
            MemoBaseClient::new(&config.base_url, &config.api_key),
            UreqTransport::new(config.timeout),
        )
    }
}

impl<T: Transport> ProjectClient<T> {
    pub fn with_transport(client: MemoBaseClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &MemoBaseClient {
        &self.client
    }

    /// A handle for requests scoped to `user_id`.
    pub fn user(&self, user_id: impl Into<String>) -> User<'_, T> {
        User {
            user_id: user_id.into(),
            project: self,
        }
    }

    pub fn ping(&self) -> Result<(), ApiError> {
        let resp = self.transport.execute(self.client.build_ping())?;
        self.client.parse_ping(resp)
    }

    /// Create a user and return its service-assigned id.
    pub fn add_user(&self, data: Option<&Value>) -> Result<String, ApiError> {
        let resp = self.transport.execute(self.client.build_add_user(data)?)?;
        self.client.parse_add_user(resp)
    }

    pub fn get_user(&self, user_id: &str) -> Result<UserData, ApiError> {
        let resp = self.transport.execute(self.client.build_get_user(user_id))?;
        self.client.parse_get_user(resp)
    }

    pub fn update_user(&self, user_id: &str, data: &Value) -> Result<(), ApiError> {
        let resp = self
            .transport
            .execute(self.client.build_update_user(user_id, data)?)?;
        self.client.parse_update_user(resp)
    }

    pub fn delete_user(&self, user_id: &str) -> Result<(), ApiError> {
        let resp = self.transport.execute(self.client.build_delete_user(user_id))?;
        self.client.parse_delete_user(resp)
    }
}

/// Per-user view of a `ProjectClient`. Not a stored entity.
#[derive(Debug, Clone)]
pub struct User<'a, T> {
    user_id: String,
    project: &'a ProjectClient<T>,
}

impl<'a, T: Transport> User<'a, T> {
    pub fn id(&self) -> &str {
        &self.user_id
    }

    /// Insert a blob and return the id the service assigned to it.
    pub fn insert(&self, blob: &Blob) -> Result<String, ApiError> {
        let c = &self.project.client;
        let resp = self.project.transport.execute(c.build_insert(&self.user_id, blob)?)?;
        c.parse_insert(resp)
    }

    /// Blob ids of one type, in the order the service returns them.
    pub fn get_all(
        &self,
        blob_type: BlobType,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<String>, ApiError> {
        let c = &self.project.client;
        let resp = self
            .project
            .transport
            .execute(c.build_get_all(&self.user_id, blob_type, page, page_size))?;
        c.parse_get_all(resp)
    }

    pub fn profile(&self) -> Result<Vec<UserProfile>, ApiError> {
        let c = &self.project.client;
        let resp = self.project.transport.execute(c.build_profile(&self.user_id))?;
        c.parse_profile(resp)
    }

    pub fn get(&self, blob_id: &str) -> Result<BlobData, ApiError> {
        let c = &self.project.client;
        let resp = self
            .project
            .transport
            .execute(c.build_get_blob(&self.user_id, blob_id))?;
        c.parse_get_blob(resp)
    }

    pub fn delete(&self, blob_id: &str) -> Result<(), ApiError> {
        let c = &self.project.client;
        let resp = self
            .project
            .transport
            .execute(c.build_delete_blob(&self.user_id, blob_id))?;
        c.parse_delete_blob(resp)
    }

    /// Ask the service to process buffered blobs of `blob_type` into the profile.
    pub fn flush(&self, blob_type: BlobType) -> Result<(), ApiError> {
        let c = &self.project.client;
        let resp = self
            .project
            .transport
            .execute(c.build_flush(&self.user_id, blob_type))?;
        c.parse_flush(resp)
    }
}
