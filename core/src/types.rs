//! DTOs exchanged with the MemoBase service.
//!
//! # Design
//! These mirror the service's JSON but are defined independently of the
//! mock-server crate. Integration tests catch schema drift between the two.
//! Read-side records default every field so a partial payload still decodes.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Category of a blob. Used verbatim as a URL path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobType {
    Chat,
    Doc,
    Image,
    Code,
    Transcript,
}

impl BlobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobType::Chat => "chat",
            BlobType::Doc => "doc",
            BlobType::Image => "image",
            BlobType::Code => "code",
            BlobType::Transcript => "transcript",
        }
    }
}

impl fmt::Display for BlobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn of a conversation stored in a chat blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            alias: None,
            created_at: None,
        }
    }
}

/// A typed unit of content submitted for a user.
///
/// Serializes as `{"blob_type": ..., <fields>...}`: the field map is
/// flattened into the request body and passed through untouched, except that
/// a `blob_type` key in `fields` is dropped so it cannot shadow the real type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Blob {
    pub blob_type: BlobType,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Serialize for Blob {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("blob_type", &self.blob_type)?;
        for (name, value) in self.fields.iter().filter(|(name, _)| name.as_str() != "blob_type") {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Blob {
    pub fn new(blob_type: BlobType) -> Self {
        Self {
            blob_type,
            fields: Map::new(),
        }
    }

    /// A chat blob in the shape the service stores:
    /// `blob_data: {"messages": [...]}`.
    pub fn chat(messages: &[ChatMessage]) -> Result<Self, ApiError> {
        let messages = serde_json::to_value(messages)
            .map_err(|e| ApiError::SerializationError(e.to_string()))?;
        let mut blob_data = Map::new();
        blob_data.insert("messages".to_string(), messages);
        Ok(Self::new(BlobType::Chat).with_field("blob_data", Value::Object(blob_data)))
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

/// A profile entry the service derived from a user's blobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub topic: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sub_topic: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
}

/// A user record as returned by the user-get endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A stored blob as returned by the blob-get endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobData {
    pub blob_type: BlobType,
    #[serde(default)]
    pub blob_data: Map<String, Value>,
    #[serde(default)]
    pub fields: Option<Map<String, Value>>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl From<BlobData> for Blob {
    fn from(data: BlobData) -> Self {
        let mut blob =
            Blob::new(data.blob_type).with_field("blob_data", Value::Object(data.blob_data));
        if let Some(fields) = data.fields {
            blob = blob.with_field("fields", Value::Object(fields));
        }
        blob
    }
}

/// Missing and `null` both decode to `T::default()`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The `{errno, errmsg, data}` wrapper on every response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub errno: i64,
    #[serde(default)]
    pub errmsg: String,
    pub data: Option<T>,
}

impl Envelope<Value> {
    /// Decode the raw `data` value into an operation-specific payload.
    pub(crate) fn decode_data<T: DeserializeOwned>(self) -> Result<Option<T>, serde_json::Error> {
        match self.data {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value).map(Some),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IdData {
    pub(crate) id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IdsData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub(crate) ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProfilesData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub(crate) profiles: Vec<UserProfile>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct UserBody<'a> {
    pub(crate) data: Option<&'a Value>,
}
