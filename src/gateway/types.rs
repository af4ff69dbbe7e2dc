//! Management API types and data structures.
//!
//! This module defines the entities exchanged with the management API.
//! Entities keep the fields the reconciler reasons about as typed fields and
//! carry everything else verbatim in a flattened `document` map, so no part
//! of a server answer is lost when it is sent back on update.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Reads an explicit `null` as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Lifecycle state of an API.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LifecycleState {
    /// Deployed and serving.
    Started,
    /// Not serving.
    #[default]
    Stopped,
    /// Created, never started.
    Initialized,
    /// Any state this crate does not know about.
    Unknown(String),
}

/// A lifecycle action accepted by the management API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LifecycleAction {
    /// Start the API.
    Start,
    /// Stop the API.
    Stop,
}

/// An API as returned by the management API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEntity {
    /// Unique API identifier.
    pub id: String,
    /// Current lifecycle state.
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: LifecycleState,
    /// Primary owner, as returned by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Value>,
    /// Every other field of the entity.
    #[serde(flatten)]
    pub document: Map<String, Value>,
}

/// A documentation page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEntity {
    /// Unique page identifier.
    pub id: String,
    /// Display order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub order: u32,
    /// Identifiers of the groups the page is hidden from.
    #[serde(default, deserialize_with = "null_as_default")]
    pub excluded_groups: Vec<String>,
    /// Every other field of the page.
    #[serde(flatten)]
    pub document: Map<String, Value>,
}

/// Publication status of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PlanStatus {
    /// Not yet published.
    #[default]
    Staging,
    /// Published; may carry live traffic.
    Published,
    /// Deprecated; existing subscriptions keep working.
    Deprecated,
    /// Closed.
    Closed,
    /// Any status this crate does not know about.
    Unknown(String),
}

/// An access plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntity {
    /// Unique plan identifier.
    pub id: String,
    /// Publication status.
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: PlanStatus,
    /// Every other field of the plan.
    #[serde(flatten)]
    pub document: Map<String, Value>,
}

/// A user group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Unique group identifier.
    pub id: String,
    /// Group name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// A user returned by the user search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSearchResult {
    /// Identity provider reference.
    pub reference: String,
    /// User identifier, when the user already exists in the gateway.
    #[serde(default)]
    pub id: Option<String>,
    /// Display name.
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
}

/// Body of an ownership transfer request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnershipRequest {
    /// Role given to the previous primary owner.
    pub role: String,
    /// Identity provider reference of the new owner.
    pub reference: String,
    /// Identifier of the new owner, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// One request sent to the management API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestRecord {
    /// HTTP method.
    pub method: String,
    /// Path below the management API root.
    pub path: String,
    /// Response status; `None` if no response was received.
    pub status: Option<u16>,
}

/// Answer of the token exchange endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Gateway-issued token.
    #[serde(default)]
    pub token: Option<String>,
}

impl ApiEntity {
    /// Returns the identifier of the primary owner, if the server exposed one.
    #[must_use]
    pub fn owner_id(&self) -> Option<&str> {
        match self.owner.as_ref()? {
            Value::Object(owner) => owner.get("id").and_then(Value::as_str),
            Value::String(id) => Some(id),
            _ => None,
        }
    }

    /// Returns the whole entity as a JSON object, typed fields included.
    #[must_use]
    pub fn to_document(&self) -> Map<String, Value> {
        let mut document = self.document.clone();
        document.insert(String::from("id"), Value::String(self.id.clone()));
        document.insert(String::from("state"), Value::String(self.state.to_string()));
        if let Some(owner) = &self.owner {
            document.insert(String::from("owner"), owner.clone());
        }
        document
    }
}

impl PageEntity {
    /// Returns the comparable content of the page: its document plus order
    /// and excluded groups.
    #[must_use]
    pub fn to_document(&self) -> Map<String, Value> {
        let mut document = self.document.clone();
        document.insert(String::from("order"), Value::from(self.order));
        document.insert(
            String::from("excluded_groups"),
            Value::Array(self.excluded_groups.iter().cloned().map(Value::String).collect()),
        );
        document
    }
}

impl PlanEntity {
    /// Returns the whole plan as a JSON object, typed fields included.
    #[must_use]
    pub fn to_document(&self) -> Map<String, Value> {
        let mut document = self.document.clone();
        document.insert(String::from("id"), Value::String(self.id.clone()));
        document.insert(String::from("status"), Value::String(self.status.to_string()));
        document
    }
}

impl LifecycleAction {
    /// Returns the query value sent to the management API.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Stop => "STOP",
        }
    }
}

impl From<String> for LifecycleState {
    fn from(value: String) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "STARTED" => Self::Started,
            "STOPPED" => Self::Stopped,
            "INITIALIZED" => Self::Initialized,
            _ => Self::Unknown(value),
        }
    }
}

impl From<LifecycleState> for String {
    fn from(value: LifecycleState) -> Self {
        value.to_string()
    }
}

impl From<String> for PlanStatus {
    fn from(value: String) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "STAGING" => Self::Staging,
            "PUBLISHED" => Self::Published,
            "DEPRECATED" => Self::Deprecated,
            "CLOSED" => Self::Closed,
            _ => Self::Unknown(value),
        }
    }
}

impl From<PlanStatus> for String {
    fn from(value: PlanStatus) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Started => write!(f, "STARTED"),
            Self::Stopped => write!(f, "STOPPED"),
            Self::Initialized => write!(f, "INITIALIZED"),
            Self::Unknown(s) => write!(f, "{s}"),
        }
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Staging => write!(f, "STAGING"),
            Self::Published => write!(f, "PUBLISHED"),
            Self::Deprecated => write!(f, "DEPRECATED"),
            Self::Closed => write!(f, "CLOSED"),
            Self::Unknown(s) => write!(f, "{s}"),
        }
    }
}

impl std::fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
