//! Parameter and desired-state types.
//!
//! [`ModuleParams`] maps one-to-one onto the parameter document handed over
//! by the orchestrator. [`ParamsValidator`](super::ParamsValidator) turns it
//! into an [`Invocation`], the validated structure the rest of the crate
//! works with.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Raw parameter document, as declared by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModuleParams {
    /// Base URL of the management server.
    #[serde(default)]
    pub url: Option<String>,
    /// Username for basic authentication.
    #[serde(default)]
    pub user: Option<String>,
    /// Password for basic authentication.
    #[serde(default)]
    pub password: Option<String>,
    /// Third-party OAuth2 access token to exchange for a gateway token.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Gateway-issued token to use as bearer.
    #[serde(default)]
    pub token: Option<String>,
    /// Identity provider resource used by the token exchange.
    #[serde(default)]
    pub auth_resource_id: Option<String>,
    /// Identifier of the API in update context.
    #[serde(default)]
    pub api_id: Option<String>,
    /// Target state of the API.
    #[serde(default)]
    pub state: Option<StateGoal>,
    /// Visibility of the API.
    #[serde(default)]
    pub visibility: Option<Visibility>,
    /// Ownership transfer request.
    #[serde(default)]
    pub transfer_ownership: Option<OwnershipParams>,
    /// API configuration body.
    #[serde(default)]
    pub config: Option<Value>,
    /// Documentation pages, in display order.
    #[serde(default)]
    pub pages: Option<Vec<Value>>,
    /// Access plans.
    #[serde(default)]
    pub plans: Option<Vec<Value>>,
    /// Whether TLS certificates are verified.
    #[serde(default)]
    pub validate_certs: Option<bool>,
    /// Request timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Raw ownership transfer block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OwnershipParams {
    /// New primary owner (search term).
    #[serde(default)]
    pub user: Option<String>,
    /// Role given to the previous primary owner.
    #[serde(default)]
    pub owner_role: Option<String>,
}

/// Target state of the API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StateGoal {
    /// Exists; lifecycle state left as is.
    Present,
    /// Removed.
    Absent,
    /// Exists, deployed and started.
    Started,
    /// Exists and stopped.
    Stopped,
}

/// Visibility of the API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    /// Visible to members only.
    #[default]
    Private,
    /// Visible to everyone.
    Public,
}

/// Connection settings for the management server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Base URL, without trailing slash.
    pub url: String,
    /// Whether TLS certificates are verified.
    pub validate_certs: bool,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// The credential strategy selected for a run.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Transport-level basic authentication.
    Basic {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// OAuth2 access token to exchange for a gateway token.
    Exchange {
        /// Third-party access token.
        access_token: String,
        /// Identity provider resource id.
        auth_resource_id: String,
    },
    /// Pre-exchanged gateway token.
    Bearer {
        /// Gateway token.
        token: String,
    },
}

/// Ownership transfer to a new primary owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipTransfer {
    /// New primary owner (search term).
    pub new_owner: String,
    /// Role given to the previous primary owner.
    pub previous_owner_role: String,
}

/// A documentation page, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSpec {
    /// 1-based position in the declared list.
    pub order: u32,
    /// Page document, without `order`, `id` and `excluded_groups`.
    pub document: Map<String, Value>,
    /// Names of the groups the page is hidden from.
    pub excluded_groups: Vec<String>,
}

/// How a desired plan is matched against existing plans.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlanKey {
    /// Service-assigned identifier.
    Id(String),
    /// Document `key` field.
    Key(String),
    /// Document `name` field.
    Name(String),
}

/// An access plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanSpec {
    /// Match key.
    pub key: PlanKey,
    /// Plan document, without `id`.
    pub document: Map<String, Value>,
}

/// The validated desired state of one API.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredSpec {
    /// Identifier of an existing API; `None` on the creation path.
    pub api_id: Option<String>,
    /// Target state.
    pub state: StateGoal,
    /// Visibility, as declared.
    pub visibility: Option<Visibility>,
    /// API configuration body.
    pub config: Option<Map<String, Value>>,
    /// Pages in display order.
    pub pages: Option<Vec<PageSpec>>,
    /// Plans.
    pub plans: Option<Vec<PlanSpec>>,
    /// Ownership transfer.
    pub transfer_ownership: Option<OwnershipTransfer>,
}

/// Everything one run needs: where to connect, how to authenticate, and
/// what to converge to.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Connection settings.
    pub connection: Connection,
    /// Credential strategy.
    pub credentials: Credentials,
    /// Desired state; `None` for an exchange-only invocation.
    pub desired: Option<DesiredSpec>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::Exchange { auth_resource_id, .. } => f
                .debug_struct("Exchange")
                .field("access_token", &"***")
                .field("auth_resource_id", auth_resource_id)
                .finish(),
            Self::Bearer { .. } => f.debug_struct("Bearer").field("token", &"***").finish(),
        }
    }
}

impl Credentials {
    /// Returns the strategy name.
    #[must_use]
    pub const fn strategy(&self) -> &'static str {
        match self {
            Self::Basic { .. } => "basic",
            Self::Exchange { .. } => "oauth2-exchange",
            Self::Bearer { .. } => "bearer",
        }
    }
}

impl DesiredSpec {
    /// Creates a desired spec with only the target state set.
    #[must_use]
    pub const fn new(api_id: Option<String>, state: StateGoal) -> Self {
        Self {
            api_id,
            state,
            visibility: None,
            config: None,
            pages: None,
            plans: None,
            transfer_ownership: None,
        }
    }

    /// Returns the visibility the API must end up with, if any.
    ///
    /// Visibility defaults to PRIVATE whenever a configuration body is
    /// given. Without configuration, only an explicit visibility counts.
    #[must_use]
    pub fn effective_visibility(&self) -> Option<Visibility> {
        match (self.visibility, &self.config) {
            (Some(v), _) => Some(v),
            (None, Some(_)) => Some(Visibility::default()),
            (None, None) => None,
        }
    }

    /// Returns the desired API document, with visibility folded in.
    #[must_use]
    pub fn desired_document(&self) -> Option<Map<String, Value>> {
        let visibility = self.effective_visibility();
        if self.config.is_none() && visibility.is_none() {
            return None;
        }

        let mut document = self.config.clone().unwrap_or_default();
        if let Some(visibility) = visibility {
            document.insert(String::from("visibility"), Value::String(visibility.to_string()));
        }
        Some(document)
    }
}

impl PlanKey {
    /// Returns the document field this key is read from.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::Id(_) => "id",
            Self::Key(_) => "key",
            Self::Name(_) => "name",
        }
    }

    /// Returns the key value.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Id(v) | Self::Key(v) | Self::Name(v) => v,
        }
    }
}

impl std::fmt::Display for StateGoal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Started => "started",
            Self::Stopped => "stopped",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Private => write!(f, "PRIVATE"),
            Self::Public => write!(f, "PUBLIC"),
        }
    }
}

impl std::fmt::Display for PlanKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.field(), self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_visibility_defaults_to_private_with_config() {
        let mut spec = DesiredSpec::new(Some(String::from("a1")), StateGoal::Present);
        assert_eq!(spec.effective_visibility(), None);
        assert!(spec.desired_document().is_none());

        spec.config = json!({ "name": "X" }).as_object().cloned();
        assert_eq!(spec.effective_visibility(), Some(Visibility::Private));

        let document = spec.desired_document().unwrap();
        assert_eq!(document.get("visibility"), Some(&json!("PRIVATE")));
        assert_eq!(document.get("name"), Some(&json!("X")));
    }

    #[test]
    fn test_explicit_visibility_without_config() {
        let mut spec = DesiredSpec::new(Some(String::from("a1")), StateGoal::Present);
        spec.visibility = Some(Visibility::Public);

        let document = spec.desired_document().unwrap();
        assert_eq!(document.len(), 1);
        assert_eq!(document.get("visibility"), Some(&json!("PUBLIC")));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result: std::result::Result<ModuleParams, _> =
            serde_json::from_value(json!({ "url": "https://x", "colour": "blue" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let credentials = Credentials::Basic {
            username: String::from("admin"),
            password: String::from("s3cret"),
        };
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("s3cret"));
    }
}
