//! Parameter validation.
//!
//! This module turns a raw [`ModuleParams`] document into a validated
//! [`Invocation`], rejecting unrecognized or contradictory combinations
//! before any collaborator is invoked.

use crate::error::{ConfigError, GatewayError, Result};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::spec::{
    Connection, Credentials, DesiredSpec, Invocation, ModuleParams, OwnershipTransfer, PageSpec,
    PlanKey, PlanSpec, StateGoal, DEFAULT_TIMEOUT_SECS,
};

/// API fields managed by the server, never sent in a configuration body.
pub const READ_ONLY_API_FIELDS: &[&str] = &[
    "id",
    "state",
    "owner",
    "created_at",
    "updated_at",
    "deployed_at",
    "workflow_state",
];

/// Validator for parameter documents.
#[derive(Debug, Default)]
pub struct ParamsValidator;

/// Validation result containing every problem found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ParamsValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a parameter document and builds the invocation.
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first problem found.
    pub fn validate(&self, params: &ModuleParams) -> Result<Invocation> {
        let (invocation, result) = self.check(params)?;

        for warning in &result.warnings {
            warn!("{warning}");
        }

        match (invocation, result.errors.first()) {
            (Some(invocation), None) => {
                debug!("Parameter validation passed");
                Ok(invocation)
            }
            (_, Some(first_error)) => Err(GatewayError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            })),
            (None, None) => Err(GatewayError::Config(ConfigError::validation_general(
                "Parameters could not be validated",
            ))),
        }
    }

    /// Checks a parameter document, collecting every error and warning.
    ///
    /// The invocation is returned only when no error was found.
    ///
    /// # Errors
    ///
    /// Returns an error right away when the credential strategy cannot be
    /// resolved, since nothing else can be checked meaningfully without it.
    pub fn check(&self, params: &ModuleParams) -> Result<(Option<Invocation>, ValidationResult)> {
        let credentials = Self::resolve_credentials(params)?;
        let mut result = ValidationResult::default();

        let connection = Self::validate_connection(params, &mut result);

        let exchange_only = Self::is_exchange_only(params);
        let desired = if exchange_only {
            debug!("Exchange-only invocation");
            None
        } else {
            Self::validate_desired(params, &mut result)
        };

        let invocation = match connection {
            Some(connection) if result.errors.is_empty() && (exchange_only || desired.is_some()) => {
                Some(Invocation {
                    connection,
                    credentials,
                    desired,
                })
            }
            _ => None,
        };

        Ok((invocation, result))
    }

    /// Selects exactly one credential strategy.
    fn resolve_credentials(params: &ModuleParams) -> Result<Credentials> {
        let basic = params.user.is_some() || params.password.is_some();
        let mut strategies = Vec::new();
        if basic {
            strategies.push("user/password");
        }
        if params.access_token.is_some() {
            strategies.push("access_token");
        }
        if params.token.is_some() {
            strategies.push("token");
        }

        match strategies.len() {
            0 => return Err(GatewayError::Config(ConfigError::MissingCredentials)),
            1 => {}
            _ => {
                return Err(GatewayError::Config(ConfigError::ConflictingCredentials {
                    strategies: strategies.join(", "),
                }));
            }
        }

        if basic {
            let (Some(username), Some(password)) = (&params.user, &params.password) else {
                return Err(GatewayError::Config(ConfigError::validation(
                    "user and password must be given together",
                    "user",
                )));
            };
            if username.is_empty() {
                return Err(GatewayError::Config(ConfigError::validation(
                    "user cannot be empty",
                    "user",
                )));
            }
            return Ok(Credentials::Basic {
                username: username.clone(),
                password: password.clone(),
            });
        }

        if let Some(access_token) = &params.access_token {
            let auth_resource_id = params
                .auth_resource_id
                .as_ref()
                .filter(|id| !id.is_empty())
                .ok_or_else(|| {
                    GatewayError::Config(ConfigError::validation(
                        "auth_resource_id is required to exchange an access_token",
                        "auth_resource_id",
                    ))
                })?;
            return Ok(Credentials::Exchange {
                access_token: access_token.clone(),
                auth_resource_id: auth_resource_id.clone(),
            });
        }

        match &params.token {
            Some(token) if !token.is_empty() => Ok(Credentials::Bearer {
                token: token.clone(),
            }),
            _ => Err(GatewayError::Config(ConfigError::validation(
                "token cannot be empty",
                "token",
            ))),
        }
    }

    /// An access token with nothing else to do only asks for the exchange.
    fn is_exchange_only(params: &ModuleParams) -> bool {
        params.access_token.is_some()
            && params.state.is_none()
            && params.api_id.is_none()
            && params.config.is_none()
            && params.pages.is_none()
            && params.plans.is_none()
            && params.transfer_ownership.is_none()
    }

    /// Validates connection settings.
    fn validate_connection(params: &ModuleParams, result: &mut ValidationResult) -> Option<Connection> {
        let Some(url) = params.url.as_deref().filter(|u| !u.is_empty()) else {
            result.error("url", "url is required");
            return None;
        };

        match reqwest::Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(parsed) => {
                result.error("url", format!("Unsupported URL scheme '{}'", parsed.scheme()));
                return None;
            }
            Err(e) => {
                result.error("url", format!("Invalid URL '{url}': {e}"));
                return None;
            }
        }

        let timeout_secs = params.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            result.error("timeout_secs", "timeout_secs must be greater than zero");
        }

        let validate_certs = params.validate_certs.unwrap_or(true);
        if !validate_certs {
            result
                .warnings
                .push(String::from("TLS certificate validation is disabled"));
        }

        Some(Connection {
            url: url.trim_end_matches('/').to_string(),
            validate_certs,
            timeout_secs,
        })
    }

    /// Validates the desired-state part of the parameters.
    fn validate_desired(params: &ModuleParams, result: &mut ValidationResult) -> Option<DesiredSpec> {
        let Some(state) = params.state else {
            result.error("state", "state is required");
            return None;
        };

        let api_id = match params.api_id.as_deref() {
            Some("") => {
                result.error("api_id", "api_id cannot be empty");
                None
            }
            other => other.map(String::from),
        };

        if state == StateGoal::Absent && api_id.is_none() {
            result.error("api_id", "api_id is required to remove an API");
        }

        let config = params
            .config
            .as_ref()
            .and_then(|config| Self::validate_config(config, result));

        if api_id.is_none() && state != StateGoal::Absent && params.config.is_none() {
            result.error("config", "config is required when api_id is not specified");
        }

        let pages = params
            .pages
            .as_ref()
            .map(|pages| Self::validate_pages(pages, result));
        let plans = params
            .plans
            .as_ref()
            .map(|plans| Self::validate_plans(plans, result));

        let transfer_ownership = params.transfer_ownership.as_ref().and_then(|transfer| {
            match (
                transfer.user.as_deref().filter(|u| !u.is_empty()),
                transfer.owner_role.as_deref().filter(|r| !r.is_empty()),
            ) {
                (Some(user), Some(role)) => Some(OwnershipTransfer {
                    new_owner: user.to_string(),
                    previous_owner_role: role.to_string(),
                }),
                (None, _) => {
                    result.error("transfer_ownership.user", "user is required");
                    None
                }
                (_, None) => {
                    result.error("transfer_ownership.owner_role", "owner_role is required");
                    None
                }
            }
        });

        if state == StateGoal::Absent
            && (config.is_some() || pages.is_some() || plans.is_some() || transfer_ownership.is_some())
        {
            result
                .warnings
                .push(String::from("state is absent: config, pages, plans and transfer_ownership are ignored"));
        }

        Some(DesiredSpec {
            api_id,
            state,
            visibility: params.visibility,
            config,
            pages,
            plans,
            transfer_ownership,
        })
    }

    /// Validates the configuration body.
    fn validate_config(config: &Value, result: &mut ValidationResult) -> Option<Map<String, Value>> {
        let Some(object) = config.as_object() else {
            result.error("config", "config must be a JSON object");
            return None;
        };

        let mut document = object.clone();
        for field in READ_ONLY_API_FIELDS {
            if document.remove(*field).is_some() {
                result
                    .warnings
                    .push(format!("config.{field} is managed by the server and was ignored"));
            }
        }

        if document.contains_key("visibility") {
            result
                .warnings
                .push(String::from("config.visibility is overridden by the visibility parameter"));
            document.remove("visibility");
        }

        Some(document)
    }

    /// Validates pages and injects their order from declaration position.
    fn validate_pages(pages: &[Value], result: &mut ValidationResult) -> Vec<PageSpec> {
        let mut specs = Vec::with_capacity(pages.len());

        for (i, page) in pages.iter().enumerate() {
            let field = format!("pages[{i}]");
            let Some(object) = page.as_object() else {
                result.error(&field, "page must be a JSON object");
                continue;
            };

            let Ok(order) = u32::try_from(i + 1) else {
                result.error(&field, "too many pages");
                continue;
            };

            let mut document = object.clone();
            if document.remove("order").is_some() {
                result
                    .warnings
                    .push(format!("{field}.order is derived from the list position and was ignored"));
            }
            document.remove("id");

            let excluded_groups = match document.remove("excluded_groups") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::String(name)) => vec![name],
                Some(Value::Array(names)) => {
                    let parsed: Option<Vec<String>> = names
                        .iter()
                        .map(|n| n.as_str().map(String::from))
                        .collect();
                    if let Some(parsed) = parsed {
                        parsed
                    } else {
                        result.error(
                            format!("{field}.excluded_groups"),
                            "excluded_groups must be a list of group names",
                        );
                        Vec::new()
                    }
                }
                Some(_) => {
                    result.error(
                        format!("{field}.excluded_groups"),
                        "excluded_groups must be a group name or a list of group names",
                    );
                    Vec::new()
                }
            };

            specs.push(PageSpec {
                order,
                document,
                excluded_groups,
            });
        }

        specs
    }

    /// Validates plans and extracts their match keys.
    fn validate_plans(plans: &[Value], result: &mut ValidationResult) -> Vec<PlanSpec> {
        let mut specs = Vec::with_capacity(plans.len());
        let mut seen = std::collections::HashSet::new();

        for (i, plan) in plans.iter().enumerate() {
            let field = format!("plans[{i}]");
            let Some(object) = plan.as_object() else {
                result.error(&field, "plan must be a JSON object");
                continue;
            };

            let text = |name: &str| object.get(name).and_then(Value::as_str).filter(|s| !s.is_empty());
            let key = if let Some(id) = text("id") {
                PlanKey::Id(id.to_string())
            } else if let Some(key) = text("key") {
                PlanKey::Key(key.to_string())
            } else if let Some(name) = text("name") {
                PlanKey::Name(name.to_string())
            } else {
                result.error(&field, "plan must carry an id, a key or a name to be matched");
                continue;
            };

            if !seen.insert(key.clone()) {
                result.error(&field, format!("Duplicate plan {key}"));
                continue;
            }

            let mut document = object.clone();
            document.remove("id");
            specs.push(PlanSpec { key, document });
        }

        specs
    }
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Records an error.
    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
