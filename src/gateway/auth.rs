//! Authentication against the management API.
//!
//! The [`Authenticator`] turns the selected [`Credentials`] into the
//! [`Authorization`] attached to every request of a run. Basic and bearer
//! credentials are used as they are; an OAuth2 access token is exchanged
//! exactly once for a gateway token.

use tracing::{debug, info};

use crate::config::Credentials;
use crate::error::{AuthError, GatewayError, RemoteError, Result};

use super::api::ManagementApi;

/// Authorization attached to management API requests.
#[derive(Clone, PartialEq, Eq)]
pub enum Authorization {
    /// HTTP basic authentication.
    Basic {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// Bearer token.
    Bearer(String),
}

/// Result of authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    /// Authorization for the rest of the run.
    pub authorization: Authorization,
    /// Gateway token obtained by exchange, if an exchange took place.
    pub exchanged_token: Option<String>,
}

/// Resolves credentials into an authorization.
#[derive(Debug, Clone, Copy)]
pub struct Authenticator<'a> {
    credentials: &'a Credentials,
}

impl<'a> Authenticator<'a> {
    /// Creates an authenticator for the given credentials.
    #[must_use]
    pub const fn new(credentials: &'a Credentials) -> Self {
        Self { credentials }
    }

    /// Authenticates, performing the token exchange when required.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ExchangeRejected`] if the exchange endpoint
    /// answers with an error status, and [`AuthError::MissingToken`] if it
    /// answers without a token.
    pub async fn authenticate<A>(&self, api: &A) -> Result<Authenticated>
    where
        A: ManagementApi + ?Sized,
    {
        debug!("Authenticating with strategy: {}", self.credentials.strategy());

        match self.credentials {
            Credentials::Basic { username, password } => Ok(Authenticated {
                authorization: Authorization::Basic {
                    username: username.clone(),
                    password: password.clone(),
                },
                exchanged_token: None,
            }),
            Credentials::Bearer { token } => Ok(Authenticated {
                authorization: Authorization::Bearer(token.clone()),
                exchanged_token: None,
            }),
            Credentials::Exchange {
                access_token,
                auth_resource_id,
            } => {
                info!("Exchanging access token with resource '{auth_resource_id}'");
                let token = api
                    .exchange_token(auth_resource_id, access_token)
                    .await
                    .map_err(into_exchange_error)?;

                if token.is_empty() {
                    return Err(AuthError::MissingToken.into());
                }

                Ok(Authenticated {
                    authorization: Authorization::Bearer(token.clone()),
                    exchanged_token: Some(token),
                })
            }
        }
    }
}

/// Maps a remote status failure of the exchange call to an auth error.
fn into_exchange_error(error: GatewayError) -> GatewayError {
    match error {
        GatewayError::Remote(RemoteError::Status { status, body, .. }) => {
            AuthError::ExchangeRejected { status, body }.into()
        }
        other => other,
    }
}

impl std::fmt::Debug for Authorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::Bearer(_) => f.debug_tuple("Bearer").field(&"***").finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::api::MockManagementApi;

    #[tokio::test]
    async fn test_basic_credentials_do_not_call_remote() {
        let credentials = Credentials::Basic {
            username: String::from("admin"),
            password: String::from("admin"),
        };
        let api = MockManagementApi::new();

        let authenticated = Authenticator::new(&credentials)
            .authenticate(&api)
            .await
            .expect("basic auth");

        assert!(authenticated.exchanged_token.is_none());
        assert!(matches!(authenticated.authorization, Authorization::Basic { .. }));
    }

    #[tokio::test]
    async fn test_exchange_called_once() {
        let credentials = Credentials::Exchange {
            access_token: String::from("third-party"),
            auth_resource_id: String::from("oidc"),
        };
        let mut api = MockManagementApi::new();
        api.expect_exchange_token()
            .withf(|resource, token| resource.to_string() == "oidc" && token.to_string() == "third-party")
            .times(1)
            .returning(|_, _| Ok(String::from("gio-token")));

        let authenticated = Authenticator::new(&credentials)
            .authenticate(&api)
            .await
            .expect("exchange");

        assert_eq!(authenticated.exchanged_token.as_deref(), Some("gio-token"));
        assert_eq!(
            authenticated.authorization,
            Authorization::Bearer(String::from("gio-token"))
        );
    }

    #[tokio::test]
    async fn test_exchange_rejected() {
        let credentials = Credentials::Exchange {
            access_token: String::from("expired"),
            auth_resource_id: String::from("oidc"),
        };
        let mut api = MockManagementApi::new();
        api.expect_exchange_token().times(1).returning(|_, _| {
            Err(RemoteError::status("POST", "/auth/oauth2/oidc/exchange", 401, "invalid token").into())
        });

        let err = Authenticator::new(&credentials)
            .authenticate(&api)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GatewayError::Auth(AuthError::ExchangeRejected { status: 401, .. })
        ));
    }

    #[test]
    fn test_authorization_debug_redacts() {
        let rendered = format!("{:?}", Authorization::Bearer(String::from("secret-token")));
        assert!(!rendered.contains("secret-token"));
    }
}
