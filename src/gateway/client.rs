//! Management API client implementation.
//!
//! This module provides the HTTP client for the gateway management REST API.
//! Requests are sent once: failures are reported, never retried.

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::Connection;
use crate::error::{AuthError, GatewayError, RemoteError, Result};

use super::api::ManagementApi;
use super::auth::Authorization;
use super::types::{
    ApiEntity, Group, LifecycleAction, OwnershipRequest, PageEntity, PlanEntity, RequestRecord,
    TokenResponse, UserSearchResult,
};

/// Path of the management API below the server URL.
const MANAGEMENT_PATH: &str = "/management";

/// Management API client.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    /// HTTP client.
    client: Client,
    /// Server URL including the management path.
    base_url: String,
    /// Authorization attached to requests, once known.
    authorization: Option<Authorization>,
    /// Requests sent and not yet drained.
    requests: Arc<Mutex<Vec<RequestRecord>>>,
}

impl GatewayClient {
    /// Creates a new management API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(connection: &Connection) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(connection.timeout_secs))
            .danger_accept_invalid_certs(!connection.validate_certs)
            .build()
            .map_err(|e| RemoteError::transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: format!("{}{MANAGEMENT_PATH}", connection.url.trim_end_matches('/')),
            authorization: None,
            requests: Arc::default(),
        })
    }

    /// Creates a client that is already authorized.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_authorization(connection: &Connection, authorization: Authorization) -> Result<Self> {
        let mut client = Self::new(connection)?;
        client.authorization = Some(authorization);
        Ok(client)
    }

    /// Builds a request with headers and authorization.
    fn builder(&self, method: &Method, path: &str, query: &[(&str, &str)]) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        let mut request = self
            .client
            .request(method.clone(), url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json");

        if !query.is_empty() {
            request = request.query(query);
        }

        match &self.authorization {
            Some(Authorization::Basic { username, password }) => {
                request.basic_auth(username, Some(password))
            }
            Some(Authorization::Bearer(token)) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Appends a request to the trail.
    fn record(&self, method: &Method, path: &str, status: Option<u16>) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RequestRecord {
                method: method.to_string(),
                path: path.to_string(),
                status,
            });
        }
    }

    /// Sends one request and returns the raw response body.
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<String> {
        trace!("{method} {path}");

        let mut request = self.builder(&method, path, query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                self.record(&method, path, None);
                return Err(RemoteError::transport(format!("{method} {path}: {e}")).into());
            }
        };

        let status = response.status();
        self.record(&method, path, Some(status.as_u16()));
        let text = response
            .text()
            .await
            .map_err(|e| RemoteError::transport(format!("Failed to read response body: {e}")))?;

        debug!("{method} {path} -> {}", status.as_u16());

        if !status.is_success() {
            return Err(RemoteError::status(method.as_str(), path, status.as_u16(), text).into());
        }

        Ok(text)
    }

    /// Sends one request and decodes the JSON response body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<T> {
        let text = self.send(method, path, query, body).await?;
        serde_json::from_str(&text).map_err(|e| {
            GatewayError::Remote(RemoteError::InvalidResponse {
                path: path.to_string(),
                message: format!("Failed to parse response: {e}"),
            })
        })
    }
}

#[async_trait]
impl ManagementApi for GatewayClient {
    fn set_authorization(&mut self, authorization: Authorization) {
        self.authorization = Some(authorization);
    }

    async fn exchange_token(&self, auth_resource_id: &str, access_token: &str) -> Result<String> {
        let path = format!("/auth/oauth2/{auth_resource_id}/exchange");
        let response: TokenResponse = self
            .send_json(Method::POST, &path, &[("token", access_token)], None)
            .await?;

        response.token.ok_or_else(|| AuthError::MissingToken.into())
    }

    async fn get_api(&self, api_id: &str) -> Result<ApiEntity> {
        self.send_json(Method::GET, &format!("/apis/{api_id}"), &[], None)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    GatewayError::NotFound {
                        api_id: api_id.to_string(),
                    }
                } else {
                    e
                }
            })
    }

    async fn verify_context_path(&self, context_path: &str) -> Result<()> {
        let body = json!({ "context_path": context_path });
        self.send(Method::POST, "/apis/verify", &[], Some(&body)).await?;
        Ok(())
    }

    async fn create_api(&self, document: &Map<String, Value>) -> Result<ApiEntity> {
        let body = Value::Object(document.clone());
        self.send_json(Method::POST, "/apis", &[], Some(&body)).await
    }

    async fn update_api(&self, api_id: &str, document: &Map<String, Value>) -> Result<ApiEntity> {
        let body = Value::Object(document.clone());
        self.send_json(Method::PUT, &format!("/apis/{api_id}"), &[], Some(&body))
            .await
    }

    async fn deploy_api(&self, api_id: &str) -> Result<()> {
        self.send(Method::POST, &format!("/apis/{api_id}/deploy"), &[], None)
            .await?;
        Ok(())
    }

    async fn set_lifecycle(&self, api_id: &str, action: LifecycleAction) -> Result<()> {
        self.send(
            Method::POST,
            &format!("/apis/{api_id}"),
            &[("action", action.as_str())],
            None,
        )
        .await?;
        Ok(())
    }

    async fn delete_api(&self, api_id: &str) -> Result<()> {
        self.send(Method::DELETE, &format!("/apis/{api_id}"), &[], None)
            .await?;
        Ok(())
    }

    async fn search_users(&self, query: &str) -> Result<Vec<UserSearchResult>> {
        self.send_json(Method::GET, "/search/users", &[("q", query)], None)
            .await
    }

    async fn transfer_ownership(&self, api_id: &str, request: &OwnershipRequest) -> Result<()> {
        let body = serde_json::to_value(request).map_err(|e| RemoteError::InvalidResponse {
            path: format!("/apis/{api_id}/members/transfer_ownership"),
            message: format!("Failed to encode request: {e}"),
        })?;
        self.send(
            Method::POST,
            &format!("/apis/{api_id}/members/transfer_ownership"),
            &[],
            Some(&body),
        )
        .await?;
        Ok(())
    }

    async fn list_pages(&self, api_id: &str) -> Result<Vec<PageEntity>> {
        self.send_json(Method::GET, &format!("/apis/{api_id}/pages"), &[], None)
            .await
    }

    async fn create_page(&self, api_id: &str, page: &Map<String, Value>) -> Result<PageEntity> {
        let body = Value::Object(page.clone());
        self.send_json(Method::POST, &format!("/apis/{api_id}/pages"), &[], Some(&body))
            .await
    }

    async fn update_page(
        &self,
        api_id: &str,
        page_id: &str,
        page: &Map<String, Value>,
    ) -> Result<PageEntity> {
        let mut payload = page.clone();
        payload.remove("id");
        payload.remove("type");
        let body = Value::Object(payload);
        self.send_json(
            Method::PUT,
            &format!("/apis/{api_id}/pages/{page_id}"),
            &[],
            Some(&body),
        )
        .await
    }

    async fn delete_page(&self, api_id: &str, page_id: &str) -> Result<()> {
        self.send(
            Method::DELETE,
            &format!("/apis/{api_id}/pages/{page_id}"),
            &[],
            None,
        )
        .await?;
        Ok(())
    }

    async fn list_plans(&self, api_id: &str) -> Result<Vec<PlanEntity>> {
        self.send_json(Method::GET, &format!("/apis/{api_id}/plans"), &[], None)
            .await
    }

    async fn create_plan(&self, api_id: &str, plan: &Map<String, Value>) -> Result<PlanEntity> {
        let body = Value::Object(plan.clone());
        self.send_json(Method::POST, &format!("/apis/{api_id}/plans"), &[], Some(&body))
            .await
    }

    async fn update_plan(
        &self,
        api_id: &str,
        plan_id: &str,
        plan: &Map<String, Value>,
    ) -> Result<PlanEntity> {
        let body = Value::Object(plan.clone());
        self.send_json(
            Method::PUT,
            &format!("/apis/{api_id}/plans/{plan_id}"),
            &[],
            Some(&body),
        )
        .await
    }

    async fn delete_plan(&self, api_id: &str, plan_id: &str) -> Result<()> {
        self.send(
            Method::DELETE,
            &format!("/apis/{api_id}/plans/{plan_id}"),
            &[],
            None,
        )
        .await?;
        Ok(())
    }

    async fn deprecate_plan(&self, api_id: &str, plan_id: &str) -> Result<()> {
        self.send(
            Method::POST,
            &format!("/apis/{api_id}/plans/{plan_id}/_deprecate"),
            &[],
            None,
        )
        .await?;
        Ok(())
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        self.send_json(Method::GET, "/configuration/groups", &[], None)
            .await
    }

    fn drain_requests(&self) -> Vec<RequestRecord> {
        self.requests
            .lock()
            .map(|mut requests| std::mem::take(&mut *requests))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::gateway::resolve_group_id;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn connection(server: &MockServer) -> Connection {
        Connection {
            url: server.uri(),
            validate_certs: true,
            timeout_secs: 10,
        }
    }

    fn basic_client(server: &MockServer) -> GatewayClient {
        GatewayClient::with_authorization(
            &connection(server),
            Authorization::Basic {
                username: String::from("admin"),
                password: String::from("admin"),
            },
        )
        .expect("client")
    }

    #[tokio::test]
    async fn test_get_api_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/management/apis/a1"))
            .and(header("authorization", "Basic YWRtaW46YWRtaW4="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "a1",
                "state": "STOPPED",
                "name": "echo"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = basic_client(&server).get_api("a1").await.expect("get api");
        assert_eq!(api.id, "a1");
        assert_eq!(api.document.get("name"), Some(&json!("echo")));
    }

    #[tokio::test]
    async fn test_get_api_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/management/apis/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("API not found"))
            .mount(&server)
            .await;

        let err = basic_client(&server).get_api("missing").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound { ref api_id } if api_id == "missing"));
    }

    #[tokio::test]
    async fn test_non_success_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/management/apis/a1"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad proxy"))
            .mount(&server)
            .await;

        let err = basic_client(&server)
            .update_api("a1", &Map::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Remote);
        assert!(matches!(
            err,
            GatewayError::Remote(RemoteError::Status { status: 400, ref body, .. }) if body == "bad proxy"
        ));
    }

    #[tokio::test]
    async fn test_exchange_token_without_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/management/auth/oauth2/oidc/exchange"))
            .and(query_param("token", "third-party"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "gio" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GatewayClient::new(&connection(&server)).expect("client");
        let token = client.exchange_token("oidc", "third-party").await.expect("exchange");
        assert_eq!(token, "gio");
    }

    #[tokio::test]
    async fn test_lifecycle_uses_action_query_and_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/management/apis/a1"))
            .and(query_param("action", "START"))
            .and(header("authorization", "Bearer jwt"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = GatewayClient::new(&connection(&server)).expect("client");
        client.set_authorization(Authorization::Bearer(String::from("jwt")));

        tokio_test::assert_ok!(client.set_lifecycle("a1", LifecycleAction::Start).await);
    }

    #[tokio::test]
    async fn test_update_page_strips_id_and_type() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/management/apis/a1/pages/p1"))
            .and(body_json(json!({ "name": "readme", "order": 1 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "p1",
                "order": 1,
                "name": "readme",
                "type": "MARKDOWN"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = json!({ "id": "p1", "type": "MARKDOWN", "name": "readme", "order": 1 });
        let updated = basic_client(&server)
            .update_page("a1", "p1", page.as_object().expect("object"))
            .await
            .expect("update page");
        assert_eq!(updated.id, "p1");
    }

    #[tokio::test]
    async fn test_transfer_ownership_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/management/apis/a1/members/transfer_ownership"))
            .and(body_json(json!({ "role": "USER", "reference": "ref-1", "id": "u-1" })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let request = OwnershipRequest {
            role: String::from("USER"),
            reference: String::from("ref-1"),
            id: Some(String::from("u-1")),
        };
        tokio_test::assert_ok!(basic_client(&server).transfer_ownership("a1", &request).await);
    }

    #[tokio::test]
    async fn test_list_groups_then_match_by_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/management/configuration/groups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "g1", "name": "partners" },
                { "id": "g2", "name": "partners-eu" }
            ])))
            .mount(&server)
            .await;

        let groups = basic_client(&server).list_groups().await.expect("groups");
        assert_eq!(groups.len(), 2);
        assert_eq!(resolve_group_id(&groups, "partners"), Some("g1"));
        assert_eq!(resolve_group_id(&groups, "part"), None);
    }

    #[tokio::test]
    async fn test_transport_error() {
        let client = GatewayClient::new(&Connection {
            url: String::from("http://127.0.0.1:9"),
            validate_certs: true,
            timeout_secs: 1,
        })
        .expect("client");

        let err = client.list_groups().await.unwrap_err();
        assert!(matches!(err, GatewayError::Remote(RemoteError::Transport { .. })));
        assert_eq!(
            client.drain_requests(),
            vec![RequestRecord {
                method: String::from("GET"),
                path: String::from("/configuration/groups"),
                status: None,
            }]
        );
    }

    #[tokio::test]
    async fn test_request_trail_records_each_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/management/apis/a1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "a1" })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/management/apis/a1/plans/p1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = basic_client(&server);
        tokio_test::assert_ok!(client.get_api("a1").await);
        assert!(client.delete_plan("a1", "p1").await.is_err());

        let trail = client.drain_requests();
        assert_eq!(
            trail,
            vec![
                RequestRecord {
                    method: String::from("GET"),
                    path: String::from("/apis/a1"),
                    status: Some(200),
                },
                RequestRecord {
                    method: String::from("DELETE"),
                    path: String::from("/apis/a1/plans/p1"),
                    status: Some(404),
                },
            ]
        );
        assert!(client.drain_requests().is_empty());
    }
}
