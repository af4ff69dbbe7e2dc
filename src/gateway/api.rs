//! The management API surface used by the reconciler.
//!
//! [`ManagementApi`] is implemented over HTTP by
//! [`GatewayClient`](super::GatewayClient). Tests substitute a mock or an
//! in-memory gateway.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;

use super::auth::Authorization;
use super::types::{
    ApiEntity, Group, LifecycleAction, OwnershipRequest, PageEntity, PlanEntity, RequestRecord,
    UserSearchResult,
};

/// Operations of the management API.
///
/// Every call is a single request: no retries, no caching.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ManagementApi: Send + Sync {
    /// Sets the authorization attached to every subsequent request.
    fn set_authorization(&mut self, authorization: Authorization);

    /// Exchanges a third-party access token for a gateway token.
    async fn exchange_token(&self, auth_resource_id: &str, access_token: &str) -> Result<String>;

    /// Fetches one API. A missing API yields [`GatewayError::NotFound`](crate::error::GatewayError::NotFound).
    async fn get_api(&self, api_id: &str) -> Result<ApiEntity>;

    /// Checks that a context path is free before creation.
    async fn verify_context_path(&self, context_path: &str) -> Result<()>;

    /// Creates an API.
    async fn create_api(&self, document: &Map<String, Value>) -> Result<ApiEntity>;

    /// Replaces an API document.
    async fn update_api(&self, api_id: &str, document: &Map<String, Value>) -> Result<ApiEntity>;

    /// Deploys the current API definition to the gateways.
    async fn deploy_api(&self, api_id: &str) -> Result<()>;

    /// Starts or stops an API.
    async fn set_lifecycle(&self, api_id: &str, action: LifecycleAction) -> Result<()>;

    /// Deletes an API.
    async fn delete_api(&self, api_id: &str) -> Result<()>;

    /// Searches users by free-text query.
    async fn search_users(&self, query: &str) -> Result<Vec<UserSearchResult>>;

    /// Transfers primary ownership of an API.
    async fn transfer_ownership(&self, api_id: &str, request: &OwnershipRequest) -> Result<()>;

    /// Lists the documentation pages of an API.
    async fn list_pages(&self, api_id: &str) -> Result<Vec<PageEntity>>;

    /// Creates a page.
    async fn create_page(&self, api_id: &str, page: &Map<String, Value>) -> Result<PageEntity>;

    /// Replaces a page.
    async fn update_page(
        &self,
        api_id: &str,
        page_id: &str,
        page: &Map<String, Value>,
    ) -> Result<PageEntity>;

    /// Deletes a page.
    async fn delete_page(&self, api_id: &str, page_id: &str) -> Result<()>;

    /// Lists the plans of an API.
    async fn list_plans(&self, api_id: &str) -> Result<Vec<PlanEntity>>;

    /// Creates a plan.
    async fn create_plan(&self, api_id: &str, plan: &Map<String, Value>) -> Result<PlanEntity>;

    /// Replaces a plan.
    async fn update_plan(
        &self,
        api_id: &str,
        plan_id: &str,
        plan: &Map<String, Value>,
    ) -> Result<PlanEntity>;

    /// Deletes a plan. Only valid for plans that are not published.
    async fn delete_plan(&self, api_id: &str, plan_id: &str) -> Result<()>;

    /// Deprecates a published plan.
    async fn deprecate_plan(&self, api_id: &str, plan_id: &str) -> Result<()>;

    /// Lists the user groups.
    async fn list_groups(&self) -> Result<Vec<Group>>;

    /// Returns the requests sent since the last call, oldest first.
    fn drain_requests(&self) -> Vec<RequestRecord>;
}

/// Returns the identifier of the group named `name`.
///
/// Names are matched exactly.
#[must_use]
pub fn resolve_group_id<'a>(groups: &'a [Group], name: &str) -> Option<&'a str> {
    groups
        .iter()
        .find(|group| group.name == name)
        .map(|group| group.id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_group_id_exact_match() {
        let groups = vec![
            Group { id: String::from("g1"), name: String::from("partners") },
            Group { id: String::from("g2"), name: String::from("Partners") },
        ];

        assert_eq!(resolve_group_id(&groups, "Partners"), Some("g2"));
        assert_eq!(resolve_group_id(&groups, "partner"), None);
    }
}
