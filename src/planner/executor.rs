//! Plan executor for applying action plans.
//!
//! This module applies an [`ActionPlan`] against the management API,
//! strictly in order. The first failing action aborts the rest; nothing is
//! rolled back. Page and plan writes are computed here, from the snapshot
//! taken before planning, so that a converged run issues no writes.

use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::config::{OwnershipTransfer, PageSpec, PlanSpec, READ_ONLY_API_FIELDS};
use crate::error::{GatewayError, ReconcileError, Result};
use crate::gateway::{
    resolve_group_id, ActualState, ApiEntity, Group, LifecycleAction, LifecycleState,
    ManagementApi, OwnershipRequest, PageEntity, PlanEntity, PlanStatus,
};

use super::diff::{
    apply_patch, page_document, page_operations, plan_operations, PageOperation, PlanOperation,
};
use super::plan::{Action, ActionPlan, PlannedAction};

/// Executor for action plans.
#[derive(Debug)]
pub struct PlanExecutor<'a, A: ?Sized> {
    /// Management API.
    api: &'a A,
    /// Whether writes are skipped.
    dry_run: bool,
}

/// Result of executing a single action.
#[derive(Debug, Clone)]
pub struct ActionResult {
    /// 1-based action index.
    pub index: usize,
    /// Description of the action.
    pub description: String,
    /// Number of remote writes issued (or that would have been issued).
    pub writes: usize,
}

/// Result of executing the entire plan.
#[derive(Debug)]
pub struct ExecutionResult {
    /// Results of the completed actions, in order.
    pub results: Vec<ActionResult>,
    /// Identifier of the API after execution.
    pub api_id: Option<String>,
    /// Total remote writes issued (or that would have been issued).
    pub writes: usize,
    /// Lifecycle state at the end of the run, when known.
    pub state: Option<String>,
    /// The failure that aborted the plan, if any.
    pub failure: Option<GatewayError>,
    /// Whether writes were skipped.
    pub dry_run: bool,
}

/// Mutable state carried from one action to the next.
#[derive(Debug, Default)]
struct ExecutionContext {
    api_id: Option<String>,
    api: Option<ApiEntity>,
    pages: Vec<PageEntity>,
    plans: Vec<PlanEntity>,
    groups: Option<Vec<Group>>,
    created: bool,
    state: Option<String>,
}

impl<'a, A> PlanExecutor<'a, A>
where
    A: ManagementApi + ?Sized,
{
    /// Creates a new plan executor.
    #[must_use]
    pub const fn new(api: &'a A) -> Self {
        Self {
            api,
            dry_run: false,
        }
    }

    /// Sets whether writes are skipped.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Executes an action plan.
    ///
    /// `actual` is the snapshot the plan was computed from. Failures are
    /// reported in [`ExecutionResult::failure`], wrapped in
    /// [`ReconcileError::ActionFailed`].
    pub async fn execute(&self, plan: &ActionPlan, actual: Option<&ActualState>) -> ExecutionResult {
        info!(
            "Executing action plan with {} actions{}",
            plan.actions.len(),
            if self.dry_run { " (check mode)" } else { "" }
        );

        let mut ctx = ExecutionContext {
            api_id: plan.api_id.clone(),
            api: actual.map(|a| a.api.clone()),
            pages: actual.map(|a| a.pages.clone()).unwrap_or_default(),
            plans: actual.map(|a| a.plans.clone()).unwrap_or_default(),
            state: actual.map(|a| a.lifecycle().to_string()),
            ..ExecutionContext::default()
        };

        let total = plan.actions.len();
        let mut results = Vec::new();
        let mut failure = None;

        for (i, planned) in plan.actions.iter().enumerate() {
            let index = i + 1;
            info!("Executing action {index}: {}", planned.description());

            match self.execute_action(planned, &mut ctx).await {
                Ok(writes) => {
                    debug!("Action {index} issued {writes} write(s)");
                    results.push(ActionResult {
                        index,
                        description: planned.description(),
                        writes,
                    });
                }
                Err(e) => {
                    error!("Action {index} ({}) failed: {e}", planned.description());
                    failure = Some(GatewayError::Reconcile(ReconcileError::ActionFailed {
                        index,
                        total,
                        action: planned.description(),
                        source: Box::new(e),
                    }));
                    break;
                }
            }
        }

        ExecutionResult {
            writes: results.iter().map(|r| r.writes).sum(),
            results,
            api_id: ctx.api_id,
            state: ctx.state,
            failure,
            dry_run: self.dry_run,
        }
    }

    /// Executes a single action and returns the number of writes.
    async fn execute_action(&self, planned: &PlannedAction, ctx: &mut ExecutionContext) -> Result<usize> {
        match &planned.action {
            Action::CreateApi { document } => self.execute_create(document, ctx).await,
            Action::UpdateApi { patch } => self.execute_update(planned, patch, ctx).await,
            Action::TransferOwnership(transfer) => {
                self.execute_transfer(planned, transfer, ctx).await
            }
            Action::SyncPages(pages) => self.execute_sync_pages(planned, pages, ctx).await,
            Action::SyncPlans(plans) => self.execute_sync_plans(planned, plans, ctx).await,
            Action::SetLifecycleState(target) => {
                self.execute_lifecycle(planned, *target, ctx).await
            }
            Action::DeleteApi => self.execute_delete(planned, ctx).await,
        }
    }

    /// Creates the API.
    async fn execute_create(
        &self,
        document: &Map<String, Value>,
        ctx: &mut ExecutionContext,
    ) -> Result<usize> {
        if let Some(context_path) = document.get("contextPath").and_then(Value::as_str) {
            debug!("Verifying context path {context_path}");
            self.api.verify_context_path(context_path).await?;
        }

        if !self.dry_run {
            let api = self.api.create_api(document).await?;
            info!("Created API {}", api.id);
            ctx.api_id = Some(api.id.clone());
            ctx.api = Some(api);
        }

        ctx.created = true;
        ctx.state = Some(LifecycleState::Stopped.to_string());
        Ok(1)
    }

    /// Replaces the API document with the patched working copy and deploys.
    async fn execute_update(
        &self,
        planned: &PlannedAction,
        patch: &Map<String, Value>,
        ctx: &mut ExecutionContext,
    ) -> Result<usize> {
        if self.dry_run {
            return Ok(2);
        }

        let api_id = require_api_id(ctx, planned)?;
        let mut document = ctx.api.as_ref().map(ApiEntity::to_document).unwrap_or_default();
        apply_patch(&mut document, patch);
        for field in READ_ONLY_API_FIELDS {
            document.remove(*field);
        }

        let updated = self.api.update_api(&api_id, &document).await?;
        info!("Updated API {api_id}");
        ctx.api = Some(updated);

        self.api.deploy_api(&api_id).await?;
        info!("Deployed API {api_id}");
        Ok(2)
    }

    /// Transfers primary ownership, unless the user already owns the API.
    async fn execute_transfer(
        &self,
        planned: &PlannedAction,
        transfer: &OwnershipTransfer,
        ctx: &mut ExecutionContext,
    ) -> Result<usize> {
        let mut users = self.api.search_users(&transfer.new_owner).await?;
        if users.len() != 1 {
            return Err(ReconcileError::AmbiguousOwner {
                user: transfer.new_owner.clone(),
                found: users.len(),
            }
            .into());
        }
        let user = users.remove(0);

        let current_owner = ctx.api.as_ref().and_then(ApiEntity::owner_id);
        if user.id.is_some() && current_owner == user.id.as_deref() {
            debug!("'{}' already owns the API", transfer.new_owner);
            return Ok(0);
        }

        if self.dry_run {
            return Ok(1);
        }

        let api_id = require_api_id(ctx, planned)?;
        let request = OwnershipRequest {
            role: transfer.previous_owner_role.clone(),
            reference: user.reference,
            id: user.id,
        };
        self.api.transfer_ownership(&api_id, &request).await?;
        info!("Transferred ownership of API {api_id} to '{}'", transfer.new_owner);
        Ok(1)
    }

    /// Converges documentation pages.
    async fn execute_sync_pages(
        &self,
        planned: &PlannedAction,
        pages: &[PageSpec],
        ctx: &mut ExecutionContext,
    ) -> Result<usize> {
        let mut documents = Vec::with_capacity(pages.len());
        for page in pages {
            let group_ids = self.resolve_groups(page, ctx).await?;
            documents.push(page_document(page, &group_ids));
        }

        let operations = page_operations(&documents, &ctx.pages);
        if operations.is_empty() {
            debug!("Pages are up to date");
            return Ok(0);
        }
        if self.dry_run {
            return Ok(operations.len());
        }

        let api_id = require_api_id(ctx, planned)?;
        for operation in &operations {
            match operation {
                PageOperation::Create { order, document } => {
                    let page = self.api.create_page(&api_id, document).await?;
                    info!("Created page {order} ({})", page.id);
                }
                PageOperation::Update {
                    page_id,
                    order,
                    document,
                } => {
                    self.api.update_page(&api_id, page_id, document).await?;
                    info!("Updated page {order} ({page_id})");
                }
                PageOperation::Delete { page_id } => {
                    self.api.delete_page(&api_id, page_id).await?;
                    info!("Deleted page {page_id}");
                }
            }
        }

        Ok(operations.len())
    }

    /// Resolves the excluded group names of a page to identifiers.
    async fn resolve_groups(&self, page: &PageSpec, ctx: &mut ExecutionContext) -> Result<Vec<String>> {
        if page.excluded_groups.is_empty() {
            return Ok(Vec::new());
        }

        if ctx.groups.is_none() {
            ctx.groups = Some(self.api.list_groups().await?);
        }
        let groups = ctx.groups.as_deref().unwrap_or_default();

        page.excluded_groups
            .iter()
            .map(|name| {
                resolve_group_id(groups, name)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        ReconcileError::UnknownGroup {
                            name: name.clone(),
                            order: page.order,
                        }
                        .into()
                    })
            })
            .collect()
    }

    /// Converges declared plans and deploys when anything changed.
    async fn execute_sync_plans(
        &self,
        planned: &PlannedAction,
        plans: &[PlanSpec],
        ctx: &mut ExecutionContext,
    ) -> Result<usize> {
        let operations = plan_operations(plans, &ctx.plans)?;
        if operations.is_empty() {
            debug!("Plans are up to date");
            return Ok(0);
        }
        if self.dry_run {
            return Ok(operations.len() + 1);
        }

        let api_id = require_api_id(ctx, planned)?;
        for operation in &operations {
            match operation {
                PlanOperation::Create { key, document } => {
                    let plan = self.api.create_plan(&api_id, document).await?;
                    info!("Created plan {key} ({})", plan.id);
                }
                PlanOperation::Update {
                    key,
                    plan_id,
                    document,
                } => {
                    self.api.update_plan(&api_id, plan_id, document).await?;
                    info!("Updated plan {key} ({plan_id})");
                }
            }
        }

        self.api.deploy_api(&api_id).await?;
        info!("Deployed API {api_id}");
        Ok(operations.len() + 1)
    }

    /// Starts or stops the API. A freshly created API is deployed first.
    async fn execute_lifecycle(
        &self,
        planned: &PlannedAction,
        target: LifecycleAction,
        ctx: &mut ExecutionContext,
    ) -> Result<usize> {
        let deploy_first = ctx.created && target == LifecycleAction::Start;
        let writes = if deploy_first { 2 } else { 1 };

        if !self.dry_run {
            let api_id = require_api_id(ctx, planned)?;
            if deploy_first {
                self.api.deploy_api(&api_id).await?;
                info!("Deployed API {api_id}");
            }
            self.api.set_lifecycle(&api_id, target).await?;
            info!("API {api_id}: {target}");
        }

        ctx.state = Some(
            match target {
                LifecycleAction::Start => LifecycleState::Started,
                LifecycleAction::Stop => LifecycleState::Stopped,
            }
            .to_string(),
        );
        Ok(writes)
    }

    /// Closes down plans, stops and deletes the API.
    async fn execute_delete(&self, planned: &PlannedAction, ctx: &mut ExecutionContext) -> Result<usize> {
        let api_id = require_api_id(ctx, planned)?;
        let mut writes = 0;

        for plan in self.api.list_plans(&api_id).await? {
            match plan.status {
                PlanStatus::Staging => {
                    if !self.dry_run {
                        self.api.delete_plan(&api_id, &plan.id).await?;
                        info!("Deleted plan {}", plan.id);
                    }
                    writes += 1;
                }
                PlanStatus::Published => {
                    if !self.dry_run {
                        self.api.deprecate_plan(&api_id, &plan.id).await?;
                        info!("Deprecated plan {}", plan.id);
                    }
                    writes += 1;
                }
                PlanStatus::Deprecated | PlanStatus::Closed => {
                    debug!("Plan {} is already {}", plan.id, plan.status);
                }
                PlanStatus::Unknown(ref status) => {
                    warn!("Leaving plan {} with unknown status '{status}'", plan.id);
                }
            }
        }

        let started = ctx
            .api
            .as_ref()
            .is_some_and(|api| api.state == LifecycleState::Started);
        if started {
            if !self.dry_run {
                self.api.set_lifecycle(&api_id, LifecycleAction::Stop).await?;
                info!("API {api_id}: STOP");
            }
            writes += 1;
        }

        if !self.dry_run {
            self.api.delete_api(&api_id).await?;
            info!("Deleted API {api_id}");
        }
        writes += 1;

        ctx.state = Some(String::from("absent"));
        Ok(writes)
    }
}

/// Returns the API identifier known at this point of the run.
fn require_api_id(ctx: &ExecutionContext, planned: &PlannedAction) -> Result<String> {
    ctx.api_id.clone().ok_or_else(|| {
        ReconcileError::MissingApiId {
            action: planned.description(),
        }
        .into()
    })
}

impl ExecutionResult {
    /// Returns true if every action succeeded.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.failure.is_none()
    }

    /// Returns true if the run succeeded and wrote (or would write) anything.
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.success() && self.writes > 0
    }

    /// Returns the descriptions of the completed actions.
    #[must_use]
    pub fn completed(&self) -> Vec<String> {
        self.results.iter().map(|r| r.description.clone()).collect()
    }
}

impl std::fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Executed {} actions: {} write(s){}",
            self.results.len(),
            self.writes,
            if self.dry_run { " (check mode)" } else { "" }
        )?;
        if let Some(failure) = &self.failure {
            write!(f, ", failed: {failure}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DesiredSpec, PlanKey, StateGoal};
    use crate::gateway::{MockManagementApi, UserSearchResult};
    use crate::planner::DiffEngine;
    use mockall::Sequence;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object")
    }

    fn api_entity(value: Value) -> ApiEntity {
        serde_json::from_value(value).expect("api")
    }

    fn plan_entity(id: &str, status: &str) -> PlanEntity {
        serde_json::from_value(json!({ "id": id, "status": status, "name": id })).expect("plan")
    }

    fn plan_of(actions: Vec<Action>, api_id: Option<&str>) -> ActionPlan {
        let mut plan = ActionPlan::new("hash", api_id.map(str::to_string));
        for action in actions {
            plan.push(action, "");
        }
        plan
    }

    #[tokio::test]
    async fn test_delete_never_hard_deletes_published_plans() {
        let mut api = MockManagementApi::new();
        api.expect_list_plans().times(1).returning(|_| {
            Ok(vec![
                plan_entity("staging", "STAGING"),
                plan_entity("published", "PUBLISHED"),
                plan_entity("closed", "CLOSED"),
            ])
        });
        api.expect_delete_plan()
            .withf(|_, plan_id| plan_id.to_string() == "staging")
            .times(1)
            .returning(|_, _| Ok(()));
        api.expect_deprecate_plan()
            .withf(|_, plan_id| plan_id.to_string() == "published")
            .times(1)
            .returning(|_, _| Ok(()));
        api.expect_set_lifecycle()
            .withf(|_, action| *action == LifecycleAction::Stop)
            .times(1)
            .returning(|_, _| Ok(()));
        api.expect_delete_api().times(1).returning(|_| Ok(()));

        let actual = ActualState::new(api_entity(json!({ "id": "a1", "state": "STARTED" })));
        let plan = plan_of(vec![Action::DeleteApi], Some("a1"));
        let result = PlanExecutor::new(&api).execute(&plan, Some(&actual)).await;

        assert!(result.success());
        assert_eq!(result.writes, 4);
        assert_eq!(result.state.as_deref(), Some("absent"));
    }

    #[tokio::test]
    async fn test_transfer_is_noop_when_owner_matches() {
        let mut api = MockManagementApi::new();
        api.expect_search_users().times(1).returning(|_| {
            Ok(vec![UserSearchResult {
                reference: String::from("ref-1"),
                id: Some(String::from("u-1")),
                display_name: None,
            }])
        });
        api.expect_transfer_ownership().never();

        let actual = ActualState::new(api_entity(json!({ "id": "a1", "owner": { "id": "u-1" } })));
        let plan = plan_of(
            vec![Action::TransferOwnership(OwnershipTransfer {
                new_owner: String::from("foo"),
                previous_owner_role: String::from("USER"),
            })],
            Some("a1"),
        );
        let result = PlanExecutor::new(&api).execute(&plan, Some(&actual)).await;

        assert!(result.success());
        assert!(!result.changed());
    }

    #[tokio::test]
    async fn test_ambiguous_owner_fails() {
        let mut api = MockManagementApi::new();
        api.expect_search_users().returning(|_| Ok(vec![]));

        let plan = plan_of(
            vec![Action::TransferOwnership(OwnershipTransfer {
                new_owner: String::from("nobody"),
                previous_owner_role: String::from("USER"),
            })],
            Some("a1"),
        );
        let actual = ActualState::new(api_entity(json!({ "id": "a1" })));
        let result = PlanExecutor::new(&api).execute(&plan, Some(&actual)).await;

        let failure = result.failure.expect("failure");
        assert_eq!(failure.kind(), crate::error::ErrorKind::Reconcile);
        assert!(failure.to_string().contains("found 0"));
    }

    #[tokio::test]
    async fn test_create_then_start_deploys_first() {
        let mut api = MockManagementApi::new();
        let mut seq = Sequence::new();
        api.expect_verify_context_path()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        api.expect_create_api()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(api_entity(json!({ "id": "new-id", "state": "STOPPED" }))));
        api.expect_deploy_api()
            .withf(|id| id.to_string() == "new-id")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        api.expect_set_lifecycle()
            .withf(|id, action| id.to_string() == "new-id" && *action == LifecycleAction::Start)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let mut desired = DesiredSpec::new(None, StateGoal::Started);
        desired.config = Some(object(json!({ "name": "X", "contextPath": "/x" })));
        let plan = DiffEngine::new().compute(&desired, None);

        let result = PlanExecutor::new(&api).execute(&plan, None).await;
        assert!(result.changed());
        assert_eq!(result.api_id.as_deref(), Some("new-id"));
        assert_eq!(result.state.as_deref(), Some("STARTED"));
    }

    #[tokio::test]
    async fn test_fail_fast_reports_completed_prefix() {
        let mut api = MockManagementApi::new();
        api.expect_update_api()
            .returning(|id, _| Ok(api_entity(json!({ "id": id }))));
        api.expect_deploy_api().returning(|_| Ok(()));
        api.expect_search_users().returning(|_| {
            Err(crate::error::RemoteError::status("GET", "/search/users", 500, "boom").into())
        });
        api.expect_set_lifecycle().never();

        let actual = ActualState::new(api_entity(json!({ "id": "a1", "name": "old" })));
        let plan = plan_of(
            vec![
                Action::UpdateApi { patch: object(json!({ "name": "new" })) },
                Action::TransferOwnership(OwnershipTransfer {
                    new_owner: String::from("foo"),
                    previous_owner_role: String::from("USER"),
                }),
                Action::SetLifecycleState(LifecycleAction::Start),
            ],
            Some("a1"),
        );
        let result = PlanExecutor::new(&api).execute(&plan, Some(&actual)).await;

        assert!(!result.changed());
        assert_eq!(result.completed(), vec![String::from("Update API (name)")]);
        let failure = result.failure.expect("failure");
        assert!(failure.to_string().starts_with("Reconciliation error: Action 2 of 3"));
    }

    #[tokio::test]
    async fn test_failed_create_reports_no_state() {
        let mut api = MockManagementApi::new();
        api.expect_create_api().times(1).returning(|_| {
            Err(crate::error::RemoteError::status("POST", "/apis", 400, "invalid definition").into())
        });
        api.expect_deploy_api().never();
        api.expect_set_lifecycle().never();

        let plan = plan_of(
            vec![
                Action::CreateApi { document: object(json!({ "name": "echo" })) },
                Action::SetLifecycleState(LifecycleAction::Start),
            ],
            None,
        );
        let result = PlanExecutor::new(&api).execute(&plan, None).await;

        assert!(!result.success());
        assert!(result.api_id.is_none());
        assert!(result.state.is_none());
        assert!(result.completed().is_empty());
    }

    #[tokio::test]
    async fn test_update_payload_strips_read_only_fields() {
        let mut api = MockManagementApi::new();
        api.expect_update_api()
            .withf(|_, document| {
                document.get("name") == Some(&json!("new"))
                    && document.get("version") == Some(&json!("1"))
                    && !document.contains_key("id")
                    && !document.contains_key("state")
                    && !document.contains_key("owner")
                    && !document.contains_key("updated_at")
            })
            .times(1)
            .returning(|id, _| Ok(api_entity(json!({ "id": id }))));
        api.expect_deploy_api().times(1).returning(|_| Ok(()));

        let actual = ActualState::new(api_entity(json!({
            "id": "a1",
            "state": "STOPPED",
            "owner": { "id": "u-1" },
            "name": "old",
            "version": "1",
            "updated_at": 1_700_000_000
        })));
        let plan = plan_of(vec![Action::UpdateApi { patch: object(json!({ "name": "new" })) }], Some("a1"));
        let result = PlanExecutor::new(&api).execute(&plan, Some(&actual)).await;

        assert!(result.changed());
        assert_eq!(result.writes, 2);
    }

    #[tokio::test]
    async fn test_unknown_group_fails_with_one_listing() {
        let mut api = MockManagementApi::new();
        api.expect_list_groups()
            .times(1)
            .returning(|| Ok(vec![Group { id: String::from("g1"), name: String::from("partners") }]));
        api.expect_create_page().never();

        let pages = vec![
            PageSpec { order: 1, document: object(json!({ "name": "a" })), excluded_groups: vec![String::from("partners")] },
            PageSpec { order: 2, document: object(json!({ "name": "b" })), excluded_groups: vec![String::from("ghosts")] },
        ];
        let actual = ActualState::new(api_entity(json!({ "id": "a1" })));
        let plan = plan_of(vec![Action::SyncPages(pages)], Some("a1"));
        let result = PlanExecutor::new(&api).execute(&plan, Some(&actual)).await;

        let failure = result.failure.expect("failure");
        assert!(failure.to_string().contains("Unknown group 'ghosts' referenced by page 2"));
    }

    #[tokio::test]
    async fn test_check_mode_issues_no_writes() {
        let mut api = MockManagementApi::new();
        api.expect_search_users().returning(|_| {
            Ok(vec![UserSearchResult {
                reference: String::from("ref-2"),
                id: Some(String::from("u-2")),
                display_name: None,
            }])
        });
        api.expect_update_api().never();
        api.expect_deploy_api().never();
        api.expect_transfer_ownership().never();
        api.expect_create_plan().never();
        api.expect_set_lifecycle().never();

        let actual = ActualState::new(api_entity(json!({ "id": "a1", "name": "old", "owner": { "id": "u-1" } })));
        let plan = plan_of(
            vec![
                Action::UpdateApi { patch: object(json!({ "name": "new" })) },
                Action::TransferOwnership(OwnershipTransfer {
                    new_owner: String::from("bar"),
                    previous_owner_role: String::from("USER"),
                }),
                Action::SyncPlans(vec![PlanSpec {
                    key: PlanKey::Name(String::from("gold")),
                    document: object(json!({ "name": "gold" })),
                }]),
                Action::SetLifecycleState(LifecycleAction::Start),
            ],
            Some("a1"),
        );
        let result = PlanExecutor::new(&api)
            .with_dry_run(true)
            .execute(&plan, Some(&actual))
            .await;

        assert!(result.changed());
        assert_eq!(result.writes, 2 + 1 + 2 + 1);
        assert_eq!(result.state.as_deref(), Some("STARTED"));
    }
}
