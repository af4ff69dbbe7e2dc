//! Diff engine for comparing desired vs actual state.
//!
//! This module computes the ordered [`ActionPlan`] for one API, and provides
//! the merge-patch comparison and the page and plan matching used when the
//! plan is executed.
//!
//! Comparison follows merge-patch semantics: only keys present in the
//! desired document count, nested objects are compared recursively, arrays
//! element by element with equal length, numbers by value, and a desired
//! `null` means the key must be absent.

use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::config::{ConfigHasher, DesiredSpec, PageSpec, PlanKey, PlanSpec, StateGoal, Visibility};
use crate::error::{ReconcileError, Result};
use crate::gateway::{ActualState, LifecycleAction, LifecycleState, PageEntity, PlanEntity};

use super::plan::{Action, ActionPlan};

/// Engine for computing action plans.
#[derive(Debug, Default)]
pub struct DiffEngine {
    /// Desired-state hasher.
    hasher: ConfigHasher,
}

/// A write needed to converge documentation pages.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOperation {
    /// Create a page.
    Create {
        /// 1-based position.
        order: u32,
        /// Page document.
        document: Map<String, Value>,
    },
    /// Replace an existing page.
    Update {
        /// Identifier of the page.
        page_id: String,
        /// 1-based position.
        order: u32,
        /// Page document.
        document: Map<String, Value>,
    },
    /// Delete a page that is no longer declared.
    Delete {
        /// Identifier of the page.
        page_id: String,
    },
}

/// A write needed to converge plans.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOperation {
    /// Create a plan.
    Create {
        /// Match key of the declared plan.
        key: PlanKey,
        /// Plan document.
        document: Map<String, Value>,
    },
    /// Replace an existing plan.
    Update {
        /// Match key of the declared plan.
        key: PlanKey,
        /// Identifier of the plan.
        plan_id: String,
        /// Plan document.
        document: Map<String, Value>,
    },
}

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            hasher: ConfigHasher::new(),
        }
    }

    /// Computes the action plan from desired and actual state.
    ///
    /// `actual` is `None` when the API does not exist yet.
    #[must_use]
    pub fn compute(&self, desired: &DesiredSpec, actual: Option<&ActualState>) -> ActionPlan {
        let api_id = actual
            .map(|a| a.api.id.clone())
            .or_else(|| desired.api_id.clone());
        let mut plan = ActionPlan::new(self.hasher.hash_desired(desired), api_id);

        if desired.state == StateGoal::Absent {
            debug!("Desired state is absent");
            plan.push(Action::DeleteApi, "state is absent");
            return plan;
        }

        match actual {
            None => {
                let document = desired.config.clone().unwrap_or_default();
                plan.push(Action::CreateApi { document }, "API does not exist");

                if let Some(visibility) = desired.effective_visibility()
                    && visibility != Visibility::default()
                {
                    debug!("New API needs visibility {visibility}");
                    let mut patch = Map::new();
                    patch.insert(String::from("visibility"), Value::String(visibility.to_string()));
                    plan.push(
                        Action::UpdateApi { patch },
                        format!("new APIs are {}", Visibility::default()),
                    );
                }
            }
            Some(actual) => {
                if let Some(patch) = desired.desired_document() {
                    let keys = diverging_keys(&patch, &actual.api.to_document());
                    if keys.is_empty() {
                        debug!("API document is up to date");
                    } else {
                        debug!("API document diverges on: {}", keys.join(", "));
                        plan.push(
                            Action::UpdateApi { patch },
                            format!("{} differ", keys.join(", ")),
                        );
                    }
                }
            }
        }

        if let Some(transfer) = &desired.transfer_ownership {
            plan.push(
                Action::TransferOwnership(transfer.clone()),
                "ownership transfer requested",
            );
        }

        if let Some(pages) = &desired.pages {
            plan.push(Action::SyncPages(pages.clone()), "pages declared");
        }

        if let Some(plans) = &desired.plans {
            plan.push(Action::SyncPlans(plans.clone()), "plans declared");
        }

        // A new API starts out stopped.
        let stopped = LifecycleState::Stopped;
        let lifecycle = actual.map_or(&stopped, ActualState::lifecycle);
        let target = match desired.state {
            StateGoal::Started if *lifecycle != LifecycleState::Started => {
                Some(LifecycleAction::Start)
            }
            StateGoal::Stopped if *lifecycle != LifecycleState::Stopped => {
                Some(LifecycleAction::Stop)
            }
            _ => None,
        };
        if let Some(target) = target {
            debug!("Lifecycle {lifecycle} needs {target}");
            plan.push(Action::SetLifecycleState(target), format!("API is {lifecycle}"));
        }

        plan
    }
}

/// Returns true if `actual` does not satisfy `desired`.
#[must_use]
pub fn value_diverges(desired: &Value, actual: Option<&Value>) -> bool {
    match (desired, actual) {
        (Value::Null, None | Some(Value::Null)) => false,
        (Value::Null, Some(_)) | (_, None) => true,
        (Value::Object(desired), Some(Value::Object(actual))) => document_diverges(desired, actual),
        (Value::Array(desired), Some(Value::Array(actual))) => {
            desired.len() != actual.len()
                || desired
                    .iter()
                    .zip(actual)
                    .any(|(d, a)| value_diverges(d, Some(a)))
        }
        (Value::Number(desired), Some(Value::Number(actual))) => !numbers_equal(desired, actual),
        (desired, Some(actual)) => desired != actual,
    }
}

/// Returns true if some key of `desired` is not satisfied by `actual`.
#[must_use]
pub fn document_diverges(desired: &Map<String, Value>, actual: &Map<String, Value>) -> bool {
    desired
        .iter()
        .any(|(key, value)| value_diverges(value, actual.get(key)))
}

/// Returns the top-level keys of `desired` that `actual` does not satisfy,
/// sorted.
#[must_use]
pub fn diverging_keys(desired: &Map<String, Value>, actual: &Map<String, Value>) -> Vec<String> {
    let mut keys: Vec<String> = desired
        .iter()
        .filter(|(key, value)| value_diverges(value, actual.get(*key)))
        .map(|(key, _)| key.clone())
        .collect();
    keys.sort_unstable();
    keys
}

/// Merges `patch` into `target`: objects recursively, `null` removes,
/// everything else replaces.
pub fn apply_patch(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        match value {
            Value::Null => {
                target.remove(key);
            }
            Value::Object(nested) => {
                if let Some(Value::Object(existing)) = target.get_mut(key) {
                    apply_patch(existing, nested);
                } else {
                    let mut created = Map::new();
                    apply_patch(&mut created, nested);
                    target.insert(key.clone(), Value::Object(created));
                }
            }
            other => {
                target.insert(key.clone(), other.clone());
            }
        }
    }
}

#[allow(clippy::float_cmp)]
fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
        return a == b;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Builds the document sent for a declared page, with group names already
/// resolved to identifiers.
#[must_use]
pub fn page_document(page: &PageSpec, excluded_group_ids: &[String]) -> Map<String, Value> {
    let mut document = page.document.clone();
    document.insert(String::from("order"), Value::from(page.order));
    document.insert(
        String::from("excluded_groups"),
        Value::Array(
            excluded_group_ids
                .iter()
                .cloned()
                .map(Value::String)
                .collect(),
        ),
    );
    document
}

/// Computes the page writes needed to converge.
///
/// Declared pages are matched by position against actual pages sorted by
/// order. An empty result means the pages are converged.
#[must_use]
pub fn page_operations(desired: &[Map<String, Value>], actual: &[PageEntity]) -> Vec<PageOperation> {
    let mut actual: Vec<&PageEntity> = actual.iter().collect();
    actual.sort_by_key(|page| page.order);

    let mut operations = Vec::new();

    for (index, document) in desired.iter().enumerate() {
        let order = u32::try_from(index + 1).unwrap_or(u32::MAX);
        match actual.get(index) {
            Some(existing) if document_diverges(document, &existing.to_document()) => {
                debug!("Page {order} ({}) diverges", existing.id);
                operations.push(PageOperation::Update {
                    page_id: existing.id.clone(),
                    order,
                    document: document.clone(),
                });
            }
            Some(_) => {}
            None => operations.push(PageOperation::Create {
                order,
                document: document.clone(),
            }),
        }
    }

    for extra in actual.iter().skip(desired.len()) {
        debug!("Page {} ({}) is no longer declared", extra.order, extra.id);
        operations.push(PageOperation::Delete {
            page_id: extra.id.clone(),
        });
    }

    operations
}

/// Computes the plan writes needed to converge.
///
/// Declared plans are matched by their key. Existing plans that match no
/// declared plan are left untouched.
///
/// # Errors
///
/// Returns [`ReconcileError::UnknownPlan`] if a plan is declared by an
/// identifier that matches no existing plan.
pub fn plan_operations(desired: &[PlanSpec], actual: &[PlanEntity]) -> Result<Vec<PlanOperation>> {
    let mut operations = Vec::new();

    for plan in desired {
        match actual.iter().find(|existing| plan_matches(&plan.key, existing)) {
            Some(existing) => {
                if document_diverges(&plan.document, &existing.to_document()) {
                    debug!("Plan {} ({}) diverges", plan.key, existing.id);
                    let mut document = existing.document.clone();
                    apply_patch(&mut document, &plan.document);
                    operations.push(PlanOperation::Update {
                        key: plan.key.clone(),
                        plan_id: existing.id.clone(),
                        document,
                    });
                }
            }
            None => {
                if let PlanKey::Id(id) = &plan.key {
                    return Err(ReconcileError::UnknownPlan { id: id.clone() }.into());
                }
                operations.push(PlanOperation::Create {
                    key: plan.key.clone(),
                    document: plan.document.clone(),
                });
            }
        }
    }

    Ok(operations)
}

fn plan_matches(key: &PlanKey, plan: &PlanEntity) -> bool {
    match key {
        PlanKey::Id(id) => plan.id == *id,
        PlanKey::Key(value) | PlanKey::Name(value) => {
            plan.document.get(key.field()).and_then(Value::as_str) == Some(value.as_str())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OwnershipTransfer;
    use crate::error::GatewayError;
    use crate::gateway::ApiEntity;
    use crate::planner::ActionType;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object")
    }

    fn actual(value: Value) -> ActualState {
        let api: ApiEntity = serde_json::from_value(value).expect("api");
        ActualState::new(api)
    }

    fn existing(id: &str, goal: StateGoal) -> DesiredSpec {
        DesiredSpec::new(Some(id.to_string()), goal)
    }

    fn page_entity(value: Value) -> PageEntity {
        serde_json::from_value(value).expect("page")
    }

    fn plan_entity(value: Value) -> PlanEntity {
        serde_json::from_value(value).expect("plan")
    }

    #[test]
    fn test_merge_patch_ignores_keys_absent_from_desired() {
        let actual = object(json!({ "name": "X", "version": "1", "proxy": { "a": 1, "b": 2 } }));
        assert!(!document_diverges(&object(json!({ "name": "X" })), &actual));
        assert!(!document_diverges(&object(json!({ "proxy": { "a": 1 } })), &actual));
        assert!(document_diverges(&object(json!({ "proxy": { "a": 2 } })), &actual));
    }

    #[test]
    fn test_merge_patch_null_means_absent() {
        let actual = object(json!({ "name": "X", "description": "old" }));
        assert!(document_diverges(&object(json!({ "description": null })), &actual));
        assert!(!document_diverges(&object(json!({ "tags": null })), &actual));
    }

    #[test]
    fn test_merge_patch_arrays_and_numbers() {
        let actual = object(json!({ "tags": ["a", "b"], "timeout": 1.0, "items": [{ "x": 1, "y": 2 }] }));
        assert!(document_diverges(&object(json!({ "tags": ["a"] })), &actual));
        assert!(!document_diverges(&object(json!({ "tags": ["a", "b"] })), &actual));
        assert!(!document_diverges(&object(json!({ "timeout": 1 })), &actual));
        assert!(!document_diverges(&object(json!({ "items": [{ "x": 1 }] })), &actual));
    }

    #[test]
    fn test_apply_patch() {
        let mut target = object(json!({ "name": "X", "description": "d", "proxy": { "a": 1, "b": 2 } }));
        apply_patch(&mut target, &object(json!({ "description": null, "proxy": { "b": 3 }, "new": true })));

        assert_eq!(
            Value::Object(target),
            json!({ "name": "X", "proxy": { "a": 1, "b": 3 }, "new": true })
        );
    }

    #[test]
    fn test_absent_yields_only_delete() {
        let engine = DiffEngine::new();
        let mut desired = existing("a1", StateGoal::Absent);
        desired.config = Some(object(json!({ "name": "X" })));
        desired.pages = Some(vec![]);

        let plan = engine.compute(&desired, Some(&actual(json!({ "id": "a1" }))));
        assert_eq!(plan.action_types(), vec![ActionType::DeleteApi]);
    }

    #[test]
    fn test_create_path_ordering() {
        let engine = DiffEngine::new();
        let mut desired = DesiredSpec::new(None, StateGoal::Started);
        desired.config = Some(object(json!({ "name": "X", "contextPath": "/x" })));
        desired.visibility = Some(Visibility::Public);
        desired.transfer_ownership = Some(OwnershipTransfer {
            new_owner: String::from("foo"),
            previous_owner_role: String::from("USER"),
        });
        desired.pages = Some(vec![]);
        desired.plans = Some(vec![]);

        let plan = engine.compute(&desired, None);
        assert_eq!(
            plan.action_types(),
            vec![
                ActionType::CreateApi,
                ActionType::UpdateApi,
                ActionType::TransferOwnership,
                ActionType::SyncPages,
                ActionType::SyncPlans,
                ActionType::SetLifecycleState,
            ]
        );
        let mut sorted = plan.action_types();
        sorted.sort();
        assert_eq!(sorted, plan.action_types());
    }

    #[test]
    fn test_create_private_needs_no_update() {
        let engine = DiffEngine::new();
        let mut desired = DesiredSpec::new(None, StateGoal::Stopped);
        desired.config = Some(object(json!({ "name": "X" })));

        let plan = engine.compute(&desired, None);
        assert_eq!(plan.action_types(), vec![ActionType::CreateApi]);
    }

    #[test]
    fn test_converged_api_has_no_update() {
        let engine = DiffEngine::new();
        let mut desired = existing("a1", StateGoal::Present);
        desired.config = Some(object(json!({ "name": "X" })));

        let current = actual(json!({ "id": "a1", "name": "X", "version": "1", "visibility": "PRIVATE", "state": "STARTED" }));
        assert!(engine.compute(&desired, Some(&current)).is_empty());
    }

    #[test]
    fn test_visibility_only_update() {
        let engine = DiffEngine::new();
        let mut desired = existing("a1", StateGoal::Present);
        desired.visibility = Some(Visibility::Public);

        let current = actual(json!({ "id": "a1", "name": "X", "visibility": "PRIVATE" }));
        let plan = engine.compute(&desired, Some(&current));

        assert_eq!(plan.action_types(), vec![ActionType::UpdateApi]);
        assert_eq!(
            plan.actions[0].action,
            Action::UpdateApi { patch: object(json!({ "visibility": "PUBLIC" })) }
        );
    }

    #[test]
    fn test_lifecycle_only_when_differs() {
        let engine = DiffEngine::new();
        let started = actual(json!({ "id": "a1", "state": "STARTED" }));

        let plan = engine.compute(&existing("a1", StateGoal::Started), Some(&started));
        assert!(plan.is_empty());

        let plan = engine.compute(&existing("a1", StateGoal::Stopped), Some(&started));
        assert_eq!(
            plan.actions[0].action,
            Action::SetLifecycleState(LifecycleAction::Stop)
        );

        let plan = engine.compute(&existing("a1", StateGoal::Present), Some(&started));
        assert!(plan.is_empty());
    }

    #[test]
    fn test_page_operations_positional() {
        let desired = vec![
            object(json!({ "name": "readme", "order": 1, "excluded_groups": [] })),
            object(json!({ "name": "swagger", "order": 2, "excluded_groups": ["g1"] })),
            object(json!({ "name": "faq", "order": 3, "excluded_groups": [] })),
        ];
        let actual = vec![
            page_entity(json!({ "id": "p2", "order": 2, "name": "swagger", "excluded_groups": [] })),
            page_entity(json!({ "id": "p1", "order": 1, "name": "readme", "type": "MARKDOWN" })),
        ];

        let operations = page_operations(&desired, &actual);
        assert_eq!(operations.len(), 2);
        assert!(matches!(&operations[0], PageOperation::Update { page_id, order: 2, .. } if page_id == "p2"));
        assert!(matches!(&operations[1], PageOperation::Create { order: 3, .. }));
    }

    #[test]
    fn test_page_operations_delete_extra_and_converged() {
        let desired = vec![object(json!({ "name": "readme", "order": 1, "excluded_groups": [] }))];
        let actual = vec![
            page_entity(json!({ "id": "p1", "order": 1, "name": "readme" })),
            page_entity(json!({ "id": "p9", "order": 2, "name": "old" })),
        ];

        assert_eq!(
            page_operations(&desired, &actual),
            vec![PageOperation::Delete { page_id: String::from("p9") }]
        );
        assert!(page_operations(&desired, &actual[..1]).is_empty());
    }

    #[test]
    fn test_page_document_resolves_order_and_groups() {
        let page = PageSpec {
            order: 2,
            document: object(json!({ "name": "swagger" })),
            excluded_groups: vec![String::from("partners")],
        };
        let document = page_document(&page, &[String::from("g1")]);
        assert_eq!(
            Value::Object(document),
            json!({ "name": "swagger", "order": 2, "excluded_groups": ["g1"] })
        );
    }

    #[test]
    fn test_plan_operations_match_by_key() {
        let desired = vec![
            PlanSpec {
                key: PlanKey::Name(String::from("gold")),
                document: object(json!({ "name": "gold", "security": "API_KEY" })),
            },
            PlanSpec {
                key: PlanKey::Key(String::from("free")),
                document: object(json!({ "key": "free", "name": "Free", "security": "KEY_LESS" })),
            },
        ];
        let actual = vec![
            plan_entity(json!({ "id": "pl1", "name": "gold", "security": "OAUTH2", "status": "PUBLISHED" })),
            plan_entity(json!({ "id": "pl2", "name": "legacy", "status": "PUBLISHED" })),
        ];

        let operations = plan_operations(&desired, &actual).expect("operations");
        assert_eq!(operations.len(), 2);
        match &operations[0] {
            PlanOperation::Update { plan_id, document, .. } => {
                assert_eq!(plan_id, "pl1");
                assert_eq!(document.get("security"), Some(&json!("API_KEY")));
            }
            other => panic!("unexpected operation: {other:?}"),
        }
        assert!(matches!(&operations[1], PlanOperation::Create { key: PlanKey::Key(k), .. } if k == "free"));
        assert!(!operations.iter().any(|op| matches!(op, PlanOperation::Update { plan_id, .. } if plan_id == "pl2")));
    }

    #[test]
    fn test_plan_operations_unknown_id() {
        let desired = vec![PlanSpec {
            key: PlanKey::Id(String::from("nope")),
            document: object(json!({ "name": "gold" })),
        }];

        let err = plan_operations(&desired, &[]).unwrap_err();
        assert!(matches!(err, GatewayError::Reconcile(ReconcileError::UnknownPlan { .. })));
    }
}
