//! Action plan types.
//!
//! This module defines the ordered list of actions that brings an API from
//! its actual state to the desired state.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::config::{OwnershipTransfer, PageSpec, PlanSpec};
use crate::gateway::LifecycleAction;

/// An ordered action plan for one API.
#[derive(Debug, Clone)]
pub struct ActionPlan {
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// Fingerprint of the desired state this plan is based on.
    pub desired_hash: String,
    /// Identifier of the API, when it already exists.
    pub api_id: Option<String>,
    /// Planned actions in execution order.
    pub actions: Vec<PlannedAction>,
}

/// A single planned action.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedAction {
    /// What to do.
    pub action: Action,
    /// Why it is needed.
    pub reason: String,
}

/// An action against the management API.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Create the API from its configuration.
    CreateApi {
        /// API document to create.
        document: Map<String, Value>,
    },
    /// Merge a patch into the API document and deploy.
    UpdateApi {
        /// Desired fields of the API document.
        patch: Map<String, Value>,
    },
    /// Hand primary ownership to another user.
    TransferOwnership(OwnershipTransfer),
    /// Converge documentation pages to the declared list.
    SyncPages(Vec<PageSpec>),
    /// Converge the declared plans.
    SyncPlans(Vec<PlanSpec>),
    /// Start or stop the API.
    SetLifecycleState(LifecycleAction),
    /// Remove the API.
    DeleteApi,
}

/// Kinds of actions, in the order they are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    /// See [`Action::CreateApi`].
    CreateApi,
    /// See [`Action::UpdateApi`].
    UpdateApi,
    /// See [`Action::TransferOwnership`].
    TransferOwnership,
    /// See [`Action::SyncPages`].
    SyncPages,
    /// See [`Action::SyncPlans`].
    SyncPlans,
    /// See [`Action::SetLifecycleState`].
    SetLifecycleState,
    /// See [`Action::DeleteApi`].
    DeleteApi,
}

impl ActionPlan {
    /// Creates an empty plan.
    #[must_use]
    pub fn new(desired_hash: impl Into<String>, api_id: Option<String>) -> Self {
        Self {
            created_at: Utc::now(),
            desired_hash: desired_hash.into(),
            api_id,
            actions: Vec::new(),
        }
    }

    /// Appends an action.
    pub fn push(&mut self, action: Action, reason: impl Into<String>) {
        self.actions.push(PlannedAction {
            action,
            reason: reason.into(),
        });
    }

    /// Returns true if the plan is empty (no changes).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Returns the number of actions.
    #[must_use]
    pub const fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Returns the kinds of the planned actions, in order.
    #[must_use]
    pub fn action_types(&self) -> Vec<ActionType> {
        self.actions.iter().map(|a| a.action.action_type()).collect()
    }
}

impl Action {
    /// Returns the kind of this action.
    #[must_use]
    pub const fn action_type(&self) -> ActionType {
        match self {
            Self::CreateApi { .. } => ActionType::CreateApi,
            Self::UpdateApi { .. } => ActionType::UpdateApi,
            Self::TransferOwnership(_) => ActionType::TransferOwnership,
            Self::SyncPages(_) => ActionType::SyncPages,
            Self::SyncPlans(_) => ActionType::SyncPlans,
            Self::SetLifecycleState(_) => ActionType::SetLifecycleState,
            Self::DeleteApi => ActionType::DeleteApi,
        }
    }

    /// Returns a human-readable description of the action.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::CreateApi { document } => match document.get("name").and_then(Value::as_str) {
                Some(name) => format!("Create API '{name}'"),
                None => String::from("Create API"),
            },
            Self::UpdateApi { patch } => {
                let mut keys: Vec<_> = patch.keys().map(String::as_str).collect();
                keys.sort_unstable();
                format!("Update API ({})", keys.join(", "))
            }
            Self::TransferOwnership(transfer) => {
                format!("Transfer ownership to '{}'", transfer.new_owner)
            }
            Self::SyncPages(pages) => format!("Sync {} page(s)", pages.len()),
            Self::SyncPlans(plans) => format!("Sync {} plan(s)", plans.len()),
            Self::SetLifecycleState(LifecycleAction::Start) => String::from("Start API"),
            Self::SetLifecycleState(LifecycleAction::Stop) => String::from("Stop API"),
            Self::DeleteApi => String::from("Delete API"),
        }
    }
}

impl PlannedAction {
    /// Returns a human-readable description of the action.
    #[must_use]
    pub fn description(&self) -> String {
        self.action.description()
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CreateApi => "create_api",
            Self::UpdateApi => "update_api",
            Self::TransferOwnership => "transfer_ownership",
            Self::SyncPages => "sync_pages",
            Self::SyncPlans => "sync_plans",
            Self::SetLifecycleState => "set_lifecycle_state",
            Self::DeleteApi => "delete_api",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())?;
        if !self.reason.is_empty() {
            write!(f, " ({})", self.reason)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for ActionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.actions.is_empty() {
            return write!(f, "No changes required");
        }

        writeln!(f, "Action Plan ({} actions):", self.actions.len())?;
        for (i, action) in self.actions.iter().enumerate() {
            writeln!(f, "  {}. {action}", i + 1)?;
        }

        Ok(())
    }
}
