//! Planning module for reconciliation.
//!
//! This module handles the comparison between desired and actual state,
//! generating ordered action plans and applying them.

mod diff;
mod executor;
mod plan;

pub use diff::{
    apply_patch, diverging_keys, document_diverges, page_document, page_operations,
    plan_operations, value_diverges, DiffEngine, PageOperation, PlanOperation,
};
pub use executor::{ActionResult, ExecutionResult, PlanExecutor};
pub use plan::{Action, ActionPlan, ActionType, PlannedAction};
