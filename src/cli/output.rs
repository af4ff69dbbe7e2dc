//! Output formatting for CLI commands.
//!
//! This module renders plans, outcomes and validation results either as
//! colored text for a terminal or as JSON for scripting.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{ConfigHasher, ValidationResult};
use crate::planner::{ActionPlan, ActionType};
use crate::reconciler::Outcome;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Plan action row for table display.
#[derive(Tabled)]
struct PlanActionRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats an action plan for display.
    #[must_use]
    pub fn format_plan(&self, plan: &ActionPlan) -> String {
        match self.format {
            OutputFormat::Json => to_json(&PlanJson::from(plan)),
            OutputFormat::Text => Self::format_plan_text(plan),
        }
    }

    /// Formats a plan as text.
    fn format_plan_text(plan: &ActionPlan) -> String {
        if plan.is_empty() {
            return format!("{} No changes required, the API is up to date.\n", "✓".green());
        }

        let mut output = String::new();
        let _ = writeln!(output, "\nAction Plan");
        if let Some(api_id) = &plan.api_id {
            let _ = writeln!(output, "   API: {api_id}");
        }
        let _ = write!(
            output,
            "   Desired hash: {}\n\n",
            ConfigHasher::new().short_hash(&plan.desired_hash)
        );

        let rows: Vec<PlanActionRow> = plan
            .actions
            .iter()
            .enumerate()
            .map(|(i, a)| PlanActionRow {
                index: i + 1,
                action: Self::format_action_type(a.action.action_type()),
                description: a.description(),
                reason: Self::truncate(&a.reason, 50),
            })
            .collect();

        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let _ = write!(output, "\nPlan: {} action(s)\n", plan.action_count().to_string().yellow());
        output
    }

    /// Formats the outcome of a run.
    #[must_use]
    pub fn format_outcome(&self, outcome: &Outcome) -> String {
        match self.format {
            OutputFormat::Json => to_json(outcome),
            OutputFormat::Text => {
                let status = if outcome.failed {
                    format!("{} Reconciliation failed", "✗".red())
                } else if outcome.changed {
                    format!("{} Reconciliation applied changes", "✓".green())
                } else {
                    format!("{} Nothing to change", "✓".green())
                };

                let mut output = format!("{status}\n\n");
                if let Some(api_id) = &outcome.api_id {
                    let _ = writeln!(output, "   API: {api_id}");
                }
                if let Some(state) = &outcome.state {
                    let _ = writeln!(output, "   State: {state}");
                }
                if outcome.token.is_some() {
                    let _ = writeln!(output, "   Token: {}", "exchanged (use --output json to read it)".dimmed());
                }
                if let Some(message) = &outcome.message {
                    let _ = writeln!(output, "   {message}");
                }

                if !outcome.actions.is_empty() {
                    output.push_str("\n   Completed:\n");
                    for action in &outcome.actions {
                        let _ = writeln!(output, "     - {action}");
                    }
                }

                if !outcome.requests.is_empty() {
                    output.push_str("\n   Requests:\n");
                    for request in &outcome.requests {
                        let status = request
                            .status
                            .map_or_else(|| String::from("no response"), |s| s.to_string());
                        let _ = writeln!(output, "     {} {} -> {status}", request.method, request.path);
                    }
                }

                output
            }
        }
    }

    /// Formats the result of a parameter validation.
    #[must_use]
    pub fn format_validation(&self, result: &ValidationResult, show_warnings: bool) -> String {
        match self.format {
            OutputFormat::Json => to_json(&ValidationJson {
                valid: result.is_valid(),
                errors: result
                    .errors
                    .iter()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .collect(),
                warnings: result.warnings.clone(),
            }),
            OutputFormat::Text => {
                let mut output = if result.is_valid() {
                    format!("{} Parameters are valid\n", "✓".green())
                } else {
                    let mut output = format!("{} Invalid parameters:\n", "✗".red());
                    for error in &result.errors {
                        let _ = writeln!(output, "   - {}: {}", error.field.bold(), error.message);
                    }
                    output
                };

                if show_warnings && !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }

                output
            }
        }
    }

    /// Formats an action type with color.
    fn format_action_type(action_type: ActionType) -> String {
        let label = action_type.to_string();
        match action_type {
            ActionType::CreateApi => format!("+{label}").green().to_string(),
            ActionType::DeleteApi => format!("-{label}").red().to_string(),
            ActionType::UpdateApi
            | ActionType::TransferOwnership
            | ActionType::SyncPages
            | ActionType::SyncPlans
            | ActionType::SetLifecycleState => format!("~{label}").yellow().to_string(),
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

// JSON serialization helpers

#[derive(Serialize)]
struct PlanJson {
    api_id: Option<String>,
    desired_hash: String,
    created_at: String,
    action_count: usize,
    actions: Vec<ActionJson>,
}

#[derive(Serialize)]
struct ActionJson {
    action_type: String,
    description: String,
    reason: String,
}

#[derive(Serialize)]
struct ValidationJson {
    valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl From<&ActionPlan> for PlanJson {
    fn from(plan: &ActionPlan) -> Self {
        Self {
            api_id: plan.api_id.clone(),
            desired_hash: plan.desired_hash.clone(),
            created_at: plan.created_at.to_rfc3339(),
            action_count: plan.action_count(),
            actions: plan
                .actions
                .iter()
                .map(|a| ActionJson {
                    action_type: a.action.action_type().to_string(),
                    description: a.description(),
                    reason: a.reason.clone(),
                })
                .collect(),
        }
    }
}
