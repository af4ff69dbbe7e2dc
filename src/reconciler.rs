//! Reconciler for converging one API to its desired state.
//!
//! A run authenticates, observes the API once, computes the action plan and
//! executes it, then reports an [`Outcome`]. Running it again against the
//! converged API issues no writes and reports `changed: false`.

use serde::Serialize;
use tracing::{debug, error, info, Instrument};
use uuid::Uuid;

use crate::config::{DesiredSpec, Invocation, StateGoal};
use crate::error::{ErrorKind, GatewayError, Result};
use crate::gateway::{ActualState, ApiObserver, Authenticator, ManagementApi, RequestRecord};
use crate::planner::{ActionPlan, DiffEngine, ExecutionResult, PlanExecutor};

/// Reconciler for one invocation at a time.
#[derive(Debug)]
pub struct Reconciler<A> {
    /// Management API.
    api: A,
    /// Diff engine.
    diff_engine: DiffEngine,
    /// Whether writes are skipped.
    check_mode: bool,
}

/// Result reported to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// Whether any remote write was issued (or would have been, in check mode).
    pub changed: bool,
    /// Identifier of the API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_id: Option<String>,
    /// Gateway token obtained by exchange.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Whether the run failed.
    pub failed: bool,
    /// Human-readable summary or failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Kind of the failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Lifecycle state at the end of the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Descriptions of the completed actions.
    pub actions: Vec<String>,
    /// Requests sent to the management API during the run, in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub requests: Vec<RequestRecord>,
}

/// A finished run: the plan that was computed (if any) and the outcome.
#[derive(Debug)]
pub struct Reconciliation {
    /// The computed plan. `None` if the run stopped before planning.
    pub plan: Option<ActionPlan>,
    /// The outcome.
    pub outcome: Outcome,
}

impl<A: ManagementApi> Reconciler<A> {
    /// Creates a new reconciler.
    #[must_use]
    pub const fn new(api: A) -> Self {
        Self {
            api,
            diff_engine: DiffEngine::new(),
            check_mode: false,
        }
    }

    /// Sets check mode: reads only, no writes.
    #[must_use]
    pub const fn with_check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    /// Returns the management API.
    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Performs one reconciliation run.
    ///
    /// Failures never escape as errors: they are reported in the outcome.
    pub async fn reconcile(&mut self, invocation: &Invocation) -> Reconciliation {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("reconcile", run = %run_id);
        let mut reconciliation = self.run(invocation).instrument(span).await;
        reconciliation.outcome.requests = self.api.drain_requests();
        reconciliation
    }

    async fn run(&mut self, invocation: &Invocation) -> Reconciliation {
        info!(
            "Starting reconciliation against {} ({} auth)",
            invocation.connection.url,
            invocation.credentials.strategy()
        );

        let authenticated = match Authenticator::new(&invocation.credentials)
            .authenticate(&self.api)
            .await
        {
            Ok(authenticated) => authenticated,
            Err(e) => return Reconciliation::failed(None, &e, None),
        };
        self.api.set_authorization(authenticated.authorization);
        let token = authenticated.exchanged_token;

        let Some(desired) = &invocation.desired else {
            info!("Token exchange only, nothing to reconcile");
            return Reconciliation {
                plan: None,
                outcome: Outcome {
                    token,
                    message: Some(String::from("Token exchanged")),
                    ..Outcome::default()
                },
            };
        };

        let actual = match self.observe(desired).await {
            Ok(actual) => actual,
            Err(e) if e.is_not_found() && desired.state == StateGoal::Absent => {
                info!("API is already absent");
                return Reconciliation {
                    plan: None,
                    outcome: Outcome {
                        api_id: desired.api_id.clone(),
                        token,
                        message: Some(String::from("API already absent")),
                        state: Some(String::from("absent")),
                        ..Outcome::default()
                    },
                };
            }
            Err(e) => return Reconciliation::failed(desired.api_id.clone(), &e, token),
        };

        let plan = self.diff_engine.compute(desired, actual.as_ref());
        debug!("{plan}");

        let result = PlanExecutor::new(&self.api)
            .with_dry_run(self.check_mode)
            .execute(&plan, actual.as_ref())
            .await;
        info!("{result}");

        let outcome = Outcome::from_execution(&plan, result, token);
        Reconciliation {
            plan: Some(plan),
            outcome,
        }
    }

    /// Observes the API, if the desired state names one.
    async fn observe(&self, desired: &DesiredSpec) -> Result<Option<ActualState>> {
        match &desired.api_id {
            Some(api_id) => ApiObserver::new(&self.api)
                .observe(api_id, desired)
                .await
                .map(Some),
            None => Ok(None),
        }
    }
}

impl Reconciliation {
    fn failed(api_id: Option<String>, error: &GatewayError, token: Option<String>) -> Self {
        error!("Reconciliation failed: {error}");
        Self {
            plan: None,
            outcome: Outcome {
                api_id,
                token,
                ..Outcome::from_error(error)
            },
        }
    }
}

impl Outcome {
    /// Builds the outcome of a run that failed before any action ran.
    #[must_use]
    pub fn from_error(error: &GatewayError) -> Self {
        Self {
            failed: true,
            message: Some(error.to_string()),
            error_kind: Some(error.kind()),
            ..Self::default()
        }
    }

    /// Builds the outcome of an executed plan.
    #[must_use]
    pub fn from_execution(plan: &ActionPlan, result: ExecutionResult, token: Option<String>) -> Self {
        let changed = result.changed();
        let actions = result.completed();

        let (failed, message, error_kind) = match &result.failure {
            Some(failure) => {
                let completed = if actions.is_empty() {
                    String::from("none")
                } else {
                    actions.join(", ")
                };
                (
                    true,
                    format!("{failure}; completed actions: {completed}"),
                    Some(failure.kind()),
                )
            }
            None if plan.is_empty() => (false, String::from("API already converged"), None),
            None => (
                false,
                format!(
                    "{} action(s), {} write(s){}",
                    plan.action_count(),
                    result.writes,
                    if result.dry_run { " (check mode)" } else { "" }
                ),
                None,
            ),
        };

        Self {
            changed,
            api_id: result.api_id,
            token,
            failed,
            message: Some(message),
            error_kind,
            state: result.state,
            actions,
            requests: Vec::new(),
        }
    }
}
