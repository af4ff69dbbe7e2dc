//! API observer.
//!
//! This module snapshots the actual state of one API: the entity itself and,
//! when the desired state declares them, its pages and plans. The snapshot
//! is taken once per run.

use tracing::{debug, info};

use crate::config::DesiredSpec;
use crate::error::Result;

use super::api::ManagementApi;
use super::types::{ApiEntity, LifecycleState, PageEntity, PlanEntity};

/// Snapshot of an existing API.
#[derive(Debug, Clone, PartialEq)]
pub struct ActualState {
    /// The API entity.
    pub api: ApiEntity,
    /// Pages, sorted by order. Empty when pages were not observed.
    pub pages: Vec<PageEntity>,
    /// Plans. Empty when plans were not observed.
    pub plans: Vec<PlanEntity>,
}

impl ActualState {
    /// Creates a snapshot of an API without pages or plans.
    #[must_use]
    pub const fn new(api: ApiEntity) -> Self {
        Self {
            api,
            pages: Vec::new(),
            plans: Vec::new(),
        }
    }

    /// Returns the API identifier.
    #[must_use]
    pub fn api_id(&self) -> &str {
        &self.api.id
    }

    /// Returns the lifecycle state of the API.
    #[must_use]
    pub const fn lifecycle(&self) -> &LifecycleState {
        &self.api.state
    }
}

/// Reads the actual state of an API.
#[derive(Debug)]
pub struct ApiObserver<'a, A: ?Sized> {
    api: &'a A,
}

impl<'a, A> ApiObserver<'a, A>
where
    A: ManagementApi + ?Sized,
{
    /// Creates a new observer.
    #[must_use]
    pub const fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Observes the API named by `api_id`.
    ///
    /// Pages and plans are only listed when `desired` declares them.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`](crate::error::GatewayError::NotFound)
    /// if the API does not exist, or any remote error.
    pub async fn observe(&self, api_id: &str, desired: &DesiredSpec) -> Result<ActualState> {
        info!("Observing API {api_id}");

        let mut state = ActualState::new(self.api.get_api(api_id).await?);

        if desired.pages.is_some() {
            let mut pages = self.api.list_pages(api_id).await?;
            pages.sort_by_key(|page| page.order);
            debug!("Observed {} pages", pages.len());
            state.pages = pages;
        }

        if desired.plans.is_some() {
            state.plans = self.api.list_plans(api_id).await?;
            debug!("Observed {} plans", state.plans.len());
        }

        debug!("API {api_id} is {}", state.lifecycle());
        Ok(state)
    }
}
