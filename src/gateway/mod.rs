//! Management API integration module.
//!
//! This module provides all functionality for talking to the gateway
//! management API: the [`ManagementApi`] operations, their HTTP client,
//! authentication and observation of the actual state.

mod api;
mod auth;
mod client;
mod observer;
mod types;

#[cfg(test)]
pub use api::MockManagementApi;
pub use api::{resolve_group_id, ManagementApi};
pub use auth::{Authenticated, Authenticator, Authorization};
pub use client::GatewayClient;
pub use observer::{ActualState, ApiObserver};
pub use types::{
    ApiEntity, Group, LifecycleAction, LifecycleState, OwnershipRequest, PageEntity, PlanEntity,
    PlanStatus, RequestRecord, TokenResponse, UserSearchResult,
};
