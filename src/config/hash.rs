//! Document fingerprints.
//!
//! This module provides deterministic fingerprints of the desired state,
//! shown in plans and logs. They are for display only: pages are matched
//! against the server by position, never by hash.

use serde_json::Value;
use sha2::{Digest, Sha256};

use super::spec::{DesiredSpec, PageSpec, PlanSpec};

/// Hasher for computing document fingerprints.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigHasher;

impl ConfigHasher {
    /// Creates a new hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes a hash of the whole desired spec.
    ///
    /// This hash changes when any declared part of the desired state
    /// changes, and is independent of key order inside documents.
    #[must_use]
    pub fn hash_desired(&self, desired: &DesiredSpec) -> String {
        let mut hasher = Sha256::new();

        if let Some(api_id) = &desired.api_id {
            hasher.update(api_id.as_bytes());
        }
        hasher.update(desired.state.to_string().as_bytes());

        if let Some(document) = desired.desired_document() {
            hasher.update(canonical(&Value::Object(document)).as_bytes());
        }

        if let Some(transfer) = &desired.transfer_ownership {
            hasher.update(transfer.new_owner.as_bytes());
            hasher.update(transfer.previous_owner_role.as_bytes());
        }

        for page in desired.pages.iter().flatten() {
            hasher.update(self.hash_page(page).as_bytes());
        }

        for plan in desired.plans.iter().flatten() {
            hasher.update(self.hash_plan(plan).as_bytes());
        }

        hex::encode(hasher.finalize())
    }

    /// Computes a fingerprint of a page's position and content.
    #[must_use]
    pub fn hash_page(&self, page: &PageSpec) -> String {
        let mut hasher = Sha256::new();

        hasher.update(page.order.to_be_bytes());
        hasher.update(canonical(&Value::Object(page.document.clone())).as_bytes());

        // Group names (sorted for determinism)
        let mut groups: Vec<_> = page.excluded_groups.iter().collect();
        groups.sort_unstable();
        for group in groups {
            hasher.update(group.as_bytes());
        }

        hex::encode(hasher.finalize())
    }

    /// Computes a hash for a plan document.
    #[must_use]
    pub fn hash_plan(&self, plan: &PlanSpec) -> String {
        let mut hasher = Sha256::new();
        hasher.update(plan.key.to_string().as_bytes());
        hasher.update(canonical(&Value::Object(plan.document.clone())).as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }
}

/// Renders a JSON value with object keys sorted at every level.
fn canonical(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().collect();
            keys.sort_unstable();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", Value::String(k.clone()), canonical(&map[k])))
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(canonical).collect();
            format!("[{}]", items.join(","))
        }
        other => other.to_string(),
    }
}
