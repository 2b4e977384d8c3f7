//! Resource status lifecycle
//!
//! The status stored for every resource, and the transition policy that
//! turns a merged status into the action the orchestrator runs for the
//! node. The policy is pure; only the orchestrator mutates statuses, and
//! only after an action has returned.

use serde::{Deserialize, Serialize};

use crate::resource::Resource;

/// Persisted per-resource status.
///
/// Unknown strings read from an old or damaged state file deserialize as
/// `Failed`, so the next apply recreates the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Status {
    #[default]
    PendingCreation,
    PendingUpdate,
    PendingModification,
    Applied,
    Disabled,
    Destroyed,
    Failed,
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending_creation" => Status::PendingCreation,
            "pending_update" => Status::PendingUpdate,
            "pending_modification" => Status::PendingModification,
            "applied" => Status::Applied,
            "disabled" => Status::Disabled,
            "destroyed" => Status::Destroyed,
            _ => Status::Failed,
        }
    }
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::PendingCreation => "pending_creation",
            Status::PendingUpdate => "pending_update",
            Status::PendingModification => "pending_modification",
            Status::Applied => "applied",
            Status::Disabled => "disabled",
            Status::Destroyed => "destroyed",
            Status::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the orchestrator does with a node during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Leave the resource alone; status is unchanged.
    None,
    /// Call the provider's create.
    Create,
    /// Call the provider's destroy.
    Destroy,
    /// Destroy then create in the same visit; a destroy failure aborts
    /// the visit.
    Replace,
    /// Destroy best-effort then create; used to recover failed resources
    /// whose real state is unknown.
    Recover,
}

/// Decide the action for a node during an apply walk.
pub fn apply_action(r: &Resource) -> Action {
    if r.disabled || r.status == Status::Disabled {
        // A disabled resource is never created. If a previous run applied
        // it, one destroy reconciles the real world with the declaration.
        return if r.prior_status == Some(Status::Applied) {
            Action::Destroy
        } else {
            Action::None
        };
    }

    match r.status {
        Status::PendingCreation | Status::Destroyed => Action::Create,
        Status::PendingUpdate | Status::Applied => Action::None,
        Status::PendingModification => Action::Replace,
        Status::Failed => Action::Recover,
        Status::Disabled => Action::None,
    }
}

/// Decide the action for a node during a destroy walk.
pub fn destroy_action(r: &Resource) -> Action {
    if r.disabled || r.status == Status::Disabled {
        return if r.prior_status == Some(Status::Applied) {
            Action::Destroy
        } else {
            Action::None
        };
    }

    match r.status {
        Status::PendingCreation | Status::Destroyed => Action::None,
        Status::PendingUpdate
        | Status::PendingModification
        | Status::Applied
        | Status::Failed => Action::Destroy,
        Status::Disabled => Action::None,
    }
}
