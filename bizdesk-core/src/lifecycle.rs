//! Pipeline lifecycle
//!
//! Every mutation of a pipeline goes through this module. Each function
//! takes the current node and returns a new one with exactly one activity
//! log entry appended and `updated_at` refreshed; the input is left alone
//! so a failed operation never leaves a half-applied node behind.
//!
//! Status transitions:
//!
//! ```text
//! Pending --approve--> Active --complete--> Completed
//!    |                   |
//!    +------reject-------+--> Rejected
//! ```

use chrono::Utc;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::log::{ActivityLog, Actor};
use crate::domain::pipeline::{
    PipelineItem, PipelineNode, PipelineStatus, RejectionInfo, StageName, standard_stages,
};

/// Lifecycle error type
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Cannot {transition} a pipeline that is {from}")]
    InvalidTransition {
        from: &'static str,
        transition: &'static str,
    },

    #[error("Pipeline is {0} and can no longer be edited")]
    ReadOnly(&'static str),

    #[error("Rejection reason cannot be empty")]
    MissingReason,

    #[error("Pipeline name cannot be empty")]
    EmptyName,

    #[error("Stage item not found: {0}")]
    ItemNotFound(Uuid),

    #[error("Stage item already exists: {0}")]
    DuplicateItem(Uuid),

    #[error("Stage missing from pipeline: {0}")]
    StageMissing(StageName),

    #[error("Pipeline is already at that position")]
    AlreadyThere,
}

pub type Result<T> = std::result::Result<T, LifecycleError>;

/// A requested status change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Approve,
    Reject { reason: String },
    Complete,
}

impl Transition {
    fn verb(&self) -> &'static str {
        match self {
            Transition::Approve => "approve",
            Transition::Reject { .. } => "reject",
            Transition::Complete => "complete",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Creates a pipeline with the nine standard stages, all empty, and a
/// `created` log entry
pub fn new_pipeline(
    name: impl Into<String>,
    parent_id: Option<Uuid>,
    actor: &Actor,
    initial_status: PipelineStatus,
) -> PipelineNode {
    let now = Utc::now();
    let node = PipelineNode {
        id: Uuid::new_v4(),
        name: name.into(),
        created_at: now,
        updated_at: now,
        parent_id,
        user_id: actor.user_id.clone(),
        user_name: actor.user_name.clone(),
        status: initial_status,
        activity_logs: Vec::new(),
        stages: standard_stages(),
        children: Vec::new(),
        revision: 0,
    };
    add_activity_log(node, "created", Some(actor), None)
}

/// Appends one log entry and refreshes `updated_at`
///
/// `action` is free-form; no check ties it to the pipeline's status.
pub fn add_activity_log(
    mut node: PipelineNode,
    action: impl Into<String>,
    actor: Option<&Actor>,
    details: Option<String>,
) -> PipelineNode {
    let entry = ActivityLog::new(action, actor, details);
    node.updated_at = entry.timestamp;
    node.activity_logs.push(entry);
    node
}

/// Applies a status transition
pub fn transition(
    node: &PipelineNode,
    transition: Transition,
    actor: &Actor,
) -> Result<PipelineNode> {
    let from = node.status.label();
    let invalid = || LifecycleError::InvalidTransition {
        from,
        transition: transition.verb(),
    };

    let (status, action, details) = match (&node.status, &transition) {
        (PipelineStatus::Pending, Transition::Approve) => (PipelineStatus::Active, "approved", None),
        (PipelineStatus::Active | PipelineStatus::Pending, Transition::Reject { reason }) => {
            let reason = reason.trim();
            if reason.is_empty() {
                return Err(LifecycleError::MissingReason);
            }
            let status = PipelineStatus::Rejected {
                rejection_info: RejectionInfo {
                    reason: reason.to_string(),
                    rejected_at: Utc::now(),
                    rejected_by_id: actor.user_id.clone(),
                    rejected_by_name: actor.user_name.clone(),
                },
            };
            (status, "rejected", Some(reason.to_string()))
        }
        (PipelineStatus::Active, Transition::Complete) => (
            PipelineStatus::Completed {
                completed_at: Utc::now(),
            },
            "completed",
            None,
        ),
        _ => return Err(invalid()),
    };

    let mut next = node.clone();
    next.status = status;
    Ok(add_activity_log(next, action, Some(actor), details))
}

/// Renames a pipeline
pub fn rename(node: &PipelineNode, name: &str, actor: &Actor) -> Result<PipelineNode> {
    ensure_editable(node)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(LifecycleError::EmptyName);
    }
    let previous = node.name.clone();
    let mut next = node.clone();
    next.name = name.to_string();
    Ok(add_activity_log(
        next,
        "renamed",
        Some(actor),
        Some(format!("{previous} -> {name}")),
    ))
}

/// Adds an item to the end of a stage
pub fn add_item(
    node: &PipelineNode,
    stage: StageName,
    item: PipelineItem,
    actor: &Actor,
) -> Result<PipelineNode> {
    ensure_editable(node)?;
    if locate_item(node, item.id).is_some() {
        return Err(LifecycleError::DuplicateItem(item.id));
    }

    let details = format!("{} added to {}", item.company_name, stage);
    let mut next = node.clone();
    next.stage_mut(stage)
        .ok_or(LifecycleError::StageMissing(stage))?
        .items
        .push(item);
    Ok(add_activity_log(next, "item_added", Some(actor), Some(details)))
}

/// Replaces an existing item (matched by id) in whichever stage holds it
pub fn update_item(node: &PipelineNode, item: PipelineItem, actor: &Actor) -> Result<PipelineNode> {
    ensure_editable(node)?;
    let (stage_index, item_index) =
        locate_item(node, item.id).ok_or(LifecycleError::ItemNotFound(item.id))?;

    let details = format!("{} updated", item.company_name);
    let mut next = node.clone();
    next.stages[stage_index].items[item_index] = item;
    Ok(add_activity_log(next, "item_updated", Some(actor), Some(details)))
}

/// Removes an item from whichever stage holds it
pub fn remove_item(node: &PipelineNode, item_id: Uuid, actor: &Actor) -> Result<PipelineNode> {
    ensure_editable(node)?;
    let (stage_index, item_index) =
        locate_item(node, item_id).ok_or(LifecycleError::ItemNotFound(item_id))?;

    let mut next = node.clone();
    let stage = &mut next.stages[stage_index];
    let removed = stage.items.remove(item_index);
    let details = format!("{} removed from {}", removed.company_name, stage.name);
    Ok(add_activity_log(next, "item_removed", Some(actor), Some(details)))
}

/// Moves an item to the end of another stage
pub fn move_item(
    node: &PipelineNode,
    item_id: Uuid,
    to: StageName,
    actor: &Actor,
) -> Result<PipelineNode> {
    ensure_editable(node)?;
    let (stage_index, item_index) =
        locate_item(node, item_id).ok_or(LifecycleError::ItemNotFound(item_id))?;

    let mut next = node.clone();
    let from = next.stages[stage_index].name;
    let item = next.stages[stage_index].items.remove(item_index);
    let details = format!("{} moved from {} to {}", item.company_name, from, to);
    next.stage_mut(to)
        .ok_or(LifecycleError::StageMissing(to))?
        .items
        .push(item);
    Ok(add_activity_log(next, "item_moved", Some(actor), Some(details)))
}

/// Places a pipeline under `new_parent`, or at the top level
///
/// Closed pipelines may still be moved; only their contents are frozen.
/// Whether the parent exists and stays acyclic is checked on save.
pub fn move_to(node: &PipelineNode, new_parent: Option<Uuid>, actor: &Actor) -> Result<PipelineNode> {
    if node.parent_id == new_parent {
        return Err(LifecycleError::AlreadyThere);
    }

    let describe = |parent: Option<Uuid>| match parent {
        Some(id) => id.to_string(),
        None => "top level".to_string(),
    };
    let details = format!("{} -> {}", describe(node.parent_id), describe(new_parent));

    let mut next = node.clone();
    next.parent_id = new_parent;
    Ok(add_activity_log(next, "moved", Some(actor), Some(details)))
}

fn ensure_editable(node: &PipelineNode) -> Result<()> {
    match node.status {
        PipelineStatus::Active | PipelineStatus::Pending => Ok(()),
        _ => Err(LifecycleError::ReadOnly(node.status.label())),
    }
}

fn locate_item(node: &PipelineNode, item_id: Uuid) -> Option<(usize, usize)> {
    node.stages.iter().enumerate().find_map(|(s, stage)| {
        stage
            .items
            .iter()
            .position(|i| i.id == item_id)
            .map(|i| (s, i))
    })
}
