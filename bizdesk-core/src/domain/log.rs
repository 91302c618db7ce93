//! Activity log domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An entry in a pipeline's append-only activity history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: Uuid,
    /// Free-form tag such as "created" or "rejected"
    pub action: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ActivityLog {
    /// Creates a log entry stamped with the current time and a fresh id
    pub fn new(action: impl Into<String>, actor: Option<&Actor>, details: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            action: action.into(),
            timestamp: Utc::now(),
            user_id: actor.map(|a| a.user_id.clone()),
            user_name: actor.map(|a| a.user_name.clone()),
            details,
        }
    }
}

/// The user performing a mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: String,
    pub user_name: String,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
        }
    }
}
