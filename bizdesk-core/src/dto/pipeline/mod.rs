//! Pipeline DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::pipeline::PipelineNode;

/// Lightweight pipeline summary for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub id: Uuid,
    pub name: String,
    pub status: String,
    pub parent_id: Option<Uuid>,
    pub owner: String,
    pub item_count: usize,
    pub child_count: usize,
    pub updated_at: DateTime<Utc>,
}

impl From<&PipelineNode> for PipelineSummary {
    fn from(node: &PipelineNode) -> Self {
        Self {
            id: node.id,
            name: node.name.clone(),
            status: node.status.label().to_string(),
            parent_id: node.parent_id,
            owner: node.user_name.clone(),
            item_count: node.item_count(),
            child_count: node.children.len(),
            updated_at: node.updated_at,
        }
    }
}

impl PipelineSummary {
    /// Summaries of every pipeline in `forest`, parents before children
    pub fn from_forest(forest: &[PipelineNode]) -> Vec<Self> {
        fn walk(nodes: &[PipelineNode], out: &mut Vec<PipelineSummary>) {
            for node in nodes {
                out.push(PipelineSummary::from(node));
                walk(&node.children, out);
            }
        }

        let mut out = Vec::new();
        walk(forest, &mut out);
        out
    }
}
