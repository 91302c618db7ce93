//! Pipeline domain types
//!
//! A pipeline tracks one deal through the nine standard stages. Pipelines
//! form a forest through `parent_id`; the tree form owns its children while
//! the flat form (what gets persisted) only carries derived `child_ids`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use uuid::Uuid;

use super::log::ActivityLog;

/// The nine standard stages every pipeline carries, in display order
pub const STANDARD_PIPELINE_STAGES: [StageName; 9] = [
    StageName::Rfq,
    StageName::Feasibility,
    StageName::Quotation,
    StageName::Negotiation,
    StageName::ClosedDeals,
    StageName::PreProcess,
    StageName::PostProcess,
    StageName::PaymentPending,
    StageName::CompletedProjects,
];

/// Name of a pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageName {
    #[serde(rename = "RFQ")]
    Rfq,
    #[serde(rename = "Feasibility")]
    Feasibility,
    #[serde(rename = "Quotation")]
    Quotation,
    #[serde(rename = "Negotiation")]
    Negotiation,
    #[serde(rename = "Closed Deals")]
    ClosedDeals,
    #[serde(rename = "Pre-Process")]
    PreProcess,
    #[serde(rename = "Post-Process")]
    PostProcess,
    #[serde(rename = "Payment Pending")]
    PaymentPending,
    #[serde(rename = "Completed Projects")]
    CompletedProjects,
}

impl StageName {
    /// Human-readable stage label
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Rfq => "RFQ",
            StageName::Feasibility => "Feasibility",
            StageName::Quotation => "Quotation",
            StageName::Negotiation => "Negotiation",
            StageName::ClosedDeals => "Closed Deals",
            StageName::PreProcess => "Pre-Process",
            StageName::PostProcess => "Post-Process",
            StageName::PaymentPending => "Payment Pending",
            StageName::CompletedProjects => "Completed Projects",
        }
    }

    /// Key under which the standalone item array for this stage is stored
    pub fn storage_key(&self) -> &'static str {
        match self {
            StageName::Rfq => "rfqData",
            StageName::Feasibility => "feasibilityData",
            StageName::Quotation => "quotationData",
            StageName::Negotiation => "negotiationData",
            StageName::ClosedDeals => "closedDealsData",
            StageName::PreProcess => "preProcessData",
            StageName::PostProcess => "postProcessData",
            StageName::PaymentPending => "paymentPendingData",
            StageName::CompletedProjects => "completedProjectsData",
        }
    }

    /// Parses a stage from its label, case-insensitively.
    ///
    /// Separators are ignored so `closed-deals`, `Closed Deals` and
    /// `closeddeals` all resolve to the same stage.
    pub fn parse(input: &str) -> Option<Self> {
        let wanted = squash(input);
        STANDARD_PIPELINE_STAGES
            .into_iter()
            .find(|stage| squash(stage.as_str()) == wanted)
    }
}

fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage and the items currently in it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub name: StageName,
    #[serde(default)]
    pub items: Vec<PipelineItem>,
}

impl Stage {
    pub fn empty(name: StageName) -> Self {
        Self {
            name,
            items: Vec::new(),
        }
    }
}

/// Builds the nine standard stages, all empty
pub fn standard_stages() -> Vec<Stage> {
    STANDARD_PIPELINE_STAGES
        .into_iter()
        .map(Stage::empty)
        .collect()
}

/// Repairs a stage list so it holds exactly the nine standard stages in
/// order. Items of duplicated stages are merged in their original order.
pub fn normalize_stages(stages: Vec<Stage>) -> Vec<Stage> {
    let mut normalized = standard_stages();
    for stage in stages {
        if let Some(slot) = normalized.iter_mut().find(|s| s.name == stage.name) {
            slot.items.extend(stage.items);
        }
    }
    normalized
}

/// Priority of a pipeline item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "High"),
            Priority::Medium => write!(f, "Medium"),
            Priority::Low => write!(f, "Low"),
        }
    }
}

/// A single deal entry inside a stage
///
/// Stage-specific fields (bill numbers, vendor ids, ...) are kept in
/// `extra` and survive a load/save cycle untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineItem {
    pub id: Uuid,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "fileName", default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl PipelineItem {
    /// Creates an item for a company with a fresh id and everything else blank
    pub fn new(company_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date: None,
            department: String::new(),
            company_name: company_name.into(),
            contact: String::new(),
            state: String::new(),
            deadline: None,
            description: String::new(),
            file_name: None,
            source: String::new(),
            priority: Priority::default(),
            extra: Map::new(),
        }
    }
}

/// Who rejected a pipeline, when, and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionInfo {
    pub reason: String,
    pub rejected_at: DateTime<Utc>,
    pub rejected_by_id: String,
    pub rejected_by_name: String,
}

/// Pipeline status
///
/// Stored as a `status` tag next to the other record fields, with
/// `rejectionInfo` or `completedAt` alongside when the variant carries them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PipelineStatus {
    Active,
    Pending,
    Rejected {
        #[serde(rename = "rejectionInfo")]
        rejection_info: RejectionInfo,
    },
    Completed {
        #[serde(rename = "completedAt")]
        completed_at: DateTime<Utc>,
    },
}

impl PipelineStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PipelineStatus::Active => "active",
            PipelineStatus::Pending => "pending",
            PipelineStatus::Rejected { .. } => "rejected",
            PipelineStatus::Completed { .. } => "completed",
        }
    }

    pub fn rejection_info(&self) -> Option<&RejectionInfo> {
        match self {
            PipelineStatus::Rejected { rejection_info } => Some(rejection_info),
            _ => None,
        }
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            PipelineStatus::Completed { completed_at } => Some(*completed_at),
            _ => None,
        }
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pipeline in tree form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineNode {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub parent_id: Option<Uuid>,
    pub user_id: String,
    pub user_name: String,
    #[serde(flatten)]
    pub status: PipelineStatus,
    #[serde(default)]
    pub activity_logs: Vec<ActivityLog>,
    #[serde(default = "standard_stages")]
    pub stages: Vec<Stage>,
    #[serde(default)]
    pub children: Vec<PipelineNode>,
    #[serde(default)]
    pub revision: u64,
}

impl PipelineNode {
    /// True iff any stage holds at least one item
    pub fn has_content(&self) -> bool {
        stages_have_content(&self.stages)
    }

    /// Gate applied before writing a node to the flat store
    pub fn should_save(&self) -> bool {
        self.has_content()
    }

    pub fn stage(&self, name: StageName) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    pub fn stage_mut(&mut self, name: StageName) -> Option<&mut Stage> {
        self.stages.iter_mut().find(|s| s.name == name)
    }

    /// Total number of items across all stages
    pub fn item_count(&self) -> usize {
        self.stages.iter().map(|s| s.items.len()).sum()
    }

    /// Converts a stored record into a childless tree node
    pub fn from_record(record: FlatPipelineRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            created_at: record.created_at,
            updated_at: record.updated_at,
            parent_id: record.parent_id,
            user_id: record.user_id,
            user_name: record.user_name,
            status: record.status,
            activity_logs: record.activity_logs,
            stages: normalize_stages(record.stages),
            children: Vec::new(),
            revision: record.revision,
        }
    }
}

/// Pipeline in stored (flat) form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatPipelineRecord {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub parent_id: Option<Uuid>,
    pub user_id: String,
    pub user_name: String,
    #[serde(flatten)]
    pub status: PipelineStatus,
    #[serde(default)]
    pub activity_logs: Vec<ActivityLog>,
    #[serde(default = "standard_stages")]
    pub stages: Vec<Stage>,
    /// Derived from the tree; never authoritative
    #[serde(default)]
    pub child_ids: Vec<Uuid>,
    /// Bumped on every successful save
    #[serde(default)]
    pub revision: u64,
}

impl FlatPipelineRecord {
    /// Flattens a single node, taking `child_ids` from its own children
    pub fn from_node(node: &PipelineNode) -> Self {
        Self {
            id: node.id,
            name: node.name.clone(),
            created_at: node.created_at,
            updated_at: node.updated_at,
            parent_id: node.parent_id,
            user_id: node.user_id.clone(),
            user_name: node.user_name.clone(),
            status: node.status.clone(),
            activity_logs: node.activity_logs.clone(),
            stages: node.stages.clone(),
            child_ids: node.children.iter().map(|c| c.id).collect(),
            revision: node.revision,
        }
    }

    pub fn has_content(&self) -> bool {
        stages_have_content(&self.stages)
    }

    pub fn should_save(&self) -> bool {
        self.has_content()
    }
}

fn stages_have_content(stages: &[Stage]) -> bool {
    stages.iter().any(|s| !s.items.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record_json(status: JsonValue) -> JsonValue {
        let mut value = json!({
            "id": "6f1c1f5e-3b8a-4a55-9a8e-7f2b7b0f6c01",
            "name": "Acme retrofit",
            "createdAt": "2026-01-10T09:00:00Z",
            "updatedAt": "2026-01-11T09:00:00Z",
            "parentId": null,
            "userId": "u-1",
            "userName": "Sam",
        });
        if let (Some(obj), Some(extra)) = (value.as_object_mut(), status.as_object()) {
            obj.extend(extra.clone());
        }
        value
    }

    #[test]
    fn test_standard_stages_are_nine_and_ordered() {
        let stages = standard_stages();
        assert_eq!(stages.len(), 9);
        assert_eq!(stages[0].name, StageName::Rfq);
        assert_eq!(stages[8].name, StageName::CompletedProjects);
        assert!(stages.iter().all(|s| s.items.is_empty()));
    }

    #[test]
    fn test_stage_name_parse() {
        assert_eq!(StageName::parse("rfq"), Some(StageName::Rfq));
        assert_eq!(StageName::parse("closed-deals"), Some(StageName::ClosedDeals));
        assert_eq!(StageName::parse("Payment Pending"), Some(StageName::PaymentPending));
        assert_eq!(StageName::parse("unknown"), None);
    }

    #[test]
    fn test_missing_stages_default_to_standard() {
        let record: FlatPipelineRecord =
            serde_json::from_value(record_json(json!({"status": "active"}))).unwrap();
        assert_eq!(record.stages.len(), 9);
        assert_eq!(record.status, PipelineStatus::Active);
        assert!(!record.should_save());
    }

    #[test]
    fn test_rejected_status_reads_rejection_info_beside_tag() {
        let record: FlatPipelineRecord = serde_json::from_value(record_json(json!({
            "status": "rejected",
            "rejectionInfo": {
                "reason": "budget",
                "rejectedAt": "2026-01-12T10:00:00Z",
                "rejectedById": "u-2",
                "rejectedByName": "Lee"
            }
        })))
        .unwrap();

        let info = record.status.rejection_info().unwrap();
        assert_eq!(info.reason, "budget");
        assert_eq!(info.rejected_by_name, "Lee");

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["status"], "rejected");
        assert_eq!(back["rejectionInfo"]["rejectedById"], "u-2");
        assert!(back.get("completedAt").is_none());
    }

    #[test]
    fn test_item_extra_fields_are_preserved() {
        let item: PipelineItem = serde_json::from_value(json!({
            "id": "0d6f2f0e-8a1b-4c7e-9d5a-1c2b3d4e5f60",
            "company_name": "Acme",
            "priority": "High",
            "fileName": "rfq.pdf",
            "billNumber": "B-77",
            "vendorId": 12
        }))
        .unwrap();

        assert_eq!(item.priority, Priority::High);
        assert_eq!(item.file_name.as_deref(), Some("rfq.pdf"));
        assert_eq!(item.extra.get("billNumber"), Some(&json!("B-77")));

        let back = serde_json::to_value(&item).unwrap();
        assert_eq!(back["vendorId"], 12);
        assert_eq!(back["fileName"], "rfq.pdf");
    }

    #[test]
    fn test_normalize_stages_reorders_and_merges() {
        let mut negotiation = Stage::empty(StageName::Negotiation);
        negotiation.items.push(PipelineItem::new("A"));
        let mut negotiation_dup = Stage::empty(StageName::Negotiation);
        negotiation_dup.items.push(PipelineItem::new("B"));

        let stages = normalize_stages(vec![negotiation, Stage::empty(StageName::Rfq), negotiation_dup]);

        assert_eq!(stages.len(), 9);
        let names: Vec<_> = stages.iter().map(|s| s.name).collect();
        assert_eq!(names, STANDARD_PIPELINE_STAGES.to_vec());
        let merged: Vec<_> = stages[3].items.iter().map(|i| i.company_name.as_str()).collect();
        assert_eq!(merged, vec!["A", "B"]);
    }
}
