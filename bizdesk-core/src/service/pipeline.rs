//! Pipeline Service
//!
//! Business logic for pipeline management.

use thiserror::Error;
use uuid::Uuid;

use crate::domain::log::{ActivityLog, Actor};
use crate::domain::pipeline::{PipelineItem, PipelineNode, PipelineStatus, StageName};
use crate::lifecycle::{self, LifecycleError, Transition};
use crate::repository::{PipelineRepository, RepositoryError, StageItemRepository};
use crate::store::KeyValueStore;
use crate::tree::{self, ForestIssue, TreeError};
use crate::validation::{ValidationError, validate_pipeline_item};

/// Service error type
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("Only active or pending pipelines can be created, not {0}")]
    InvalidInitialStatus(&'static str),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Options for creating a pipeline
#[derive(Debug, Clone)]
pub struct NewPipeline {
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub status: PipelineStatus,
    /// A pipeline is only stored once it holds an item, so creation usually
    /// comes with the first one.
    pub first_item: Option<(StageName, PipelineItem)>,
}

/// Pipeline management on top of a key-value store
#[derive(Debug, Clone)]
pub struct PipelineService<S> {
    pipelines: PipelineRepository<S>,
    stages: StageItemRepository<S>,
}

impl<S: KeyValueStore + Clone> PipelineService<S> {
    pub fn new(store: S) -> Self {
        Self {
            pipelines: PipelineRepository::new(store.clone()),
            stages: StageItemRepository::new(store),
        }
    }

    pub fn repository(&self) -> &PipelineRepository<S> {
        &self.pipelines
    }

    /// Create a new pipeline
    pub fn create(&self, req: NewPipeline, actor: &Actor) -> Result<PipelineNode> {
        if !matches!(req.status, PipelineStatus::Active | PipelineStatus::Pending) {
            return Err(PipelineError::InvalidInitialStatus(req.status.label()));
        }
        if req.name.trim().is_empty() {
            return Err(LifecycleError::EmptyName.into());
        }

        let mut node = lifecycle::new_pipeline(req.name.trim(), req.parent_id, actor, req.status);

        match req.first_item {
            Some((stage, item)) => {
                validate_pipeline_item(&item)?;
                node = lifecycle::add_item(&node, stage, item, actor)?;
            }
            None => {
                tracing::warn!(
                    "Pipeline '{}' has no items and will not be stored until one is added",
                    node.name
                );
            }
        }

        let node = self.persist(&node)?;
        tracing::info!("Pipeline created: {} ({})", node.name, node.id);
        Ok(node)
    }

    /// All stored pipelines as a forest
    pub fn list(&self) -> Vec<PipelineNode> {
        self.pipelines.load_forest()
    }

    /// Get a pipeline by ID, with its subtree
    pub fn get(&self, id: Uuid) -> Result<PipelineNode> {
        Ok(self.pipelines.get(id)?)
    }

    /// Activity history, oldest first
    pub fn activity(&self, id: Uuid) -> Result<Vec<ActivityLog>> {
        Ok(self.get(id)?.activity_logs)
    }

    /// Number of ancestors above a pipeline
    pub fn depth(&self, id: Uuid) -> Result<usize> {
        Ok(tree::get_depth(&self.pipelines.load_flat(), id)?)
    }

    pub fn rename(&self, id: Uuid, name: &str, actor: &Actor) -> Result<PipelineNode> {
        self.apply(id, |node| lifecycle::rename(node, name, actor))
    }

    pub fn add_item(
        &self,
        id: Uuid,
        stage: StageName,
        item: PipelineItem,
        actor: &Actor,
    ) -> Result<PipelineNode> {
        validate_pipeline_item(&item)?;
        self.apply(id, |node| lifecycle::add_item(node, stage, item, actor))
    }

    pub fn update_item(&self, id: Uuid, item: PipelineItem, actor: &Actor) -> Result<PipelineNode> {
        validate_pipeline_item(&item)?;
        self.apply(id, |node| lifecycle::update_item(node, item, actor))
    }

    pub fn remove_item(&self, id: Uuid, item_id: Uuid, actor: &Actor) -> Result<PipelineNode> {
        self.apply(id, |node| lifecycle::remove_item(node, item_id, actor))
    }

    pub fn move_item(
        &self,
        id: Uuid,
        item_id: Uuid,
        to: StageName,
        actor: &Actor,
    ) -> Result<PipelineNode> {
        self.apply(id, |node| lifecycle::move_item(node, item_id, to, actor))
    }

    pub fn approve(&self, id: Uuid, actor: &Actor) -> Result<PipelineNode> {
        self.apply(id, |node| lifecycle::transition(node, Transition::Approve, actor))
    }

    pub fn reject(&self, id: Uuid, reason: &str, actor: &Actor) -> Result<PipelineNode> {
        let transition = Transition::Reject {
            reason: reason.to_string(),
        };
        self.apply(id, |node| lifecycle::transition(node, transition, actor))
    }

    pub fn complete(&self, id: Uuid, actor: &Actor) -> Result<PipelineNode> {
        self.apply(id, |node| lifecycle::transition(node, Transition::Complete, actor))
    }

    /// Delete a pipeline and its descendants
    pub fn delete(&self, id: Uuid) -> Result<Vec<Uuid>> {
        let removed = self.pipelines.delete(id)?;
        self.sync_stages()?;
        Ok(removed)
    }

    /// Move a pipeline, with its subtree, under another one or to the root
    /// level
    pub fn move_under(
        &self,
        id: Uuid,
        new_parent: Option<Uuid>,
        actor: &Actor,
    ) -> Result<PipelineNode> {
        self.apply(id, |node| lifecycle::move_to(node, new_parent, actor))
    }

    /// Structural problems in the stored list
    pub fn check(&self) -> Vec<ForestIssue> {
        tree::validate_forest(&self.pipelines.load_flat())
    }

    /// Rewrites the store from the records reachable from a root
    ///
    /// Orphans and cycle members are discarded. Returns how many records
    /// were dropped.
    pub fn repair(&self) -> Result<usize> {
        let before = self.pipelines.load_flat().len();
        let forest = self.pipelines.load_forest();
        let written = self.pipelines.save_forest(&forest)?;
        self.stages.rebuild(&forest)?;

        let dropped = before.saturating_sub(written);
        tracing::info!("Repaired pipeline store, dropped {} record(s)", dropped);
        Ok(dropped)
    }

    fn apply<F>(&self, id: Uuid, mutate: F) -> Result<PipelineNode>
    where
        F: FnOnce(&PipelineNode) -> lifecycle::Result<PipelineNode>,
    {
        let current = self.pipelines.get(id)?;
        let next = mutate(&current)?;
        let saved = self.persist(&next)?;

        if let Some(entry) = saved.activity_logs.last() {
            tracing::info!("Pipeline {} {}", saved.id, entry.action);
        }
        if !saved.should_save() && saved.children.is_empty() {
            tracing::info!("Pipeline {} is now empty and was dropped from the store", saved.id);
        }

        Ok(saved)
    }

    fn persist(&self, node: &PipelineNode) -> Result<PipelineNode> {
        let saved = self.pipelines.save(node)?;
        self.sync_stages()?;
        Ok(saved)
    }

    fn sync_stages(&self) -> Result<()> {
        self.stages
            .rebuild(&self.pipelines.load_forest())
            .map_err(PipelineError::from)
    }
}
