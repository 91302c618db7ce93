//! Per-stage item lists
//!
//! Stage list views read a standalone array of items for each stage, kept
//! under the stage's own key. These arrays are a projection of the
//! pipeline forest and are rebuilt from it after every pipeline change.

use super::Result;
use crate::domain::pipeline::{PipelineItem, PipelineNode, STANDARD_PIPELINE_STAGES, StageName};
use crate::store::{KeyValueStore, read_json, write_json};

/// Repository for the per-stage item arrays
#[derive(Debug, Clone)]
pub struct StageItemRepository<S> {
    store: S,
}

impl<S: KeyValueStore> StageItemRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Items stored for a stage; malformed data reads as empty
    pub fn load(&self, stage: StageName) -> Vec<PipelineItem> {
        read_json(&self.store, stage.storage_key(), Vec::new())
    }

    pub fn save(&self, stage: StageName, items: &[PipelineItem]) -> Result<()> {
        write_json(&self.store, stage.storage_key(), items)?;
        Ok(())
    }

    /// Rewrites every stage array from the items held by `forest`
    ///
    /// Items appear in pre-order pipeline order, then stage order within
    /// a pipeline.
    pub fn rebuild(&self, forest: &[PipelineNode]) -> Result<()> {
        for stage in STANDARD_PIPELINE_STAGES {
            let mut items = Vec::new();
            collect(forest, stage, &mut items);
            self.save(stage, &items)?;
        }
        Ok(())
    }
}

fn collect(forest: &[PipelineNode], stage: StageName, out: &mut Vec<PipelineItem>) {
    for node in forest {
        if let Some(s) = node.stage(stage) {
            out.extend(s.items.iter().cloned());
        }
        collect(&node.children, stage, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::log::Actor;
    use crate::domain::pipeline::PipelineStatus;
    use crate::lifecycle::{add_item, new_pipeline};
    use crate::store::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn test_rebuild_projects_items_per_stage() {
        let actor = Actor::new("u-1", "Sam");
        let parent = new_pipeline("Parent", None, &actor, PipelineStatus::Active);
        let parent = add_item(&parent, StageName::Rfq, PipelineItem::new("Acme"), &actor).unwrap();
        let mut child = new_pipeline("Child", Some(parent.id), &actor, PipelineStatus::Active);
        child = add_item(&child, StageName::Rfq, PipelineItem::new("Bolt"), &actor).unwrap();
        child = add_item(&child, StageName::Quotation, PipelineItem::new("Cogs"), &actor).unwrap();
        let mut parent = parent;
        parent.children.push(child);

        let store = Arc::new(MemoryStore::new());
        let repo = StageItemRepository::new(Arc::clone(&store));
        repo.rebuild(&[parent]).unwrap();

        let rfq: Vec<_> = repo
            .load(StageName::Rfq)
            .into_iter()
            .map(|i| i.company_name)
            .collect();
        assert_eq!(rfq, vec!["Acme", "Bolt"]);
        assert_eq!(repo.load(StageName::Quotation).len(), 1);
        assert!(repo.load(StageName::Negotiation).is_empty());
        assert!(store.get("negotiationData").unwrap().is_some());
    }

    #[test]
    fn test_malformed_stage_array_reads_as_empty() {
        let store = MemoryStore::new();
        store.set("rfqData", "not valid json".to_string()).unwrap();
        let repo = StageItemRepository::new(store);
        assert!(repo.load(StageName::Rfq).is_empty());
    }
}
