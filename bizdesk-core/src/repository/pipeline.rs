//! Pipeline repository
//!
//! Persists the pipeline forest as a flat list under a single store key.
//! Each record carries a revision that is bumped on every save; saving a
//! node whose revision no longer matches the stored one fails with
//! [`RepositoryError::Conflict`] instead of silently overwriting a newer
//! write from another process.

use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::{RepositoryError, Result};
use crate::domain::pipeline::{FlatPipelineRecord, PipelineNode};
use crate::store::{KeyValueStore, keys, read_json, update_json};
use crate::tree::{build_tree, descendant_ids, find_by_id, flatten_tree};

/// Repository for pipeline records
#[derive(Debug, Clone)]
pub struct PipelineRepository<S> {
    store: S,
}

impl<S: KeyValueStore> PipelineRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Stored records in stored order; malformed data reads as empty
    pub fn load_flat(&self) -> Vec<FlatPipelineRecord> {
        read_json(&self.store, keys::PIPELINES, Vec::new())
    }

    /// Stored records assembled into a forest
    pub fn load_forest(&self) -> Vec<PipelineNode> {
        build_tree(&self.load_flat())
    }

    /// A pipeline with its whole subtree
    pub fn get(&self, id: Uuid) -> Result<PipelineNode> {
        find_by_id(&self.load_forest(), id)
            .cloned()
            .ok_or(RepositoryError::NotFound(id))
    }

    /// Inserts or updates a single pipeline
    ///
    /// Only the node's own fields are written; its `children` are ignored.
    /// Returns the node with its new revision. A node without content is
    /// not written unless one of its descendants has content. The revision
    /// and parent checks run against the store as it is at write time.
    pub fn save(&self, node: &PipelineNode) -> Result<PipelineNode> {
        let mut saved = node.clone();
        saved.revision = node.revision + 1;
        let record = FlatPipelineRecord::from_node(&saved);

        self.modify(|flat| {
            if let Some(parent) = node.parent_id {
                check_parent(flat, node.id, parent)?;
            }

            match flat.iter_mut().find(|r| r.id == node.id) {
                Some(stored) if stored.revision != node.revision => {
                    Err(RepositoryError::Conflict {
                        id: node.id,
                        expected: node.revision,
                        found: stored.revision,
                    })
                }
                Some(stored) => {
                    *stored = record;
                    Ok(())
                }
                None => {
                    flat.push(record);
                    Ok(())
                }
            }
        })?;

        tracing::debug!("Saved pipeline {} at revision {}", saved.id, saved.revision);
        Ok(saved)
    }

    /// Replaces the whole store with `forest`, without revision checks
    ///
    /// Returns the number of records written.
    pub fn save_forest(&self, forest: &[PipelineNode]) -> Result<usize> {
        let records = flatten_tree(forest);
        self.modify(|flat| {
            *flat = records;
            prune(flat);
            Ok(flat.len())
        })
    }

    /// Deletes a pipeline and everything below it
    ///
    /// Returns the removed ids, the pipeline itself first.
    pub fn delete(&self, id: Uuid) -> Result<Vec<Uuid>> {
        let removed = self.modify(|flat| {
            let forest = build_tree(flat);
            let node = find_by_id(&forest, id).ok_or(RepositoryError::NotFound(id))?;
            let mut removed = vec![id];
            removed.extend(descendant_ids(node));

            let doomed: HashSet<Uuid> = removed.iter().copied().collect();
            flat.retain(|r| !doomed.contains(&r.id));
            Ok(removed)
        })?;

        tracing::info!("Deleted pipeline {} and {} descendant(s)", id, removed.len() - 1);
        Ok(removed)
    }

    /// Runs `f` on the stored list and writes the result back in one
    /// atomic store update. Records with nothing worth keeping are dropped
    /// and `child_ids` recomputed before the write; nothing is written when
    /// `f` fails.
    fn modify<R>(&self, f: impl FnOnce(&mut Vec<FlatPipelineRecord>) -> Result<R>) -> Result<R> {
        let apply = |flat: &mut Vec<FlatPipelineRecord>| -> Result<R> {
            let result = f(flat)?;
            prune(flat);
            Ok(result)
        };
        update_json(&self.store, keys::PIPELINES, Vec::new(), apply)
    }
}

/// Drops records without content (keeping ancestors of records that have
/// some) and recomputes `child_ids`
fn prune(flat: &mut Vec<FlatPipelineRecord>) {
    let keep = persistable_ids(flat);
    let before = flat.len();
    flat.retain(|r| keep.contains(&r.id));

    if flat.len() < before {
        tracing::debug!("Skipping {} pipeline(s) without content", before - flat.len());
    }

    let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for record in flat.iter() {
        if let Some(parent) = record.parent_id {
            children.entry(parent).or_default().push(record.id);
        }
    }
    for record in flat.iter_mut() {
        record.child_ids = children.remove(&record.id).unwrap_or_default();
    }
}

/// Ids of records that have content, plus every ancestor of such a record
fn persistable_ids(flat: &[FlatPipelineRecord]) -> HashSet<Uuid> {
    let parents: HashMap<Uuid, Option<Uuid>> = flat.iter().map(|r| (r.id, r.parent_id)).collect();
    let mut keep = HashSet::new();

    for record in flat.iter().filter(|r| r.should_save()) {
        let mut current = Some(record.id);
        while let Some(id) = current {
            if !keep.insert(id) {
                break;
            }
            current = parents.get(&id).copied().flatten();
        }
    }

    keep
}

/// Rejects a parent that does not exist or that sits below `id`
fn check_parent(flat: &[FlatPipelineRecord], id: Uuid, parent: Uuid) -> Result<()> {
    let parents: HashMap<Uuid, Option<Uuid>> = flat.iter().map(|r| (r.id, r.parent_id)).collect();
    if !parents.contains_key(&parent) {
        return Err(RepositoryError::UnknownParent(parent));
    }

    let mut current = Some(parent);
    let mut hops = 0;
    while let Some(ancestor) = current {
        if ancestor == id || hops > parents.len() {
            return Err(RepositoryError::WouldCycle { id, parent });
        }
        current = parents.get(&ancestor).copied().flatten();
        hops += 1;
    }
    Ok(())
}
