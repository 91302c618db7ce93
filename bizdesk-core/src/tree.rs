//! Pipeline tree helpers
//!
//! Converts between the flat stored list and the owned tree form, and
//! answers structural queries (lookup, depth, descendants) over either.

use std::collections::{HashMap, HashSet};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::pipeline::{FlatPipelineRecord, PipelineNode};

/// Errors from structural queries
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("Pipeline not found: {0}")]
    NotFound(Uuid),

    #[error("Pipeline {child} references missing parent {parent}")]
    DanglingParent { child: Uuid, parent: Uuid },

    #[error("Parent chain of pipeline {0} contains a cycle")]
    Cycle(Uuid),
}

/// Structural problem found in a flat list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForestIssue {
    DuplicateId(Uuid),
    Orphan { id: Uuid, parent_id: Uuid },
    Cycle(Uuid),
}

/// Builds the forest described by a flat list
///
/// Roots and siblings keep the order they have in `flat`. A record whose
/// parent is missing is dropped together with its descendants, and so is
/// any record whose parent chain loops, since neither is reachable from a
/// root. `child_ids` on the input is ignored.
pub fn build_tree(flat: &[FlatPipelineRecord]) -> Vec<PipelineNode> {
    let known: HashSet<Uuid> = flat.iter().map(|r| r.id).collect();
    let mut children_of: HashMap<Uuid, Vec<usize>> = HashMap::new();
    let mut roots = Vec::new();

    for (index, record) in flat.iter().enumerate() {
        match record.parent_id {
            None => roots.push(index),
            Some(parent) if known.contains(&parent) => {
                children_of.entry(parent).or_default().push(index);
            }
            Some(parent) => {
                tracing::warn!(
                    "Dropping pipeline {} from tree: parent {} does not exist",
                    record.id,
                    parent
                );
            }
        }
    }

    let mut visited = HashSet::new();
    let forest: Vec<PipelineNode> = roots
        .into_iter()
        .map(|index| assemble(flat, index, &children_of, &mut visited))
        .collect();

    let unreachable = flat.len() - visited.len();
    if unreachable > 0 {
        tracing::debug!("{} pipeline record(s) not reachable from any root", unreachable);
    }

    forest
}

fn assemble(
    flat: &[FlatPipelineRecord],
    index: usize,
    children_of: &HashMap<Uuid, Vec<usize>>,
    visited: &mut HashSet<usize>,
) -> PipelineNode {
    visited.insert(index);
    let record = &flat[index];
    let mut node = PipelineNode::from_record(record.clone());

    if let Some(child_indices) = children_of.get(&record.id) {
        for &child in child_indices {
            // Duplicate ids can make a record its own ancestor.
            if visited.contains(&child) {
                continue;
            }
            node.children.push(assemble(flat, child, children_of, visited));
        }
    }

    node
}

/// Flattens a forest in pre-order, one root at a time
pub fn flatten_tree(forest: &[PipelineNode]) -> Vec<FlatPipelineRecord> {
    let mut out = Vec::new();
    for root in forest {
        flatten_into(root, &mut out);
    }
    out
}

fn flatten_into(node: &PipelineNode, out: &mut Vec<FlatPipelineRecord>) {
    out.push(FlatPipelineRecord::from_node(node));
    for child in &node.children {
        flatten_into(child, out);
    }
}

/// Depth-first search across every root
pub fn find_by_id(forest: &[PipelineNode], id: Uuid) -> Option<&PipelineNode> {
    for node in forest {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_by_id(&node.children, id) {
            return Some(found);
        }
    }
    None
}

pub fn find_by_id_mut(forest: &mut [PipelineNode], id: Uuid) -> Option<&mut PipelineNode> {
    for node in forest.iter_mut() {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_by_id_mut(&mut node.children, id) {
            return Some(found);
        }
    }
    None
}

/// Number of ancestors above `id` in a flat list (0 for a root)
pub fn get_depth(flat: &[FlatPipelineRecord], id: Uuid) -> Result<usize, TreeError> {
    let parents: HashMap<Uuid, Option<Uuid>> = flat.iter().map(|r| (r.id, r.parent_id)).collect();

    let mut current = id;
    let mut parent = *parents.get(&id).ok_or(TreeError::NotFound(id))?;
    let mut depth = 0;

    while let Some(next) = parent {
        depth += 1;
        if depth > parents.len() {
            return Err(TreeError::Cycle(id));
        }
        parent = *parents.get(&next).ok_or(TreeError::DanglingParent {
            child: current,
            parent: next,
        })?;
        current = next;
    }

    Ok(depth)
}

/// Ids of every node strictly below `node`, in pre-order
pub fn descendant_ids(node: &PipelineNode) -> Vec<Uuid> {
    let mut ids = Vec::new();
    let mut stack: Vec<&PipelineNode> = node.children.iter().rev().collect();
    while let Some(current) = stack.pop() {
        ids.push(current.id);
        stack.extend(current.children.iter().rev());
    }
    ids
}

/// Number of nodes in a forest, roots included
pub fn count_nodes(forest: &[PipelineNode]) -> usize {
    forest.iter().map(|n| 1 + count_nodes(&n.children)).sum()
}

/// Reports duplicate ids, orphans and parent cycles in a flat list
pub fn validate_forest(flat: &[FlatPipelineRecord]) -> Vec<ForestIssue> {
    let mut issues = Vec::new();
    let mut seen = HashSet::new();

    for record in flat {
        if !seen.insert(record.id) {
            issues.push(ForestIssue::DuplicateId(record.id));
        }
    }

    for record in flat {
        match get_depth(flat, record.id) {
            Ok(_) => {}
            Err(TreeError::DanglingParent { parent, .. }) if record.parent_id == Some(parent) => {
                issues.push(ForestIssue::Orphan {
                    id: record.id,
                    parent_id: parent,
                });
            }
            // An ancestor's orphan is already reported on that ancestor.
            Err(TreeError::DanglingParent { .. }) => {}
            Err(TreeError::Cycle(id)) => issues.push(ForestIssue::Cycle(id)),
            Err(TreeError::NotFound(_)) => {}
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::log::Actor;
    use crate::domain::pipeline::{PipelineItem, PipelineStatus, StageName};
    use crate::lifecycle::new_pipeline;

    fn record(id: Uuid, parent_id: Option<Uuid>) -> FlatPipelineRecord {
        let actor = Actor::new("u-1", "Sam");
        let node = new_pipeline(format!("p-{id}"), parent_id, &actor, PipelineStatus::Active);
        let mut record = FlatPipelineRecord::from_node(&node);
        record.id = id;
        record
    }

    fn ids(n: u128) -> Vec<Uuid> {
        (1..=n).map(Uuid::from_u128).collect()
    }

    /// A <- B <- C
    fn chain() -> (Vec<Uuid>, Vec<FlatPipelineRecord>) {
        let ids = ids(3);
        let flat = vec![
            record(ids[0], None),
            record(ids[1], Some(ids[0])),
            record(ids[2], Some(ids[1])),
        ];
        (ids, flat)
    }

    fn topology(flat: &[FlatPipelineRecord]) -> HashSet<(Uuid, Option<Uuid>)> {
        flat.iter().map(|r| (r.id, r.parent_id)).collect()
    }

    #[test]
    fn test_chain_depth_and_descendants() {
        let (ids, flat) = chain();

        assert_eq!(get_depth(&flat, ids[0]), Ok(0));
        assert_eq!(get_depth(&flat, ids[2]), Ok(2));

        let forest = build_tree(&flat);
        let a = find_by_id(&forest, ids[0]).unwrap();
        let descendants: HashSet<_> = descendant_ids(a).into_iter().collect();
        assert_eq!(descendants, HashSet::from([ids[1], ids[2]]));
    }

    #[test]
    fn test_depth_of_child_is_one_more_than_parent() {
        let ids = ids(5);
        let flat = vec![
            record(ids[0], None),
            record(ids[1], Some(ids[0])),
            record(ids[2], Some(ids[0])),
            record(ids[3], Some(ids[2])),
            record(ids[4], None),
        ];
        for r in &flat {
            match r.parent_id {
                None => assert_eq!(get_depth(&flat, r.id), Ok(0)),
                Some(parent) => assert_eq!(
                    get_depth(&flat, r.id).unwrap(),
                    1 + get_depth(&flat, parent).unwrap()
                ),
            }
        }
    }

    #[test]
    fn test_depth_of_unknown_id_is_not_found() {
        let (_, flat) = chain();
        let missing = Uuid::from_u128(99);
        assert_eq!(get_depth(&flat, missing), Err(TreeError::NotFound(missing)));
    }

    #[test]
    fn test_depth_detects_cycle() {
        let ids = ids(2);
        let flat = vec![record(ids[0], Some(ids[1])), record(ids[1], Some(ids[0]))];
        assert_eq!(get_depth(&flat, ids[0]), Err(TreeError::Cycle(ids[0])));
    }

    #[test]
    fn test_build_then_flatten_preserves_topology() {
        let ids = ids(6);
        // Children listed before their parents on purpose.
        let flat = vec![
            record(ids[3], Some(ids[1])),
            record(ids[0], None),
            record(ids[1], Some(ids[0])),
            record(ids[5], None),
            record(ids[2], Some(ids[0])),
            record(ids[4], Some(ids[5])),
        ];

        let round_trip = flatten_tree(&build_tree(&flat));

        assert_eq!(round_trip.len(), flat.len());
        assert_eq!(topology(&round_trip), topology(&flat));
    }

    #[test]
    fn test_flatten_is_preorder_and_fills_child_ids() {
        let ids = ids(4);
        let flat = vec![
            record(ids[0], None),
            record(ids[1], Some(ids[0])),
            record(ids[2], Some(ids[1])),
            record(ids[3], Some(ids[0])),
        ];

        let round_trip = flatten_tree(&build_tree(&flat));
        let order: Vec<_> = round_trip.iter().map(|r| r.id).collect();
        assert_eq!(order, vec![ids[0], ids[1], ids[2], ids[3]]);
        assert_eq!(round_trip[0].child_ids, vec![ids[1], ids[3]]);
        assert!(round_trip[2].child_ids.is_empty());
    }

    #[test]
    fn test_siblings_keep_input_order() {
        let ids = ids(4);
        let flat = vec![
            record(ids[0], None),
            record(ids[3], Some(ids[0])),
            record(ids[1], Some(ids[0])),
            record(ids[2], Some(ids[0])),
        ];
        let forest = build_tree(&flat);
        let children: Vec<_> = forest[0].children.iter().map(|c| c.id).collect();
        assert_eq!(children, vec![ids[3], ids[1], ids[2]]);
    }

    #[test]
    fn test_orphans_are_dropped_with_their_descendants() {
        let ids = ids(4);
        let ghost = Uuid::from_u128(42);
        let flat = vec![
            record(ids[0], None),
            record(ids[1], Some(ghost)),
            record(ids[2], Some(ids[1])),
            record(ids[3], Some(ids[0])),
        ];

        let forest = build_tree(&flat);
        assert_eq!(count_nodes(&forest), 2);
        assert!(find_by_id(&forest, ids[1]).is_none());
        assert!(find_by_id(&forest, ids[2]).is_none());
    }

    #[test]
    fn test_find_searches_every_root() {
        let ids = ids(4);
        let flat = vec![
            record(ids[0], None),
            record(ids[1], None),
            record(ids[2], Some(ids[1])),
            record(ids[3], Some(ids[2])),
        ];
        let forest = build_tree(&flat);
        assert_eq!(find_by_id(&forest, ids[3]).map(|n| n.id), Some(ids[3]));
        assert!(find_by_id(&forest, Uuid::from_u128(77)).is_none());
    }

    #[test]
    fn test_descendants_are_union_over_children() {
        let ids = ids(6);
        let flat = vec![
            record(ids[0], None),
            record(ids[1], Some(ids[0])),
            record(ids[2], Some(ids[0])),
            record(ids[3], Some(ids[1])),
            record(ids[4], Some(ids[3])),
            record(ids[5], Some(ids[2])),
        ];
        let forest = build_tree(&flat);

        fn check(node: &PipelineNode) {
            let own: HashSet<_> = descendant_ids(node).into_iter().collect();
            assert!(!own.contains(&node.id));
            let mut expected = HashSet::new();
            for child in &node.children {
                expected.insert(child.id);
                expected.extend(descendant_ids(child));
                check(child);
            }
            assert_eq!(own, expected);
        }

        for root in &forest {
            check(root);
        }
    }

    #[test]
    fn test_find_by_id_mut_allows_edits_deep_in_tree() {
        let (ids, flat) = chain();
        let mut forest = build_tree(&flat);

        let c = find_by_id_mut(&mut forest, ids[2]).unwrap();
        c.stage_mut(StageName::Rfq)
            .unwrap()
            .items
            .push(PipelineItem::new("Acme"));

        assert!(find_by_id(&forest, ids[2]).unwrap().has_content());
        assert!(!find_by_id(&forest, ids[0]).unwrap().has_content());
    }

    #[test]
    fn test_validate_forest_reports_problems() {
        let ids = ids(5);
        let ghost = Uuid::from_u128(42);
        let flat = vec![
            record(ids[0], None),
            record(ids[0], None),
            record(ids[1], Some(ghost)),
            record(ids[2], Some(ids[1])),
            record(ids[3], Some(ids[4])),
            record(ids[4], Some(ids[3])),
        ];

        let issues = validate_forest(&flat);

        assert!(issues.contains(&ForestIssue::DuplicateId(ids[0])));
        assert!(issues.contains(&ForestIssue::Orphan {
            id: ids[1],
            parent_id: ghost
        }));
        assert!(!issues.iter().any(|i| matches!(i, ForestIssue::Orphan { id, .. } if *id == ids[2])));
        assert!(issues.contains(&ForestIssue::Cycle(ids[3])));
        assert!(issues.contains(&ForestIssue::Cycle(ids[4])));
    }

    #[test]
    fn test_validate_clean_forest_has_no_issues() {
        let (_, flat) = chain();
        assert!(validate_forest(&flat).is_empty());
    }
}
