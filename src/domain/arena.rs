use std::collections::HashMap;

use generational_arena::{Arena, Index};
use serde_json::Value;
use tracing::instrument;

use crate::domain::entities::{NodeDataSchema, NodeId, NodeState, TreeId, TreeState};
use crate::domain::error::DomainError;

/// Node stored in the arena.
#[derive(Debug)]
pub struct ArenaNode {
    pub node_id: NodeId,
    pub node_data: Value,
    pub expanded: bool,
    /// Indices of child nodes in insertion order
    pub children: Vec<Index>,
}

/// Arena-based storage for one tree.
///
/// A tree may carry any number of roots. Node ids map to arena indices for
/// O(1) parent lookup during appends.
#[derive(Debug)]
pub struct TreeArena {
    tree_id: TreeId,
    schema: NodeDataSchema,
    arena: Arena<ArenaNode>,
    roots: Vec<Index>,
    index: HashMap<NodeId, Index>,
    version: u64,
}

impl TreeArena {
    pub fn new(tree_id: TreeId, schema: NodeDataSchema) -> Self {
        Self {
            tree_id,
            schema,
            arena: Arena::new(),
            roots: Vec::new(),
            index: HashMap::new(),
            version: 0,
        }
    }

    /// Insert a node below `parent`, or as a new root when `parent` is `None`.
    #[instrument(level = "trace", skip(self, node_data), fields(tree_id = %self.tree_id))]
    pub fn insert_node(
        &mut self,
        node_id: NodeId,
        node_data: Value,
        expanded: bool,
        parent: Option<&NodeId>,
    ) -> Result<Index, DomainError> {
        if self.index.contains_key(&node_id) {
            return Err(DomainError::DuplicateNode {
                tree_id: self.tree_id.clone(),
                node_id,
            });
        }
        let parent_idx = match parent {
            Some(parent_id) => Some(*self.index.get(parent_id).ok_or_else(|| {
                DomainError::ParentNotFound {
                    tree_id: self.tree_id.clone(),
                    parent_id: parent_id.clone(),
                    node_id: node_id.clone(),
                }
            })?),
            None => None,
        };
        self.schema.validate(&node_id, &node_data)?;

        let node_idx = self.arena.insert(ArenaNode {
            node_id: node_id.clone(),
            node_data,
            expanded,
            children: Vec::new(),
        });
        match parent_idx.and_then(|idx| self.arena.get_mut(idx)) {
            Some(parent) => parent.children.push(node_idx),
            None => self.roots.push(node_idx),
        }
        self.index.insert(node_id, node_idx);
        self.version += 1;

        Ok(node_idx)
    }

    /// Flip the expanded flag and return the new value.
    #[instrument(level = "trace", skip(self), fields(tree_id = %self.tree_id))]
    pub fn toggle_expanded(&mut self, node_id: &NodeId) -> Result<bool, DomainError> {
        let node = self
            .index
            .get(node_id)
            .and_then(|idx| self.arena.get_mut(*idx))
            .ok_or_else(|| DomainError::NodeNotFound {
                tree_id: self.tree_id.clone(),
                node_id: node_id.clone(),
            })?;
        node.expanded = !node.expanded;
        self.version += 1;
        Ok(node.expanded)
    }

    /// Build an immutable snapshot of the whole tree.
    #[instrument(level = "trace", skip(self), fields(tree_id = %self.tree_id))]
    pub fn snapshot(&self) -> TreeState {
        TreeState {
            tree_id: self.tree_id.clone(),
            version: self.version,
            roots: self
                .roots
                .iter()
                .filter_map(|&idx| self.snapshot_node(idx))
                .collect(),
        }
    }

    fn snapshot_node(&self, idx: Index) -> Option<NodeState> {
        let node = self.arena.get(idx)?;
        Some(NodeState {
            node_id: node.node_id.clone(),
            node_data: node.node_data.clone(),
            expanded: node.expanded,
            children: node
                .children
                .iter()
                .filter_map(|&child| self.snapshot_node(child))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn arena() -> TreeArena {
        let mut arena = TreeArena::new(TreeId::from("t"), NodeDataSchema::any());
        arena.insert_node("a".into(), json!({}), false, None).unwrap();
        arena.insert_node("b".into(), json!({}), false, Some(&"a".into())).unwrap();
        arena.insert_node("c".into(), json!({}), true, Some(&"b".into())).unwrap();
        arena.insert_node("d".into(), json!({}), false, None).unwrap();
        arena
    }

    #[rstest]
    fn given_existing_id_when_inserting_then_rejects_duplicate(mut arena: TreeArena) {
        let err = arena.insert_node("b".into(), json!({}), false, None).unwrap_err();
        assert!(matches!(err, DomainError::DuplicateNode { .. }));
        assert_eq!(arena.snapshot().version, 4);
    }

    #[rstest]
    fn given_unknown_parent_when_inserting_then_rejects(mut arena: TreeArena) {
        let err = arena
            .insert_node("x".into(), json!({}), false, Some(&"missing".into()))
            .unwrap_err();
        assert!(matches!(err, DomainError::ParentNotFound { .. }));
        assert!(arena.snapshot().find(&"x".into()).is_none());
    }

    #[rstest]
    fn given_node_when_toggling_then_flips_expanded(mut arena: TreeArena) {
        assert!(arena.toggle_expanded(&"a".into()).unwrap());
        assert!(!arena.toggle_expanded(&"a".into()).unwrap());
        assert!(matches!(
            arena.toggle_expanded(&"nope".into()),
            Err(DomainError::NodeNotFound { .. })
        ));
        assert_eq!(arena.snapshot().version, 6);
    }

    #[rstest]
    fn given_nodes_when_snapshotting_then_nests_children_in_order(arena: TreeArena) {
        let state = arena.snapshot();
        assert_eq!(state.version, 4);
        assert_eq!(state.roots.len(), 2);
        assert_eq!(state.roots[0].children[0].node_id, NodeId::from("b"));
        assert!(state.roots[0].children[0].children[0].expanded);
        assert_eq!(state.roots[1].node_id, NodeId::from("d"));
        assert_eq!(state.node_count(), 4);
    }

    #[test]
    fn given_new_arena_when_snapshotting_then_state_is_empty() {
        let arena = TreeArena::new(TreeId::from("t"), NodeDataSchema::any());
        let state = arena.snapshot();
        assert!(state.is_empty());
        assert_eq!(state.version, 0);
    }
}
