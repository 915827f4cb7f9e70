//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::entities::{NodeId, TreeId};

/// Domain errors represent tree-state rule violations.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("tree already exists: {0}")]
    DuplicateTree(TreeId),

    #[error("tree not found: {0}")]
    TreeNotFound(TreeId),

    #[error("node already exists in tree {tree_id}: {node_id}")]
    DuplicateNode { tree_id: TreeId, node_id: NodeId },

    #[error("parent node not found in tree {tree_id}: {parent_id} (child {node_id})")]
    ParentNotFound {
        tree_id: TreeId,
        parent_id: NodeId,
        node_id: NodeId,
    },

    #[error("node not found in tree {tree_id}: {node_id}")]
    NodeNotFound { tree_id: TreeId, node_id: NodeId },

    #[error("node data for {node_id} violates schema: {reason}")]
    SchemaViolation { node_id: NodeId, reason: String },
}
