//! Domain entities: core data structures

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::error::DomainError;

/// Caller-supplied key identifying one logical tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeId(String);

impl TreeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TreeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TreeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Identifier of a node, unique within its tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A node as delivered by a node source.
///
/// The JSON shape is `{"parentId": null, "nodeId": "a", "nodeData": {..}}`.
/// A missing, `null` or empty `parentId` marks a root-level node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    #[serde(default, deserialize_with = "deserialize_parent_id")]
    pub parent_id: Option<NodeId>,
    pub node_id: NodeId,
    #[serde(default)]
    pub node_data: Value,
}

impl TreeNode {
    pub fn root(node_id: impl Into<NodeId>, node_data: Value) -> Self {
        Self {
            parent_id: None,
            node_id: node_id.into(),
            node_data,
        }
    }

    pub fn child(
        parent_id: impl Into<NodeId>,
        node_id: impl Into<NodeId>,
        node_data: Value,
    ) -> Self {
        Self {
            parent_id: Some(parent_id.into()),
            node_id: node_id.into(),
            node_data,
        }
    }
}

fn deserialize_parent_id<'de, D>(deserializer: D) -> Result<Option<NodeId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|id| !id.is_empty()).map(NodeId::from))
}

/// Schema descriptor for node payloads.
///
/// Opaque to the orchestrator. The arena state manager understands a small
/// JSON-schema subset: an object schema with a `required` key list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeDataSchema(Value);

impl NodeDataSchema {
    pub fn new(schema: Value) -> Self {
        Self(schema)
    }

    /// Schema accepting any payload.
    pub fn any() -> Self {
        Self(Value::Null)
    }

    /// Keys every node payload must carry.
    pub fn required_keys(&self) -> Vec<&str> {
        self.0
            .get("required")
            .and_then(Value::as_array)
            .map(|keys| keys.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    fn expects_object(&self) -> bool {
        self.0.get("type").and_then(Value::as_str) == Some("object")
            || !self.required_keys().is_empty()
    }

    /// Check a node payload against this schema.
    pub fn validate(&self, node_id: &NodeId, node_data: &Value) -> Result<(), DomainError> {
        if !self.expects_object() {
            return Ok(());
        }
        let Some(object) = node_data.as_object() else {
            return Err(DomainError::SchemaViolation {
                node_id: node_id.clone(),
                reason: "node data must be an object".into(),
            });
        };
        if let Some(missing) = self
            .required_keys()
            .into_iter()
            .find(|key| !object.contains_key(*key))
        {
            return Err(DomainError::SchemaViolation {
                node_id: node_id.clone(),
                reason: format!("missing required key '{missing}'"),
            });
        }
        Ok(())
    }
}

/// One node inside a [`TreeState`] snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub node_id: NodeId,
    pub node_data: Value,
    pub expanded: bool,
    pub children: Vec<NodeState>,
}

impl NodeState {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Immutable snapshot of one tree, produced by the state manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeState {
    pub tree_id: TreeId,
    /// Mutation counter, `0` right after creation.
    pub version: u64,
    pub roots: Vec<NodeState>,
}

impl TreeState {
    pub fn empty(tree_id: TreeId) -> Self {
        Self {
            tree_id,
            version: 0,
            roots: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of nodes, collapsed subtrees included.
    pub fn node_count(&self) -> usize {
        fn count(nodes: &[NodeState]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.children)).sum()
        }
        count(&self.roots)
    }

    /// Depth-first lookup by node id.
    pub fn find(&self, node_id: &NodeId) -> Option<&NodeState> {
        fn search<'a>(nodes: &'a [NodeState], node_id: &NodeId) -> Option<&'a NodeState> {
            nodes.iter().find_map(|n| {
                if &n.node_id == node_id {
                    Some(n)
                } else {
                    search(&n.children, node_id)
                }
            })
        }
        search(&self.roots, node_id)
    }
}

/// Change notification delivered to subscribers.
#[derive(Debug, Clone)]
pub struct StateChanged {
    pub state_id: String,
    /// `None` for the first state published under `state_id`.
    pub old_state: Option<Arc<TreeState>>,
    pub new_state: Arc<TreeState>,
}
