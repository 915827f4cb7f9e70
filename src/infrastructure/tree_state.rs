//! Arena-backed tree state manager
//!
//! Stores one [`TreeArena`] per tree and announces every mutation through a
//! [`StatePublisher`], using the tree id as state id.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, instrument};

use crate::domain::{DomainError, NodeDataSchema, NodeId, TreeArena, TreeId, TreeState};
use crate::infrastructure::error::InfraResult;
use crate::infrastructure::traits::{StateChangeHandler, StatePublisher, TreeStateManager};

struct TreeEntry {
    arena: TreeArena,
    /// Held from mutation until its publish completes.
    turn: Arc<Mutex<()>>,
}

/// State manager keeping trees in process memory.
///
/// Changes of one tree are published in mutation order. Handlers may read
/// through [`get_state`](TreeStateManager::get_state) but must not mutate
/// the tree that notified them, or they wait on their own turn.
pub struct ArenaTreeStateManager {
    publisher: Arc<dyn StatePublisher>,
    trees: RwLock<HashMap<TreeId, TreeEntry>>,
}

impl ArenaTreeStateManager {
    pub fn new(publisher: Arc<dyn StatePublisher>) -> Self {
        Self {
            publisher,
            trees: RwLock::new(HashMap::new()),
        }
    }

    pub async fn contains_tree(&self, tree_id: &TreeId) -> bool {
        self.trees.read().await.contains_key(tree_id)
    }

    /// Apply `mutation` to the tree and publish the resulting change.
    ///
    /// The map lock is released before publishing; the tree's turn is not.
    async fn mutate<F>(&self, tree_id: &TreeId, mutation: F) -> InfraResult<()>
    where
        F: FnOnce(&mut TreeArena) -> Result<(), DomainError> + Send,
    {
        let turn = {
            let trees = self.trees.read().await;
            let entry = trees
                .get(tree_id)
                .ok_or_else(|| DomainError::TreeNotFound(tree_id.clone()))?;
            Arc::clone(&entry.turn)
        };
        let _turn = turn.lock().await;

        let (old_state, new_state) = {
            let mut trees = self.trees.write().await;
            let entry = trees
                .get_mut(tree_id)
                .ok_or_else(|| DomainError::TreeNotFound(tree_id.clone()))?;
            let old_state = entry.arena.snapshot();
            mutation(&mut entry.arena)?;
            (old_state, entry.arena.snapshot())
        };
        debug!(%tree_id, version = new_state.version, "tree state changed");
        self.publisher
            .publish(tree_id.as_str(), Some(Arc::new(old_state)), Arc::new(new_state))
            .await
    }
}

#[async_trait]
impl TreeStateManager for ArenaTreeStateManager {
    #[instrument(level = "debug", skip(self, node_data_schema), fields(tree_id = %tree_id))]
    async fn create_tree(
        &self,
        tree_id: &TreeId,
        node_data_schema: &NodeDataSchema,
    ) -> InfraResult<()> {
        let (initial, _turn) = {
            let mut trees = self.trees.write().await;
            if trees.contains_key(tree_id) {
                return Err(DomainError::DuplicateTree(tree_id.clone()).into());
            }
            let arena = TreeArena::new(tree_id.clone(), node_data_schema.clone());
            let initial = arena.snapshot();
            let turn = Arc::new(Mutex::new(()));
            let guard = Arc::clone(&turn).lock_owned().await;
            trees.insert(tree_id.clone(), TreeEntry { arena, turn });
            (initial, guard)
        };
        self.publisher
            .publish(tree_id.as_str(), None, Arc::new(initial))
            .await
    }

    #[instrument(
        level = "debug",
        skip(self, node_data),
        fields(tree_id = %tree_id, node_id = %node_id)
    )]
    async fn append_node_to_root(
        &self,
        tree_id: &TreeId,
        node_id: &NodeId,
        node_data: &Value,
        expanded: bool,
    ) -> InfraResult<()> {
        let node_id = node_id.clone();
        let node_data = node_data.clone();
        self.mutate(tree_id, move |tree| {
            tree.insert_node(node_id, node_data, expanded, None).map(|_| ())
        })
        .await
    }

    #[instrument(
        level = "debug",
        skip(self, node_data),
        fields(tree_id = %tree_id, parent_node_id = %parent_node_id, node_id = %node_id)
    )]
    async fn append_node_to_parent_node(
        &self,
        tree_id: &TreeId,
        parent_node_id: &NodeId,
        node_id: &NodeId,
        node_data: &Value,
        expanded: bool,
    ) -> InfraResult<()> {
        let parent_node_id = parent_node_id.clone();
        let node_id = node_id.clone();
        let node_data = node_data.clone();
        self.mutate(tree_id, move |tree| {
            tree.insert_node(node_id, node_data, expanded, Some(&parent_node_id))
                .map(|_| ())
        })
        .await
    }

    #[instrument(level = "debug", skip(self), fields(tree_id = %tree_id, node_id = %node_id))]
    async fn toggle_node_status_expanded(
        &self,
        tree_id: &TreeId,
        node_id: &NodeId,
    ) -> InfraResult<()> {
        let node_id = node_id.clone();
        self.mutate(tree_id, move |tree| tree.toggle_expanded(&node_id).map(|_| ()))
            .await
    }

    async fn get_state(&self, tree_id: &TreeId) -> InfraResult<Arc<TreeState>> {
        let trees = self.trees.read().await;
        let entry = trees
            .get(tree_id)
            .ok_or_else(|| DomainError::TreeNotFound(tree_id.clone()))?;
        Ok(Arc::new(entry.arena.snapshot()))
    }

    #[instrument(level = "debug", skip(self, on_change), fields(tree_id = %tree_id))]
    async fn subscribe_to_state_changed(
        &self,
        subscriber_id: &str,
        tree_id: &TreeId,
        on_change: StateChangeHandler,
    ) -> InfraResult<()> {
        if !self.contains_tree(tree_id).await {
            return Err(DomainError::TreeNotFound(tree_id.clone()).into());
        }
        self.publisher
            .subscribe(subscriber_id, tree_id.as_str(), on_change)
            .await
    }
}
