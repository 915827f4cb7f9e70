//! Collaborator capability traits
//!
//! The orchestrator only talks to these traits, so any publisher, state
//! manager or renderer can be injected, including mocks in tests.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::domain::{NodeDataSchema, NodeId, StateChanged, TreeId, TreeState};
use crate::infrastructure::error::InfraResult;

/// Callback invoked with every published state change.
pub type StateChangeHandler =
    Arc<dyn Fn(StateChanged) -> BoxFuture<'static, InfraResult<()>> + Send + Sync>;

/// Publish/subscribe broadcaster for state snapshots.
#[async_trait]
pub trait StatePublisher: Send + Sync {
    /// Notify all subscribers of `state_id`.
    async fn publish(
        &self,
        state_id: &str,
        old_state: Option<Arc<TreeState>>,
        new_state: Arc<TreeState>,
    ) -> InfraResult<()>;

    /// Register `on_change` for `state_id` under `subscriber_id`.
    async fn subscribe(
        &self,
        subscriber_id: &str,
        state_id: &str,
        on_change: StateChangeHandler,
    ) -> InfraResult<()>;

    /// Remove the registration of `subscriber_id` for `state_id`.
    async fn unsubscribe(&self, subscriber_id: &str, state_id: &str) -> InfraResult<()>;
}

/// Owner of the authoritative state of all trees.
#[async_trait]
pub trait TreeStateManager: Send + Sync {
    async fn create_tree(
        &self,
        tree_id: &TreeId,
        node_data_schema: &NodeDataSchema,
    ) -> InfraResult<()>;

    async fn append_node_to_root(
        &self,
        tree_id: &TreeId,
        node_id: &NodeId,
        node_data: &Value,
        expanded: bool,
    ) -> InfraResult<()>;

    async fn append_node_to_parent_node(
        &self,
        tree_id: &TreeId,
        parent_node_id: &NodeId,
        node_id: &NodeId,
        node_data: &Value,
        expanded: bool,
    ) -> InfraResult<()>;

    async fn toggle_node_status_expanded(
        &self,
        tree_id: &TreeId,
        node_id: &NodeId,
    ) -> InfraResult<()>;

    async fn get_state(&self, tree_id: &TreeId) -> InfraResult<Arc<TreeState>>;

    /// Register `on_change` for changes of `tree_id`.
    async fn subscribe_to_state_changed(
        &self,
        subscriber_id: &str,
        tree_id: &TreeId,
        on_change: StateChangeHandler,
    ) -> InfraResult<()>;
}

/// Turns a tree snapshot into a visual presentation on a target `T`.
#[async_trait]
pub trait TreeElementRenderer<T>: Send + Sync
where
    T: Send + Sync,
{
    /// Identity used as subscriber id for change notifications.
    fn name(&self) -> &str;

    async fn render(&self, parent_element: &T, tree_state: Arc<TreeState>) -> InfraResult<()>;
}
