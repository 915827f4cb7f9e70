//! Tree orchestration service
//!
//! Creates a tree in the state manager, streams nodes into it and keeps the
//! renderer subscribed to every later change.

use std::convert::Infallible;
use std::sync::Arc;

use futures::{pin_mut, FutureExt, Stream, StreamExt};
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{NodeDataSchema, StateChanged, TreeId, TreeNode};
use crate::infrastructure::traits::{
    StateChangeHandler, StatePublisher, TreeElementRenderer, TreeStateManager,
};
use crate::infrastructure::InfraError;

/// Facade over a publisher, a tree state manager and a renderer.
///
/// `T` is the render target handle handed to the renderer.
pub struct TreeOrchestrator<T> {
    state_publisher: Arc<dyn StatePublisher>,
    tree_state_manager: Arc<dyn TreeStateManager>,
    tree_element_renderer: Arc<dyn TreeElementRenderer<T>>,
}

impl<T> TreeOrchestrator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub const NAME: &'static str = "livetree";

    pub fn new(
        state_publisher: Arc<dyn StatePublisher>,
        tree_state_manager: Arc<dyn TreeStateManager>,
        tree_element_renderer: Arc<dyn TreeElementRenderer<T>>,
    ) -> Self {
        Self {
            state_publisher,
            tree_state_manager,
            tree_element_renderer,
        }
    }

    /// Publisher the state manager is expected to be built on.
    pub fn state_publisher(&self) -> &Arc<dyn StatePublisher> {
        &self.state_publisher
    }

    /// Create `tree_id` and return the populator that fills and renders it.
    ///
    /// The tree is created before this returns; nothing is rendered until the
    /// populator runs. Creating an existing tree fails with whatever error the
    /// state manager reports for duplicates.
    #[instrument(
        level = "debug",
        skip(self, parent_element, node_data_schema),
        fields(tree_id = %tree_id)
    )]
    pub async fn prepare(
        &self,
        parent_element: T,
        tree_id: TreeId,
        node_data_schema: &NodeDataSchema,
        expand_nodes_on_render: bool,
    ) -> ApplicationResult<TreePopulator<T>> {
        self.tree_state_manager
            .create_tree(&tree_id, node_data_schema)
            .await
            .map_err(|source| ApplicationError::Collaborator {
                operation: "create_tree",
                tree_id: tree_id.clone(),
                source,
            })?;
        debug!("tree created");

        Ok(TreePopulator {
            parent_element,
            tree_id,
            expand_nodes_on_render,
            tree_state_manager: Arc::clone(&self.tree_state_manager),
            tree_element_renderer: Arc::clone(&self.tree_element_renderer),
        })
    }

    /// [`prepare`](Self::prepare) with nodes collapsed on insertion.
    pub async fn prepare_default(
        &self,
        parent_element: T,
        tree_id: TreeId,
        node_data_schema: &NodeDataSchema,
    ) -> ApplicationResult<TreePopulator<T>> {
        self.prepare(parent_element, tree_id, node_data_schema, false)
            .await
    }
}

/// Population callback returned by [`TreeOrchestrator::prepare`].
#[derive(Clone)]
pub struct TreePopulator<T> {
    parent_element: T,
    tree_id: TreeId,
    expand_nodes_on_render: bool,
    tree_state_manager: Arc<dyn TreeStateManager>,
    tree_element_renderer: Arc<dyn TreeElementRenderer<T>>,
}

impl<T> TreePopulator<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Insert every node of `tree_nodes`, then subscribe the renderer and draw once.
    pub async fn populate<S>(&self, tree_nodes: S) -> ApplicationResult<()>
    where
        S: Stream<Item = TreeNode>,
    {
        self.try_populate(tree_nodes.map(Ok::<_, Infallible>)).await
    }

    /// [`populate`](Self::populate) over a finite collection.
    pub async fn populate_iter<I>(&self, tree_nodes: I) -> ApplicationResult<()>
    where
        I: IntoIterator<Item = TreeNode>,
    {
        self.populate(futures::stream::iter(tree_nodes)).await
    }

    /// Like [`populate`](Self::populate) for sources that can fail.
    ///
    /// Nodes are inserted one at a time in arrival order, each insertion
    /// awaited before the next item is pulled. The subscription and the
    /// initial render only happen once the stream is exhausted. The first
    /// error, from the source or a collaborator, ends the run; nodes inserted
    /// before it stay in the tree.
    #[instrument(level = "debug", skip(self, tree_nodes), fields(tree_id = %self.tree_id))]
    pub async fn try_populate<S, E>(&self, tree_nodes: S) -> ApplicationResult<()>
    where
        S: Stream<Item = Result<TreeNode, E>>,
        E: Into<ApplicationError>,
    {
        pin_mut!(tree_nodes);
        let mut inserted = 0usize;
        while let Some(item) = tree_nodes.next().await {
            let tree_node = item.map_err(Into::into)?;
            self.insert(&tree_node).await?;
            inserted += 1;
        }
        debug!(inserted, "node stream exhausted");

        self.subscribe_renderer().await?;

        let tree_state = self
            .tree_state_manager
            .get_state(&self.tree_id)
            .await
            .map_err(|e| self.failed("get_state", e))?;
        self.tree_element_renderer
            .render(&self.parent_element, tree_state)
            .await
            .map_err(|e| self.failed("render", e))
    }

    async fn insert(&self, tree_node: &TreeNode) -> ApplicationResult<()> {
        match &tree_node.parent_id {
            None => self
                .tree_state_manager
                .append_node_to_root(
                    &self.tree_id,
                    &tree_node.node_id,
                    &tree_node.node_data,
                    self.expand_nodes_on_render,
                )
                .await
                .map_err(|e| self.failed("append_node_to_root", e)),
            Some(parent_id) => self
                .tree_state_manager
                .append_node_to_parent_node(
                    &self.tree_id,
                    parent_id,
                    &tree_node.node_id,
                    &tree_node.node_data,
                    self.expand_nodes_on_render,
                )
                .await
                .map_err(|e| self.failed("append_node_to_parent_node", e)),
        }
    }

    async fn subscribe_renderer(&self) -> ApplicationResult<()> {
        let renderer = Arc::clone(&self.tree_element_renderer);
        let parent_element = self.parent_element.clone();
        let on_change: StateChangeHandler = Arc::new(move |change: StateChanged| {
            let renderer = Arc::clone(&renderer);
            let parent_element = parent_element.clone();
            async move { renderer.render(&parent_element, change.new_state).await }.boxed()
        });

        self.tree_state_manager
            .subscribe_to_state_changed(self.tree_element_renderer.name(), &self.tree_id, on_change)
            .await
            .map_err(|e| self.failed("subscribe_to_state_changed", e))
    }

    fn failed(&self, operation: &'static str, source: InfraError) -> ApplicationError {
        debug!(operation, error = %source, "collaborator call failed");
        ApplicationError::Collaborator {
            operation,
            tree_id: self.tree_id.clone(),
            source,
        }
    }
}
