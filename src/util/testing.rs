//! Test support: logging setup and recording collaborator doubles

use std::env;
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::{NodeDataSchema, NodeId, StateChanged, TreeId, TreeState};
use crate::infrastructure::traits::{StateChangeHandler, TreeElementRenderer, TreeStateManager};
use crate::infrastructure::{InfraError, InfraResult};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("livetree=debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_test_writer()
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else if let Err(e) = subscriber.try_init() {
        eprintln!("Error: Failed to set up logging: {} (RUST_LOG={:?})", e, env::var("RUST_LOG"));
    }
}

/// One collaborator call observed by a recording double.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateTree {
        tree_id: TreeId,
        schema: NodeDataSchema,
    },
    AppendToRoot {
        tree_id: TreeId,
        node_id: NodeId,
        node_data: Value,
        expanded: bool,
    },
    AppendToParent {
        tree_id: TreeId,
        parent_id: NodeId,
        node_id: NodeId,
        node_data: Value,
        expanded: bool,
    },
    Toggle {
        tree_id: TreeId,
        node_id: NodeId,
    },
    GetState {
        tree_id: TreeId,
    },
    Subscribe {
        subscriber_id: String,
        tree_id: TreeId,
    },
    Render {
        target: String,
        version: u64,
    },
}

impl Call {
    pub fn operation(&self) -> &'static str {
        match self {
            Call::CreateTree { .. } => "create_tree",
            Call::AppendToRoot { .. } => "append_node_to_root",
            Call::AppendToParent { .. } => "append_node_to_parent_node",
            Call::Toggle { .. } => "toggle_node_status_expanded",
            Call::GetState { .. } => "get_state",
            Call::Subscribe { .. } => "subscribe_to_state_changed",
            Call::Render { .. } => "render",
        }
    }
}

/// Ordered log shared by all doubles of one test.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: Call) -> usize {
        let mut calls = self.0.lock().unwrap_or_else(|e| e.into_inner());
        let occurrence = calls
            .iter()
            .filter(|c| c.operation() == call.operation())
            .count();
        calls.push(call);
        occurrence
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Operation names in call order.
    pub fn operations(&self) -> Vec<&'static str> {
        self.calls().iter().map(Call::operation).collect()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.operations().into_iter().filter(|op| *op == operation).count()
    }
}

#[derive(Debug, Clone, Copy)]
struct Failure {
    operation: &'static str,
    occurrence: usize,
}

fn injected(operation: &str) -> InfraError {
    InfraError::Other(format!("injected failure in {operation}").into())
}

/// State manager double recording every call into a [`CallLog`].
///
/// Calls are recorded even when they are made to fail.
pub struct RecordingStateManager {
    log: CallLog,
    failure: Option<Failure>,
    version: Mutex<u64>,
    handlers: Mutex<Vec<StateChangeHandler>>,
}

impl RecordingStateManager {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            failure: None,
            version: Mutex::new(0),
            handlers: Mutex::new(Vec::new()),
        }
    }

    /// Fail the `occurrence`-th (0-based) call of `operation`.
    pub fn failing_on(mut self, operation: &'static str, occurrence: usize) -> Self {
        self.failure = Some(Failure {
            operation,
            occurrence,
        });
        self
    }

    fn check(&self, call: Call) -> InfraResult<()> {
        let operation = call.operation();
        let occurrence = self.log.record(call);
        match self.failure {
            Some(f) if f.operation == operation && f.occurrence == occurrence => {
                Err(injected(operation))
            }
            _ => Ok(()),
        }
    }

    fn bump(&self) -> u64 {
        let mut version = self.version.lock().unwrap_or_else(|e| e.into_inner());
        *version += 1;
        *version
    }

    fn current(&self, tree_id: &TreeId) -> TreeState {
        TreeState {
            version: *self.version.lock().unwrap_or_else(|e| e.into_inner()),
            ..TreeState::empty(tree_id.clone())
        }
    }

    /// Deliver a change to every registered handler, as a publisher would.
    pub async fn notify(&self, tree_id: &TreeId) -> InfraResult<()> {
        let old_state = Arc::new(self.current(tree_id));
        self.bump();
        let new_state = Arc::new(self.current(tree_id));
        let handlers: Vec<StateChangeHandler> = self
            .handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for handler in handlers {
            handler(StateChanged {
                state_id: tree_id.to_string(),
                old_state: Some(Arc::clone(&old_state)),
                new_state: Arc::clone(&new_state),
            })
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl TreeStateManager for RecordingStateManager {
    async fn create_tree(
        &self,
        tree_id: &TreeId,
        node_data_schema: &NodeDataSchema,
    ) -> InfraResult<()> {
        self.check(Call::CreateTree {
            tree_id: tree_id.clone(),
            schema: node_data_schema.clone(),
        })
    }

    async fn append_node_to_root(
        &self,
        tree_id: &TreeId,
        node_id: &NodeId,
        node_data: &Value,
        expanded: bool,
    ) -> InfraResult<()> {
        self.check(Call::AppendToRoot {
            tree_id: tree_id.clone(),
            node_id: node_id.clone(),
            node_data: node_data.clone(),
            expanded,
        })?;
        self.bump();
        Ok(())
    }

    async fn append_node_to_parent_node(
        &self,
        tree_id: &TreeId,
        parent_node_id: &NodeId,
        node_id: &NodeId,
        node_data: &Value,
        expanded: bool,
    ) -> InfraResult<()> {
        self.check(Call::AppendToParent {
            tree_id: tree_id.clone(),
            parent_id: parent_node_id.clone(),
            node_id: node_id.clone(),
            node_data: node_data.clone(),
            expanded,
        })?;
        self.bump();
        Ok(())
    }

    async fn toggle_node_status_expanded(
        &self,
        tree_id: &TreeId,
        node_id: &NodeId,
    ) -> InfraResult<()> {
        self.check(Call::Toggle {
            tree_id: tree_id.clone(),
            node_id: node_id.clone(),
        })?;
        self.bump();
        Ok(())
    }

    async fn get_state(&self, tree_id: &TreeId) -> InfraResult<Arc<TreeState>> {
        self.check(Call::GetState {
            tree_id: tree_id.clone(),
        })?;
        Ok(Arc::new(self.current(tree_id)))
    }

    async fn subscribe_to_state_changed(
        &self,
        subscriber_id: &str,
        tree_id: &TreeId,
        on_change: StateChangeHandler,
    ) -> InfraResult<()> {
        self.check(Call::Subscribe {
            subscriber_id: subscriber_id.to_string(),
            tree_id: tree_id.clone(),
        })?;
        self.handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(on_change);
        Ok(())
    }
}

/// Renderer double drawing onto `String` targets.
pub struct RecordingRenderer {
    name: String,
    log: CallLog,
    fail: bool,
}

impl RecordingRenderer {
    pub fn new(name: impl Into<String>, log: CallLog) -> Self {
        Self {
            name: name.into(),
            log,
            fail: false,
        }
    }

    /// Make every render call fail.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl TreeElementRenderer<String> for RecordingRenderer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn render(&self, parent_element: &String, tree_state: Arc<TreeState>) -> InfraResult<()> {
        self.log.record(Call::Render {
            target: parent_element.clone(),
            version: tree_state.version,
        });
        if self.fail {
            return Err(InfraError::render(&self.name, "injected failure in render"));
        }
        Ok(())
    }
}

/// Handler accepting every change without side effects.
pub fn noop_handler() -> StateChangeHandler {
    Arc::new(|_| futures::future::ok::<(), InfraError>(()).boxed())
}
