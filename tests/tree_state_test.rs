//! Tests for ArenaTreeStateManager and the default collaborators wired together

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use rstest::{fixture, rstest};
use serde_json::json;

use livetree::config::{RendererSettings, Settings};
use livetree::domain::{DomainError, NodeDataSchema, NodeId, StateChanged, TreeId, TreeNode};
use livetree::infrastructure::di::ServiceContainer;
use livetree::infrastructure::{
    ArenaTreeStateManager, InMemoryStatePublisher, InfraError, StatePublisher, TextSurface,
    TreeStateManager,
};
use livetree::util::testing;

struct Manager {
    publisher: Arc<InMemoryStatePublisher>,
    manager: ArenaTreeStateManager,
}

#[fixture]
fn manager() -> Manager {
    testing::init_test_setup();
    let publisher = Arc::new(InMemoryStatePublisher::new());
    let manager = ArenaTreeStateManager::new(Arc::clone(&publisher) as Arc<dyn StatePublisher>);
    Manager { publisher, manager }
}

fn tree() -> TreeId {
    TreeId::from("t")
}

fn plain_settings() -> Settings {
    Settings {
        expand_nodes_on_render: false,
        renderer: RendererSettings {
            color: false,
            ..RendererSettings::default()
        },
    }
}

// ============================================================
// ArenaTreeStateManager
// ============================================================

#[rstest]
#[tokio::test]
async fn given_existing_tree_when_creating_again_then_rejects_duplicate(manager: Manager) {
    let m = manager.manager;
    m.create_tree(&tree(), &NodeDataSchema::any()).await.unwrap();

    let err = m.create_tree(&tree(), &NodeDataSchema::any()).await.unwrap_err();

    assert_eq!(err.domain(), Some(&DomainError::DuplicateTree(tree())));
}

#[rstest]
#[tokio::test]
async fn given_unknown_tree_when_mutating_or_reading_then_reports_tree_not_found(manager: Manager) {
    let m = manager.manager;
    let missing = DomainError::TreeNotFound(tree());

    let append = m
        .append_node_to_root(&tree(), &NodeId::from("a"), &json!({}), false)
        .await
        .unwrap_err();
    let read = m.get_state(&tree()).await.unwrap_err();

    assert_eq!(append.domain(), Some(&missing));
    assert_eq!(read.domain(), Some(&missing));
}

#[rstest]
#[tokio::test]
async fn given_child_before_parent_when_appending_then_reports_parent_not_found(manager: Manager) {
    let m = manager.manager;
    m.create_tree(&tree(), &NodeDataSchema::any()).await.unwrap();

    let err = m
        .append_node_to_parent_node(&tree(), &"p".into(), &"c".into(), &json!({}), false)
        .await
        .unwrap_err();

    assert!(matches!(err.domain(), Some(DomainError::ParentNotFound { .. })));
    assert!(m.get_state(&tree()).await.unwrap().is_empty());
}

#[rstest]
#[tokio::test]
async fn given_required_field_missing_when_appending_then_reports_schema_violation(
    manager: Manager,
) {
    let m = manager.manager;
    let schema = NodeDataSchema::new(json!({"type": "object", "required": ["title"]}));
    m.create_tree(&tree(), &schema).await.unwrap();

    let err = m
        .append_node_to_root(&tree(), &"a".into(), &json!({"size": 3}), false)
        .await
        .unwrap_err();

    assert!(matches!(err.domain(), Some(DomainError::SchemaViolation { .. })));
}

#[rstest]
#[tokio::test]
async fn given_nodes_when_reading_state_then_snapshot_reflects_hierarchy(manager: Manager) {
    let m = manager.manager;
    m.create_tree(&tree(), &NodeDataSchema::any()).await.unwrap();
    m.append_node_to_root(&tree(), &"a".into(), &json!({"title": "A"}), true)
        .await
        .unwrap();
    m.append_node_to_parent_node(&tree(), &"a".into(), &"b".into(), &json!({}), false)
        .await
        .unwrap();
    m.toggle_node_status_expanded(&tree(), &"a".into()).await.unwrap();

    let state = m.get_state(&tree()).await.unwrap();

    assert_eq!(state.version, 3);
    assert_eq!(state.node_count(), 2);
    let root = state.find(&"a".into()).unwrap();
    assert!(!root.expanded);
    assert_eq!(root.children[0].node_id, NodeId::from("b"));
}

#[rstest]
#[tokio::test]
async fn given_unknown_tree_when_subscribing_then_rejects_without_registering(manager: Manager) {
    let handler = testing::noop_handler();

    let err = manager
        .manager
        .subscribe_to_state_changed("r", &tree(), handler)
        .await
        .unwrap_err();

    assert!(matches!(err.domain(), Some(DomainError::TreeNotFound(_))));
    assert_eq!(manager.publisher.subscriber_count("t").await, 0);
}

#[tokio::test]
async fn given_slow_handler_when_mutating_concurrently_then_changes_arrive_in_mutation_order() {
    // Arrange
    testing::init_test_setup();
    let publisher: Arc<dyn StatePublisher> = Arc::new(InMemoryStatePublisher::new());
    let manager = Arc::new(ArenaTreeStateManager::new(publisher));
    manager.create_tree(&tree(), &NodeDataSchema::any()).await.unwrap();
    let delivered: Arc<Mutex<Vec<u64>>> = Arc::default();
    let seen = Arc::clone(&delivered);
    manager
        .subscribe_to_state_changed(
            "slow",
            &tree(),
            Arc::new(move |change: StateChanged| {
                let seen = Arc::clone(&seen);
                async move {
                    if change.new_state.version == 1 {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                    seen.lock().unwrap().push(change.new_state.version);
                    Ok::<(), InfraError>(())
                }
                .boxed()
            }),
        )
        .await
        .unwrap();

    // Act
    let first = tokio::spawn({
        let manager = Arc::clone(&manager);
        async move {
            manager
                .append_node_to_root(&tree(), &"a".into(), &json!({}), false)
                .await
        }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    let second = tokio::spawn({
        let manager = Arc::clone(&manager);
        async move {
            manager
                .append_node_to_root(&tree(), &"b".into(), &json!({}), false)
                .await
        }
    });
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    // Assert
    let current = manager.get_state(&tree()).await.unwrap();
    let delivered = delivered.lock().unwrap().clone();
    assert_eq!(delivered, vec![1, 2]);
    assert_eq!(delivered.last(), Some(&current.version));
}

// ============================================================
// default collaborators end to end
// ============================================================

#[tokio::test]
async fn given_populated_tree_when_toggling_then_surface_receives_new_frame() {
    // Arrange
    testing::init_test_setup();
    let container = ServiceContainer::new(plain_settings());
    let surface = TextSurface::new();
    let populator = container
        .orchestrator()
        .prepare(surface.clone(), tree(), &NodeDataSchema::any(), true)
        .await
        .unwrap();
    populator
        .populate_iter(vec![
            TreeNode::root("docs", json!({"title": "Docs"})),
            TreeNode::child("docs", "guide", json!({"title": "Guide"})),
        ])
        .await
        .unwrap();

    // Act
    container
        .state_manager
        .toggle_node_status_expanded(&tree(), &"docs".into())
        .await
        .unwrap();

    // Assert
    assert_eq!(
        surface.frames(),
        vec!["- Docs\n└── Guide".to_string(), "+ Docs".to_string()]
    );
}

#[tokio::test]
async fn given_prepare_twice_with_same_id_when_preparing_then_second_fails() {
    testing::init_test_setup();
    let container = ServiceContainer::new(plain_settings());
    let orchestrator = container.orchestrator();
    orchestrator
        .prepare_default(TextSurface::new(), tree(), &NodeDataSchema::any())
        .await
        .unwrap();

    let err = orchestrator
        .prepare_default(TextSurface::new(), tree(), &NodeDataSchema::any())
        .await
        .err()
        .expect("second prepare should fail");

    assert_eq!(err.domain(), Some(&DomainError::DuplicateTree(tree())));
}

#[tokio::test]
async fn given_failing_insert_when_populating_then_earlier_nodes_remain() {
    testing::init_test_setup();
    let container = ServiceContainer::new(plain_settings());
    let surface = TextSurface::new();
    let populator = container
        .orchestrator()
        .prepare_default(surface.clone(), tree(), &NodeDataSchema::any())
        .await
        .unwrap();

    let err = populator
        .populate_iter(vec![
            TreeNode::root("a", json!({})),
            TreeNode::child("missing", "b", json!({})),
        ])
        .await
        .unwrap_err();

    assert_eq!(err.operation(), Some("append_node_to_parent_node"));
    let state = container.state_manager.get_state(&tree()).await.unwrap();
    assert_eq!(state.node_count(), 1);
    assert_eq!(surface.frame_count(), 0);
}
