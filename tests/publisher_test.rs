//! Tests for InMemoryStatePublisher delivery semantics

use std::sync::{Arc, Mutex};

use futures::FutureExt;

use livetree::domain::{TreeId, TreeState};
use livetree::infrastructure::{
    InMemoryStatePublisher, InfraError, StateChangeHandler, StatePublisher,
};
use livetree::util::testing;

type Seen = Arc<Mutex<Vec<String>>>;

/// Handler appending `label@version` to `seen`, failing when `fail` is set.
fn recording_handler(label: &str, seen: &Seen, fail: bool) -> StateChangeHandler {
    let label = label.to_string();
    let seen = Arc::clone(seen);
    Arc::new(move |change| {
        let label = label.clone();
        let seen = Arc::clone(&seen);
        async move {
            seen.lock()
                .unwrap()
                .push(format!("{label}@{}", change.new_state.version));
            if fail {
                Err(InfraError::render(label, "refused"))
            } else {
                Ok(())
            }
        }
        .boxed()
    })
}

fn state(version: u64) -> Arc<TreeState> {
    let mut state = TreeState::empty(TreeId::from("t"));
    state.version = version;
    Arc::new(state)
}

#[tokio::test]
async fn given_two_subscribers_when_publishing_then_delivers_in_subscription_order() {
    // Arrange
    testing::init_test_setup();
    let publisher = InMemoryStatePublisher::new();
    let seen = Seen::default();
    publisher
        .subscribe("first", "t", recording_handler("first", &seen, false))
        .await
        .unwrap();
    publisher
        .subscribe("second", "t", recording_handler("second", &seen, false))
        .await
        .unwrap();

    // Act
    publisher.publish("t", None, state(1)).await.unwrap();

    // Assert
    assert_eq!(*seen.lock().unwrap(), vec!["first@1", "second@1"]);
}

#[tokio::test]
async fn given_same_subscriber_id_when_resubscribing_then_replaces_handler() {
    testing::init_test_setup();
    let publisher = InMemoryStatePublisher::new();
    let seen = Seen::default();
    publisher
        .subscribe("r", "t", recording_handler("old", &seen, false))
        .await
        .unwrap();
    publisher
        .subscribe("r", "t", recording_handler("new", &seen, false))
        .await
        .unwrap();

    publisher.publish("t", Some(state(1)), state(2)).await.unwrap();

    assert_eq!(publisher.subscriber_count("t").await, 1);
    assert_eq!(*seen.lock().unwrap(), vec!["new@2"]);
}

#[tokio::test]
async fn given_other_state_id_when_publishing_then_subscriber_is_not_called() {
    testing::init_test_setup();
    let publisher = InMemoryStatePublisher::new();
    let seen = Seen::default();
    publisher
        .subscribe("r", "other", recording_handler("r", &seen, false))
        .await
        .unwrap();

    publisher.publish("t", None, state(1)).await.unwrap();

    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn given_unsubscribed_handler_when_publishing_then_it_is_not_called() {
    testing::init_test_setup();
    let publisher = InMemoryStatePublisher::new();
    let seen = Seen::default();
    publisher
        .subscribe("r", "t", recording_handler("r", &seen, false))
        .await
        .unwrap();

    publisher.unsubscribe("r", "t").await.unwrap();
    publisher.publish("t", None, state(1)).await.unwrap();

    assert_eq!(publisher.subscriber_count("t").await, 0);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn given_failing_subscriber_when_publishing_then_later_subscribers_still_run() {
    // Arrange
    testing::init_test_setup();
    let publisher = InMemoryStatePublisher::new();
    let seen = Seen::default();
    publisher
        .subscribe("broken", "t", recording_handler("broken", &seen, true))
        .await
        .unwrap();
    publisher
        .subscribe("healthy", "t", recording_handler("healthy", &seen, false))
        .await
        .unwrap();

    // Act
    let result = publisher.publish("t", None, state(3)).await;

    // Assert
    match result {
        Err(InfraError::Subscriber { subscriber_id, .. }) => assert_eq!(subscriber_id, "broken"),
        other => panic!("expected subscriber failure, got {other:?}"),
    }
    assert_eq!(*seen.lock().unwrap(), vec!["broken@3", "healthy@3"]);
}

#[tokio::test]
async fn given_no_subscribers_when_publishing_then_succeeds() {
    testing::init_test_setup();
    let publisher = InMemoryStatePublisher::new();
    assert!(publisher.publish("t", None, state(0)).await.is_ok());
}
