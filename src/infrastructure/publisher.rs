//! In-memory state broadcaster
//!
//! Keeps subscriptions per state id and delivers every published change to
//! them in subscription order.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::domain::{StateChanged, TreeState};
use crate::infrastructure::error::{InfraError, InfraResult};
use crate::infrastructure::traits::{StateChangeHandler, StatePublisher};

struct Subscription {
    subscriber_id: String,
    handler: StateChangeHandler,
}

/// Publisher holding subscriptions in process memory.
///
/// Handlers run sequentially and outside the registry lock, so a handler may
/// itself subscribe or publish.
#[derive(Default)]
pub struct InMemoryStatePublisher {
    subscriptions: RwLock<HashMap<String, Vec<Subscription>>>,
}

impl InMemoryStatePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of subscribers registered for `state_id`.
    pub async fn subscriber_count(&self, state_id: &str) -> usize {
        self.subscriptions
            .read()
            .await
            .get(state_id)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl StatePublisher for InMemoryStatePublisher {
    #[instrument(level = "debug", skip(self, old_state, new_state))]
    async fn publish(
        &self,
        state_id: &str,
        old_state: Option<Arc<TreeState>>,
        new_state: Arc<TreeState>,
    ) -> InfraResult<()> {
        let targets: Vec<(String, StateChangeHandler)> = {
            let subscriptions = self.subscriptions.read().await;
            subscriptions
                .get(state_id)
                .map(|subs| {
                    subs.iter()
                        .map(|s| (s.subscriber_id.clone(), Arc::clone(&s.handler)))
                        .collect()
                })
                .unwrap_or_default()
        };
        debug!(subscribers = targets.len(), "publishing state change");

        let mut first_failure = None;
        for (subscriber_id, handler) in targets {
            let change = StateChanged {
                state_id: state_id.to_string(),
                old_state: old_state.clone(),
                new_state: Arc::clone(&new_state),
            };
            if let Err(e) = handler(change).await {
                warn!(%subscriber_id, error = %e, "subscriber failed to handle state change");
                first_failure.get_or_insert(InfraError::Subscriber {
                    subscriber_id,
                    source: Box::new(e),
                });
            }
        }

        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    #[instrument(level = "debug", skip(self, on_change))]
    async fn subscribe(
        &self,
        subscriber_id: &str,
        state_id: &str,
        on_change: StateChangeHandler,
    ) -> InfraResult<()> {
        let mut subscriptions = self.subscriptions.write().await;
        let subs = subscriptions.entry(state_id.to_string()).or_default();
        match subs.iter_mut().find(|s| s.subscriber_id == subscriber_id) {
            Some(existing) => {
                debug!("replacing existing subscription");
                existing.handler = on_change;
            }
            None => subs.push(Subscription {
                subscriber_id: subscriber_id.to_string(),
                handler: on_change,
            }),
        }
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    async fn unsubscribe(&self, subscriber_id: &str, state_id: &str) -> InfraResult<()> {
        let mut subscriptions = self.subscriptions.write().await;
        if let Some(subs) = subscriptions.get_mut(state_id) {
            subs.retain(|s| s.subscriber_id != subscriber_id);
            if subs.is_empty() {
                subscriptions.remove(state_id);
            }
        }
        Ok(())
    }
}
