//! Service container for dependency injection
//!
//! Wires the default collaborators together and hands out orchestrators.

use std::sync::Arc;

use crate::application::services::TreeOrchestrator;
use crate::config::Settings;
use crate::infrastructure::publisher::InMemoryStatePublisher;
use crate::infrastructure::renderer::{TermTreeRenderer, TextSurface};
use crate::infrastructure::traits::{StatePublisher, TreeElementRenderer, TreeStateManager};
use crate::infrastructure::tree_state::ArenaTreeStateManager;

/// Container holding the collaborators of one application instance.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// State broadcaster shared by the state manager
    pub publisher: Arc<dyn StatePublisher>,

    /// Authoritative tree state
    pub state_manager: Arc<dyn TreeStateManager>,

    /// Renderer drawing onto text surfaces
    pub renderer: Arc<dyn TreeElementRenderer<TextSurface>>,
}

impl ServiceContainer {
    /// Create a container with the in-memory publisher, arena state manager
    /// and terminal renderer.
    pub fn new(settings: Settings) -> Self {
        let publisher: Arc<dyn StatePublisher> = Arc::new(InMemoryStatePublisher::new());
        let state_manager = Arc::new(ArenaTreeStateManager::new(Arc::clone(&publisher)));
        let renderer = Arc::new(TermTreeRenderer::new(settings.renderer.clone()));
        Self::with_deps(settings, publisher, state_manager, renderer)
    }

    /// Create a container with custom collaborators (for testing).
    pub fn with_deps(
        settings: Settings,
        publisher: Arc<dyn StatePublisher>,
        state_manager: Arc<dyn TreeStateManager>,
        renderer: Arc<dyn TreeElementRenderer<TextSurface>>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            publisher,
            state_manager,
            renderer,
        }
    }

    /// Orchestrator over this container's collaborators.
    pub fn orchestrator(&self) -> TreeOrchestrator<TextSurface> {
        TreeOrchestrator::new(
            Arc::clone(&self.publisher),
            Arc::clone(&self.state_manager),
            Arc::clone(&self.renderer),
        )
    }
}
