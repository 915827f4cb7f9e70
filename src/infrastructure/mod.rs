//! Infrastructure layer: collaborator contracts, reference implementations and DI container
//!
//! The orchestrator depends only on [`traits`]; everything else here is a
//! replaceable default.

pub mod di;
pub mod error;
pub mod publisher;
pub mod renderer;
pub mod traits;
pub mod tree_state;

pub use error::{InfraError, InfraResult};
pub use publisher::InMemoryStatePublisher;
pub use renderer::{TermTreeRenderer, TextSurface};
pub use traits::{StateChangeHandler, StatePublisher, TreeElementRenderer, TreeStateManager};
pub use tree_state::ArenaTreeStateManager;
