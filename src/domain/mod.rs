//! Domain layer: entities and tree-state rules
//!
//! This layer is independent of external concerns (no I/O, no runtime, no config loading).

pub mod arena;
pub mod entities;
pub mod error;

pub use arena::{ArenaNode, TreeArena};
pub use entities::*;
pub use error::DomainError;
