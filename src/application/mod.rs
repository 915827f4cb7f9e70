//! Application layer: orchestration use cases
//!
//! This layer sequences collaborator calls and depends only on the
//! capability traits.

pub mod error;
pub mod services;

pub use error::{ApplicationError, ApplicationResult};
pub use services::{TreeOrchestrator, TreePopulator};
