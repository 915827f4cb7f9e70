//! Application services

pub mod tree;

pub use tree::{TreeOrchestrator, TreePopulator};
