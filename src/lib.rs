//! Live tree views.
//!
//! A [`TreeOrchestrator`](application::TreeOrchestrator) wires a state
//! publisher, a tree state manager and a renderer together: it creates a
//! tree, streams nodes into it in order, subscribes the renderer to later
//! changes and draws the tree once.
//!
//! The collaborators are traits in [`infrastructure::traits`]; in-memory
//! defaults live next to them and are wired by
//! [`ServiceContainer`](infrastructure::di::ServiceContainer).

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
