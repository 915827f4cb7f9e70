//! Text renderer for tree snapshots
//!
//! Draws each root as a [`termtree::Tree`] onto a [`TextSurface`].

use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use colored::Colorize;
use termtree::Tree;
use tracing::{instrument, trace};

use crate::config::RendererSettings;
use crate::domain::{NodeState, TreeState};
use crate::infrastructure::error::{InfraError, InfraResult};
use crate::infrastructure::traits::TreeElementRenderer;

const EXPANDED_MARKER: &str = "-";
const COLLAPSED_MARKER: &str = "+";

/// Render target collecting frames, optionally echoed to stdout.
///
/// Clones share the same frame buffer.
#[derive(Debug, Clone, Default)]
pub struct TextSurface {
    frames: Arc<Mutex<Vec<String>>>,
    echo: bool,
}

impl TextSurface {
    /// Surface keeping frames in memory only.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    fn push(&self, frame: String) -> InfraResult<()> {
        if self.echo {
            let mut out = std::io::stdout().lock();
            writeln!(out, "{frame}").map_err(|e| InfraError::io("write frame to stdout", e))?;
        }
        self.frames
            .lock()
            .map_err(|_| InfraError::render("surface", "frame buffer poisoned"))?
            .push(frame);
        Ok(())
    }

    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().map(|f| f.clone()).unwrap_or_default()
    }

    pub fn last_frame(&self) -> Option<String> {
        self.frames.lock().ok().and_then(|f| f.last().cloned())
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().map(|f| f.len()).unwrap_or(0)
    }
}

/// Renders tree snapshots with box-drawing characters.
#[derive(Debug, Clone)]
pub struct TermTreeRenderer {
    settings: RendererSettings,
}

impl Default for TermTreeRenderer {
    fn default() -> Self {
        Self::new(RendererSettings::default())
    }
}

impl TermTreeRenderer {
    pub fn new(settings: RendererSettings) -> Self {
        Self { settings }
    }

    /// Build the text frame for `state` without drawing it.
    pub fn format(&self, state: &TreeState) -> String {
        if state.is_empty() {
            return self.settings.empty_placeholder.clone();
        }
        state
            .roots
            .iter()
            .map(|root| self.to_tree(root).to_string())
            .collect::<Vec<_>>()
            .join("")
            .trim_end()
            .to_string()
    }

    fn to_tree(&self, node: &NodeState) -> Tree<String> {
        let tree = Tree::new(self.label(node));
        if node.expanded {
            tree.with_leaves(node.children.iter().map(|c| self.to_tree(c)))
        } else {
            tree
        }
    }

    fn label(&self, node: &NodeState) -> String {
        let text = self
            .settings
            .label_field
            .as_deref()
            .and_then(|field| node.node_data.get(field))
            .and_then(|v| v.as_str())
            .unwrap_or_else(|| node.node_id.as_str())
            .to_string();
        if node.is_leaf() {
            return text;
        }
        let marker = if node.expanded {
            EXPANDED_MARKER
        } else {
            COLLAPSED_MARKER
        };
        if self.settings.color {
            format!("{} {}", marker.cyan().bold(), text)
        } else {
            format!("{marker} {text}")
        }
    }
}

#[async_trait]
impl TreeElementRenderer<TextSurface> for TermTreeRenderer {
    fn name(&self) -> &str {
        &self.settings.name
    }

    #[instrument(
        level = "debug",
        skip(self, parent_element, tree_state),
        fields(tree_id = %tree_state.tree_id, version = tree_state.version)
    )]
    async fn render(
        &self,
        parent_element: &TextSurface,
        tree_state: Arc<TreeState>,
    ) -> InfraResult<()> {
        let frame = self.format(&tree_state);
        trace!(lines = frame.lines().count(), "rendered frame");
        parent_element.push(frame)
    }
}
