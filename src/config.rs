//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/livetree/livetree.toml`
//! 3. Local config: file passed with `--config`
//! 4. Environment variables: `LIVETREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// Terminal renderer configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RendererSettings {
    /// Renderer identity, also used as subscriber id for change notifications
    pub name: String,
    /// Node data key used as row label (falls back to the node id)
    pub label_field: Option<String>,
    /// Colorize expand/collapse markers
    pub color: bool,
    /// Text drawn for a tree without nodes
    pub empty_placeholder: String,
    /// Print every frame to stdout as it is rendered
    pub echo: bool,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            name: "livetree-term".into(),
            label_field: Some("title".into()),
            color: true,
            empty_placeholder: "(empty tree)".into(),
            echo: false,
        }
    }
}

/// Raw renderer config for intermediate parsing (`None` → not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawRendererSettings {
    pub name: Option<String>,
    pub label_field: Option<String>,
    pub color: Option<bool>,
    pub empty_placeholder: Option<String>,
    pub echo: Option<bool>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub expand_nodes_on_render: Option<bool>,
    pub renderer: RawRendererSettings,
}

impl RendererSettings {
    /// Overlay wins where it specifies a value.
    ///
    /// An empty `label_field` disables labels from node data.
    fn merge(&self, overlay: &RawRendererSettings) -> Self {
        Self {
            name: overlay.name.clone().unwrap_or_else(|| self.name.clone()),
            label_field: match &overlay.label_field {
                Some(field) if field.is_empty() => None,
                Some(field) => Some(field.clone()),
                None => self.label_field.clone(),
            },
            color: overlay.color.unwrap_or(self.color),
            empty_placeholder: overlay
                .empty_placeholder
                .clone()
                .unwrap_or_else(|| self.empty_placeholder.clone()),
            echo: overlay.echo.unwrap_or(self.echo),
        }
    }
}

/// Unified configuration for livetree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Settings {
    /// Insert nodes expanded
    pub expand_nodes_on_render: bool,
    /// Terminal renderer settings
    pub renderer: RendererSettings,
}

/// Get the XDG config directory for livetree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "livetree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("livetree.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            expand_nodes_on_render: overlay
                .expand_nodes_on_render
                .unwrap_or(self.expand_nodes_on_render),
            renderer: self.renderer.merge(&overlay.renderer),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_config` - Optional config file layered over the global one.
    ///   It must exist when given.
    pub fn load(local_config: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_from(global_config_path().as_deref(), local_config)
    }

    /// Load settings from an explicit global path (used by `load` and tests).
    pub fn load_from(
        global_config: Option<&Path>,
        local_config: Option<&Path>,
    ) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config, optional
        if let Some(global_path) = global_config {
            if global_path.exists() {
                current = current.merge_with(&load_raw_settings(global_path)?);
            }
        }

        // 3. Local config, required when given
        if let Some(local_path) = local_config {
            current = current.merge_with(&load_raw_settings(local_path)?);
        }

        // 4. Environment variables
        Self::apply_env_overrides(current)
    }

    /// Apply LIVETREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("LIVETREE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_bool("expand_nodes_on_render") {
            settings.expand_nodes_on_render = val;
        }
        if let Ok(val) = config.get_string("renderer.name") {
            settings.renderer.name = val;
        }
        if let Ok(val) = config.get_string("renderer.label_field") {
            settings.renderer.label_field = (!val.is_empty()).then_some(val);
        }
        if let Ok(val) = config.get_bool("renderer.color") {
            settings.renderer.color = val;
        }
        if let Ok(val) = config.get_string("renderer.empty_placeholder") {
            settings.renderer.empty_placeholder = val;
        }
        if let Ok(val) = config.get_bool("renderer.echo") {
            settings.renderer.echo = val;
        }

        Ok(settings)
    }

    /// Serialize the effective settings as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize settings: {e}"),
        })
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
