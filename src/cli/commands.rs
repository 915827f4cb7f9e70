//! Command dispatch for the `livetree` binary

use std::path::Path;

use clap::CommandFactory;
use futures::{future, Stream, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::domain::{NodeDataSchema, NodeId, TreeId, TreeNode};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::TextSurface;

/// Options of the `render` subcommand.
#[derive(Debug)]
pub struct RenderOptions<'a> {
    pub input: &'a Path,
    pub tree_id: &'a str,
    pub schema: Option<&'a Path>,
    pub expand: bool,
    pub toggle: &'a [String],
    pub json: bool,
    pub no_color: bool,
}

pub async fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Render {
            input,
            tree_id,
            schema,
            expand,
            toggle,
            json,
            no_color,
        }) => {
            let settings = Settings::load(cli.config.as_deref())?;
            let options = RenderOptions {
                input,
                tree_id,
                schema: schema.as_deref(),
                expand: *expand,
                toggle,
                json: *json,
                no_color: *no_color,
            };
            if let Some(rendered) = render(settings, &options).await? {
                output::info(&rendered);
            }
            Ok(())
        }
        Some(Commands::Config { command }) => config(cli, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(*shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
        None => Ok(()),
    }
}

/// Populate a tree from the node file, apply toggles and return what to print.
///
/// Returns the final state as JSON, or the last rendered frame unless frames
/// were already echoed.
#[instrument(level = "debug", skip(settings))]
pub async fn render(
    mut settings: Settings,
    options: &RenderOptions<'_>,
) -> CliResult<Option<String>> {
    if options.no_color {
        settings.renderer.color = false;
    }
    let expand = options.expand || settings.expand_nodes_on_render;
    let schema = match options.schema {
        Some(path) => read_schema(path).await?,
        None => NodeDataSchema::any(),
    };

    let container = ServiceContainer::new(settings);
    let orchestrator = container.orchestrator();
    let echo = container.settings.renderer.echo;
    let surface = TextSurface::new().with_echo(echo);
    let tree_id = TreeId::from(options.tree_id);

    let populator = orchestrator
        .prepare(surface.clone(), tree_id.clone(), &schema, expand)
        .await?;
    let reader = open_input(options.input).await?;
    populator
        .try_populate(node_lines(reader, options.input.display().to_string()))
        .await?;

    for node_id in options.toggle {
        debug!(%node_id, "toggling node");
        container
            .state_manager
            .toggle_node_status_expanded(&tree_id, &NodeId::from(node_id.as_str()))
            .await?;
    }
    info!(frames = surface.frame_count(), "tree rendered");

    if options.json {
        let state = container.state_manager.get_state(&tree_id).await?;
        return serde_json::to_string_pretty(&*state)
            .map(Some)
            .map_err(|e| CliError::io("serialize tree state", e.into()));
    }
    Ok(if echo { None } else { surface.last_frame() })
}

fn config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(cli.config.as_deref())?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => match global_config_path() {
            Some(path) => {
                if !path.exists() {
                    output::warning(&format!("{} does not exist", path.display()));
                }
                output::info(&path.display());
            }
            None => output::warning("no config directory available on this platform"),
        },
    }
    Ok(())
}

async fn read_schema(path: &Path) -> CliResult<NodeDataSchema> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CliError::io(format!("read schema {}", path.display()), e))?;
    let value = serde_json::from_str(&content)
        .map_err(|e| CliError::InvalidArgs(format!("schema {}: {}", path.display(), e)))?;
    Ok(NodeDataSchema::new(value))
}

async fn open_input(path: &Path) -> CliResult<Box<dyn AsyncBufRead + Unpin + Send>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| CliError::io(format!("open {}", path.display()), e))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Parse one [`TreeNode`] per non-blank line, as lines arrive.
pub fn node_lines<R>(reader: R, source: String) -> impl Stream<Item = ApplicationResult<TreeNode>>
where
    R: AsyncBufRead + Unpin,
{
    futures::stream::unfold((reader.lines(), 0usize), |(mut lines, line_no)| async move {
        let item = match lines.next_line().await {
            Ok(Some(line)) => Ok((line_no + 1, line)),
            Ok(None) => return None,
            Err(e) => Err(e),
        };
        Some((item, (lines, line_no + 1)))
    })
    .filter(|item| future::ready(!matches!(item, Ok((_, line)) if line.trim().is_empty())))
    .map(move |item| {
        let (line_no, line) =
            item.map_err(|e| ApplicationError::node_source(format!("read {source}"), e))?;
        serde_json::from_str::<TreeNode>(&line)
            .map_err(|e| ApplicationError::node_source(format!("parse {source}:{line_no}"), e))
    })
}
