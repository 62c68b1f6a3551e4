//! Command dispatch

use std::io;

use clap::CommandFactory;
use clap_complete::generate;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::services::SearchService;
use crate::cli::args::{Cli, Commands, ConfigCommands, OutputFormat};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::domain::{
    build_where_clause, label_and_flatten, parse_chain, transport, ConditionsTree, NodeId,
    TransportNode,
};
use crate::infrastructure::di::ServiceContainer;
use crate::tree_traits::TreeNodeConvert;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage("no command given, see --help".to_string()));
    };

    // completions need neither settings nor database
    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let settings = Settings::load(cli.config.as_deref())?;
    if !settings.output.color {
        output::disable_colors();
    }

    match command {
        Commands::Build { format, exprs } => build(exprs, *format),
        Commands::Config { command } => config(command, &settings, cli),
        _ => {
            let container = ServiceContainer::new(settings)?;
            execute_with_service(command, &container.search)
        }
    }
}

/// Commands working on stored searches.
pub fn execute_with_service(command: &Commands, search: &SearchService) -> CliResult<()> {
    match command {
        Commands::Save { name, exprs } => save(search, name, exprs),
        Commands::Show { name, format } => show(search, name, *format),
        Commands::List => list(search),
        Commands::Delete { name } => delete(search, name),
        other => Err(CliError::Usage(format!(
            "{:?} doesn't operate on saved searches",
            other
        ))),
    }
}

#[instrument(level = "debug")]
fn build(exprs: &[String], format: OutputFormat) -> CliResult<()> {
    let (mut tree, root) = parse_chain(exprs)?;
    output::info(&render(&mut tree, root, format)?);
    Ok(())
}

#[instrument(level = "debug", skip(search))]
fn save(search: &SearchService, name: &str, exprs: &[String]) -> CliResult<()> {
    let (mut tree, root) = parse_chain(exprs)?;
    let rows = search.save(name, &mut tree, root)?;
    output::success(&format!("saved '{}' ({} nodes)", name, rows));
    Ok(())
}

#[instrument(level = "debug", skip(search))]
fn show(search: &SearchService, name: &str, format: OutputFormat) -> CliResult<()> {
    let mut tree = search.load(name)?;
    let root = tree
        .root()
        .ok_or_else(|| CliError::Usage(format!("search '{}' has no single root", name)))?;
    output::info(&render(&mut tree, root, format)?);
    Ok(())
}

fn list(search: &SearchService) -> CliResult<()> {
    let summaries = search.summaries()?;
    if summaries.is_empty() {
        output::info("no saved searches");
        return Ok(());
    }
    output::header("Saved searches");
    for summary in summaries {
        output::detail(&format!(
            "{}  ({} nodes, {} conditions)",
            summary.name, summary.nodes, summary.leaves
        ));
    }
    Ok(())
}

fn delete(search: &SearchService, name: &str) -> CliResult<()> {
    search.delete(name)?;
    output::success(&format!("deleted '{}'", name));
    Ok(())
}

fn config(command: &ConfigCommands, settings: &Settings, cli: &Cli) -> CliResult<()> {
    match command {
        ConfigCommands::Show => output::info(&settings.to_toml()?),
        ConfigCommands::Path => {
            let global = global_config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<none>".to_string());
            output::detail(&format!("global:   {}", global));
            if let Some(explicit) = &cli.config {
                output::detail(&format!("explicit: {}", explicit.display()));
            }
            output::detail(&format!("database: {}", settings.database.display()));
        }
        ConfigCommands::Template => output::info(&Settings::template()),
    }
    Ok(())
}

/// Format the tree under `root`. Labels are (re)applied for formats that show them.
pub fn render(tree: &mut ConditionsTree, root: NodeId, format: OutputFormat) -> CliResult<String> {
    debug!("rendering {} nodes as {:?}", tree.len(), format);
    let rendered = match format {
        OutputFormat::Tree => {
            tree.apply_mptt_label(root)?;
            tree.to_tree_string(root)?.to_string()
        }
        OutputFormat::Rows => label_and_flatten(tree, root)?
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?
            .join("\n"),
        OutputFormat::Sql => {
            let clause = build_where_clause(tree, root)?;
            std::iter::once(clause.sql)
                .chain(clause.args.iter().map(|arg| format!("  {}", arg)))
                .join("\n")
        }
        OutputFormat::Json => serde_json::to_string_pretty(&TransportNode::from_tree(tree, root)?)?,
        OutputFormat::Hex => transport::encode(tree, root)?
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .join(""),
    };
    Ok(rendered)
}

