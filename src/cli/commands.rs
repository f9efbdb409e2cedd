//! Command dispatch: maps parsed arguments onto the services

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::cli::args::{
    Cli, Commands, ConfigCommands, EdgeCommands, NodeCommands, TreeCommands, VersionCommands,
};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{NodeId, Payload, Tree, TreeVersion, VersionId};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Ok(());
    };

    // commands that never touch the journal
    match command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            return Ok(());
        }
        Commands::Config { command } => return cmd_config(cli, command),
        _ => {}
    }

    let settings = load_settings(cli)?;
    let container = ServiceContainer::new(settings)?;

    match command {
        Commands::Tree { command } => cmd_tree(&container, command),
        Commands::Version { command } => cmd_version(&container, command),
        Commands::Tag {
            tag,
            tree,
            description,
        } => cmd_tag(&container, tree.as_deref(), tag, description.as_deref()),
        Commands::Restore { tag, tree } => cmd_restore(&container, tree.as_deref(), tag),
        Commands::Branch { tag, tree } => cmd_branch(&container, tree.as_deref(), tag),
        Commands::Node { command } => cmd_node(&container, command),
        Commands::Edge { command } => cmd_edge(&container, command),
        Commands::Traverse {
            version,
            start,
            tree,
        } => cmd_traverse(&container, *version, *start, *tree),
        Commands::Path { version, from, to } => cmd_path(&container, *version, *from, *to),
        Commands::Completion { .. } | Commands::Config { .. } => Ok(()),
    }
}

fn config_dir(cli: &Cli) -> CliResult<PathBuf> {
    match &cli.config_dir {
        Some(dir) => Ok(dir.clone()),
        None => std::env::current_dir().map_err(|e| InfraError::io("resolve cwd", e).into()),
    }
}

/// Layered settings, with `--journal` taking precedence over everything.
fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let dir = config_dir(cli)?;
    let mut settings = Settings::load(Some(dir.as_path()))?;
    if let Some(journal) = &cli.journal {
        let file = journal
            .file_name()
            .ok_or_else(|| CliError::InvalidArgs(format!("not a file: {}", journal.display())))?;
        settings.journal_file = file.to_string_lossy().into_owned();
        settings.data_dir = journal
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
    }
    debug!("journal: {}", settings.journal_path().display());
    Ok(settings)
}

/// Explicit tree argument, falling back to `default_tree`.
fn resolve_tree(container: &ServiceContainer, tree: Option<&str>) -> CliResult<Tree> {
    let key = tree
        .map(str::to_string)
        .or_else(|| container.settings.default_tree.clone())
        .ok_or_else(|| {
            CliError::Usage("no tree given and no default_tree configured (use --tree)".into())
        })?;
    Ok(container.graph.resolve_tree(&key)?)
}

fn parse_payload(data: &str) -> CliResult<Payload> {
    serde_json::from_str(data).map_err(|e| {
        InfraError::Payload {
            message: format!("{data}: {e}"),
        }
        .into()
    })
}

fn print_version(version: &TreeVersion, current: Option<VersionId>) {
    let marker = if current == Some(version.id) {
        output::current_marker()
    } else {
        " ".to_string()
    };
    let mut line = format!("{marker} {version}");
    if let Some(parent) = version.parent_version_id {
        line.push_str(&format!("  (from {parent})"));
    }
    if let Some(description) = &version.description {
        line.push_str(&format!("  {description}"));
    }
    output::info(&line);
}

// ============================================================
// Trees and versions
// ============================================================

#[instrument(skip(container))]
fn cmd_tree(container: &ServiceContainer, command: &TreeCommands) -> CliResult<()> {
    match command {
        TreeCommands::Create { name } => {
            let tree = container.graph.create_tree(name)?;
            output::success(&format!("created tree {} '{}'", tree.id, tree.name));
        }
        TreeCommands::List => {
            for tree in container.graph.trees()? {
                let current = tree
                    .current_version
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "-".into());
                output::info(&format!("{}\t{}\tcurrent: {}", tree.id, tree.name, current));
            }
        }
        TreeCommands::Show { tree } => {
            let tree = resolve_tree(container, tree.as_deref())?;
            output::header(&format!("{} {}", tree.id, tree.name));
            output::detail(&format!("created: {}", tree.created_at.to_rfc3339()));
            for version in container.graph.versions(tree.id)? {
                print_version(&version, tree.current_version);
            }
        }
    }
    Ok(())
}

#[instrument(skip(container))]
fn cmd_version(container: &ServiceContainer, command: &VersionCommands) -> CliResult<()> {
    match command {
        VersionCommands::Create {
            tree,
            tag,
            description,
        } => {
            let tree = resolve_tree(container, tree.as_deref())?;
            let version =
                container
                    .graph
                    .create_version(tree.id, tag.as_deref(), description.as_deref())?;
            output::success(&format!("created {} in tree '{}'", version, tree.name));
        }
        VersionCommands::List { tree } => {
            let tree = resolve_tree(container, tree.as_deref())?;
            for version in container.graph.versions(tree.id)? {
                print_version(&version, tree.current_version);
            }
        }
        VersionCommands::Show { version } => {
            let lineage = container.versions.lineage(*version)?;
            let current = match lineage.first() {
                Some(v) => container.graph.tree(v.tree_id)?.current_version,
                None => None,
            };
            for v in &lineage {
                print_version(v, current);
            }
        }
    }
    Ok(())
}

#[instrument(skip(container))]
fn cmd_tag(
    container: &ServiceContainer,
    tree: Option<&str>,
    tag: &str,
    description: Option<&str>,
) -> CliResult<()> {
    let tree = resolve_tree(container, tree)?;
    let version = container.versions.create_tag(tree.id, tag, description)?;
    output::action("Tagged", &version);
    Ok(())
}

#[instrument(skip(container))]
fn cmd_restore(container: &ServiceContainer, tree: Option<&str>, tag: &str) -> CliResult<()> {
    let tree = resolve_tree(container, tree)?;
    let version = container.versions.restore_from_tag(tree.id, tag)?;
    output::action("Restored", &format!("'{}' as {} (current)", tag, version.id));
    Ok(())
}

#[instrument(skip(container))]
fn cmd_branch(container: &ServiceContainer, tree: Option<&str>, tag: &str) -> CliResult<()> {
    let tree = resolve_tree(container, tree)?;
    let version = container.versions.branch_from_tag(tree.id, tag)?;
    output::action("Branched", &format!("'{}' into {} (current)", tag, version.id));
    Ok(())
}

// ============================================================
// Nodes and edges
// ============================================================

#[instrument(skip(container))]
fn cmd_node(container: &ServiceContainer, command: &NodeCommands) -> CliResult<()> {
    match command {
        NodeCommands::Add { version, data } => {
            let node = container.graph.add_node(*version, parse_payload(data)?)?;
            output::success(&node);
        }
        NodeCommands::List { version } => {
            for node in container.graph.nodes(*version)? {
                output::info(&node);
            }
        }
        NodeCommands::Children { version, node } => {
            for child in container.navigator.children(*version, *node)? {
                output::info(&child);
            }
        }
        NodeCommands::Parents { version, node } => {
            for parent in container.navigator.parents(*version, *node)? {
                output::info(&parent);
            }
        }
    }
    Ok(())
}

#[instrument(skip(container))]
fn cmd_edge(container: &ServiceContainer, command: &EdgeCommands) -> CliResult<()> {
    match command {
        EdgeCommands::Add {
            version,
            from,
            to,
            data,
        } => {
            let edge = container
                .graph
                .add_edge(*version, *from, *to, parse_payload(data)?)?;
            output::success(&edge);
        }
        EdgeCommands::List { version } => {
            for edge in container.graph.edges(*version)? {
                output::info(&edge);
            }
        }
    }
    Ok(())
}

// ============================================================
// Navigation
// ============================================================

#[instrument(skip(container))]
fn cmd_traverse(
    container: &ServiceContainer,
    version: VersionId,
    start: NodeId,
    as_tree: bool,
) -> CliResult<()> {
    if as_tree {
        let tree = container.navigator.render(version, start)?;
        output::info(&tree);
        return Ok(());
    }
    for step in container.navigator.traverse(version, start)? {
        output::info(&step.node);
        for edge in &step.edges {
            output::detail(&format!("-> {} {}", edge.outgoing_node_id, edge.data));
        }
    }
    Ok(())
}

#[instrument(skip(container))]
fn cmd_path(
    container: &ServiceContainer,
    version: VersionId,
    from: NodeId,
    to: NodeId,
) -> CliResult<()> {
    let path = container.navigator.find_path(version, from, to)?;
    if path.is_empty() {
        output::warning(&format!("no path from {from} to {to} in {version}"));
        return Ok(());
    }
    let rendered: Vec<String> = path.iter().map(ToString::to_string).collect();
    output::info(&rendered.join(" -> "));
    Ok(())
}

// ============================================================
// Config
// ============================================================

fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => {
            let dir = config_dir(cli)?;
            let describe = |path: &Path| {
                let state = if path.exists() { "exists" } else { "missing" };
                format!("{} ({state})", path.display())
            };
            match global_config_path() {
                Some(path) => output::action("global", &describe(path.as_path())),
                None => output::action("global", &"unavailable"),
            }
            output::action("local", &describe(local_config_path(&dir).as_path()));
        }
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("cannot determine global config directory".into())
                })?
            } else {
                local_config_path(&config_dir(cli)?)
            };
            if path.exists() {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| InfraError::io(format!("create {}", parent.display()), e))?;
            }
            std::fs::write(&path, Settings::template())
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::success(&format!("created {}", path.display()));
        }
    }
    Ok(())
}
