//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

use crate::domain::{NodeId, VersionId};

/// Versioned configuration graphs: snapshots, tags, restore and traversal
#[derive(Parser, Debug)]
#[command(name = "kastle")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Turn debugging information on (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Journal file (overrides data_dir/journal_file from config)
    #[arg(long, global = true, env = "KASTLE_JOURNAL", value_hint = ValueHint::FilePath)]
    pub journal: Option<PathBuf>,

    /// Directory to look for a local .kastle.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage trees
    Tree {
        #[command(subcommand)]
        command: TreeCommands,
    },

    /// Manage versions of a tree
    Version {
        #[command(subcommand)]
        command: VersionCommands,
    },

    /// Tag the current version of a tree
    Tag {
        /// Tag name, unique per tree
        tag: String,
        /// Tree name or id (default: default_tree from config)
        #[arg(short, long)]
        tree: Option<String>,
        /// Description stored with the tag
        #[arg(long)]
        description: Option<String>,
    },

    /// Restore a tagged version as a new current version
    Restore {
        /// Tag to restore
        tag: String,
        /// Tree name or id
        #[arg(short, long)]
        tree: Option<String>,
    },

    /// Start a new version from a tagged version
    Branch {
        /// Tag to branch from
        tag: String,
        /// Tree name or id
        #[arg(short, long)]
        tree: Option<String>,
    },

    /// Manage nodes of a version
    Node {
        #[command(subcommand)]
        command: NodeCommands,
    },

    /// Manage edges of a version
    Edge {
        #[command(subcommand)]
        command: EdgeCommands,
    },

    /// Depth-first walk from a node
    Traverse {
        /// Version to walk
        #[arg(id = "version_id", value_name = "VERSION")]
        version: VersionId,
        /// Start node
        start: NodeId,
        /// Render as an indented tree instead of a flat list
        #[arg(long)]
        tree: bool,
    },

    /// Find a path between two nodes
    Path {
        /// Version to search
        #[arg(id = "version_id", value_name = "VERSION")]
        version: VersionId,
        /// Start node
        from: NodeId,
        /// Target node
        to: NodeId,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum TreeCommands {
    /// Create an empty tree
    Create {
        /// Tree name
        name: String,
    },

    /// List trees
    List,

    /// Show a tree and its versions
    Show {
        /// Tree name or id
        tree: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum VersionCommands {
    /// Create a new, empty current version
    Create {
        /// Tree name or id
        #[arg(short, long)]
        tree: Option<String>,
        /// Tag the new version right away
        #[arg(long)]
        tag: Option<String>,
        /// Version description
        #[arg(long)]
        description: Option<String>,
    },

    /// List versions of a tree
    List {
        /// Tree name or id
        #[arg(short, long)]
        tree: Option<String>,
    },

    /// Show a version and the versions it was copied from
    Show {
        /// Version id
        #[arg(id = "version_id", value_name = "VERSION")]
        version: VersionId,
    },
}

#[derive(Subcommand, Debug)]
pub enum NodeCommands {
    /// Add a node carrying a JSON payload
    Add {
        /// Version id
        #[arg(id = "version_id", value_name = "VERSION")]
        version: VersionId,
        /// JSON payload, e.g. '{"setting": "value1"}'
        data: String,
    },

    /// List nodes of a version
    List {
        /// Version id
        #[arg(id = "version_id", value_name = "VERSION")]
        version: VersionId,
    },

    /// Direct successors of a node
    Children {
        /// Version id
        #[arg(id = "version_id", value_name = "VERSION")]
        version: VersionId,
        /// Node id
        node: NodeId,
    },

    /// Direct predecessors of a node
    Parents {
        /// Version id
        #[arg(id = "version_id", value_name = "VERSION")]
        version: VersionId,
        /// Node id
        node: NodeId,
    },
}

#[derive(Subcommand, Debug)]
pub enum EdgeCommands {
    /// Connect two nodes of a version
    Add {
        /// Version id
        #[arg(id = "version_id", value_name = "VERSION")]
        version: VersionId,
        /// Source node
        from: NodeId,
        /// Target node
        to: NodeId,
        /// JSON payload
        #[arg(default_value = "{}")]
        data: String,
    },

    /// List edges of a version
    List {
        /// Version id
        #[arg(id = "version_id", value_name = "VERSION")]
        version: VersionId,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}
