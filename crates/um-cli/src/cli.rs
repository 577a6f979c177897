//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// unimeta - unified metadata and lineage across dbt projects
#[derive(Parser, Debug)]
#[command(name = "um")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to unimeta.yml (default: ./unimeta.yml when present)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override the directory scanned for projects
    #[arg(long, global = true)]
    pub projects_dir: Option<String>,

    /// Override the snapshot file path
    #[arg(long = "output-path", global = true)]
    pub output_path: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the unified graph once and persist the snapshot
    Build(BuildArgs),

    /// List nodes from the snapshot
    Ls(LsArgs),

    /// Show direct lineage of one node
    Lineage(LineageArgs),

    /// Report dependency cycles
    Cycles(CyclesArgs),

    /// Set a model or column description
    Describe(DescribeArgs),

    /// Serve the metadata over HTTP
    Serve(ServeArgs),
}

/// Arguments for the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Output format for the build summary
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: ReportFormat,
}

/// Summary formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Human-readable summary
    Table,
    /// JSON output
    Json,
}

/// Arguments for the ls command
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Only nodes owned by this project id
    #[arg(long)]
    pub project: Option<String>,

    /// Exact local name
    #[arg(short, long)]
    pub name: Option<String>,

    /// Case-insensitive substring of the description
    #[arg(short, long)]
    pub search: Option<String>,

    /// Only models or only sources
    #[arg(short, long, value_enum)]
    pub kind: Option<KindFilter>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: ReportFormat,

    /// Build from the projects instead of reading the saved snapshot
    #[arg(long)]
    pub fresh: bool,
}

/// Node kind filter
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindFilter {
    Model,
    Source,
}

/// Arguments for the lineage command
#[derive(Args, Debug)]
pub struct LineageArgs {
    /// Global node id (`<project>_<name>`)
    pub id: String,

    /// Which side of the node to show
    #[arg(short, long, value_enum, default_value = "both")]
    pub direction: LineageDirection,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: LineageOutput,

    /// Build from the projects instead of reading the saved snapshot
    #[arg(long)]
    pub fresh: bool,
}

/// Lineage direction
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineageDirection {
    /// Nodes this node is derived from
    Upstream,
    /// Nodes derived from this node
    Downstream,
    /// Both directions
    Both,
}

/// Lineage output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineageOutput {
    /// Table format
    Table,
    /// JSON output
    Json,
    /// Graphviz DOT
    Dot,
}

/// Arguments for the cycles command
#[derive(Args, Debug)]
pub struct CyclesArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: ReportFormat,

    /// Build from the projects instead of reading the saved snapshot
    #[arg(long)]
    pub fresh: bool,
}

/// Arguments for the describe command
#[derive(Args, Debug)]
pub struct DescribeArgs {
    /// What to describe
    #[arg(value_enum)]
    pub entity: EntityArg,

    /// Global node id, or `<global_id>:<column>` for columns
    pub id: String,

    /// Description text
    pub text: String,
}

/// Description targets
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityArg {
    Model,
    Column,
}

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Host to bind to (default: server.host from config)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (default: server.port from config)
    #[arg(long)]
    pub port: Option<u16>,

    /// Poll the projects directory and refresh on change
    #[arg(short, long)]
    pub watch: bool,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
