//! Command-line interface definition.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "flowtrace",
    about = "Trace variable data flow through Python and TypeScript code",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Trace where a variable's value comes from and what it affects
    Trace {
        #[command(flatten)]
        target: Target,

        /// Traversal direction
        #[arg(long, value_enum, default_value_t = DirectionArg::Both)]
        direction: DirectionArg,

        /// Maximum traversal depth (0 shows direct neighbors only)
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Analyze the blast radius of changing a variable
    Impact {
        #[command(flatten)]
        target: Target,
    },

    /// Show the ordered calculation steps behind a value
    Path {
        #[command(flatten)]
        target: Target,
    },

    /// Show a variable's type evolution and state warnings
    Types {
        #[command(flatten)]
        target: Target,
    },
}

/// Arguments shared by every subcommand.
#[derive(Args)]
pub struct Target {
    /// File or directory to analyze
    pub path: PathBuf,

    /// Variable name to query
    pub variable: String,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = FormatArg::Terminal)]
    pub format: FormatArg,

    /// Per-query time budget in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Inter-procedural expansion bound; 0 keeps the trace within one
    /// function body
    #[arg(long)]
    pub max_call_depth: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    Forward,
    Backward,
    Both,
}

impl From<DirectionArg> for crate::core::Direction {
    fn from(value: DirectionArg) -> Self {
        match value {
            DirectionArg::Forward => Self::Forward,
            DirectionArg::Backward => Self::Backward,
            DirectionArg::Both => Self::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Terminal,
    Json,
    Dot,
}

impl From<FormatArg> for crate::io::output::OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Terminal => Self::Terminal,
            FormatArg::Json => Self::Json,
            FormatArg::Dot => Self::Dot,
        }
    }
}
