//! Command line argument parsing for the Pegasus CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Pegasus - filter validation and multimodal nearest-neighbor retrieval
#[derive(Parser, Debug, Clone)]
#[command(name = "pegasus")]
#[command(about = "Filter validation and multimodal nearest-neighbor retrieval")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct PegasusArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl PegasusArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Validate a metadata filter (where clause)
    #[command(name = "validate-where")]
    ValidateWhere(ValidateExpressionArgs),

    /// Validate a document filter (where_document clause)
    #[command(name = "validate-where-document")]
    ValidateWhereDocument(ValidateExpressionArgs),

    /// Validate an include list
    #[command(name = "validate-include")]
    ValidateInclude(ValidateIncludeArgs),

    /// Rank a snapshot against a query file
    Search(SearchArgs),

    /// Embed inputs with a precomputed lookup table
    Embed(EmbedArgs),

    /// Show per-modality statistics of a snapshot
    Info(InfoArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ValidateExpressionArgs {
    /// Filter expression as JSON
    #[arg(value_name = "JSON")]
    pub expression: String,
}

#[derive(Parser, Debug, Clone)]
pub struct ValidateIncludeArgs {
    /// Comma-separated include items
    #[arg(value_name = "ITEMS", value_delimiter = ',')]
    pub items: Vec<String>,

    /// Accept `distances` (nearest-neighbor queries)
    #[arg(long)]
    pub allow_distances: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Index snapshot file (JSON)
    #[arg(value_name = "SNAPSHOT_FILE")]
    pub snapshot_file: PathBuf,

    /// Query request file (JSON)
    #[arg(value_name = "QUERY_FILE")]
    pub query_file: PathBuf,

    /// Ranking strategy
    #[arg(short, long, default_value = "modality")]
    pub strategy: StrategyKind,

    /// Modality searched (modality) or of the query (cross-modal)
    #[arg(short, long)]
    pub modality: Option<String>,

    /// Fusion mode for the fusion strategy
    #[arg(long, default_value = "late")]
    pub fusion: String,

    /// Results per query row
    #[arg(short = 'n', long)]
    pub n_results: Option<usize>,

    /// Metadata filter as JSON, overriding the query file
    #[arg(long = "where", value_name = "JSON")]
    pub where_clause: Option<String>,

    /// Document filter as JSON, overriding the query file
    #[arg(long, value_name = "JSON")]
    pub where_document: Option<String>,

    /// Comma-separated include items, overriding the query file
    #[arg(long, value_delimiter = ',')]
    pub include: Option<Vec<String>>,

    /// Configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,
}

impl SearchArgs {
    /// The strategy parameter: a modality name or a fusion mode.
    pub fn strategy_parameter(&self) -> Option<&str> {
        match self.strategy {
            StrategyKind::Modality | StrategyKind::CrossModal => self.modality.as_deref(),
            StrategyKind::Fusion => Some(self.fusion.as_str()),
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct EmbedArgs {
    /// Precomputed table file (JSON)
    #[arg(value_name = "TABLE_FILE")]
    pub table_file: PathBuf,

    /// Modality of the inputs
    #[arg(short, long)]
    pub modality: String,

    /// Text inputs to embed
    #[arg(value_name = "TEXT", required = true)]
    pub inputs: Vec<String>,

    /// Configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct InfoArgs {
    /// Index snapshot file (JSON)
    #[arg(value_name = "SNAPSHOT_FILE")]
    pub snapshot_file: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Rank one modality
    Modality,
    /// Rank the other configured modality
    CrossModal,
    /// Combine modalities
    Fusion,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Modality => "modality",
            StrategyKind::CrossModal => "cross_modal",
            StrategyKind::Fusion => "fusion",
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
