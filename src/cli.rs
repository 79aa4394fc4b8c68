//! Command-line interface definitions for the Sachse digest.
//!
//! All arguments can be provided via command-line flags or environment variables.

use crate::models::SourceId;
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Write the newsletter into ./out
/// sachse_digest -o ./out
///
/// # Use a downloaded council packet instead of the portal, also emit JSON
/// sachse_digest -o ./out --council-document ~/Downloads/packet.pdf -j ./api
///
/// # Check what the sources yield without calling the model
/// sachse_digest -o ./out --raw --only sports
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Output directory for the newsletter Markdown file
    #[arg(short, long, env = "SACHSE_OUTPUT_DIR")]
    pub output_dir: String,

    /// Optional output directory for a JSON copy of the digest
    #[arg(short, long, env = "SACHSE_JSON_OUTPUT_DIR")]
    pub json_output_dir: Option<String>,

    /// Optional path to the LLM config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Optional YAML file overriding source URLs, caps, markers and timeouts
    #[arg(short, long, env = "SACHSE_SOURCES_CONFIG")]
    pub sources_config: Option<String>,

    /// Local agenda document (PDF, HTML or text) to use for the City Council section
    #[arg(long)]
    pub council_document: Option<PathBuf>,

    /// Local agenda document to use for the School Board section
    #[arg(long)]
    pub school_board_document: Option<PathBuf>,

    /// Local schedule or results document to use for the sports section
    #[arg(long)]
    pub sports_document: Option<PathBuf>,

    /// Build only these sections (repeatable); all sections by default
    #[arg(long, value_enum)]
    pub only: Vec<SourceArg>,

    /// Never fall back to a headless browser, even when one is installed
    #[arg(long)]
    pub no_render: bool,

    /// Skip summarization and put the extracted text in the newsletter
    #[arg(long)]
    pub raw: bool,

    /// Include per-strategy failure details under placeholder sections
    #[arg(long)]
    pub diagnostics: bool,
}

/// Source names accepted on the command line.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceArg {
    Council,
    SchoolBoard,
    Sports,
}

impl From<SourceArg> for SourceId {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Council => SourceId::Council,
            SourceArg::SchoolBoard => SourceId::SchoolBoard,
            SourceArg::Sports => SourceId::Sports,
        }
    }
}

impl Cli {
    /// Enabled sources in digest order.
    pub fn sources(&self) -> Vec<SourceId> {
        SourceId::ALL
            .into_iter()
            .filter(|source| self.only.is_empty() || self.only.iter().any(|arg| SourceId::from(*arg) == *source))
            .collect()
    }

    /// User-supplied documents keyed by source.
    pub fn overrides(&self) -> HashMap<SourceId, PathBuf> {
        [
            (SourceId::Council, &self.council_document),
            (SourceId::SchoolBoard, &self.school_board_document),
            (SourceId::Sports, &self.sports_document),
        ]
        .into_iter()
        .filter_map(|(source, path)| path.clone().map(|p| (source, p)))
        .collect()
    }
}
