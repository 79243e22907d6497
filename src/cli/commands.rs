//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - extract: parse sources out of a text file
//! - generate: run a source-list prompt and list its sources
//! - batch: run refinements for selected sources concurrently

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use mimic::batch::QueueKey;
use mimic::domain::RefinementOption;
use mimic::id::{PromptId, RunId};

/// Mimic - source list extraction and batch refinement
#[derive(Parser, Debug)]
#[command(name = "mimic")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract sources from generated text
    Extract {
        /// Text file to read, `-` for stdin
        input: PathBuf,

        /// JSON file mapping URL to enrichment
        #[arg(short, long)]
        enrichments: Option<PathBuf>,

        /// Print JSON instead of a listing
        #[arg(long)]
        json: bool,
    },

    /// Run a source-list prompt and list the extracted sources
    Generate {
        /// Source-list prompt to run
        #[arg(short, long)]
        prompt_id: PromptId,

        /// Print JSON instead of a listing
        #[arg(long)]
        json: bool,
    },

    /// Run refinements for selected sources of completed source-list runs
    Batch {
        /// Completed source-list run to take sources from (repeatable)
        #[arg(short, long = "story", required = true)]
        stories: Vec<RunId>,

        /// Source and refinement pair, as [STORY/]SOURCE_INDEX:REFINEMENT_ID (repeatable; repeating a pair
        /// deselects it). STORY may be left out when only one run is given.
        #[arg(short, long = "pick", value_parser = parse_pick, required = true)]
        picks: Vec<QueueKey>,

        /// Refinement display name, as REFINEMENT_ID=NAME (repeatable)
        #[arg(short, long = "refinement", value_parser = parse_refinement)]
        refinements: Vec<RefinementOption>,

        /// Print the final states as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Parse `[STORY/]SOURCE_INDEX:REFINEMENT_ID`
pub fn parse_pick(raw: &str) -> Result<QueueKey, String> {
    let (parent, pair) = match raw.split_once('/') {
        Some((story, pair)) => {
            let story = story
                .parse::<RunId>()
                .map_err(|e| format!("invalid story id '{}': {}", story, e))?;
            (Some(story), pair)
        }
        None => (None, raw),
    };
    let (index, refinement) = pair
        .split_once(':')
        .ok_or_else(|| format!("expected SOURCE_INDEX:REFINEMENT_ID, got '{}'", raw))?;
    let index = index
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid source index '{}': {}", index, e))?;
    let refinement = refinement
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid refinement id '{}': {}", refinement, e))?;
    let key = QueueKey::new(index, refinement);
    Ok(match parent {
        Some(parent) => key.with_parent(parent),
        None => key,
    })
}

/// Parse `REFINEMENT_ID=NAME`
pub fn parse_refinement(raw: &str) -> Result<RefinementOption, String> {
    let (id, name) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected REFINEMENT_ID=NAME, got '{}'", raw))?;
    let id = id
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid refinement id '{}': {}", id, e))?;
    Ok(RefinementOption::new(id, name.trim()))
}
