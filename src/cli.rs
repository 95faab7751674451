use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Rebuild the index from the image directory
    Index {},

    /// Compare the image directory with the index and report
    Check {},

    /// Search images by caption
    Search {
        /// Free text query
        query: String,

        /// Number of results (defaults to semantic_search.top_k)
        #[clap(short = 'k', long)]
        top_k: Option<usize>,

        /// Drop results scoring below this value
        #[clap(short, long)]
        threshold: Option<f32>,

        /// Print results as JSON
        #[clap(long, default_value = "false")]
        json: bool,
    },

    /// Prompt for queries until Esc or Ctrl-C
    Interactive {
        /// Number of results per query (defaults to semantic_search.top_k)
        #[clap(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Copy an image to the clipboard
    Copy {
        /// Image file
        path: PathBuf,
    },
}
