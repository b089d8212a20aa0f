//! CLI module for TubeQA.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// TubeQA - Ask questions about YouTube videos
///
/// Answers are generated strictly from the transcripts of the videos you name.
#[derive(Parser, Debug)]
#[command(name = "tubeqa")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "TUBEQA_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question about one or more videos
    Ask {
        /// The question to ask
        question: String,

        /// YouTube URL or video ID (repeat for several videos)
        #[arg(long = "video", required = true)]
        videos: Vec<String>,
    },

    /// Ask questions about videos interactively, one question per line
    Chat {
        /// YouTube URL or video ID (repeat for several videos)
        #[arg(long = "video", required = true)]
        videos: Vec<String>,
    },

    /// Fetch, chunk and index videos without asking anything
    Ingest {
        /// YouTube URLs or video IDs
        #[arg(required = true)]
        videos: Vec<String>,
    },

    /// Search indexed videos for relevant passages
    Search {
        /// Search query
        query: String,

        /// YouTube URL or video ID to search (repeat for several videos)
        #[arg(long = "video", required = true)]
        videos: Vec<String>,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// List indexed videos
    List,

    /// Show metadata for a video
    Info {
        /// YouTube URL or video ID
        video: String,
    },

    /// Remove cached transcripts and/or indexed videos
    Clear {
        #[command(subcommand)]
        target: ClearTarget,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum ClearTarget {
    /// The transcript cache
    Transcripts,
    /// The vector index
    Index,
    /// Both
    All,
    /// One video's indexed passages
    Video {
        /// YouTube URL or video ID
        video: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
