//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    videos: &[String],
    limit: usize,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let pipeline = Pipeline::new(settings)?;

    let spinner = Output::spinner("Searching...");
    let results = pipeline.search(query, videos, limit).await;
    spinner.finish_and_clear();

    match results {
        Ok(chunks) => {
            if chunks.is_empty() {
                Output::warning("No results found. Have these videos been ingested?");
            } else {
                Output::success(&format!("Found {} results", chunks.len()));

                for result in &chunks {
                    Output::passage(
                        &result.video_title,
                        result.chunk.sequence_index + 1,
                        result.score,
                        &result.chunk.text,
                        &result.chunk.video_id.watch_url(),
                    );
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
