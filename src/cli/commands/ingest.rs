//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::Result;

/// Run the ingest command.
pub async fn run_ingest(videos: &[String], settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let pipeline = Pipeline::new(settings)?;

    let spinner = Output::spinner(&format!("Ingesting {} video(s)...", videos.len()));
    let results = pipeline.ingest_all(videos).await;
    spinner.finish_and_clear();

    let mut failed = 0;
    for (input, result) in &results {
        match result {
            Ok(r) if r.skipped => {
                Output::info(&format!("{} is already indexed", r.video_id));
            }
            Ok(r) => {
                Output::success(&format!(
                    "{} ({}): indexed {} chunks",
                    r.title, r.video_id, r.chunks_indexed
                ));
            }
            Err(e) => {
                failed += 1;
                Output::error(&format!("{}: {}", input, e));
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} videos failed to ingest", failed, results.len());
    }

    Ok(())
}
