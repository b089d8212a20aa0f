//! Clear command implementation.

use crate::cli::{ClearTarget, Output};
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::Result;

/// Run the clear command.
pub async fn run_clear(target: ClearTarget, settings: Settings) -> Result<()> {
    let pipeline = Pipeline::new(settings)?;

    if matches!(target, ClearTarget::Transcripts | ClearTarget::All) {
        if pipeline.clear_transcript_cache()? {
            Output::success("Transcript cache cleared.");
        } else {
            Output::info("Transcript cache is already empty.");
        }
    }

    if matches!(target, ClearTarget::Index | ClearTarget::All) {
        let removed = pipeline.clear_index().await?;
        Output::success(&format!("Removed {} indexed chunks.", removed));
    }

    if let ClearTarget::Video { video } = &target {
        match pipeline.remove_video(video).await {
            Ok(0) => Output::info(&format!("{} is not indexed.", video)),
            Ok(removed) => Output::success(&format!("Removed {} indexed chunks.", removed)),
            Err(e) => {
                Output::error(&format!("Failed to remove {}: {}", video, e));
                return Err(e.into());
            }
        }
    }

    Ok(())
}
