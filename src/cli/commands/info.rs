//! Info command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::video::{build_http_client, MetadataSource, VideoId, YoutubeMetadataSource};
use anyhow::Result;
use std::time::Duration;

/// Run the info command.
pub async fn run_info(video: &str, settings: Settings) -> Result<()> {
    let video_id = VideoId::parse(video)?;
    let http = build_http_client(Duration::from_secs(settings.transcript.timeout_seconds))?;
    let source = YoutubeMetadataSource::new(http, settings.youtube.api_key.clone());

    let metadata = match source.fetch(&video_id).await {
        Ok(metadata) => metadata,
        Err(e) => {
            Output::error(&format!("Failed to fetch metadata: {}", e));
            return Err(e.into());
        }
    };

    Output::header(&metadata.title);
    Output::kv("ID", metadata.id.as_str());
    Output::kv("URL", &metadata.id.watch_url());
    if let Some(channel) = &metadata.channel {
        Output::kv("Channel", channel);
    }
    if let Some(views) = metadata.view_count {
        Output::kv("Views", &views.to_string());
    }
    if let Some(thumbnail) = &metadata.thumbnail_url {
        Output::kv("Thumbnail", thumbnail);
    }
    if let Some(description) = metadata.description.as_deref().filter(|d| !d.is_empty()) {
        println!("\n{}", description);
    }

    Ok(())
}
