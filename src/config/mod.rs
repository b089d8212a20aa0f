//! Configuration module for TubeQA.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, QaPrompts};
pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, PromptSettings, QaSettings, Settings,
    TracingSettings, TranscriptSettings, VectorStoreSettings, YoutubeSettings,
};
