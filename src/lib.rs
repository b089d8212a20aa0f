//! TubeQA - Question answering over YouTube transcripts
//!
//! Ask a question about one or more YouTube videos and get an answer drawn
//! strictly from what is said in them.
//!
//! # Overview
//!
//! TubeQA:
//! - Fetches the English captions of a video
//! - Splits them into overlapping chunks and embeds each chunk once
//! - Retrieves the passages most similar to a question, restricted to the videos asked about
//! - Has a language model answer from those passages alone, or decline
//!
//! # Architecture
//!
//! - `config` - Configuration management and prompt templates
//! - `video` - Video id parsing and metadata
//! - `transcript` - Caption retrieval and the transcript cache
//! - `chunking` - Fixed-size overlapping chunking
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector storage and the embedding index
//! - `llm` - Language model access
//! - `qa` - Grounded question answering
//! - `pipeline` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use tubeqa::config::Settings;
//! use tubeqa::pipeline::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let pipeline = Pipeline::new(settings)?;
//!
//!     let videos = vec!["https://youtu.be/dQw4w9WgXcQ".to_string()];
//!     let answer = pipeline.ask("What is the song about?", &videos).await?;
//!     println!("{}", answer.format_for_display());
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod openai;
pub mod pipeline;
pub mod qa;
pub mod transcript;
pub mod vector_store;
pub mod video;

#[cfg(test)]
mod testing;

pub use error::{Result, TubeQaError};
