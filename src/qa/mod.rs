//! Question answering grounded in indexed transcripts.
//!
//! The [`QaAgent`] retrieves the passages most similar to a question from the
//! requested videos and asks the language model to answer from those passages
//! alone. Each question is independent; no conversation state is kept.

pub mod context;

pub use context::{format_context_for_display, format_context_for_prompt};

use crate::config::Prompts;
use crate::error::{Result, TubeQaError};
use crate::llm::{LanguageModel, Prompt};
use crate::vector_store::{RetrievedChunk, VectorIndex};
use crate::video::VideoId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Reply given when no transcript passage supports an answer.
pub const NOT_FOUND_ANSWER: &str = "I don't have that information in the video content.";

/// A retrieved passage with display details.
#[derive(Debug, Clone)]
pub struct ContextChunk {
    /// Video the passage belongs to.
    pub video_id: VideoId,
    /// Video title.
    pub video_title: String,
    /// Position of the passage within its video.
    pub sequence_index: usize,
    /// Passage text.
    pub content: String,
    /// Similarity score.
    pub score: f32,
    /// Link to the video.
    pub url: String,
}

impl From<RetrievedChunk> for ContextChunk {
    fn from(result: RetrievedChunk) -> Self {
        Self {
            url: result.chunk.video_id.watch_url(),
            video_id: result.chunk.video_id,
            video_title: result.video_title,
            sequence_index: result.chunk.sequence_index,
            content: result.chunk.text,
            score: result.score,
        }
    }
}

/// An answer with the passages it was generated from.
#[derive(Debug, Clone)]
pub struct Answer {
    /// The answer text.
    pub text: String,
    /// Passages given to the model, most relevant first.
    pub sources: Vec<ContextChunk>,
}

impl Answer {
    fn not_found() -> Self {
        Self {
            text: NOT_FOUND_ANSWER.to_string(),
            sources: Vec::new(),
        }
    }

    /// Whether the answer was generated from retrieved passages.
    pub fn is_grounded(&self) -> bool {
        !self.sources.is_empty()
    }

    /// Format the answer for display.
    pub fn format_for_display(&self) -> String {
        let mut output = self.text.clone();

        if !self.sources.is_empty() {
            output.push_str("\n\n--- Sources ---\n\n");
            output.push_str(&format_context_for_display(&self.sources));
        }

        output
    }
}

/// Answers questions from the transcripts of a chosen set of videos.
pub struct QaAgent {
    index: Arc<VectorIndex>,
    model: Arc<dyn LanguageModel>,
    prompts: Prompts,
    top_k: usize,
    min_score: Option<f32>,
}

impl QaAgent {
    /// Create an agent with default prompts, `top_k` of 8 and no score threshold.
    pub fn new(index: Arc<VectorIndex>, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            index,
            model,
            prompts: Prompts::default(),
            top_k: 8,
            min_score: None,
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Set the number of passages retrieved per question.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the minimum similarity score for a passage to be used.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    /// Answer `question` using only passages from `video_ids`.
    ///
    /// When nothing is retrieved the fixed [`NOT_FOUND_ANSWER`] is returned
    /// without calling the language model.
    #[instrument(skip(self, video_ids), fields(question = %question, videos = video_ids.len()))]
    pub async fn answer(&self, question: &str, video_ids: &[VideoId]) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(TubeQaError::InvalidInput("Question is empty".to_string()));
        }

        info!("Processing question: {}", question);

        let retrieved = match self.min_score {
            Some(min_score) => {
                self.index
                    .search_with_threshold(question, video_ids, self.top_k, min_score)
                    .await?
            }
            None => self.index.search(question, video_ids, self.top_k).await?,
        };

        if retrieved.is_empty() {
            debug!("No passages retrieved, declining");
            return Ok(Answer::not_found());
        }

        let sources: Vec<ContextChunk> = retrieved.into_iter().map(ContextChunk::from).collect();
        let prompt = self.build_prompt(question, &sources);

        let text = self.model.complete(&prompt).await?;

        debug!(
            "Generated response with {} sources using {}",
            sources.len(),
            self.model.name()
        );

        Ok(Answer { text, sources })
    }

    fn build_prompt(&self, question: &str, sources: &[ContextChunk]) -> Prompt {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), format_context_for_prompt(sources));

        Prompt::new(
            self.prompts.render_with_custom(&self.prompts.qa.system, &vars),
            self.prompts.render_with_custom(&self.prompts.qa.user, &vars),
        )
    }
}
