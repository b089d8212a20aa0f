//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise fail midway.

use crate::error::{Result, TubeQaError};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Ingestion embeds transcripts and requires an API key.
    Ingest,
    /// Asking questions requires an API key.
    Ask,
    /// Search embeds the query and requires an API key.
    Search,
    /// Listing reads the local index only.
    List,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation) -> Result<()> {
    check_with(operation, |name| std::env::var(name).ok())
}

fn check_with<F>(operation: Operation, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    match operation {
        Operation::Ingest | Operation::Ask | Operation::Search => check_api_key(&lookup),
        Operation::List => Ok(()),
    }
}

/// Check if OpenAI API key is configured.
fn check_api_key<F>(lookup: &F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup("OPENAI_API_KEY") {
        Some(key) if !key.trim().is_empty() => Ok(()),
        Some(_) => Err(TubeQaError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        None => Err(TubeQaError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}
