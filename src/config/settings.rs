//! Configuration settings for TubeQA.

use crate::chunking::{ChunkUnit, ChunkingConfig};
use crate::error::TubeQaError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub transcript: TranscriptSettings,
    pub youtube: YoutubeSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub vector_store: VectorStoreSettings,
    pub qa: QaSettings,
    pub tracing: TracingSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level when no -v flag is given (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.tubeqa".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Transcript retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptSettings {
    /// Accepted caption languages, in order of preference.
    pub languages: Vec<String>,
    /// Keep fetched transcripts in a local JSON cache.
    pub cache_enabled: bool,
    /// Path of the transcript cache file.
    pub cache_path: String,
    /// Timeout for transcript HTTP requests.
    pub timeout_seconds: u64,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string()],
            cache_enabled: true,
            cache_path: "~/.tubeqa/transcript_cache.json".to_string(),
            timeout_seconds: 30,
        }
    }
}

/// YouTube-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct YoutubeSettings {
    /// YouTube Data API key (optional, enables richer metadata).
    pub api_key: Option<String>,
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Transcript chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Unit that `chunk_size` and `overlap` are measured in (chars, words).
    pub unit: String,
    /// Window size in units.
    pub chunk_size: usize,
    /// Units shared between consecutive windows.
    pub overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            unit: "chars".to_string(),
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

impl ChunkingSettings {
    /// Convert to a chunker configuration.
    pub fn to_config(&self) -> crate::error::Result<ChunkingConfig> {
        let unit: ChunkUnit = self.unit.parse().map_err(TubeQaError::InvalidChunkConfig)?;
        Ok(ChunkingConfig {
            chunk_size: self.chunk_size,
            overlap: self.overlap,
            unit,
        })
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Vector store provider (sqlite, memory).
    pub provider: String,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: "sqlite".to_string(),
            sqlite_path: "~/.tubeqa/vectors.db".to_string(),
        }
    }
}

/// Question answering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QaSettings {
    /// LLM model for answer generation.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens in a generated answer.
    pub max_tokens: u32,
    /// Number of passages retrieved per question.
    pub top_k: usize,
    /// Minimum similarity score for a passage to count as relevant.
    /// Unset means every retrieved passage is used.
    pub min_score: Option<f32>,
}

impl Default for QaSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4-turbo-preview".to_string(),
            temperature: 0.0,
            max_tokens: 1024,
            top_k: 8,
            min_score: None,
        }
    }
}

/// Tracing identifiers attached to every run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct TracingSettings {
    /// Project identifier used to correlate runs.
    pub project: Option<String>,
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Environment overrides are applied on top of the file contents.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Apply overrides from environment variables.
    ///
    /// The lookup is injected so tests do not depend on the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("YOUTUBE_API_KEY") {
            self.youtube.api_key = Some(key);
        }
        if let Some(path) = non_empty("TUBEQA_DB_PATH") {
            self.vector_store.sqlite_path = path;
        }
        if let Some(project) = non_empty("TUBEQA_PROJECT") {
            self.tracing.project = Some(project);
        }
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tubeqa")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }

    /// Get the expanded transcript cache path.
    pub fn transcript_cache_path(&self) -> PathBuf {
        Self::expand_path(&self.transcript.cache_path)
    }
}
