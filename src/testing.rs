//! Deterministic stand-ins for the network-backed seams, used by unit tests.

use crate::embedding::Embedder;
use crate::error::{Result, TubeQaError};
use crate::llm::{LanguageModel, Prompt};
use crate::transcript::{Transcript, TranscriptFetcher, TranscriptSegment};
use crate::video::{MetadataSource, VideoId, VideoMetadata};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use async_openai::config::OpenAIConfig;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const HASH_DIMENSIONS: usize = 512;

/// Bag-of-words embedder: each lowercase word is hashed into one dimension.
pub struct HashEmbedder {
    fail: bool,
    single_calls: AtomicUsize,
    batch_calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self {
            fail: false,
            single_calls: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
        }
    }

    /// An embedder whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn single_calls(&self) -> usize {
        self.single_calls.load(Ordering::SeqCst)
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    fn vectorize(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; HASH_DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            // FNV-1a
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0xcbf29ce484222325u64, |h, b| (h ^ b as u64).wrapping_mul(0x100000001b3));
            vector[(hash % HASH_DIMENSIONS as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail {
            return Err(TubeQaError::Embedding("scripted failure".to_string()));
        }
        Ok(Self::vectorize(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail {
            return Err(TubeQaError::Embedding("scripted failure".to_string()));
        }
        Ok(texts.iter().map(|t| Self::vectorize(t)).collect())
    }

    fn dimensions(&self) -> usize {
        HASH_DIMENSIONS
    }
}

/// Embeds questions (text ending in `?`) opposite to everything else, so
/// every passage scores -1 against every question.
pub struct OpposingEmbedder;

#[async_trait]
impl Embedder for OpposingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let sign = if text.trim_end().ends_with('?') { 1.0 } else { -1.0 };
        Ok(vec![sign, 0.0])
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        2
    }
}

/// Language model that returns a fixed reply and records what it was asked.
pub struct ScriptedModel {
    reply: Option<String>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<Prompt>>,
}

impl ScriptedModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    /// A model whose every call fails.
    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<Prompt> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.clone());
        self.reply
            .clone()
            .ok_or_else(|| TubeQaError::Generation("scripted failure".to_string()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Transcript fetcher backed by a fixed table of videos.
///
/// Unknown videos have no transcript; videos registered with
/// [`with_failure`](Self::with_failure) fail with a fetch error.
pub struct ScriptedFetcher {
    transcripts: HashMap<String, String>,
    failures: HashSet<String>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self {
            transcripts: HashMap::new(),
            failures: HashSet::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_text(mut self, video_id: &str, text: &str) -> Self {
        self.transcripts.insert(video_id.to_string(), text.to_string());
        self
    }

    pub fn with_failure(mut self, video_id: &str) -> Self {
        self.failures.insert(video_id.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptFetcher for ScriptedFetcher {
    async fn fetch(&self, video_id: &VideoId) -> Result<Transcript> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failures.contains(video_id.as_str()) {
            return Err(TubeQaError::fetch(video_id.as_str(), "scripted failure"));
        }

        let text = self
            .transcripts
            .get(video_id.as_str())
            .ok_or_else(|| TubeQaError::NoTranscriptAvailable(video_id.to_string()))?;

        Ok(Transcript::new(
            video_id.clone(),
            "en",
            vec![TranscriptSegment::new(text.clone(), 0.0, 10.0)],
        ))
    }
}

/// Metadata source with fixed titles; unknown videos fail.
#[derive(Default)]
pub struct ScriptedMetadata {
    titles: HashMap<String, String>,
}

impl ScriptedMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, video_id: &str, title: &str) -> Self {
        self.titles.insert(video_id.to_string(), title.to_string());
        self
    }
}

#[async_trait]
impl MetadataSource for ScriptedMetadata {
    async fn fetch(&self, video_id: &VideoId) -> Result<VideoMetadata> {
        let title = self
            .titles
            .get(video_id.as_str())
            .ok_or_else(|| TubeQaError::Metadata(format!("unknown video {}", video_id)))?;

        Ok(VideoMetadata {
            id: video_id.clone(),
            title: title.clone(),
            description: None,
            channel: None,
            thumbnail_url: None,
            view_count: None,
        })
    }
}

const RATE_LIMIT_BODY: &str = r#"{"error":{"message":"Rate limit reached","type":"rate_limit_exceeded","param":null,"code":"rate_limit_exceeded"}}"#;

/// Local HTTP server that answers every request with `429 Too Many Requests`.
pub struct RateLimitedApi {
    base: String,
    requests: Arc<AtomicUsize>,
}

impl RateLimitedApi {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(AtomicUsize::new(0));

        let counter = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let counter = counter.clone();
                tokio::spawn(async move {
                    let _ = read_request(stream, &counter).await;
                });
            }
        });

        Self {
            base: format!("http://{}/v1", addr),
            requests,
        }
    }

    /// Client configuration pointing at this server.
    pub fn config(&self) -> OpenAIConfig {
        OpenAIConfig::new()
            .with_api_base(self.base.clone())
            .with_api_key("test-key")
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

async fn read_request(mut stream: TcpStream, counter: &AtomicUsize) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
        let body_len = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);

        if buf.len() >= header_end + 4 + body_len {
            break;
        }
    }

    counter.fetch_add(1, Ordering::SeqCst);

    let response = format!(
        "HTTP/1.1 429 Too Many Requests\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        RATE_LIMIT_BODY.len(),
        RATE_LIMIT_BODY
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
