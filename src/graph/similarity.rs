//! Semantic similarity edges
//!
//! Embeds a textual summary of each code file through an
//! [`EmbeddingProvider`] and relates files whose embeddings are close.
//! Uses ureq (sync HTTP), no async runtime.

use crate::graph::builder::PendingEdge;
use crate::models::EdgeKind;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Files with less meaningful text than this are not embedded
const MIN_TEXT_CHARS: usize = 50;
/// Input longer than this is truncated before embedding
const MAX_TEXT_CHARS: usize = 30_000;

/// Extensions considered source code for similarity purposes
pub const CODE_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "jsx", "tsx", "java", "cpp", "c", "h", "rb", "go", "rs", "php", "kt",
    "swift",
];

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Missing API key: {0} not set")]
    MissingApiKey(String),

    #[error("Embedding request failed: {0}")]
    RequestFailed(String),

    #[error("Embedding API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse embedding response: {0}")]
    ParseError(String),
}

/// Turns text into a vector
pub trait EmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// OpenAI-compatible `/v1/embeddings` client
pub struct OpenAiEmbeddings {
    api_key: String,
    model: String,
    url: String,
    agent: ureq::Agent,
}

fn make_agent() -> ureq::Agent {
    ureq::config::Config::builder()
        .http_status_as_error(false)
        .timeout_global(Some(Duration::from_secs(60)))
        .build()
        .new_agent()
}

impl OpenAiEmbeddings {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            url: OPENAI_EMBEDDINGS_URL.to_string(),
            agent: make_agent(),
        }
    }

    /// Client keyed from `OPENAI_API_KEY`.
    pub fn from_env(model: &str) -> Result<Self, EmbeddingError> {
        let api_key = env::var(OPENAI_API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| EmbeddingError::MissingApiKey(OPENAI_API_KEY_ENV.to_string()))?;
        Ok(Self::new(api_key, model))
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl EmbeddingProvider for OpenAiEmbeddings {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .agent
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(&body)
            .map_err(|e| EmbeddingError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        if status >= 400 {
            let message = response.into_body().read_to_string().unwrap_or_default();
            return Err(EmbeddingError::ApiError { status, message });
        }

        let parsed: EmbeddingResponse = response
            .into_body()
            .read_json()
            .map_err(|e| EmbeddingError::ParseError(e.to_string()))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::ParseError("No embedding in response".to_string()))
    }
}

/// Cosine similarity; 0.0 for empty, mismatched or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Whether a file extension is eligible for embedding.
pub fn is_code_extension(extension: Option<&str>) -> bool {
    extension.is_some_and(|ext| CODE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn truncate_text(text: &str) -> String {
    match text.char_indices().nth(MAX_TEXT_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Similarity edges among `(file_id, semantic_text)` documents.
///
/// Failures to embed a single file are warnings; that file simply takes no
/// part in the comparison.
pub fn similarity_edges<P: EmbeddingProvider + ?Sized>(
    provider: &P,
    documents: &[(String, String)],
    threshold: f64,
) -> Vec<PendingEdge> {
    let mut embedded: Vec<(&str, Vec<f32>)> = Vec::new();
    for (id, text) in documents {
        if text.trim().chars().count() <= MIN_TEXT_CHARS {
            debug!("Skipping {} for similarity: too little text", id);
            continue;
        }
        match provider.embed(&truncate_text(text)) {
            Ok(vector) if !vector.is_empty() => embedded.push((id.as_str(), vector)),
            Ok(_) => warn!("Empty embedding for {}", id),
            Err(e) => warn!("Could not embed {}: {}", id, e),
        }
    }

    if embedded.len() < 2 {
        info!("Not enough embedded files for semantic similarity");
        return Vec::new();
    }

    let mut edges = Vec::new();
    for (i, (id_a, vec_a)) in embedded.iter().enumerate() {
        for (id_b, vec_b) in &embedded[i + 1..] {
            let similarity = cosine_similarity(vec_a, vec_b);
            if similarity >= threshold {
                edges.push(
                    PendingEdge::new(*id_a, *id_b, EdgeKind::SemanticSimilarity)
                        .with_weight(similarity.clamp(0.0, 1.0)),
                );
            }
        }
    }
    info!(
        "Semantic similarity: {} files embedded, {} edges",
        embedded.len(),
        edges.len()
    );
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Embeds by keyword presence so tests control similarity exactly.
    struct KeywordEmbeddings {
        calls: RefCell<usize>,
    }

    impl EmbeddingProvider for KeywordEmbeddings {
        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            *self.calls.borrow_mut() += 1;
            if text.contains("broken") {
                return Err(EmbeddingError::RequestFailed("boom".into()));
            }
            Ok(vec![
                if text.contains("user") { 1.0 } else { 0.0 },
                if text.contains("invoice") { 1.0 } else { 0.0 },
            ])
        }
    }

    fn doc(id: &str, topic: &str) -> (String, String) {
        (id.to_string(), format!("{} {}", topic, "x".repeat(60)))
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_similarity_edges_above_threshold() {
        let provider = KeywordEmbeddings { calls: RefCell::new(0) };
        let documents = vec![
            doc("users.py", "user"),
            doc("accounts.py", "user"),
            doc("billing.py", "invoice"),
            doc("broken.py", "broken"),
            ("tiny.py".to_string(), "short".to_string()),
        ];

        let edges = similarity_edges(&provider, &documents, 0.7);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source, "users.py");
        assert_eq!(edges[0].target, "accounts.py");
        assert_eq!(edges[0].kind, EdgeKind::SemanticSimilarity);
        // tiny.py is never sent
        assert_eq!(*provider.calls.borrow(), 4);
    }

    #[test]
    fn test_is_code_extension() {
        assert!(is_code_extension(Some("py")));
        assert!(is_code_extension(Some("TSX")));
        assert!(!is_code_extension(Some("md")));
        assert!(!is_code_extension(None));
    }

    #[test]
    fn test_truncate_text() {
        let long = "a".repeat(MAX_TEXT_CHARS + 10);
        let truncated = truncate_text(&long);
        assert_eq!(truncated.len(), MAX_TEXT_CHARS + 3);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncate_text("short"), "short");
    }
}
