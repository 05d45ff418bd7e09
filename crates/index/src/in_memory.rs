//! In-memory keyword index, useful for small document sets and tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use toolloop_core::error::RetrievalError;
use toolloop_core::retrieval::{RetrievedFragment, Retriever};
use toolloop_core::tool::Tool;
use tracing::{debug, warn};
use uuid::Uuid;

/// Default number of fragments returned per query.
pub const DEFAULT_TOP_K: usize = 2;

/// File extensions picked up by [`InMemoryIndex::load_dir`].
const INDEXED_EXTENSIONS: &[&str] = &["txt", "md"];

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "do", "does", "for", "from", "how", "i",
    "in", "is", "it", "me", "of", "on", "or", "the", "to", "what", "which", "who", "with",
];

/// A document stored in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    /// Where the text came from (file name, tool name, ...)
    pub source: String,
    pub content: String,
}

/// An index that keeps documents in a Vec and ranks them by keyword overlap.
pub struct InMemoryIndex {
    documents: Arc<RwLock<Vec<Document>>>,
    top_k: usize,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::with_documents(Vec::new())
    }

    fn with_documents(documents: Vec<Document>) -> Self {
        Self {
            documents: Arc::new(RwLock::new(documents)),
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Return at most `top_k` fragments per query.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Index every `.txt` and `.md` file directly inside `dir`.
    ///
    /// The file name becomes the fragment source.
    pub async fn load_dir(dir: impl AsRef<Path>) -> Result<Self, RetrievalError> {
        let dir = dir.as_ref();
        let load_failed = |reason: String| RetrievalError::LoadFailed {
            path: dir.display().to_string(),
            reason,
        };

        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| load_failed(e.to_string()))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| load_failed(e.to_string()))? {
            let path = entry.path();
            let indexed = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| INDEXED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
            if indexed && path.is_file() {
                paths.push(path);
            }
        }
        // read_dir order is platform dependent
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let source = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => documents.push(Document {
                    id: Uuid::new_v4().to_string(),
                    source,
                    content,
                }),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable document"),
            }
        }

        debug!(dir = %dir.display(), count = documents.len(), "Loaded documents into index");
        Ok(Self::with_documents(documents))
    }

    /// Index tool descriptions so tools can be retrieved by what they do.
    ///
    /// Each fragment's source is the tool name.
    pub fn from_tools(tools: &[Arc<dyn Tool>]) -> Self {
        let documents = tools
            .iter()
            .map(|tool| Document {
                id: Uuid::new_v4().to_string(),
                source: tool.name().to_string(),
                content: format!("{}: {}", tool.name(), tool.description()),
            })
            .collect();
        Self::with_documents(documents)
    }

    /// Add a document, returning its id.
    pub async fn insert(&self, source: impl Into<String>, content: impl Into<String>) -> String {
        let id = Uuid::new_v4().to_string();
        self.documents.write().await.push(Document {
            id: id.clone(),
            source: source.into(),
            content: content.into(),
        });
        id
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.documents.write().await.clear();
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercased alphanumeric words, minus stopwords.
fn keywords(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Keyword overlap score, normalized by document length.
fn score(query_terms: &HashSet<String>, content: &str) -> f32 {
    let words = keywords(content);
    let hits = words.iter().filter(|w| query_terms.contains(*w)).count();
    hits as f32 / (words.len() as f32 / 100.0).max(1.0)
}

#[async_trait]
impl Retriever for InMemoryIndex {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedFragment>, RetrievalError> {
        let query_terms: HashSet<String> = keywords(query).into_iter().collect();
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }

        let documents = self.documents.read().await;
        let mut results: Vec<RetrievedFragment> = documents
            .iter()
            .map(|d| RetrievedFragment::new(&d.source, &d.content, score(&query_terms, &d.content)))
            .filter(|f| f.score > 0.0)
            .collect();

        // Stable sort keeps insertion order among equal scores.
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(self.top_k);

        debug!(query = %query, hits = results.len(), "Index query");
        Ok(results)
    }
}
