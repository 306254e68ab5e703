use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use crate::embedding::{validate_embedding, EmbeddingService};
use crate::storage::{RetrievalResult, VectorStorage};
use crate::{Result, RagError};

#[async_trait]
pub trait RetrievalPipeline: Send + Sync {
    /// Ranked chunks with `similarity >= min_similarity`, at most `k` of them.
    async fn retrieve(&self, question: &str, k: usize, min_similarity: f32) -> Result<Vec<RetrievalResult>>;
}

pub struct VectorRetriever {
    storage: Arc<dyn VectorStorage>,
    embedding_service: Arc<dyn EmbeddingService>,
    max_context_length: Option<usize>,
    embed_timeout: Duration,
}

impl VectorRetriever {
    pub fn new(
        storage: Arc<dyn VectorStorage>,
        embedding_service: Arc<dyn EmbeddingService>,
        embed_timeout: Duration,
    ) -> Self {
        Self {
            storage,
            embedding_service,
            max_context_length: None,
            embed_timeout,
        }
    }

    pub fn with_max_context_length(mut self, max_context_length: Option<usize>) -> Self {
        self.max_context_length = max_context_length;
        self
    }

    /// Embeds on its own task so the timeout fires even when a backend
    /// blocks the thread it runs on.
    async fn embed_question(&self, question: &str) -> Result<Vec<f32>> {
        let service = self.embedding_service.clone();
        let text = question.to_string();
        let mut task = tokio::spawn(async move { service.embed_text(&text).await });

        let embedding = match tokio::time::timeout(self.embed_timeout, &mut task).await {
            Ok(joined) => joined.map_err(|e| RagError::Embedding(format!("embedding task failed: {}", e)))??,
            Err(_) => {
                task.abort();
                return Err(RagError::Embedding(format!(
                    "embedding timed out after {}ms",
                    self.embed_timeout.as_millis()
                )));
            }
        };

        validate_embedding(embedding, self.storage.dimension())
    }

    /// Keeps results in rank order while their combined text fits the budget.
    /// The top result is always kept.
    fn assemble_context(&self, results: Vec<RetrievalResult>) -> Vec<RetrievalResult> {
        let Some(budget) = self.max_context_length else {
            return results;
        };

        let mut total_length = 0;
        let mut selected = Vec::with_capacity(results.len());
        for result in results {
            let length = result.text.chars().count();
            if !selected.is_empty() && total_length + length > budget {
                break;
            }
            total_length += length;
            selected.push(result);
        }
        selected
    }
}

#[async_trait]
impl RetrievalPipeline for VectorRetriever {
    async fn retrieve(&self, question: &str, k: usize, min_similarity: f32) -> Result<Vec<RetrievalResult>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        if self.storage.size() == 0 {
            tracing::debug!("Vector store is empty, skipping retrieval");
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let embedding = self.embed_question(question).await?;
        let embed_ms = start.elapsed().as_millis() as u64;

        // The store ranks descending, so filtering its top-k equals the
        // top-k of the filtered set.
        let candidates = self.storage.search(&embedding, k).await?;
        let candidate_count = candidates.len();
        let relevant: Vec<RetrievalResult> = candidates
            .into_iter()
            .filter(|r| r.similarity >= min_similarity)
            .take(k)
            .collect();
        let relevant_count = relevant.len();

        let results = self.assemble_context(relevant);

        tracing::debug!(
            candidates = candidate_count,
            above_threshold = relevant_count,
            selected = results.len(),
            min_similarity,
            embed_ms,
            "Retrieval finished"
        );

        Ok(results)
    }
}
