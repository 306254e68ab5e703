use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use crate::{Result, RagError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub scheme_name: String,
    pub source_file: String,
    pub chunk_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// An ingested excerpt of a scheme document. Never mutated once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunk_id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub similarity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    Cosine,
    DotProduct,
}

impl SimilarityMetric {
    /// Accumulates in f64, so any finite inputs give a finite score.
    /// Cosine is clamped to [-1, 1]; dot products saturate at the f32 range.
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
        match self {
            SimilarityMetric::DotProduct => dot.clamp(f32::MIN as f64, f32::MAX as f64) as f32,
            SimilarityMetric::Cosine => {
                let norm_a = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
                let norm_b = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    0.0
                } else {
                    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0) as f32
                }
            }
        }
    }
}

#[async_trait]
pub trait VectorStorage: Send + Sync {
    async fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<RetrievalResult>>;
    fn size(&self) -> usize;
    fn dimension(&self) -> usize;
    fn metric(&self) -> SimilarityMetric;
}

/// On-disk layout written by the ingestion pipeline.
#[derive(Debug, Serialize, Deserialize)]
struct StoreSnapshot {
    dimension: usize,
    metric: SimilarityMetric,
    documents: Vec<DocumentChunk>,
}

/// Exact nearest-neighbour store kept entirely in memory.
///
/// Chunks are appended before the store is shared; once it sits behind an
/// `Arc` it is only ever read.
#[derive(Debug, Clone)]
pub struct InMemoryVectorStore {
    documents: Vec<DocumentChunk>,
    ids: HashSet<String>,
    dimension: usize,
    metric: SimilarityMetric,
}

impl InMemoryVectorStore {
    pub fn new(dimension: usize, metric: SimilarityMetric) -> Self {
        Self {
            documents: Vec::new(),
            ids: HashSet::new(),
            dimension,
            metric,
        }
    }

    pub fn add(&mut self, chunk: DocumentChunk) -> Result<()> {
        if self.ids.contains(&chunk.id) {
            return Err(RagError::DuplicateChunk(chunk.id));
        }
        if chunk.embedding.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                found: chunk.embedding.len(),
            });
        }
        if chunk.embedding.iter().any(|x| !x.is_finite()) {
            return Err(RagError::Storage(format!(
                "chunk {} has a non-finite embedding component",
                chunk.id
            )));
        }

        self.ids.insert(chunk.id.clone());
        self.documents.push(chunk);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&DocumentChunk> {
        self.documents.iter().find(|chunk| chunk.id == id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Ranks every chunk against the query. Ties keep insertion order.
    pub fn search_exact(&self, query_embedding: &[f32], k: usize) -> Result<Vec<RetrievalResult>> {
        if query_embedding.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                found: query_embedding.len(),
            });
        }
        if query_embedding.iter().any(|x| !x.is_finite()) {
            return Err(RagError::Storage("query embedding has a non-finite component".to_string()));
        }
        if k == 0 || self.documents.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .documents
            .iter()
            .enumerate()
            .map(|(idx, chunk)| (idx, self.metric.score(query_embedding, &chunk.embedding)))
            .collect();

        // sort_by is stable, so equal scores stay in insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(idx, similarity)| {
                let chunk = &self.documents[idx];
                RetrievalResult {
                    chunk_id: chunk.id.clone(),
                    text: chunk.text.clone(),
                    metadata: chunk.metadata.clone(),
                    similarity,
                }
            })
            .collect())
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let snapshot: StoreSnapshot = serde_json::from_str(&content)?;

        let mut store = Self::new(snapshot.dimension, snapshot.metric);
        for chunk in snapshot.documents {
            store.add(chunk)?;
        }

        tracing::info!(
            path = %path.display(),
            documents = store.len(),
            dimension = store.dimension,
            metric = ?store.metric,
            "Loaded vector store snapshot"
        );
        Ok(store)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let snapshot = StoreSnapshot {
            dimension: self.dimension,
            metric: self.metric,
            documents: self.documents.clone(),
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, serde_json::to_vec(&snapshot)?).await?;
        Ok(())
    }
}

#[async_trait]
impl VectorStorage for InMemoryVectorStore {
    async fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<RetrievalResult>> {
        self.search_exact(query_embedding, k)
    }

    fn size(&self) -> usize {
        self.documents.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> SimilarityMetric {
        self.metric
    }
}
