use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::api::tokio::Api;
use lru::LruCache;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokenizers::{Tokenizer, TruncationParams};
use crate::config::{EmbeddingConfig, EmbeddingProvider};
use crate::storage::SimilarityMetric;
use crate::{Result, RagError};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;
    async fn embed_batch(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>>;
    fn dimension(&self) -> usize;

    /// The metric the encoder was trained for; the store must use the same one.
    fn metric(&self) -> SimilarityMetric {
        SimilarityMetric::Cosine
    }
}

/// Bounded text -> vector cache. A capacity of zero disables caching.
pub struct EmbeddingCache {
    inner: Option<Mutex<LruCache<String, Vec<f32>>>>,
}

impl EmbeddingCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        let cache = self.inner.as_ref()?;
        let mut guard = cache.lock().ok()?;
        guard.get(text).cloned()
    }

    pub fn insert(&self, text: &str, embedding: &[f32]) {
        if let Some(cache) = &self.inner {
            if let Ok(mut guard) = cache.lock() {
                guard.put(text.to_string(), embedding.to_vec());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .as_ref()
            .and_then(|cache| cache.lock().ok().map(|guard| guard.len()))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rejects vectors that would silently corrupt ranking.
pub fn validate_embedding(embedding: Vec<f32>, dimension: usize) -> Result<Vec<f32>> {
    if embedding.len() != dimension {
        return Err(RagError::Embedding(format!(
            "expected a {}-dimensional embedding, backend returned {}",
            dimension,
            embedding.len()
        )));
    }
    if embedding.iter().any(|x| !x.is_finite()) {
        return Err(RagError::Embedding("embedding contains non-finite values".to_string()));
    }
    if embedding.iter().all(|x| *x == 0.0) {
        return Err(RagError::Embedding("backend returned a zero vector".to_string()));
    }
    Ok(embedding)
}

/// Tokenizer and BERT weights. Shared with blocking tasks, never mutated.
struct BertEncoder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
}

/// Local sentence encoder. Tokenization and the forward pass are CPU bound,
/// so they run on the blocking pool instead of an executor worker.
pub struct CandleEmbedding {
    encoder: Arc<BertEncoder>,
    dimension: usize,
    cache: EmbeddingCache,
}

impl CandleEmbedding {
    pub async fn new(config: &EmbeddingConfig) -> Result<Self> {
        let device = Device::Cpu;

        let api = Api::new()?;
        let repo = api.model(config.model_id.clone());
        tracing::info!(model = %config.model_id, "Loading embedding model");

        let tokenizer_path = repo.get("tokenizer.json").await?;
        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| RagError::Tokenizer(format!("Failed to load tokenizer: {}", e)))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_sequence_length,
                ..Default::default()
            }))
            .map_err(|e| RagError::Tokenizer(format!("Invalid truncation settings: {}", e)))?;
        tokenizer.with_padding(None);

        let config_path = repo.get("config.json").await?;
        let config_content = std::fs::read_to_string(config_path)?;
        let bert_config: Config = serde_json::from_str(&config_content)?;
        let raw_config: serde_json::Value = serde_json::from_str(&config_content)?;
        let dimension = raw_config
            .get("hidden_size")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .ok_or_else(|| RagError::Config("model config has no hidden_size".to_string()))?;

        let vb = match repo.get("model.safetensors").await {
            Ok(weights) => unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, &device)? },
            Err(_) => {
                let weights = repo.get("pytorch_model.bin").await?;
                VarBuilder::from_pth(weights, DType::F32, &device)?
            }
        };
        let model = BertModel::load(vb, &bert_config)?;

        Ok(Self {
            encoder: Arc::new(BertEncoder {
                model,
                tokenizer,
                device,
                dimension,
            }),
            dimension,
            cache: EmbeddingCache::new(config.cache_size),
        })
    }

    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let encoder = self.encoder.clone();
        let text = text.to_string();
        tokio::task::spawn_blocking(move || encoder.compute_embedding(&text))
            .await
            .map_err(|e| RagError::Embedding(format!("Embedding task failed: {}", e)))?
    }
}

impl BertEncoder {
    fn forward(&self, ids: &[u32], mask: &[u32]) -> candle_core::Result<Vec<f32>> {
        let token_ids = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let token_type_ids = token_ids.zeros_like()?;
        let attention_mask = Tensor::new(mask, &self.device)?.unsqueeze(0)?;

        // [1, seq_len, hidden]
        let hidden = self.model.forward(&token_ids, &token_type_ids, Some(&attention_mask))?;

        // Mean over real tokens only
        let mask_f = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask_f)?.sum(1)?;
        let counts = mask_f.sum(1)?;
        let pooled = summed.broadcast_div(&counts)?;
        pooled.squeeze(0)?.to_vec1::<f32>()
    }

    fn compute_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self.tokenizer.encode(text, true)
            .map_err(|e| RagError::Embedding(format!("Tokenization failed: {}", e)))?;

        let raw = self
            .forward(encoding.get_ids(), encoding.get_attention_mask())
            .map_err(|e| RagError::Embedding(format!("Model forward pass failed: {}", e)))?;

        let norm = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 || !norm.is_finite() {
            return Err(RagError::Embedding("model produced a degenerate embedding".to_string()));
        }
        let normalized: Vec<f32> = raw.iter().map(|x| x / norm).collect();

        validate_embedding(normalized, self.dimension)
    }
}

#[async_trait]
impl EmbeddingService for CandleEmbedding {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self.cache.get(text) {
            return Ok(cached);
        }

        let embedding = self.encode(text).await?;
        self.cache.insert(text, &embedding);
        Ok(embedding)
    }

    async fn embed_batch(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>> {
        futures::future::try_join_all(texts.into_iter().map(|text| self.embed_text(text))).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[derive(Serialize)]
struct OpenAIEmbeddingRequest {
    input: Vec<String>,
    model: String,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Embeddings from any OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAIEmbedding {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
    batch_size: usize,
    timeout: Duration,
    cache: EmbeddingCache,
}

impl OpenAIEmbedding {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.is_empty());

        Ok(Self {
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model: config.model_id.clone(),
            dimension: config.dimension,
            batch_size: config.batch_size.max(1),
            timeout,
            cache: EmbeddingCache::new(config.cache_size),
        })
    }

    async fn call_api(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let expected = texts.len();
        let request = OpenAIEmbeddingRequest {
            input: texts,
            model: self.model.clone(),
        };

        let mut builder = self.client
            .post(format!("{}/embeddings", self.base_url))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                RagError::Embedding(format!("Embedding request timed out after {:?}", self.timeout))
            } else {
                RagError::Embedding(format!("Embedding API call failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RagError::Embedding(format!("Embedding API error ({}): {}", status, error_text)));
        }

        let mut parsed: OpenAIEmbeddingResponse = response.json().await
            .map_err(|e| RagError::Embedding(format!("Failed to parse embedding response: {}", e)))?;

        if parsed.data.len() != expected {
            return Err(RagError::Embedding(format!(
                "requested {} embeddings, backend returned {}",
                expected,
                parsed.data.len()
            )));
        }
        parsed.data.sort_by_key(|d| d.index);

        parsed
            .data
            .into_iter()
            .map(|d| validate_embedding(d.embedding, self.dimension))
            .collect()
    }
}

#[async_trait]
impl EmbeddingService for OpenAIEmbedding {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self.cache.get(text) {
            return Ok(cached);
        }

        let embedding = self.call_api(vec![text.to_string()]).await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("No embedding returned".to_string()))?;

        self.cache.insert(text, &embedding);
        Ok(embedding)
    }

    async fn embed_batch(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>> {
        let mut results: Vec<Option<Vec<f32>>> = texts.iter().map(|t| self.cache.get(t)).collect();
        let uncached: Vec<(usize, &str)> = texts
            .iter()
            .enumerate()
            .filter(|(i, _)| results[*i].is_none())
            .map(|(i, t)| (i, *t))
            .collect();

        for batch in uncached.chunks(self.batch_size) {
            let inputs = batch.iter().map(|(_, t)| t.to_string()).collect();
            let embeddings = self.call_api(inputs).await?;
            for ((idx, text), embedding) in batch.iter().zip(embeddings) {
                self.cache.insert(text, &embedding);
                results[*idx] = Some(embedding);
            }
        }

        results
            .into_iter()
            .map(|e| e.ok_or_else(|| RagError::Embedding("missing embedding in batch".to_string())))
            .collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

pub async fn build_embedding_service(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingService>> {
    match config.provider {
        EmbeddingProvider::Candle => Ok(Arc::new(CandleEmbedding::new(config).await?)),
        EmbeddingProvider::OpenAI => Ok(Arc::new(OpenAIEmbedding::new(config)?)),
    }
}
