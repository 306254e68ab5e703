use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::Result;

/// Prefix for environment overrides, e.g. `SEVASETU__RETRIEVAL__TOP_K=8`.
pub const ENV_PREFIX: &str = "SEVASETU";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    pub server: ServerConfig,
    pub embedding: EmbeddingConfig,
    pub storage: StorageConfig,
    pub retrieval: RetrievalConfig,
    pub conversation: ConversationConfig,
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model_id: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    /// Only consulted for remote providers; local models report their own.
    pub dimension: usize,
    pub batch_size: usize,
    pub cache_size: usize,
    pub max_sequence_length: usize,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProvider {
    Candle,
    #[serde(rename = "openai")]
    OpenAI,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub snapshot_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub similarity_threshold: f32,
    /// Character budget for the chunks handed to the generator.
    pub max_context_length: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    pub max_turns: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub provider: GenerationProvider,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationProvider {
    Anthropic,
    OpenaiCompatible,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            embedding: EmbeddingConfig {
                provider: EmbeddingProvider::Candle,
                model_id: "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2".to_string(),
                api_key: None,
                base_url: None,
                dimension: 384,
                batch_size: 32,
                cache_size: 1000,
                max_sequence_length: 256,
                timeout_ms: 10_000,
            },
            storage: StorageConfig {
                snapshot_path: "data/vector_store.json".to_string(),
            },
            retrieval: RetrievalConfig {
                top_k: 5,
                similarity_threshold: 0.3,
                max_context_length: Some(6000),
            },
            conversation: ConversationConfig {
                max_turns: 6,
            },
            generation: GenerationConfig {
                provider: GenerationProvider::Anthropic,
                model: "claude-3-5-sonnet-20241022".to_string(),
                api_key: None,
                base_url: None,
                max_tokens: 1024,
                temperature: 0.3,
                timeout_ms: 60_000,
            },
        }
    }
}

impl RagConfig {
    /// Layers defaults, an optional TOML file, then `SEVASETU__*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&RagConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: RagConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.retrieval.top_k == 0 {
            return Err(crate::RagError::Config("retrieval.top_k must be at least 1".to_string()));
        }
        if !self.retrieval.similarity_threshold.is_finite() {
            return Err(crate::RagError::Config(
                "retrieval.similarity_threshold must be a finite number".to_string(),
            ));
        }
        if self.embedding.timeout_ms == 0 || self.generation.timeout_ms == 0 {
            return Err(crate::RagError::Config("backend timeouts must be non-zero".to_string()));
        }
        if self.embedding.batch_size == 0 {
            return Err(crate::RagError::Config("embedding.batch_size must be at least 1".to_string()));
        }
        Ok(())
    }
}
