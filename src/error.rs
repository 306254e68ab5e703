use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Invalid question: {0}")]
    InvalidQuestion(String),

    #[error("Duplicate chunk id: {0}")]
    DuplicateChunk(String),

    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("HuggingFace Hub error: {0}")]
    HfHub(#[from] hf_hub::api::tokio::ApiError),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),
}

impl From<config::ConfigError> for RagError {
    fn from(err: config::ConfigError) -> Self {
        RagError::Config(err.to_string())
    }
}

impl RagError {
    /// Stable identifier for callers that render kind-specific messages.
    pub fn code(&self) -> &'static str {
        match self {
            RagError::Embedding(_) => "embedding_failure",
            RagError::UnsupportedLanguage(_) => "unsupported_language",
            RagError::Generation(_) => "generation_failure",
            RagError::InvalidQuestion(_) => "invalid_question",
            RagError::DuplicateChunk(_) => "duplicate_chunk",
            RagError::DimensionMismatch { .. } => "dimension_mismatch",
            RagError::Storage(_) => "storage_error",
            RagError::Config(_) => "configuration_error",
            RagError::Io(_) => "io_error",
            RagError::Serde(_) => "serialization_error",
            RagError::Candle(_) => "model_error",
            RagError::HfHub(_) => "model_download_error",
            RagError::Tokenizer(_) => "tokenizer_error",
        }
    }

    /// True for failures caused by a request rather than by the backends.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RagError::UnsupportedLanguage(_) | RagError::InvalidQuestion(_)
        )
    }

    /// True for failures of an upstream model backend.
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, RagError::Embedding(_) | RagError::Generation(_))
    }
}
