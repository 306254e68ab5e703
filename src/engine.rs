use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use crate::config::RagConfig;
use crate::conversation::{ContextManager, ConversationTurn};
use crate::embedding::{build_embedding_service, EmbeddingService};
use crate::generation::{build_language_model, AnswerGenerator, LanguageModel};
use crate::language::{LanguageInfo, LanguageRegistry};
use crate::query::QueryProcessor;
use crate::retrieval::{RetrievalPipeline, VectorRetriever};
use crate::storage::{InMemoryVectorStore, RetrievalResult, VectorStorage};
use crate::{Result, RagError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub response: String,
    /// Scheme names of `documents`, deduplicated, first appearance first.
    pub sources: Vec<String>,
    pub retrieved_docs: usize,
    pub language: String,
    pub documents: Vec<RetrievalResult>,
    pub processing_time_ms: u64,
}

/// The question answering engine. Built once, shared behind an `Arc`; it
/// holds no per-request state.
pub struct RagSystem {
    languages: LanguageRegistry,
    processor: QueryProcessor,
    storage: Arc<dyn VectorStorage>,
    retriever: Arc<dyn RetrievalPipeline>,
    context: ContextManager,
    generator: AnswerGenerator,
    top_k: usize,
    min_similarity: f32,
}

impl RagSystem {
    pub fn new(
        storage: Arc<dyn VectorStorage>,
        embedding_service: Arc<dyn EmbeddingService>,
        model: Arc<dyn LanguageModel>,
        config: &RagConfig,
    ) -> Result<Self> {
        if embedding_service.dimension() != storage.dimension() {
            return Err(RagError::Config(format!(
                "embedder produces {}-dimensional vectors but the store holds {}-dimensional ones",
                embedding_service.dimension(),
                storage.dimension()
            )));
        }
        if embedding_service.metric() != storage.metric() {
            return Err(RagError::Config(format!(
                "embedder expects {:?} similarity but the store was built for {:?}",
                embedding_service.metric(),
                storage.metric()
            )));
        }

        let retriever = VectorRetriever::new(
            storage.clone(),
            embedding_service,
            Duration::from_millis(config.embedding.timeout_ms),
        )
        .with_max_context_length(config.retrieval.max_context_length);

        Ok(Self {
            languages: LanguageRegistry::new(),
            processor: QueryProcessor::new()?,
            storage,
            retriever: Arc::new(retriever),
            context: ContextManager::new(config.conversation.max_turns),
            generator: AnswerGenerator::new(model, Duration::from_millis(config.generation.timeout_ms)),
            top_k: config.retrieval.top_k,
            min_similarity: config.retrieval.similarity_threshold,
        })
    }

    /// Loads the store snapshot and builds both backends from configuration.
    pub async fn from_config(config: &RagConfig, snapshot: &Path) -> Result<Self> {
        let store = InMemoryVectorStore::load(snapshot).await?;
        let embedding_service = build_embedding_service(&config.embedding).await?;
        let model = build_language_model(&config.generation)?;
        Self::new(Arc::new(store), embedding_service, model, config)
    }

    pub fn with_retrieval(mut self, top_k: usize, min_similarity: f32) -> Self {
        self.top_k = top_k;
        self.min_similarity = min_similarity;
        self
    }

    pub async fn query(
        &self,
        question: &str,
        language: &str,
        conversation_history: &[ConversationTurn],
    ) -> Result<QueryResult> {
        let start = Instant::now();

        // Validate cheap inputs before touching any backend
        let directive = self.languages.resolve(language)?;
        let processed = self.processor.process(question)?;

        let documents = self
            .retriever
            .retrieve(&processed.search_text, self.top_k, self.min_similarity)
            .await?;

        let history = self.context.condense(conversation_history);
        let answer = self
            .generator
            .generate(&processed.normalized, &documents, &history, &directive)
            .await?;

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            language = %directive.code,
            retrieved_docs = documents.len(),
            sources = ?answer.sources,
            history_turns = history.len(),
            processing_time_ms,
            "Query answered"
        );

        Ok(QueryResult {
            response: answer.response,
            sources: answer.sources,
            retrieved_docs: documents.len(),
            language: directive.code,
            documents,
            processing_time_ms,
        })
    }

    pub fn document_count(&self) -> usize {
        self.storage.size()
    }

    pub fn supported_languages(&self) -> Vec<LanguageInfo> {
        self.languages.supported()
    }
}
