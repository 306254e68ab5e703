use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};
use crate::config::{GenerationConfig, GenerationProvider};
use crate::conversation::ConversationTurn;
use crate::language::LanguageDirective;
use crate::storage::RetrievalResult;
use crate::{Result, RagError};

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

const GROUNDING_INSTRUCTION: &str = "You are SevaSetu, an assistant that helps citizens of India \
understand government welfare schemes. Answer using ONLY the information in the numbered source \
excerpts supplied with the question. If the excerpts do not contain the answer, say that the \
information is not available in the scheme documents instead of guessing. Never invent amounts, \
dates, eligibility rules or application steps. Name the scheme when you state a fact from it. \
Use short sentences and simple words.";

/// A single-turn prompt: system instruction plus one user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    pub response: String,
    pub sources: Vec<String>,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, prompt: &Prompt) -> Result<String>;
}

/// Distinct scheme names of the supplied chunks, in first-appearance order.
pub fn collect_sources(retrieved: &[RetrievalResult]) -> Vec<String> {
    let mut seen = HashSet::new();
    retrieved
        .iter()
        .filter(|r| seen.insert(r.metadata.scheme_name.as_str()))
        .map(|r| r.metadata.scheme_name.clone())
        .collect()
}

pub fn build_prompt(
    question: &str,
    retrieved: &[RetrievalResult],
    history: &[ConversationTurn],
    directive: &LanguageDirective,
) -> Prompt {
    let system = format!("{}\n\n{}", GROUNDING_INSTRUCTION, directive.instruction);

    let mut user = String::new();
    if !history.is_empty() {
        user.push_str("Previous conversation (for context only, not a source of facts):\n");
        for turn in history {
            let _ = writeln!(user, "{}: {}", turn.role, turn.content);
        }
        user.push('\n');
    }

    user.push_str("Source excerpts:\n");
    for (i, result) in retrieved.iter().enumerate() {
        let _ = writeln!(
            user,
            "[{}] Scheme: {} (source: {})\n{}\n",
            i + 1,
            result.metadata.scheme_name,
            result.metadata.source_file,
            result.text.trim()
        );
    }

    let _ = write!(user, "Question: {}\n\nAnswer in {}:", question, directive.name);

    Prompt { system, user }
}

pub struct AnswerGenerator {
    model: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl AnswerGenerator {
    pub fn new(model: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    pub async fn generate(
        &self,
        question: &str,
        retrieved: &[RetrievalResult],
        history: &[ConversationTurn],
        directive: &LanguageDirective,
    ) -> Result<GeneratedAnswer> {
        if retrieved.is_empty() {
            tracing::info!(language = %directive.code, "No grounding available, returning canned response");
            return Ok(GeneratedAnswer {
                response: directive.no_information_response.clone(),
                sources: Vec::new(),
            });
        }

        let prompt = build_prompt(question, retrieved, history, directive);
        let start = Instant::now();

        let completion = tokio::time::timeout(self.timeout, self.model.complete(&prompt))
            .await
            .map_err(|_| {
                RagError::Generation(format!(
                    "{} did not answer within {}ms",
                    self.model.name(),
                    self.timeout.as_millis()
                ))
            })??;

        let response = completion.trim().to_string();
        if response.is_empty() {
            return Err(RagError::Generation(format!("{} returned an empty completion", self.model.name())));
        }

        tracing::debug!(
            model = self.model.name(),
            chunks = retrieved.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Answer generated"
        );

        Ok(GeneratedAnswer {
            response,
            sources: collect_sources(retrieved),
        })
    }
}

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RagError::Config(format!("Failed to build HTTP client: {}", e)))
}

fn request_error(backend: &str, err: reqwest::Error) -> RagError {
    if err.is_timeout() {
        RagError::Generation(format!("{} request timed out", backend))
    } else {
        RagError::Generation(format!("{} request failed: {}", backend, err))
    }
}

/// Claude through the Anthropic Messages API.
pub struct AnthropicClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicClient {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                RagError::Config("no Anthropic API key: set generation.api_key or ANTHROPIC_API_KEY".to_string())
            })?;

        Ok(Self {
            client: build_client(Duration::from_millis(config.timeout_ms))?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| ANTHROPIC_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Deserialize)]
struct AnthropicContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[async_trait]
impl LanguageModel for AnthropicClient {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "system": prompt.system,
            "messages": [{ "role": "user", "content": prompt.user }],
        });

        let res = self.client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error("Anthropic", e))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::Generation(format!("Anthropic API error ({}): {}", status, text)));
        }

        let payload: AnthropicResponse = res.json().await
            .map_err(|e| RagError::Generation(format!("Failed to parse Anthropic response: {}", e)))?;

        Ok(payload
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}

/// Any OpenAI-compatible chat completions endpoint (OpenAI, LM Studio,
/// llama.cpp server, vLLM).
pub struct OpenAiChatClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiChatClient {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(Duration::from_millis(config.timeout_ms))?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: config
                .api_key
                .clone()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .filter(|key| !key.is_empty()),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatClient {
    fn name(&self) -> &str {
        "openai_compatible"
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "stream": false,
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user },
            ],
        });

        let mut req = self.client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let res = req.send().await.map_err(|e| request_error("Chat completion", e))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::Generation(format!("Chat completion error ({}): {}", status, text)));
        }

        let payload: Value = res.json().await
            .map_err(|e| RagError::Generation(format!("Failed to parse chat completion: {}", e)))?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RagError::Generation("chat completion carried no message content".to_string()))
    }
}

pub fn build_language_model(config: &GenerationConfig) -> Result<Arc<dyn LanguageModel>> {
    match config.provider {
        GenerationProvider::Anthropic => Ok(Arc::new(AnthropicClient::new(config)?)),
        GenerationProvider::OpenaiCompatible => Ok(Arc::new(OpenAiChatClient::new(config)?)),
    }
}
