use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

/// Anything that turns a prompt into an answer.
#[async_trait]
pub trait AnswerGenerator {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub host: String,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub repeat_penalty: f32,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            model: "llama3.2:1b".to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            top_p: 0.9,
            repeat_penalty: 1.1,
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    num_predict: usize,
    temperature: f32,
    top_p: f32,
    repeat_penalty: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Client for a local Ollama server.
pub struct LLM {
    client: reqwest::Client,
    config: LLMConfig,
}

impl LLM {
    pub fn new(config: LLMConfig) -> Result<Self> {
        if config.model.trim().is_empty() {
            return Err(anyhow!("Model name not set"));
        }
        let client = reqwest::Client::builder().build()?;
        Ok(LLM { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.config.host.trim_end_matches('/'))
    }
}

#[async_trait]
impl AnswerGenerator for LLM {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(anyhow!("Prompt cannot be empty"));
        }

        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                num_predict: self.config.max_tokens,
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                repeat_penalty: self.config.repeat_penalty,
            },
        };

        debug!("Sending {} prompt chars to {}", prompt.len(), self.config.model);
        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to reach Ollama at {}", self.config.host))?
            .error_for_status()
            .context("Ollama returned an error status")?
            .json::<GenerateResponse>()
            .await
            .context("Malformed response from Ollama")?;

        Ok(response.response.trim().to_string())
    }
}

/// Prompt for the document route: the query followed by the matching texts.
pub fn construct_prompt(query: &str, context: &[&str]) -> String {
    format!("{query} Context: {}", context.join(" "))
}

/// Prompt for the web route: the query followed by flattened search results.
pub fn construct_search_prompt(query: &str, sources: &str) -> String {
    format!("{query} {sources}")
}
