//! Ollama engine adapter for local vision model inference.
//!
//! Talks to a local Ollama instance via its HTTP API. No authentication
//! required, just needs Ollama running locally. Generation uses the
//! streaming `/api/chat` endpoint so the per-token callback fires as chunks
//! arrive; returning `Stop` drops the response stream, which aborts
//! generation server-side.

use super::{
    GenerateParams, Generation, ModelHandle, PreparedInput, TokenCallback, TokenDecision,
    VlmEngine,
};
use crate::error::EngineError;
use crate::prompt::StructuredPrompt;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Model load can pull gigabytes of weights into memory.
const LOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Vision models running locally can be slow.
const GENERATE_TIMEOUT: Duration = Duration::from_secs(120);

/// Ollama engine backend.
pub struct OllamaEngine {
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaEngine {
    pub fn new(endpoint: &str, model: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

/// Ollama /api/show request body.
#[derive(Serialize)]
struct ShowRequest {
    model: String,
}

/// Ollama /api/show response (fields we read).
#[derive(Deserialize)]
struct ShowResponse {
    #[serde(default)]
    details: Option<ShowDetails>,
}

#[derive(Deserialize)]
struct ShowDetails {
    #[serde(default)]
    parameter_size: Option<String>,
}

/// Ollama /api/generate body used for load and unload.
///
/// An empty prompt loads the model into memory; `keep_alive: 0` unloads it.
#[derive(Serialize)]
struct LoadRequest {
    model: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<u32>,
}

/// Ollama /api/chat request body.
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct WireMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    seed: u64,
}

/// One JSONL chunk of the streaming /api/chat response.
#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    /// Server-side token count, reported on the final chunk
    #[serde(default)]
    eval_count: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

#[async_trait]
impl VlmEngine for OllamaEngine {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.endpoint);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn load(&self) -> Result<Arc<dyn ModelHandle>, EngineError> {
        // Model metadata; 404 means the model was never pulled
        let url = format!("{}/api/show", self.endpoint);
        let resp = self
            .client
            .post(&url)
            .json(&ShowRequest {
                model: self.model.clone(),
            })
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| EngineError::new(format!("Ollama request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(EngineError::http(
                status.as_u16(),
                format!("Ollama HTTP {status}: {text}"),
            ));
        }

        let show: ShowResponse = resp
            .json()
            .await
            .map_err(|e| EngineError::new(format!("Failed to parse Ollama response: {e}")))?;
        let parameter_size = show.details.and_then(|d| d.parameter_size);

        // An empty /api/generate body pulls the weights into memory, so the
        // first real inference doesn't pay the load cost.
        let url = format!("{}/api/generate", self.endpoint);
        let resp = self
            .client
            .post(&url)
            .json(&LoadRequest {
                model: self.model.clone(),
                stream: false,
                keep_alive: None,
            })
            .timeout(LOAD_TIMEOUT)
            .send()
            .await
            .map_err(|e| EngineError::new(format!("Ollama model load failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(EngineError::http(
                status.as_u16(),
                format!("Ollama HTTP {status}: {text}"),
            ));
        }

        Ok(Arc::new(OllamaHandle {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            client: self.client.clone(),
            parameter_size,
        }))
    }

    async fn release_memory(&self) {
        // keep_alive: 0 asks the server to unload the model immediately
        let url = format!("{}/api/generate", self.endpoint);
        let result = self
            .client
            .post(&url)
            .json(&LoadRequest {
                model: self.model.clone(),
                stream: false,
                keep_alive: Some(0),
            })
            .timeout(Duration::from_secs(10))
            .send()
            .await;

        if let Err(e) = result {
            tracing::debug!("Ollama unload request failed: {e}");
        }
    }
}

/// A loaded Ollama model.
struct OllamaHandle {
    endpoint: String,
    model: String,
    client: reqwest::Client,
    parameter_size: Option<String>,
}

#[async_trait]
impl ModelHandle for OllamaHandle {
    fn num_parameters(&self) -> Option<String> {
        self.parameter_size.clone()
    }

    async fn prepare(&self, prompt: &StructuredPrompt) -> Result<PreparedInput, EngineError> {
        Ok(PreparedInput::render(prompt))
    }

    async fn generate(
        &self,
        input: PreparedInput,
        params: &GenerateParams,
        on_token: TokenCallback<'_>,
    ) -> Result<Generation, EngineError> {
        let url = format!("{}/api/chat", self.endpoint);
        let body = ChatRequest {
            model: self.model.clone(),
            messages: input
                .messages
                .into_iter()
                .map(|m| WireMessage {
                    role: m.role,
                    content: m.content,
                    images: m.images,
                })
                .collect(),
            stream: true,
            options: ChatOptions {
                temperature: params.temperature,
                seed: params.seed,
            },
        };

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .timeout(GENERATE_TIMEOUT)
            .send()
            .await
            .map_err(|e| EngineError::new(format!("Ollama request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(EngineError::http(
                status.as_u16(),
                format!("Ollama HTTP {status}: {text}"),
            ));
        }

        // Newlines never occur inside a JSONL line (escaped in JSON), so
        // byte-level splitting is safe across chunk boundaries.
        let mut stream = resp.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut text = String::new();
        let mut token_count = 0u32;

        'stream: while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| EngineError::new(format!("Ollama stream error: {e}")))?;
            buffer.extend_from_slice(&chunk);

            while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                let line = &line[..line.len() - 1];
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }

                let parsed: ChatChunk = serde_json::from_slice(line)
                    .map_err(|e| EngineError::new(format!("Failed to parse Ollama chunk: {e}")))?;

                if let Some(error) = parsed.error {
                    return Err(EngineError::new(format!("Ollama error: {error}")));
                }

                if let Some(message) = parsed.message {
                    if !message.content.is_empty() {
                        text.push_str(&message.content);
                        token_count += 1;
                        if on_token(token_count) == TokenDecision::Stop {
                            // Dropping the stream aborts generation server-side
                            break 'stream;
                        }
                    }
                }

                if parsed.done {
                    if let Some(count) = parsed.eval_count {
                        token_count = count;
                    }
                    break 'stream;
                }
            }
        }

        Ok(Generation { text, token_count })
    }

    fn clear_cache(&self) {
        // The HTTP adapter holds no client-side generation buffers; the
        // server's transient state expires with its keep-alive window.
        tracing::trace!("No client-side generation cache to clear");
    }
}
