//! VLM engine boundary: traits, request/response types, and the factory.
//!
//! The neural network lives behind these traits. `VlmEngine` owns model
//! lifecycle (load, availability, device-memory release); `ModelHandle` is a
//! loaded model that can prepare inputs and generate tokens. Both use
//! `async_trait` because native async fn in trait is not object-safe (we
//! need `Arc<dyn VlmEngine>` / `Arc<dyn ModelHandle>` for dynamic dispatch).

pub(crate) mod ollama;

pub use ollama::OllamaEngine;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::prompt::{Part, StructuredPrompt};
use async_trait::async_trait;
use std::sync::Arc;

/// Signal returned by the per-token callback.
///
/// The callback is the sole mechanism for enforcing the token budget and
/// cancellation: the engine keeps producing tokens until it returns `Stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenDecision {
    Continue,
    Stop,
}

/// Callback invoked after each produced token with the cumulative count.
pub type TokenCallback<'a> = &'a mut (dyn FnMut(u32) -> TokenDecision + Send);

/// Sampling parameters for one generation run.
#[derive(Debug, Clone)]
pub struct GenerateParams {
    /// Sampling temperature
    pub temperature: f32,
    /// Pseudo-random seed, derived from wall-clock time per run.
    pub seed: u64,
}

/// A chat message rendered for the engine wire format.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// Conversation role ("system", "user")
    pub role: String,
    /// Concatenated text parts of the turn
    pub content: String,
    /// Base64 image payloads embedded in the turn
    pub images: Vec<String>,
}

/// Engine-ready input produced by [`ModelHandle::prepare`].
#[derive(Debug, Clone)]
pub struct PreparedInput {
    pub messages: Vec<ChatMessage>,
}

impl PreparedInput {
    /// Render a structured prompt into flat chat messages.
    ///
    /// Shared by engine implementations whose wire format is role + text +
    /// image list per message.
    pub fn render(prompt: &StructuredPrompt) -> Self {
        let messages = prompt
            .turns
            .iter()
            .map(|turn| {
                let mut content = String::new();
                let mut images = Vec::new();
                for part in &turn.parts {
                    match part {
                        Part::Text(text) => {
                            if !content.is_empty() {
                                content.push('\n');
                            }
                            content.push_str(text);
                        }
                        Part::Image(image) => images.push(image.data.clone()),
                    }
                }
                ChatMessage {
                    role: turn.role.as_str().to_string(),
                    content,
                    images,
                }
            })
            .collect();

        Self { messages }
    }
}

/// Output of a completed (or stopped) generation.
#[derive(Debug, Clone)]
pub struct Generation {
    /// Concatenated output text
    pub text: String,
    /// Number of tokens produced before the stop
    pub token_count: u32,
}

/// A loaded model ready for inference.
#[async_trait]
pub trait ModelHandle: Send + Sync {
    /// Engine-reported parameter count, when known. Used for load logging.
    fn num_parameters(&self) -> Option<String>;

    /// Convert a structured prompt into engine-ready input.
    async fn prepare(&self, prompt: &StructuredPrompt) -> Result<PreparedInput, EngineError>;

    /// Drive token generation, invoking `on_token` after every produced
    /// token. Generation stops when the callback returns
    /// [`TokenDecision::Stop`]; the partial output is still returned.
    async fn generate(
        &self,
        input: PreparedInput,
        params: &GenerateParams,
        on_token: TokenCallback<'_>,
    ) -> Result<Generation, EngineError>;

    /// Drop transient generation buffers accumulated by the last run. This
    /// does not unload the model; see [`VlmEngine::release_memory`].
    fn clear_cache(&self);
}

/// A backend capable of loading vision-language models.
#[async_trait]
pub trait VlmEngine: Send + Sync {
    /// Backend name for logging (e.g., "ollama").
    fn name(&self) -> &str;

    /// Check whether the engine is configured and reachable.
    async fn is_available(&self) -> bool;

    /// Load the configured model and return a shareable handle.
    async fn load(&self) -> Result<Arc<dyn ModelHandle>, EngineError>;

    /// Ask the engine to release the model's device memory. Called on
    /// session reset, after the cached handle has been dropped.
    async fn release_memory(&self);
}

/// Factory that creates the configured engine backend.
pub struct EngineFactory;

impl EngineFactory {
    /// Create an engine from the config's backend identifier.
    pub fn create(config: &EngineConfig) -> Result<Arc<dyn VlmEngine>, EngineError> {
        match config.backend.as_str() {
            "ollama" => Ok(Arc::new(OllamaEngine::new(&config.endpoint, &config.model))),
            other => Err(EngineError::new(format!("Unknown engine backend: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PromptConfig;
    use crate::media::ImageInput;
    use crate::prompt::build_prompt;

    #[test]
    fn test_render_maps_turns_to_messages() {
        let image = ImageInput::from_bytes(&[1, 2, 3], "jpeg");
        let prompt = build_prompt(&image, &PromptConfig::default());
        let input = PreparedInput::render(&prompt);

        assert_eq!(input.messages.len(), 2);
        assert_eq!(input.messages[0].role, "system");
        assert!(input.messages[0].images.is_empty());
        assert_eq!(input.messages[1].role, "user");
        assert_eq!(input.messages[1].images.len(), 1);
        assert!(input.messages[1].content.contains("four words or fewer"));
    }

    #[test]
    fn test_render_concatenates_text_parts() {
        use crate::prompt::{Part, Role, StructuredPrompt, Turn};
        let prompt = StructuredPrompt {
            turns: vec![Turn {
                role: Role::User,
                parts: vec![
                    Part::Text("first".to_string()),
                    Part::Text("second".to_string()),
                ],
            }],
        };
        let input = PreparedInput::render(&prompt);
        assert_eq!(input.messages[0].content, "first\nsecond");
    }

    #[test]
    fn test_factory_rejects_unknown_backend() {
        let config = EngineConfig {
            backend: "mlx".to_string(),
            ..EngineConfig::default()
        };
        let err = EngineFactory::create(&config).unwrap_err();
        assert!(err.message.contains("Unknown engine backend"));
    }

    #[test]
    fn test_factory_creates_ollama() {
        let engine = EngineFactory::create(&EngineConfig::default()).unwrap();
        assert_eq!(engine.name(), "ollama");
    }
}
