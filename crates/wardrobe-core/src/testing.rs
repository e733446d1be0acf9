//! Shared mock engine for exercising session, coordinator, and façade
//! behavior without a real model server.

use crate::engine::{
    GenerateParams, Generation, ModelHandle, PreparedInput, TokenCallback, TokenDecision,
    VlmEngine,
};
use crate::error::EngineError;
use crate::prompt::StructuredPrompt;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What the mock handle streams back.
#[derive(Clone)]
enum Script {
    /// Emit these chunks in order, one callback invocation each.
    Chunks(Vec<String>),
    /// Emit "tok " forever until the callback says stop.
    Unbounded,
    /// Fail after `after_tokens` chunks.
    FailGeneration { message: String, after_tokens: u32 },
}

/// A configurable mock VLM engine.
///
/// Every load returns the same shared handle so call counters accumulate
/// across loads; the load counter itself distinguishes fresh loads.
pub(crate) struct MockEngine {
    handle: Arc<MockHandle>,
    load_count: Arc<AtomicU32>,
    release_count: Arc<AtomicU32>,
    load_delay: Option<Duration>,
    fail_load: Option<String>,
}

impl MockEngine {
    fn with_script(script: Script) -> Self {
        Self {
            handle: Arc::new(MockHandle {
                script,
                generate_count: Arc::new(AtomicU32::new(0)),
                clear_cache_count: Arc::new(AtomicU32::new(0)),
                token_delay: None,
            }),
            load_count: Arc::new(AtomicU32::new(0)),
            release_count: Arc::new(AtomicU32::new(0)),
            load_delay: None,
            fail_load: None,
        }
    }

    /// Stream the given text one whitespace-delimited chunk at a time.
    pub(crate) fn returning(text: &str) -> Self {
        let mut chunks: Vec<String> = text
            .split_whitespace()
            .map(|word| format!("{word} "))
            .collect();
        if let Some(last) = chunks.last_mut() {
            *last = last.trim_end().to_string();
        }
        Self::with_script(Script::Chunks(chunks))
    }

    /// Stream tokens forever; only the callback can stop generation.
    pub(crate) fn unbounded() -> Self {
        Self::with_script(Script::Unbounded)
    }

    /// Fail every load attempt.
    pub(crate) fn failing_load(message: &str) -> Self {
        let mut engine = Self::with_script(Script::Chunks(vec![]));
        engine.fail_load = Some(message.to_string());
        engine
    }

    /// Produce `after_tokens` chunks, then fail generation.
    pub(crate) fn failing_generation(message: &str, after_tokens: u32) -> Self {
        Self::with_script(Script::FailGeneration {
            message: message.to_string(),
            after_tokens,
        })
    }

    /// Sleep this long inside `load` (for concurrent-first-caller tests).
    pub(crate) fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    /// Sleep this long before each emitted token (keeps a run in flight).
    pub(crate) fn with_token_delay(self, delay: Duration) -> Self {
        let handle = MockHandle {
            script: self.handle.script.clone(),
            generate_count: self.handle.generate_count.clone(),
            clear_cache_count: self.handle.clear_cache_count.clone(),
            token_delay: Some(delay),
        };
        Self {
            handle: Arc::new(handle),
            ..self
        }
    }

    pub(crate) fn load_count(&self) -> Arc<AtomicU32> {
        self.load_count.clone()
    }

    pub(crate) fn release_count(&self) -> Arc<AtomicU32> {
        self.release_count.clone()
    }

    pub(crate) fn generate_count(&self) -> Arc<AtomicU32> {
        self.handle.generate_count.clone()
    }

    pub(crate) fn clear_cache_count(&self) -> Arc<AtomicU32> {
        self.handle.clear_cache_count.clone()
    }
}

#[async_trait]
impl VlmEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn load(&self) -> Result<Arc<dyn ModelHandle>, EngineError> {
        if let Some(delay) = self.load_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.fail_load {
            return Err(EngineError::new(message.clone()));
        }
        self.load_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.handle.clone())
    }

    async fn release_memory(&self) {
        self.release_count.fetch_add(1, Ordering::SeqCst);
    }
}

struct MockHandle {
    script: Script,
    generate_count: Arc<AtomicU32>,
    clear_cache_count: Arc<AtomicU32>,
    token_delay: Option<Duration>,
}

#[async_trait]
impl ModelHandle for MockHandle {
    fn num_parameters(&self) -> Option<String> {
        Some("2.2B".to_string())
    }

    async fn prepare(&self, prompt: &StructuredPrompt) -> Result<PreparedInput, EngineError> {
        Ok(PreparedInput::render(prompt))
    }

    async fn generate(
        &self,
        _input: PreparedInput,
        _params: &GenerateParams,
        on_token: TokenCallback<'_>,
    ) -> Result<Generation, EngineError> {
        self.generate_count.fetch_add(1, Ordering::SeqCst);

        let mut text = String::new();
        let mut token_count = 0u32;

        let mut emit = |text: &mut String, chunk: &str, count: &mut u32| {
            text.push_str(chunk);
            *count += 1;
            on_token(*count)
        };

        match &self.script {
            Script::Chunks(chunks) => {
                for chunk in chunks {
                    if let Some(delay) = self.token_delay {
                        tokio::time::sleep(delay).await;
                    }
                    if emit(&mut text, chunk, &mut token_count) == TokenDecision::Stop {
                        break;
                    }
                }
            }
            Script::Unbounded => loop {
                if let Some(delay) = self.token_delay {
                    tokio::time::sleep(delay).await;
                }
                if emit(&mut text, "tok ", &mut token_count) == TokenDecision::Stop {
                    break;
                }
            },
            Script::FailGeneration {
                message,
                after_tokens,
            } => {
                while token_count < *after_tokens {
                    if let Some(delay) = self.token_delay {
                        tokio::time::sleep(delay).await;
                    }
                    if emit(&mut text, "tok ", &mut token_count) == TokenDecision::Stop {
                        break;
                    }
                }
                return Err(EngineError::new(message.clone()));
            }
        }

        Ok(Generation { text, token_count })
    }

    fn clear_cache(&self) {
        self.clear_cache_count.fetch_add(1, Ordering::SeqCst);
    }
}
