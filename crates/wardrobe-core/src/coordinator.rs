//! Inference orchestration: single-flight guard, cancellation checkpoints,
//! and the token-generation stop predicate.
//!
//! At most one generation runs system-wide at any time. A second request
//! arriving while one is in flight is rejected, never queued; callers retry
//! later. The running flag is the only shared mutable state here and is
//! cleared by a drop guard on every exit path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tokio_util::sync::CancellationToken;

use crate::config::GenerationConfig;
use crate::engine::{GenerateParams, ModelHandle, TokenDecision};
use crate::error::{InferenceError, InferenceResult};
use crate::prompt::StructuredPrompt;
use crate::session::ModelSession;
use crate::types::InferenceReport;

/// One inference request. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub prompt: StructuredPrompt,
}

impl InferenceRequest {
    pub fn new(prompt: StructuredPrompt) -> Self {
        Self { prompt }
    }
}

/// Clears the running flag when dropped, covering success, error,
/// cancellation, and panic exits alike.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Serializes generation requests against a single model session.
pub struct InferenceCoordinator {
    session: Arc<ModelSession>,
    generation: GenerationConfig,
    running: AtomicBool,
}

impl InferenceCoordinator {
    pub fn new(session: Arc<ModelSession>, generation: GenerationConfig) -> Self {
        Self {
            session,
            generation,
            running: AtomicBool::new(false),
        }
    }

    /// Whether a generation is currently in flight.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The session this coordinator drives.
    pub fn session(&self) -> &Arc<ModelSession> {
        &self.session
    }

    /// Run one generation under the single-flight guard.
    ///
    /// Cancellation is cooperative, checked before the model load, before
    /// input preparation, and after every produced token. The per-token
    /// callback is also the sole enforcement point for the token budget.
    pub async fn infer(
        &self,
        request: &InferenceRequest,
        cancel: &CancellationToken,
    ) -> InferenceResult<InferenceReport> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("Analysis already in progress, dropping request");
            return Err(InferenceError::AlreadyRunning);
        }
        let _guard = RunningGuard(&self.running);

        if cancel.is_cancelled() {
            tracing::info!("Analysis cancelled before model load");
            return Err(InferenceError::Cancelled);
        }

        let load_start = Instant::now();
        let handle = self.session.ensure_loaded().await?;
        let load_ms = load_start.elapsed().as_millis() as u64;

        let result = self.run_generation(&handle, request, cancel).await;
        // Transient generation buffers are released on every exit path;
        // the model itself stays loaded until the session resets.
        handle.clear_cache();

        let (text, token_count, generation_ms) = result?;
        tracing::info!(
            "Inference completed: {token_count} tokens in {generation_ms}ms (load {load_ms}ms)"
        );

        Ok(InferenceReport {
            text,
            token_count,
            load_ms,
            generation_ms,
        })
    }

    async fn run_generation(
        &self,
        handle: &Arc<dyn ModelHandle>,
        request: &InferenceRequest,
        cancel: &CancellationToken,
    ) -> InferenceResult<(String, u32, u64)> {
        if cancel.is_cancelled() {
            tracing::info!("Analysis cancelled before input preparation");
            return Err(InferenceError::Cancelled);
        }

        let start = Instant::now();
        let input = handle
            .prepare(&request.prompt)
            .await
            .map_err(InferenceError::Generation)?;

        let params = GenerateParams {
            temperature: self.generation.temperature,
            seed: time_seed(),
        };

        let max_tokens = self.generation.max_tokens;
        let cancel_flag = cancel.clone();
        let mut on_token = move |count: u32| {
            if cancel_flag.is_cancelled() || count >= max_tokens {
                TokenDecision::Stop
            } else {
                TokenDecision::Continue
            }
        };

        let generation = handle
            .generate(input, &params, &mut on_token)
            .await
            .map_err(InferenceError::Generation)?;

        // The callback stops the engine on cancellation, but the partial
        // output must not masquerade as a result.
        if cancel.is_cancelled() {
            tracing::info!("Analysis cancelled during generation");
            return Err(InferenceError::Cancelled);
        }

        Ok((
            generation.text,
            generation.token_count,
            start.elapsed().as_millis() as u64,
        ))
    }
}

/// Generation seed from wall-clock time. Each run samples differently; the
/// output is short free text, nothing needs to be reproducible.
fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
