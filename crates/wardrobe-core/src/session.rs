//! Model session: lazy single-load cache with explicit reset.
//!
//! The session owns the loaded model handle for the process lifetime. The
//! state mutex is held across the load await, so concurrent first callers
//! serialize and exactly one engine load ever runs; later callers get the
//! cached handle back without touching the engine.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

use crate::engine::{ModelHandle, VlmEngine};
use crate::error::{InferenceError, InferenceResult};

enum SessionState {
    Idle,
    Loaded(Arc<dyn ModelHandle>),
}

/// Owns the lazily-loaded model handle.
pub struct ModelSession {
    engine: Arc<dyn VlmEngine>,
    state: Mutex<SessionState>,
}

impl ModelSession {
    /// Create an idle session backed by the given engine.
    pub fn new(engine: Arc<dyn VlmEngine>) -> Self {
        Self {
            engine,
            state: Mutex::new(SessionState::Idle),
        }
    }

    /// The engine backing this session.
    pub fn engine(&self) -> &Arc<dyn VlmEngine> {
        &self.engine
    }

    /// Load and return the model, or return the cached handle.
    ///
    /// Idempotent: a loaded session never reloads. Load failures leave the
    /// session idle, so the next call retries from scratch.
    pub async fn ensure_loaded(&self) -> InferenceResult<Arc<dyn ModelHandle>> {
        let mut state = self.state.lock().await;
        if let SessionState::Loaded(handle) = &*state {
            return Ok(handle.clone());
        }

        tracing::info!("Starting model load via {}", self.engine.name());
        let start = Instant::now();

        let handle = self.engine.load().await.map_err(InferenceError::Load)?;

        match handle.num_parameters() {
            Some(params) => tracing::info!(
                "Model loaded ({params} parameters) in {:.2}s",
                start.elapsed().as_secs_f64()
            ),
            None => tracing::info!("Model loaded in {:.2}s", start.elapsed().as_secs_f64()),
        }

        *state = SessionState::Loaded(handle.clone());
        Ok(handle)
    }

    /// Whether a handle is currently cached.
    pub async fn is_loaded(&self) -> bool {
        matches!(&*self.state.lock().await, SessionState::Loaded(_))
    }

    /// Drop the cached handle and ask the engine to release device memory.
    ///
    /// Always succeeds; the next `ensure_loaded` reloads from scratch. An
    /// in-flight run keeps its own `Arc` clone alive until it finishes.
    pub async fn reset(&self) {
        tracing::info!("Resetting model session");
        {
            let mut state = self.state.lock().await;
            *state = SessionState::Idle;
        }
        self.engine.release_memory().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEngine;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    #[tokio::test]
    async fn test_ensure_loaded_is_idempotent() {
        let engine = MockEngine::returning("tag");
        let load_count = engine.load_count();
        let session = ModelSession::new(Arc::new(engine));

        let first = session.ensure_loaded().await.unwrap();
        let second = session.ensure_loaded().await.unwrap();

        assert_eq!(load_count.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_first_callers_trigger_one_load() {
        let engine = MockEngine::returning("tag").with_load_delay(Duration::from_millis(100));
        let load_count = engine.load_count();
        let session = Arc::new(ModelSession::new(Arc::new(engine)));

        let a = tokio::spawn({
            let session = session.clone();
            async move { session.ensure_loaded().await.is_ok() }
        });
        let b = tokio::spawn({
            let session = session.clone();
            async move { session.ensure_loaded().await.is_ok() }
        });

        assert!(a.await.unwrap());
        assert!(b.await.unwrap());
        assert_eq!(load_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reset_forces_fresh_load() {
        let engine = MockEngine::returning("tag");
        let load_count = engine.load_count();
        let release_count = engine.release_count();
        let session = ModelSession::new(Arc::new(engine));

        session.ensure_loaded().await.unwrap();
        assert!(session.is_loaded().await);

        session.reset().await;
        assert!(!session.is_loaded().await);
        assert_eq!(release_count.load(Ordering::SeqCst), 1);

        session.ensure_loaded().await.unwrap();
        assert_eq!(load_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_load_failure_leaves_session_idle() {
        let engine = MockEngine::failing_load("weights missing");
        let session = ModelSession::new(Arc::new(engine));

        let err = session.ensure_loaded().await.unwrap_err();
        assert!(matches!(err, InferenceError::Load(_)));
        assert!(!session.is_loaded().await);
    }
}
