//! Clothing tagging façade.
//!
//! Composes prompt assembly, inference orchestration, and output
//! normalization into one `tag` operation. This is the only surface the
//! presentation layer talks to.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::config::{Config, PromptConfig};
use crate::coordinator::{InferenceCoordinator, InferenceRequest};
use crate::engine::VlmEngine;
use crate::error::{InferenceError, TaggingError};
use crate::media::ImageInput;
use crate::normalize::{normalize_tag, TagPolicy};
use crate::prompt::build_prompt;
use crate::session::ModelSession;
use crate::types::TagOutcome;

/// High-level clothing tagger over a single model session.
pub struct ClothingTagger {
    coordinator: InferenceCoordinator,
    template: PromptConfig,
    policy: TagPolicy,
}

impl ClothingTagger {
    /// Build a tagger from an engine and the loaded configuration.
    pub fn new(engine: Arc<dyn VlmEngine>, config: &Config) -> Self {
        let session = Arc::new(ModelSession::new(engine));
        let coordinator = InferenceCoordinator::new(session, config.generation.clone());
        Self {
            coordinator,
            policy: TagPolicy::from(&config.prompt),
            template: config.prompt.clone(),
        }
    }

    /// Tag the clothing in a prepared image.
    ///
    /// Returns `TagOutcome::NoClothing` as a success: the model looked and
    /// found nothing to tag. A busy rejection means another run is in
    /// flight; the caller retries later, nothing is queued.
    pub async fn tag(
        &self,
        image: &ImageInput,
        cancel: &CancellationToken,
    ) -> Result<TagOutcome, TaggingError> {
        tracing::info!("Starting clothing tagging");
        let start = Instant::now();

        let prompt = build_prompt(image, &self.template);
        let request = InferenceRequest::new(prompt);

        let report = match self.coordinator.infer(&request, cancel).await {
            Ok(report) => report,
            Err(InferenceError::AlreadyRunning) => return Err(TaggingError::Busy),
            Err(InferenceError::Cancelled) => {
                tracing::info!("Tagging was cancelled");
                return Err(TaggingError::Cancelled);
            }
            Err(err) => {
                // Load and generation collapse into one user-visible
                // failure; the distinct kind stays in the log record.
                tracing::error!("Tagging failed: {err}");
                return Err(TaggingError::Analysis(err));
            }
        };

        let outcome = normalize_tag(&report.text, &self.policy);
        match &outcome {
            TagOutcome::Tag { tag } => tracing::info!(
                "Tagged '{tag}' in {:.2}s ({} tokens)",
                start.elapsed().as_secs_f64(),
                report.token_count
            ),
            TagOutcome::NoClothing => tracing::warn!(
                "No clothing detected ({:.2}s, {} tokens)",
                start.elapsed().as_secs_f64(),
                report.token_count
            ),
        }

        Ok(outcome)
    }

    /// Whether a tagging run is currently in flight.
    pub fn is_processing(&self) -> bool {
        self.coordinator.is_running()
    }

    /// Load the model ahead of the first tag call.
    pub async fn warm_up(&self) -> Result<(), TaggingError> {
        self.coordinator
            .session()
            .ensure_loaded()
            .await
            .map(|_| ())
            .map_err(TaggingError::Analysis)
    }

    /// Drop the cached model and release engine memory.
    pub async fn reset(&self) {
        self.coordinator.session().reset().await;
    }

    /// The session's engine, for availability probes.
    pub fn engine(&self) -> &Arc<dyn VlmEngine> {
        self.coordinator.session().engine()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEngine;
    use crate::types::{Alert, AlertKind};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn tagger(engine: MockEngine) -> ClothingTagger {
        ClothingTagger::new(Arc::new(engine), &Config::default())
    }

    fn tagger_with_prompt(engine: MockEngine, prompt: PromptConfig) -> ClothingTagger {
        let config = Config {
            prompt,
            ..Config::default()
        };
        ClothingTagger::new(Arc::new(engine), &config)
    }

    fn test_image() -> ImageInput {
        ImageInput::from_bytes(&[1, 2, 3], "jpeg")
    }

    #[tokio::test]
    async fn test_tag_end_to_end() {
        let tagger = tagger(MockEngine::returning("Green Cotton Pant"));
        let outcome = tagger
            .tag(&test_image(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.tag(), Some("green cotton pant"));
    }

    #[tokio::test]
    async fn test_tag_detects_null_sentinel() {
        let tagger = tagger(MockEngine::returning("null"));
        let outcome = tagger
            .tag(&test_image(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, TagOutcome::NoClothing);
    }

    #[tokio::test]
    async fn test_tag_respects_three_word_template() {
        let tagger = tagger_with_prompt(
            MockEngine::returning("Red Cotton Striped Summer Shirt"),
            PromptConfig::three_word_nil(),
        );
        let outcome = tagger
            .tag(&test_image(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.tag(), Some("red cotton striped"));
    }

    #[tokio::test]
    async fn test_nil_sentinel_under_three_word_template() {
        let tagger = tagger_with_prompt(
            MockEngine::returning("nil"),
            PromptConfig::three_word_nil(),
        );
        let outcome = tagger
            .tag(&test_image(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, TagOutcome::NoClothing);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_tag_maps_to_busy() {
        let engine = MockEngine::unbounded().with_token_delay(Duration::from_millis(20));
        let tagger = Arc::new(tagger(engine));
        let cancel = CancellationToken::new();

        let first = tokio::spawn({
            let tagger = tagger.clone();
            let cancel = cancel.clone();
            async move { tagger.tag(&test_image(), &cancel).await }
        });

        while !tagger.is_processing() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let second = tagger.tag(&test_image(), &CancellationToken::new()).await;
        assert!(matches!(&second, Err(TaggingError::Busy)));
        // Busy is a warning to the user, not a hard error
        let alert = Alert::from_error(&second.unwrap_err()).unwrap();
        assert_eq!(alert.kind, AlertKind::Warning);

        cancel.cancel();
        let first = first.await.unwrap();
        assert!(matches!(first, Err(TaggingError::Cancelled)));
        assert!(!tagger.is_processing());
    }

    #[tokio::test]
    async fn test_analysis_failure_keeps_inner_kind() {
        let tagger = tagger(MockEngine::failing_load("weights missing"));
        let err = tagger
            .tag(&test_image(), &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            TaggingError::Analysis(InferenceError::Load(engine_err)) => {
                assert!(engine_err.message.contains("weights missing"));
            }
            other => panic!("Expected load failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_tag_is_silent() {
        let tagger = tagger(MockEngine::returning("tag"));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = tagger.tag(&test_image(), &cancel).await.unwrap_err();
        assert!(matches!(err, TaggingError::Cancelled));
        assert!(Alert::from_error(&err).is_none());
    }

    #[tokio::test]
    async fn test_warm_up_loads_once() {
        let engine = MockEngine::returning("Blue Silk Scarf");
        let load_count = engine.load_count();
        let tagger = tagger(engine);

        tagger.warm_up().await.unwrap();
        assert_eq!(load_count.load(Ordering::SeqCst), 1);

        // The tag call reuses the warmed handle
        tagger
            .tag(&test_image(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(load_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reset_triggers_fresh_load_on_next_tag() {
        let engine = MockEngine::returning("Black Leather Belt");
        let load_count = engine.load_count();
        let release_count = engine.release_count();
        let tagger = tagger(engine);

        tagger
            .tag(&test_image(), &CancellationToken::new())
            .await
            .unwrap();
        tagger.reset().await;
        assert_eq!(release_count.load(Ordering::SeqCst), 1);

        tagger
            .tag(&test_image(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(load_count.load(Ordering::SeqCst), 2);
    }
}
