//! Wardrobe Core - on-device clothing tagging library.
//!
//! Takes a photo of a clothing item and produces a short canonical tag
//! using a local vision-language model: the library loads the model lazily
//! (once), serializes inference so a single generation runs at a time,
//! builds a structured image+text prompt, drives token generation under a
//! stop predicate and cooperative cancellation, and normalizes the model's
//! free-form answer.
//!
//! # Architecture
//!
//! ```text
//! Image → Preprocess → Prompt → [load model once] → Generate → Normalize → Tag
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use tokio_util::sync::CancellationToken;
//! use wardrobe_core::{ClothingTagger, Config, EngineFactory};
//!
//! #[tokio::main]
//! async fn main() -> wardrobe_core::Result<()> {
//!     let config = Config::load()?;
//!     let engine = EngineFactory::create(&config.engine)?;
//!     let tagger = ClothingTagger::new(engine, &config);
//!
//!     let bytes = std::fs::read("./shirt.jpg")?;
//!     let image = wardrobe_core::media::prepare_image(bytes, &config.image).await?;
//!     match tagger.tag(&image, &CancellationToken::new()).await {
//!         Ok(outcome) => println!("{outcome:?}"),
//!         Err(err) => eprintln!("{err}"),
//!     }
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod media;
pub mod normalize;
pub mod prompt;
pub mod service;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenient access
pub use config::{Config, GenerationConfig, PromptConfig};
pub use coordinator::{InferenceCoordinator, InferenceRequest};
pub use engine::{EngineFactory, VlmEngine};
pub use error::{ConfigError, InferenceError, Result, TaggingError, WardrobeError};
pub use media::ImageInput;
pub use normalize::{normalize_tag, TagPolicy};
pub use prompt::{build_prompt, StructuredPrompt};
pub use service::ClothingTagger;
pub use session::ModelSession;
pub use types::{Alert, AlertKind, InferenceReport, TagOutcome};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
