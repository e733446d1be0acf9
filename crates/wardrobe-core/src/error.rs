//! Error types for the Wardrobe tagging core.
//!
//! Errors are layered by boundary: raw engine failures stay inside the
//! inference layer, the coordinator exposes a small taxonomy, and the
//! tagging façade exposes only what the presentation layer needs to show.

use thiserror::Error;

/// Top-level error type for Wardrobe operations.
#[derive(Error, Debug)]
pub enum WardrobeError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Inference orchestration errors
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    /// Image preprocessing errors
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Image preprocessing errors.
#[derive(Error, Debug)]
pub enum MediaError {
    /// The input bytes could not be decoded as an image
    #[error("image decode failed: {0}")]
    Decode(String),

    /// Re-encoding the downscaled image failed
    #[error("image encode failed: {0}")]
    Encode(String),
}

/// Raw failure reported by a VLM engine.
///
/// Never crosses the coordinator boundary: the coordinator translates it
/// into [`InferenceError::Load`] or [`InferenceError::Generation`].
#[derive(Error, Debug)]
#[error("{message}")]
pub struct EngineError {
    /// Human-readable failure description
    pub message: String,
    /// HTTP status, when the engine speaks HTTP
    pub status_code: Option<u16>,
}

impl EngineError {
    /// Build an engine error without an HTTP status.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
        }
    }

    /// Build an engine error carrying an HTTP status code.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: Some(status),
        }
    }
}

/// Inference orchestration errors surfaced by the coordinator.
#[derive(Error, Debug)]
pub enum InferenceError {
    /// A generation is already in flight; the request was dropped, not queued
    #[error("an analysis is already in progress")]
    AlreadyRunning,

    /// The run was cancelled at a cooperative checkpoint
    #[error("analysis was cancelled")]
    Cancelled,

    /// The model failed to load. Fatal to this request only; a later call
    /// triggers a fresh load attempt.
    #[error("model load failed: {0}")]
    Load(#[source] EngineError),

    /// The engine failed mid-generation. The cached model handle stays valid.
    #[error("generation failed: {0}")]
    Generation(#[source] EngineError),
}

/// Errors surfaced by the tagging façade.
#[derive(Error, Debug)]
pub enum TaggingError {
    /// Another tagging run is in flight. A caller-timing condition, not a
    /// system fault; the presentation layer shows "please wait".
    #[error("another analysis is already running")]
    Busy,

    /// The run was cancelled; never presented as an error to the user
    #[error("analysis was cancelled")]
    Cancelled,

    /// Load or generation failed. Collapsed into one user-visible message,
    /// with the inner kind preserved for logging.
    #[error("analysis failed: {0}")]
    Analysis(#[source] InferenceError),
}

/// Convenience type alias for Wardrobe results.
pub type Result<T> = std::result::Result<T, WardrobeError>;

/// Convenience type alias for inference-layer results.
pub type InferenceResult<T> = std::result::Result<T, InferenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::http(503, "service unavailable");
        assert_eq!(err.to_string(), "service unavailable");
        assert_eq!(err.status_code, Some(503));
    }

    #[test]
    fn test_inference_error_wraps_engine_message() {
        let err = InferenceError::Load(EngineError::new("weights missing"));
        assert_eq!(err.to_string(), "model load failed: weights missing");
    }

    #[test]
    fn test_tagging_error_display() {
        let err = TaggingError::Analysis(InferenceError::Generation(EngineError::new(
            "engine crashed",
        )));
        assert!(err.to_string().starts_with("analysis failed"));
    }
}
