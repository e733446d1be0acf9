//! Core data types shared between the tagging façade and its callers.

use serde::{Deserialize, Serialize};

use crate::error::TaggingError;

/// Outcome of a successful tagging run.
///
/// `NoClothing` is a valid semantic result, not a failure: the model looked
/// at the image and reported the configured sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TagOutcome {
    /// A normalized clothing tag: lowercase, punctuation-free, capped at the
    /// configured word count.
    Tag { tag: String },

    /// The model reported no clothing in the image.
    NoClothing,
}

impl TagOutcome {
    /// The tag string, if this outcome carries one.
    pub fn tag(&self) -> Option<&str> {
        match self {
            TagOutcome::Tag { tag } => Some(tag),
            TagOutcome::NoClothing => None,
        }
    }

    /// Alert payload for this outcome, if the presentation layer should show
    /// one. Only the no-clothing case warrants an alert.
    pub fn alert(&self) -> Option<Alert> {
        match self {
            TagOutcome::Tag { .. } => None,
            TagOutcome::NoClothing => Some(Alert {
                kind: AlertKind::Warning,
                message: "The image does not appear to be a clothing item.".to_string(),
            }),
        }
    }
}

/// Severity of a user-facing alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Error,
    Warning,
}

/// Dismissible alert payload surfaced once per failed or no-clothing outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
}

impl Alert {
    /// Map a tagging error to its user-facing alert.
    ///
    /// Cancellation is silent (returns `None`); a busy rejection is a
    /// warning, not a hard error, since it's a caller-timing issue.
    pub fn from_error(error: &TaggingError) -> Option<Alert> {
        match error {
            TaggingError::Busy => Some(Alert {
                kind: AlertKind::Warning,
                message: "An analysis is already in progress. Please wait.".to_string(),
            }),
            TaggingError::Cancelled => None,
            TaggingError::Analysis(_) => Some(Alert {
                kind: AlertKind::Error,
                message: "Something went wrong while analyzing the image.".to_string(),
            }),
        }
    }
}

/// Raw inference result plus per-phase timing, for logging and verbose output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceReport {
    /// Raw model output before normalization
    pub text: String,

    /// Tokens produced before the stop predicate fired
    pub token_count: u32,

    /// Wall-clock duration of the model-load step. Zero when the handle was
    /// already cached.
    pub load_ms: u64,

    /// Wall-clock duration of prepare + token generation
    pub generation_ms: u64,
}
