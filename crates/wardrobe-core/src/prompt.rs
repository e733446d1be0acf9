//! Structured prompt assembly for the vision model.
//!
//! A prompt is an ordered list of conversation turns: an optional system
//! turn carrying the tagging instruction, then a user turn embedding the
//! image plus literal guidance text. Assembly is pure and deterministic.

use crate::config::PromptConfig;
use crate::media::ImageInput;

/// Fallback guidance when the template carries no instruction at all.
const MINIMAL_GUIDANCE: &str = "Identify the clothing in this image.";

/// Conversation role of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
        }
    }
}

/// One part of a turn's content.
#[derive(Debug, Clone)]
pub enum Part {
    Text(String),
    Image(ImageInput),
}

/// A single conversation turn.
#[derive(Debug, Clone)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
}

/// An ordered multi-part conversation ready for the engine.
#[derive(Debug, Clone)]
pub struct StructuredPrompt {
    pub turns: Vec<Turn>,
}

impl StructuredPrompt {
    /// All image parts across turns, in order.
    pub fn images(&self) -> Vec<&ImageInput> {
        self.turns
            .iter()
            .flat_map(|turn| &turn.parts)
            .filter_map(|part| match part {
                Part::Image(image) => Some(image),
                Part::Text(_) => None,
            })
            .collect()
    }
}

/// Assemble the tagging conversation for one image.
///
/// The template is read, never mutated. An empty system instruction drops
/// the system turn; the user turn always carries the image, followed by the
/// guidance text (or a minimal default when the template has none).
pub fn build_prompt(image: &ImageInput, template: &PromptConfig) -> StructuredPrompt {
    let mut turns = Vec::with_capacity(2);

    if !template.system_instruction.trim().is_empty() {
        turns.push(Turn {
            role: Role::System,
            parts: vec![Part::Text(template.system_instruction.clone())],
        });
    }

    let guidance = if template.user_guidance.trim().is_empty() {
        MINIMAL_GUIDANCE.to_string()
    } else {
        template.user_guidance.clone()
    };

    turns.push(Turn {
        role: Role::User,
        parts: vec![Part::Image(image.clone()), Part::Text(guidance)],
    });

    StructuredPrompt { turns }
}
