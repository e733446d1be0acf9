//! Configuration management for Wardrobe.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. All config structs implement `Default`; the prompt section also
//! ships named presets because the instruction template, sentinel literal,
//! and word cap have changed together across product iterations.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Wardrobe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine connection settings
    pub engine: EngineConfig,

    /// Token generation settings
    pub generation: GenerationConfig,

    /// Image preprocessing settings
    pub image: ImageConfig,

    /// Prompt template settings
    pub prompt: PromptConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.wardrobe.wardrobe/config.toml
    /// - Linux: ~/.config/wardrobe/config.toml
    ///
    /// Falls back to ~/.wardrobe/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "wardrobe", "wardrobe")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".wardrobe").join("config.toml")
            })
    }

    /// Check cross-field constraints that serde defaults can't express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prompt.max_words == 0 {
            return Err(ConfigError::ValidationError(
                "prompt.max_words must be at least 1".to_string(),
            ));
        }
        if self.prompt.sentinel.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "prompt.sentinel must not be empty".to_string(),
            ));
        }
        if self.generation.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "generation.max_tokens must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "generation.temperature must be in [0.0, 2.0], got {}",
                self.generation.temperature
            )));
        }
        Ok(())
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

/// Engine connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine backend identifier ("ollama")
    pub backend: String,

    /// Engine API endpoint
    pub endpoint: String,

    /// Vision model name
    pub model: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: "ollama".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            model: "qwen2.5vl:3b".to_string(),
        }
    }
}

/// Token generation settings. Fixed per build of the config; not mutated
/// per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate before the stop predicate fires
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.6,
            max_tokens: 800,
        }
    }
}

/// Image preprocessing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Longest-edge target for downscaling before inference.
    /// Images already within the target are passed through untouched.
    pub resize_width: u32,

    /// Target height (paired with `resize_width`)
    pub resize_height: u32,

    /// JPEG quality for the re-encoded engine payload (0-100)
    pub jpeg_quality: u8,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            resize_width: 1024,
            resize_height: 1024,
            jpeg_quality: 85,
        }
    }
}

/// Prompt template settings.
///
/// The instruction text, sentinel literal, and word cap move together: a
/// template that asks for three words and 'nil' must be normalized with
/// `max_words = 3` and `sentinel = "nil"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// System-turn instruction. If empty, no system turn is emitted and the
    /// user turn alone carries the task.
    pub system_instruction: String,

    /// Literal guidance text placed in the user turn next to the image
    pub user_guidance: String,

    /// Reserved output meaning "no clothing detected"
    pub sentinel: String,

    /// Maximum words kept in a normalized tag
    pub max_words: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self::four_word_null()
    }
}

impl PromptConfig {
    /// Current template: four-word tags with color and fabric, 'null' sentinel.
    pub fn four_word_null() -> Self {
        Self {
            system_instruction: "You are a strict clothing identification AI.\n\
                 - If the image contains clothing, respond with the name of the clothing \
                 in **four words or fewer**, including its color and fabric when visible.\n\
                 - If no clothing is detected, respond **only** with 'null'.\n\
                 - Do **not** provide additional text, explanations, or symbols."
                .to_string(),
            user_guidance: "Identify the clothing in this image using four words or fewer. \
                 If no clothing is present, return 'null' only."
                .to_string(),
            sentinel: "null".to_string(),
            max_words: 4,
        }
    }

    /// Earlier template: three-word tags, 'nil' sentinel.
    pub fn three_word_nil() -> Self {
        Self {
            system_instruction: "You are a strict clothing identification AI.\n\
                 - If the image contains clothing, respond with the name of the clothing \
                 in **three words or fewer**.\n\
                 - If no clothing is detected, respond **only** with 'nil'.\n\
                 - Do **not** provide additional text, explanations, or symbols."
                .to_string(),
            user_guidance: "Identify the clothing in this image using three words or fewer. \
                 If no clothing is present, return 'nil' only."
                .to_string(),
            sentinel: "nil".to_string(),
            max_words: 3,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
