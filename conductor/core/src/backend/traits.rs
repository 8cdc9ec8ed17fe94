//! Service Client Traits
//!
//! Capability interfaces the controller consumes. Each one is a single async
//! call that either settles with a value or with a [`GameError`] of the
//! matching kind; implementations handle the wire details.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::catalog::SubjectEntry;
use crate::error::GameError;
use crate::round::ImageReference;

/// Language model used for prompt derivation and translation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelChoice {
    /// Local Ollama model
    #[default]
    #[serde(alias = "olama")]
    Ollama,
    /// OpenAI
    OpenAi,
    /// Google Gemini
    Gemini,
}

impl ModelChoice {
    /// All choices in display order
    pub const ALL: [ModelChoice; 3] = [Self::Ollama, Self::OpenAi, Self::Gemini];

    /// Value sent as `model_type`
    #[must_use]
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }
}

impl std::fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl std::str::FromStr for ModelChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" | "olama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            other => Err(format!("unknown model '{other}' (expected ollama, openai or gemini)")),
        }
    }
}

/// Fetches a real reference photo for a subject
#[async_trait]
pub trait ImageSourceClient: Send + Sync {
    /// Fails with [`GameError::SourceUnavailable`] when no candidate is found
    async fn fetch(&self, subject: &SubjectEntry) -> Result<ImageReference, GameError>;
}

/// Derives a descriptive prompt from a subject and its reference photo
#[async_trait]
pub trait PromptClient: Send + Sync {
    /// Fails with [`GameError::DerivationFailed`]
    async fn derive(
        &self,
        subject: &SubjectEntry,
        image: &ImageReference,
        model: ModelChoice,
    ) -> Result<String, GameError>;
}

/// Synthesizes an image from a prompt
#[async_trait]
pub trait ImageGenClient: Send + Sync {
    /// Fails with [`GameError::SynthesisFailed`]
    async fn synthesize(&self, prompt: &str) -> Result<ImageReference, GameError>;
}

/// Purges generated-image storage
#[async_trait]
pub trait ClearClient: Send + Sync {
    /// Best-effort; fails with [`GameError::PurgeFailed`]
    async fn purge(&self) -> Result<(), GameError>;
}

/// Translates free text
#[async_trait]
pub trait TranslateClient: Send + Sync {
    /// Fails with [`GameError::DerivationFailed`]
    async fn translate(&self, text: &str, model: ModelChoice) -> Result<String, GameError>;
}

/// The set of service handles a controller talks to
#[derive(Clone)]
pub struct GameClients {
    /// Reference photo source
    pub source: Arc<dyn ImageSourceClient>,
    /// Prompt derivation
    pub prompt: Arc<dyn PromptClient>,
    /// Image synthesis
    pub image_gen: Arc<dyn ImageGenClient>,
    /// Storage purge
    pub clear: Arc<dyn ClearClient>,
    /// Translation
    pub translate: Arc<dyn TranslateClient>,
}

impl GameClients {
    /// Assemble from individual implementations
    pub fn new(
        source: Arc<dyn ImageSourceClient>,
        prompt: Arc<dyn PromptClient>,
        image_gen: Arc<dyn ImageGenClient>,
        clear: Arc<dyn ClearClient>,
        translate: Arc<dyn TranslateClient>,
    ) -> Self {
        Self {
            source,
            prompt,
            image_gen,
            clear,
            translate,
        }
    }
}

impl std::fmt::Debug for GameClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameClients").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_choice_parsing() {
        assert_eq!("ollama".parse::<ModelChoice>(), Ok(ModelChoice::Ollama));
        assert_eq!("olama".parse::<ModelChoice>(), Ok(ModelChoice::Ollama));
        assert_eq!("OpenAI".parse::<ModelChoice>(), Ok(ModelChoice::OpenAi));
        assert_eq!("gemini".parse::<ModelChoice>(), Ok(ModelChoice::Gemini));
        assert!("claude".parse::<ModelChoice>().is_err());
    }

    #[test]
    fn test_model_choice_serde_uses_wire_names() {
        for model in ModelChoice::ALL {
            let json = serde_json::to_string(&model).unwrap();
            assert_eq!(json, format!("\"{}\"", model.wire_name()));
        }
        let legacy: ModelChoice = serde_json::from_str("\"olama\"").unwrap();
        assert_eq!(legacy, ModelChoice::Ollama);
    }
}
