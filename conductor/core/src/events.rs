//! Player Intents
//!
//! Intents sent from a surface to the controller. Surfaces don't interpret
//! what an intent means or whether it is allowed right now; they report what
//! the player did and the controller decides how to respond.

use serde::{Deserialize, Serialize};

use crate::backend::ModelChoice;
use crate::round::{Label, Slot};

/// Intents from surface to controller
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameIntent {
    /// Start a round for a catalog subject
    SelectSubject {
        /// Catalog id
        subject_id: String,
    },

    /// Switch the prompt model, re-deriving the prompt if a subject is selected
    ChangeModel {
        /// New model
        model: ModelChoice,
    },

    /// Synthesize the AI image from the current prompt
    GenerateImage,

    /// Pick an image by identity
    SubmitGuess {
        /// Guessed identity of the picked image
        label: Label,
    },

    /// Pick an image by on-screen position
    PickImage {
        /// Position the player clicked
        slot: Slot,
    },

    /// Abandon the session and start over
    ResetSession,

    /// Translate a piece of text with the current model
    Translate {
        /// Text to translate
        text: String,
    },

    /// Surface is going away
    Quit,
}

impl GameIntent {
    /// Short name used in logs and transition errors
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SelectSubject { .. } => "select subject",
            Self::ChangeModel { .. } => "change model",
            Self::GenerateImage => "generate image",
            Self::SubmitGuess { .. } | Self::PickImage { .. } => "submit guess",
            Self::ResetSession => "reset session",
            Self::Translate { .. } => "translate",
            Self::Quit => "quit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_roundtrips_through_json() {
        let intent = GameIntent::SelectSubject {
            subject_id: "mountain".into(),
        };
        let json = serde_json::to_string(&intent).unwrap();
        let back: GameIntent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, intent);
    }

    #[test]
    fn test_pick_and_guess_share_a_name() {
        assert_eq!(
            GameIntent::PickImage { slot: Slot::Left }.name(),
            GameIntent::SubmitGuess {
                label: Label::Real
            }
            .name()
        );
    }
}
