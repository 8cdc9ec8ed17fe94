//! Game Messages
//!
//! Messages sent from the controller to surfaces. Surfaces are pure renderers:
//! everything they need to draw a frame is in the latest [`GameSnapshot`], the
//! remaining variants are one-off notices (catalog, round records, errors).

use serde::{Deserialize, Serialize};

use crate::backend::ModelChoice;
use crate::catalog::SubjectEntry;
use crate::error::ErrorKind;
use crate::round::{ImageReference, Label};

/// Messages from controller to surface
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum GameMessage {
    /// Sent once on start
    SessionInfo {
        /// Session ID
        session_id: SessionId,
        /// Model used for prompt derivation
        model: ModelChoice,
        /// Rounds per session
        round_limit: usize,
    },

    /// Selectable subjects
    Catalog {
        /// Catalog entries in display order
        subjects: Vec<SubjectEntry>,
    },

    /// Full read-only state, sent after every transition
    Snapshot {
        /// The state
        snapshot: GameSnapshot,
    },

    /// A round was scored
    RoundRecorded {
        /// 1-based round number
        round_index: usize,
        /// Subject of the round
        subject_id: String,
        /// What the player picked
        guess: Label,
        /// Whether the pick was the synthetic image
        correct: bool,
    },

    /// The last round of the session was scored
    SessionOver {
        /// Final score
        score: usize,
        /// Rounds played
        round_limit: usize,
    },

    /// Result of an ad hoc translation
    Translation {
        /// Input text
        text: String,
        /// Translated text
        translation: String,
    },

    /// Player-facing notification
    Notify {
        /// Notification level
        level: NotifyLevel,
        /// Message content
        message: String,
    },

    /// Controller is shutting down
    Quit {
        /// Optional goodbye message
        message: Option<String>,
    },
}

/// Session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new unique session ID
    ///
    /// Atomic counter plus timestamp, unique even within one millisecond.
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        use std::time::{SystemTime, UNIX_EPOCH};

        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let count = COUNTER.fetch_add(1, Ordering::SeqCst);
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self(format!("game_{timestamp}_{count}"))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notification levels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyLevel {
    /// Informational
    Info,
    /// Warning
    Warning,
    /// Error
    Error,
    /// Success
    Success,
}

/// Controller phases
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Nothing in flight, waiting for a subject
    Idle,
    /// Subject accepted, chain about to be issued
    SubjectSelected,
    /// Fetching the reference photo and deriving the prompt
    PromptPending,
    /// Prompt available, image generation may be requested
    PromptReady,
    /// Waiting for the synthesized image
    ImagePending,
    /// Both images shown, waiting for the player's pick
    GuessPending,
    /// Pick scored
    RoundResolved,
    /// Last round scored, reset scheduled
    SessionComplete,
}

impl Phase {
    /// Human-readable description
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Idle => "Pick a subject to start a round",
            Self::SubjectSelected => "Subject selected",
            Self::PromptPending => "Analyzing the photo and writing a prompt...",
            Self::PromptReady => "Prompt ready, generate the AI image",
            Self::ImagePending => "Generating the AI image...",
            Self::GuessPending => "Which one is AI generated?",
            Self::RoundResolved => "Round scored",
            Self::SessionComplete => "Game over",
        }
    }

    /// Whether a service call is outstanding in this phase
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::PromptPending | Self::ImagePending)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::SubjectSelected => "subject selected",
            Self::PromptPending => "prompt pending",
            Self::PromptReady => "prompt ready",
            Self::ImagePending => "image pending",
            Self::GuessPending => "guess pending",
            Self::RoundResolved => "round resolved",
            Self::SessionComplete => "session complete",
        };
        f.write_str(s)
    }
}

/// Read-only view of the controller, rebuilt after every transition
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Current phase
    pub phase: Phase,
    /// Derived prompt of the current round (empty when none)
    pub prompt: String,
    /// Reference photo of the current round
    pub real_image: Option<ImageReference>,
    /// Synthesized image of the current round
    pub generated_image: Option<ImageReference>,
    /// Which label is in which slot
    pub display_order: [Label; 2],
    /// Player's pick in the current round
    pub guess: Option<Label>,
    /// Whether the current round has been scored
    pub resolved: bool,
    /// Running score
    pub score: usize,
    /// 1-based number of the round in play or last scored, 0 before the first
    pub round_index: usize,
    /// Rounds per session
    pub round_limit: usize,
    /// Most recent user-visible failure, cleared when a new request starts
    pub last_error: Option<ErrorKind>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_unique() {
        let id1 = SessionId::new();
        let id2 = SessionId::new();
        assert_ne!(id1, id2);
        assert!(id1.0.starts_with("game_"));
    }

    #[test]
    fn test_phase_pending() {
        assert!(Phase::PromptPending.is_pending());
        assert!(Phase::ImagePending.is_pending());
        assert!(!Phase::GuessPending.is_pending());
        assert_eq!(Phase::GuessPending.to_string(), "guess pending");
    }

    #[test]
    fn test_message_serializes_with_variant_tag() {
        let msg = GameMessage::SessionOver {
            score: 3,
            round_limit: 5,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["SessionOver"]["score"], 3);
    }
}
