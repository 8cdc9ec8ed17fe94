//! Game Error Taxonomy
//!
//! Service failures carry a human-readable detail string so they can travel
//! through the completion channel and into notifications. `ErrorKind` is the
//! detail-free projection that goes into snapshots.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::messages::Phase;

/// Errors produced by service clients and the controller
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GameError {
    /// No reference photo could be obtained for the subject
    #[error("no reference image available: {0}")]
    SourceUnavailable(String),

    /// The prompt (or translation) service failed or answered garbage
    #[error("prompt derivation failed: {0}")]
    DerivationFailed(String),

    /// The image generator failed
    #[error("image synthesis failed: {0}")]
    SynthesisFailed(String),

    /// Generated-image storage could not be cleared. Never blocks play.
    #[error("failed to purge generated images: {0}")]
    PurgeFailed(String),

    /// An intent arrived in a phase that forbids it
    #[error("cannot {intent} while {phase}")]
    InvalidTransition {
        /// Intent name
        intent: &'static str,
        /// Phase the controller was in
        phase: Phase,
    },

    /// The subject id is not in the catalog
    #[error("unknown subject: {0}")]
    UnknownSubject(String),
}

/// Detail-free error category, as shown in snapshots
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// See [`GameError::SourceUnavailable`]
    SourceUnavailable,
    /// See [`GameError::DerivationFailed`]
    DerivationFailed,
    /// See [`GameError::SynthesisFailed`]
    SynthesisFailed,
    /// See [`GameError::PurgeFailed`]
    PurgeFailed,
    /// See [`GameError::InvalidTransition`]
    InvalidTransition,
    /// See [`GameError::UnknownSubject`]
    UnknownSubject,
}

impl GameError {
    /// Category of this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SourceUnavailable(_) => ErrorKind::SourceUnavailable,
            Self::DerivationFailed(_) => ErrorKind::DerivationFailed,
            Self::SynthesisFailed(_) => ErrorKind::SynthesisFailed,
            Self::PurgeFailed(_) => ErrorKind::PurgeFailed,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::UnknownSubject(_) => ErrorKind::UnknownSubject,
        }
    }

    /// Whether the player should be told about this error
    #[must_use]
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::PurgeFailed(_) | Self::InvalidTransition { .. })
    }
}
