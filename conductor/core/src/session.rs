//! Game Session
//!
//! Accumulates resolved rounds and the running score for up to `round_limit`
//! consecutive rounds. The score is always recomputed from the history, so it
//! can never drift from what was actually recorded.

use serde::{Deserialize, Serialize};

use crate::round::{Label, RoundState};

/// Default number of rounds per session
pub const DEFAULT_ROUND_LIMIT: usize = 5;

/// Returned when a round is recorded into a full session
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("session already holds {limit} rounds")]
pub struct SessionFull {
    /// The round limit that was hit
    pub limit: usize,
}

/// Rounds played so far and their score
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSession {
    rounds: Vec<RoundState>,
    score: usize,
    round_limit: usize,
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new(DEFAULT_ROUND_LIMIT)
    }
}

impl GameSession {
    /// Empty session. A limit of zero is treated as one.
    #[must_use]
    pub fn new(round_limit: usize) -> Self {
        Self {
            rounds: Vec::with_capacity(round_limit),
            score: 0,
            round_limit: round_limit.max(1),
        }
    }

    /// Append a resolved round and recompute the score
    ///
    /// Keeps `score <= rounds.len() <= round_limit`.
    pub fn record_round(&mut self, round: RoundState) -> Result<(), SessionFull> {
        if self.is_complete() {
            return Err(SessionFull {
                limit: self.round_limit,
            });
        }
        self.rounds.push(round);
        self.score = self
            .rounds
            .iter()
            .filter(|r| r.guess == Some(Label::Synthetic))
            .count();
        Ok(())
    }

    /// Whether the round limit has been reached
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.rounds.len() >= self.round_limit
    }

    /// 1-based index of the round being played or last scored
    ///
    /// `current_resolved` is `None` when there is no round in flight.
    #[must_use]
    pub fn round_index(&self, current_resolved: Option<bool>) -> usize {
        match current_resolved {
            Some(false) => self.rounds.len() + 1,
            Some(true) | None => self.rounds.len(),
        }
    }

    /// Drop all rounds and the score
    pub fn reset(&mut self) {
        self.rounds.clear();
        self.score = 0;
    }

    /// Resolved rounds, oldest first
    #[must_use]
    pub fn rounds(&self) -> &[RoundState] {
        &self.rounds
    }

    /// Running score
    #[must_use]
    pub fn score(&self) -> usize {
        self.score
    }

    /// Rounds per session
    #[must_use]
    pub fn round_limit(&self) -> usize {
        self.round_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Category, SubjectEntry};

    fn resolved(guess: Label) -> RoundState {
        let mut round = RoundState::new(SubjectEntry::new("lake", "Lake", Category::Landscape));
        round.guess = Some(guess);
        round.resolved = true;
        round
    }

    #[test]
    fn test_score_counts_synthetic_guesses() {
        let mut session = GameSession::default();
        session.record_round(resolved(Label::Synthetic)).unwrap();
        session.record_round(resolved(Label::Real)).unwrap();
        session.record_round(resolved(Label::Synthetic)).unwrap();
        assert_eq!(session.score(), 2);
        assert_eq!(session.rounds().len(), 3);
        assert!(!session.is_complete());
    }

    #[test]
    fn test_full_session_rejects_rounds() {
        let mut session = GameSession::new(2);
        session.record_round(resolved(Label::Real)).unwrap();
        session.record_round(resolved(Label::Real)).unwrap();
        assert!(session.is_complete());
        assert_eq!(
            session.record_round(resolved(Label::Synthetic)),
            Err(SessionFull { limit: 2 })
        );
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn test_invariant_holds_for_every_guess_sequence() {
        for mask in 0u8..32 {
            let mut session = GameSession::default();
            for bit in 0..5 {
                let guess = if mask & (1 << bit) == 0 {
                    Label::Real
                } else {
                    Label::Synthetic
                };
                session.record_round(resolved(guess)).unwrap();
                assert!(session.score() <= session.rounds().len());
                assert!(session.rounds().len() <= session.round_limit());
            }
            assert_eq!(session.score(), mask.count_ones() as usize);
        }
    }

    #[test]
    fn test_round_index() {
        let mut session = GameSession::default();
        assert_eq!(session.round_index(None), 0);
        assert_eq!(session.round_index(Some(false)), 1);
        session.record_round(resolved(Label::Real)).unwrap();
        assert_eq!(session.round_index(Some(true)), 1);
        assert_eq!(session.round_index(Some(false)), 2);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut session = GameSession::new(1);
        session.record_round(resolved(Label::Synthetic)).unwrap();
        session.reset();
        assert!(session.rounds().is_empty());
        assert_eq!(session.score(), 0);
        assert_eq!(session.round_limit(), 1);
    }
}
