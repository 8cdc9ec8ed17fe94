//! Game Controller - The Round/Session State Machine
//!
//! The controller is the only writer of game state. It:
//! - validates player intents against the current [`Phase`]
//! - issues service calls as spawned tasks
//! - applies their settlements, dropping any that belong to a superseded request
//! - keeps score and resets the session after the last round
//! - emits a [`GameSnapshot`] after every transition
//!
//! # Concurrency
//!
//! One logical actor. Service calls never block intent processing: each runs
//! on its own task and reports back through a completion channel, tagged with
//! the [`RequestToken`] that was current when it was issued. Selecting a
//! subject, changing the model or resetting bumps the token, so late results
//! from earlier requests are discarded before they can touch state. Nothing is
//! aborted; results are only suppressed.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::backend::{GameClients, ModelChoice};
use crate::catalog::{Catalog, SubjectEntry};
use crate::config::HunterConfig;
use crate::error::{ErrorKind, GameError};
use crate::events::GameIntent;
use crate::messages::{GameMessage, GameSnapshot, NotifyLevel, Phase, SessionId};
use crate::round::{ImageReference, Label, RoundState, DEFAULT_DISPLAY_ORDER};
use crate::session::{GameSession, DEFAULT_ROUND_LIMIT};
use crate::shuffle::Shuffler;

/// Controller configuration
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Rounds per session
    pub round_limit: usize,
    /// Model used until the player picks another
    pub default_model: ModelChoice,
    /// Selectable subjects
    pub catalog: Catalog,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            round_limit: DEFAULT_ROUND_LIMIT,
            default_model: ModelChoice::default(),
            catalog: Catalog::preset(),
        }
    }
}

impl ControllerConfig {
    /// Game rules from the loaded configuration, with the preset catalog
    #[must_use]
    pub fn from_config(config: &HunterConfig) -> Self {
        Self {
            round_limit: config.round_limit,
            default_model: config.default_model,
            catalog: Catalog::preset(),
        }
    }
}

/// Generation counter used to recognise stale settlements
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Raw counter value
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Why a purge was issued
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PurgeReason {
    /// Scheduled after the last round; finalizes the session reset
    SessionComplete,
    /// Issued by an explicit reset; state was already cleared
    Manual,
}

/// Settlement of a service call, delivered back to the controller
#[derive(Debug)]
pub enum Completion {
    /// Reference photo fetch settled
    SourceFetched {
        /// Token current when the chain was issued
        token: RequestToken,
        /// Outcome
        result: Result<ImageReference, GameError>,
    },
    /// Prompt derivation settled
    PromptDerived {
        /// Token current when the chain was issued
        token: RequestToken,
        /// Outcome
        result: Result<String, GameError>,
    },
    /// Image synthesis settled
    ImageSynthesized {
        /// Token current when synthesis was issued
        token: RequestToken,
        /// Outcome
        result: Result<ImageReference, GameError>,
    },
    /// Storage purge settled
    SessionPurged {
        /// Token current when the purge was issued
        token: RequestToken,
        /// Why the purge was issued
        reason: PurgeReason,
        /// Outcome
        result: Result<(), GameError>,
    },
    /// Translation settled
    Translated {
        /// Input text
        text: String,
        /// Outcome
        result: Result<String, GameError>,
    },
}

impl Completion {
    fn label(&self) -> &'static str {
        match self {
            Self::SourceFetched { .. } => "source fetch",
            Self::PromptDerived { .. } => "prompt derivation",
            Self::ImageSynthesized { .. } => "image synthesis",
            Self::SessionPurged { .. } => "purge",
            Self::Translated { .. } => "translation",
        }
    }
}

/// The game controller - headless orchestration of rounds and sessions
pub struct GameController {
    clients: GameClients,
    config: ControllerConfig,
    shuffler: Shuffler,
    session: GameSession,
    /// Round in flight, or the last resolved round until the next selection
    round: Option<RoundState>,
    /// Kept across failures so a model change can re-run the chain
    selected_subject: Option<SubjectEntry>,
    model: ModelChoice,
    phase: Phase,
    token: RequestToken,
    last_error: Option<ErrorKind>,
    session_id: SessionId,
    /// Channel to the surface
    tx: mpsc::Sender<GameMessage>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
}

impl GameController {
    /// Create a controller in [`Phase::Idle`]
    pub fn new(
        clients: GameClients,
        config: ControllerConfig,
        tx: mpsc::Sender<GameMessage>,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            clients,
            session: GameSession::new(config.round_limit),
            model: config.default_model,
            config,
            shuffler: Shuffler::new(),
            round: None,
            selected_subject: None,
            phase: Phase::Idle,
            token: RequestToken::default(),
            last_error: None,
            session_id: SessionId::new(),
            tx,
            completion_tx,
            completion_rx,
        }
    }

    /// Replace the display-order shuffler (seeded shufflers for replays)
    #[must_use]
    pub fn with_shuffler(mut self, shuffler: Shuffler) -> Self {
        self.shuffler = shuffler;
        self
    }

    /// Session ID
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current request token
    pub fn token(&self) -> RequestToken {
        self.token
    }

    /// Current prompt model
    pub fn model(&self) -> ModelChoice {
        self.model
    }

    /// Rounds played so far
    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// Round in flight or last resolved
    pub fn round(&self) -> Option<&RoundState> {
        self.round.as_ref()
    }

    /// Subject of the latest selection
    pub fn selected_subject(&self) -> Option<&SubjectEntry> {
        self.selected_subject.as_ref()
    }

    /// Most recent user-visible failure
    pub fn last_error(&self) -> Option<ErrorKind> {
        self.last_error
    }

    /// Subjects offered to the player
    pub fn catalog(&self) -> &Catalog {
        &self.config.catalog
    }

    /// Read-only view of the current state
    #[must_use]
    pub fn snapshot(&self) -> GameSnapshot {
        let round = self.round.as_ref();
        GameSnapshot {
            phase: self.phase,
            prompt: round.map(|r| r.prompt.clone()).unwrap_or_default(),
            real_image: round.and_then(|r| r.real_image.clone()),
            generated_image: round.and_then(|r| r.generated_image.clone()),
            display_order: round.map_or(DEFAULT_DISPLAY_ORDER, |r| r.display_order),
            guess: round.and_then(|r| r.guess),
            resolved: round.is_some_and(|r| r.resolved),
            score: self.session.score(),
            round_index: self.session.round_index(round.map(|r| r.resolved)),
            round_limit: self.session.round_limit(),
            last_error: self.last_error,
        }
    }

    /// Announce the session to the surface
    pub async fn start(&mut self) {
        self.send(GameMessage::SessionInfo {
            session_id: self.session_id.clone(),
            model: self.model,
            round_limit: self.session.round_limit(),
        })
        .await;
        self.send(GameMessage::Catalog {
            subjects: self.config.catalog.entries().to_vec(),
        })
        .await;
        self.emit_snapshot().await;
    }

    /// Handle a player intent
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidTransition`] when the current phase forbids
    /// the intent and [`GameError::UnknownSubject`] for ids not in the
    /// catalog. State is unchanged in both cases.
    pub async fn handle_intent(&mut self, intent: GameIntent) -> Result<(), GameError> {
        tracing::debug!(intent = intent.name(), phase = %self.phase, "Handling intent");

        match intent {
            GameIntent::SelectSubject { subject_id } => {
                let Some(subject) = self.config.catalog.get(&subject_id).cloned() else {
                    self.notify(NotifyLevel::Warning, &format!("Unknown subject: {subject_id}"))
                        .await;
                    return Err(GameError::UnknownSubject(subject_id));
                };
                self.select_subject(subject).await;
            }
            GameIntent::ChangeModel { model } => self.change_model(model).await,
            GameIntent::GenerateImage => self.generate_image().await?,
            GameIntent::SubmitGuess { label } => {
                if self.check_guess_allowed()? {
                    self.resolve_round(label).await;
                }
            }
            GameIntent::PickImage { slot } => {
                if self.check_guess_allowed()? {
                    let label = self
                        .round
                        .as_ref()
                        .map_or(Label::Real, |round| round.label_at(slot));
                    self.resolve_round(label).await;
                }
            }
            GameIntent::ResetSession => self.reset_session().await,
            GameIntent::Translate { text } => self.spawn_translate(text),
            GameIntent::Quit => self.shutdown().await,
        }
        Ok(())
    }

    /// Wait for the next service settlement
    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.completion_rx.recv().await
    }

    /// Apply settlements that have already arrived
    ///
    /// Returns true if there was activity.
    pub async fn poll_completions(&mut self) -> bool {
        let mut collected = Vec::new();
        while let Ok(completion) = self.completion_rx.try_recv() {
            collected.push(completion);
        }

        if collected.is_empty() {
            return false;
        }
        for completion in collected {
            self.handle_completion(completion).await;
        }
        true
    }

    /// Apply one service settlement
    pub async fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::SourceFetched { token, result } => {
                if !self.is_current(token, Phase::PromptPending, "source fetch") {
                    return;
                }
                match result {
                    Ok(image) => {
                        if let Some(round) = self.round.as_mut() {
                            round.real_image = Some(image);
                        }
                        self.emit_snapshot().await;
                    }
                    Err(e) => self.abort_round(e).await,
                }
            }
            Completion::PromptDerived { token, result } => {
                if !self.is_current(token, Phase::PromptPending, "prompt derivation") {
                    return;
                }
                match result {
                    Ok(prompt) => {
                        if let Some(round) = self.round.as_mut() {
                            round.prompt = prompt;
                        }
                        self.set_phase(Phase::PromptReady).await;
                    }
                    Err(e) => self.abort_round(e).await,
                }
            }
            Completion::ImageSynthesized { token, result } => {
                if !self.is_current(token, Phase::ImagePending, "image synthesis") {
                    return;
                }
                match result {
                    Ok(image) => {
                        let order = self.shuffler.permute([Label::Real, Label::Synthetic]);
                        if let Some(round) = self.round.as_mut() {
                            round.generated_image = Some(image);
                            round.display_order = order;
                        }
                        self.set_phase(Phase::GuessPending).await;
                    }
                    Err(e) => {
                        if let Some(round) = self.round.as_mut() {
                            round.generated_image = None;
                        }
                        self.record_failure(&e).await;
                        self.set_phase(Phase::PromptReady).await;
                    }
                }
            }
            Completion::SessionPurged {
                token,
                reason,
                result,
            } => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, ?reason, "Purge failed");
                }
                if reason == PurgeReason::SessionComplete {
                    if token == self.token && self.phase == Phase::SessionComplete {
                        self.finish_session_reset().await;
                    } else {
                        tracing::debug!(
                            token = token.value(),
                            current = self.token.value(),
                            "Session already restarted, skipping scheduled reset"
                        );
                    }
                }
            }
            Completion::Translated { text, result } => match result {
                Ok(translation) => self.send(GameMessage::Translation { text, translation }).await,
                Err(e) => self.notify(NotifyLevel::Error, &e.to_string()).await,
            },
        }
    }

    /// Drive the controller until the surface quits or goes away
    pub async fn run(mut self, mut intents: mpsc::Receiver<GameIntent>) {
        enum Step {
            Intent(Option<GameIntent>),
            Completion(Completion),
        }

        self.start().await;

        loop {
            let step = tokio::select! {
                intent = intents.recv() => Step::Intent(intent),
                Some(completion) = self.completion_rx.recv() => Step::Completion(completion),
            };

            match step {
                Step::Intent(None) => {
                    tracing::info!(session = %self.session_id, "Surface disconnected");
                    self.shutdown().await;
                    break;
                }
                Step::Intent(Some(GameIntent::Quit)) => {
                    self.shutdown().await;
                    break;
                }
                Step::Intent(Some(intent)) => {
                    let name = intent.name();
                    if let Err(e) = self.handle_intent(intent).await {
                        tracing::warn!(intent = name, error = %e, "Intent rejected");
                    }
                }
                Step::Completion(completion) => {
                    tracing::trace!(completion = completion.label(), "Completion received");
                    self.handle_completion(completion).await;
                }
            }
        }
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    async fn select_subject(&mut self, subject: SubjectEntry) {
        if self.phase == Phase::SessionComplete {
            // The scheduled reset hasn't landed yet; do it now.
            self.session.reset();
        }

        self.token = self.token.next();
        self.last_error = None;
        self.selected_subject = Some(subject.clone());
        self.round = Some(RoundState::new(subject.clone()));
        self.set_phase(Phase::SubjectSelected).await;

        tracing::info!(
            subject = %subject.id,
            model = %self.model,
            token = self.token.value(),
            "Starting round"
        );
        self.spawn_chain(subject);
        self.set_phase(Phase::PromptPending).await;
    }

    async fn change_model(&mut self, model: ModelChoice) {
        if model == self.model {
            self.emit_snapshot().await;
            return;
        }
        self.model = model;
        match self.selected_subject.clone() {
            Some(subject) => self.select_subject(subject).await,
            None => self.emit_snapshot().await,
        }
    }

    async fn generate_image(&mut self) -> Result<(), GameError> {
        let prompt = match (&self.round, self.phase) {
            (Some(round), Phase::PromptReady) if !round.prompt.is_empty() => round.prompt.clone(),
            _ => {
                return Err(GameError::InvalidTransition {
                    intent: "generate image",
                    phase: self.phase,
                })
            }
        };

        self.last_error = None;
        if let Some(round) = self.round.as_mut() {
            round.generated_image = None;
        }

        let token = self.token;
        let image_gen = Arc::clone(&self.clients.image_gen);
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = image_gen.synthesize(&prompt).await;
            let _ = tx.send(Completion::ImageSynthesized { token, result });
        });

        self.set_phase(Phase::ImagePending).await;
        Ok(())
    }

    /// Ok(true) to proceed, Ok(false) for a repeated guess on a scored round
    fn check_guess_allowed(&self) -> Result<bool, GameError> {
        match self.phase {
            Phase::GuessPending => Ok(true),
            Phase::RoundResolved | Phase::SessionComplete => {
                tracing::debug!("Round already scored, ignoring guess");
                Ok(false)
            }
            phase => Err(GameError::InvalidTransition {
                intent: "submit guess",
                phase,
            }),
        }
    }

    async fn resolve_round(&mut self, label: Label) {
        let Some(round) = self.round.as_mut() else {
            return;
        };
        round.guess = Some(label);
        round.resolved = true;
        let recorded = round.clone();

        let correct = recorded.is_correct();
        let subject_id = recorded.subject.id.clone();
        if let Err(e) = self.session.record_round(recorded) {
            tracing::warn!(error = %e, "Round not recorded");
            return;
        }

        self.send(GameMessage::RoundRecorded {
            round_index: self.session.rounds().len(),
            subject_id,
            guess: label,
            correct,
        })
        .await;
        self.set_phase(Phase::RoundResolved).await;

        if self.session.is_complete() {
            tracing::info!(
                score = self.session.score(),
                rounds = self.session.rounds().len(),
                "Session complete"
            );
            self.send(GameMessage::SessionOver {
                score: self.session.score(),
                round_limit: self.session.round_limit(),
            })
            .await;
            self.set_phase(Phase::SessionComplete).await;
            self.spawn_purge(PurgeReason::SessionComplete);
        }
    }

    async fn reset_session(&mut self) {
        self.token = self.token.next();
        self.clear_game_state();
        self.spawn_purge(PurgeReason::Manual);
        tracing::info!(token = self.token.value(), "Session reset");
        self.set_phase(Phase::Idle).await;
    }

    async fn finish_session_reset(&mut self) {
        self.token = self.token.next();
        self.clear_game_state();
        tracing::info!(token = self.token.value(), "New session ready");
        self.set_phase(Phase::Idle).await;
    }

    fn clear_game_state(&mut self) {
        self.session.reset();
        self.round = None;
        self.selected_subject = None;
        self.last_error = None;
    }

    /// Fetch or derivation failed: no round without a reference and a prompt
    async fn abort_round(&mut self, error: GameError) {
        self.round = None;
        self.record_failure(&error).await;
        self.set_phase(Phase::Idle).await;
    }

    async fn record_failure(&mut self, error: &GameError) {
        tracing::warn!(error = %error, phase = %self.phase, "Service call failed");
        if error.is_user_visible() {
            self.last_error = Some(error.kind());
            self.notify(NotifyLevel::Error, &error.to_string()).await;
        }
    }

    async fn shutdown(&mut self) {
        self.send(GameMessage::Quit {
            message: Some("Thanks for playing!".to_string()),
        })
        .await;
    }

    // =========================================================================
    // Service calls
    // =========================================================================

    fn spawn_chain(&self, subject: SubjectEntry) {
        let token = self.token;
        let model = self.model;
        let source = Arc::clone(&self.clients.source);
        let prompt = Arc::clone(&self.clients.prompt);
        let tx = self.completion_tx.clone();

        tokio::spawn(async move {
            let image = match source.fetch(&subject).await {
                Ok(image) => image,
                Err(e) => {
                    let _ = tx.send(Completion::SourceFetched {
                        token,
                        result: Err(e),
                    });
                    return;
                }
            };
            if tx
                .send(Completion::SourceFetched {
                    token,
                    result: Ok(image.clone()),
                })
                .is_err()
            {
                return;
            }

            let result = prompt.derive(&subject, &image, model).await;
            let _ = tx.send(Completion::PromptDerived { token, result });
        });
    }

    fn spawn_purge(&self, reason: PurgeReason) {
        let token = self.token;
        let clear = Arc::clone(&self.clients.clear);
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = clear.purge().await;
            let _ = tx.send(Completion::SessionPurged {
                token,
                reason,
                result,
            });
        });
    }

    fn spawn_translate(&self, text: String) {
        let model = self.model;
        let translate = Arc::clone(&self.clients.translate);
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = translate.translate(&text, model).await;
            let _ = tx.send(Completion::Translated { text, result });
        });
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn is_current(&self, token: RequestToken, expected: Phase, what: &'static str) -> bool {
        if token != self.token || self.phase != expected {
            tracing::debug!(
                what,
                token = token.value(),
                current = self.token.value(),
                phase = %self.phase,
                "Dropping stale settlement"
            );
            return false;
        }
        true
    }

    /// Set phase and notify the surface
    async fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            tracing::debug!(from = %self.phase, to = %phase, "Phase transition");
        }
        self.phase = phase;
        self.emit_snapshot().await;
    }

    async fn emit_snapshot(&self) {
        self.send(GameMessage::Snapshot {
            snapshot: self.snapshot(),
        })
        .await;
    }

    /// Send notification
    async fn notify(&self, level: NotifyLevel, message: &str) {
        self.send(GameMessage::Notify {
            level,
            message: message.to_string(),
        })
        .await;
    }

    /// Send a message to the surface
    async fn send(&self, msg: GameMessage) {
        if let Err(e) = self.tx.send(msg).await {
            tracing::warn!("Failed to send message to surface: {}", e);
        }
    }
}

impl std::fmt::Debug for GameController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameController")
            .field("session_id", &self.session_id)
            .field("phase", &self.phase)
            .field("token", &self.token)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}
