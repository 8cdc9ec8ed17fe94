//! Scripted service fakes and a controller harness
//!
//! Each fake can be told to fail for a key, or to hold its answer until a
//! gate is opened. Gates are `Notify`s keyed by subject id (or model wire
//! name for the prompt fake), so tests decide the order in which concurrent
//! calls settle.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};

use hunter_core::{
    Catalog, ClearClient, ControllerConfig, GameClients, GameController, GameError, GameMessage,
    GameSnapshot, ImageGenClient, ImageReference, ImageSourceClient, ModelChoice, PromptClient,
    Shuffler, SubjectEntry, TranslateClient,
};

#[derive(Default)]
struct Gates(Mutex<HashMap<String, Arc<Notify>>>);

impl Gates {
    fn close(&self, key: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.0
            .lock()
            .unwrap()
            .insert(key.to_string(), Arc::clone(&gate));
        gate
    }

    fn get(&self, key: &str) -> Option<Arc<Notify>> {
        self.0.lock().unwrap().get(key).cloned()
    }

    async fn pass(&self, key: &str) {
        if let Some(gate) = self.get(key) {
            gate.notified().await;
        }
    }
}

// =============================================================================
// Image source
// =============================================================================

#[derive(Default)]
pub struct FakeSource {
    gates: Gates,
    failing: Mutex<HashSet<String>>,
    pub calls: AtomicUsize,
}

impl FakeSource {
    /// Hold the fetch for `subject_id` until the returned gate is notified
    pub fn gate(&self, subject_id: &str) -> Arc<Notify> {
        self.gates.close(subject_id)
    }

    pub fn fail_for(&self, subject_id: &str) {
        self.failing.lock().unwrap().insert(subject_id.to_string());
    }

    pub fn photo_url(subject_id: &str) -> String {
        format!("https://photos.test/{subject_id}.jpg")
    }
}

#[async_trait]
impl ImageSourceClient for FakeSource {
    async fn fetch(&self, subject: &SubjectEntry) -> Result<ImageReference, GameError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gates.pass(&subject.id).await;
        if self.failing.lock().unwrap().contains(&subject.id) {
            return Err(GameError::SourceUnavailable(format!(
                "no photos found for '{}'",
                subject.id
            )));
        }
        Ok(ImageReference::with_attribution(
            Self::photo_url(&subject.id),
            "Test Photographer",
            "https://photos.test/@tester?utm_source=test&utm_medium=referral",
        ))
    }
}

// =============================================================================
// Prompt derivation
// =============================================================================

#[derive(Default)]
pub struct FakePrompt {
    gates: Gates,
    failing: Mutex<HashSet<String>>,
    scripted: Mutex<HashMap<String, String>>,
    pub calls: AtomicUsize,
}

impl FakePrompt {
    /// Hold derivations for a subject id or a model wire name
    pub fn gate(&self, key: &str) -> Arc<Notify> {
        self.gates.close(key)
    }

    pub fn fail_for(&self, subject_id: &str) {
        self.failing.lock().unwrap().insert(subject_id.to_string());
    }

    /// Fixed prompt for a subject, regardless of model
    pub fn script(&self, subject_id: &str, prompt: &str) {
        self.scripted
            .lock()
            .unwrap()
            .insert(subject_id.to_string(), prompt.to_string());
    }

    pub fn default_prompt(subject_id: &str, model: ModelChoice) -> String {
        format!("prompt for {subject_id} via {model}")
    }
}

#[async_trait]
impl PromptClient for FakePrompt {
    async fn derive(
        &self,
        subject: &SubjectEntry,
        image: &ImageReference,
        model: ModelChoice,
    ) -> Result<String, GameError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(image.url, FakeSource::photo_url(&subject.id));
        self.gates.pass(&subject.id).await;
        self.gates.pass(model.wire_name()).await;

        if self.failing.lock().unwrap().contains(&subject.id) {
            return Err(GameError::DerivationFailed("model offline".into()));
        }
        let scripted = self.scripted.lock().unwrap().get(&subject.id).cloned();
        Ok(scripted.unwrap_or_else(|| Self::default_prompt(&subject.id, model)))
    }
}

// =============================================================================
// Image synthesis
// =============================================================================

#[derive(Default)]
pub struct FakeImageGen {
    failures: Mutex<VecDeque<GameError>>,
    pub prompts: Mutex<Vec<String>>,
    pub calls: AtomicUsize,
}

impl FakeImageGen {
    /// Fail the next synthesis
    pub fn fail_next(&self) {
        self.failures
            .lock()
            .unwrap()
            .push_back(GameError::SynthesisFailed("GPU on fire".into()));
    }
}

#[async_trait]
impl ImageGenClient for FakeImageGen {
    async fn synthesize(&self, prompt: &str) -> Result<ImageReference, GameError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(ImageReference::new(format!("https://gen.test/{n}.png")))
    }
}

// =============================================================================
// Purge and translation
// =============================================================================

#[derive(Default)]
pub struct FakeClear {
    gates: Gates,
    failing: Mutex<bool>,
    pub calls: AtomicUsize,
}

impl FakeClear {
    pub fn gate(&self) -> Arc<Notify> {
        self.gates.close("purge")
    }

    pub fn fail(&self) {
        *self.failing.lock().unwrap() = true;
    }
}

#[async_trait]
impl ClearClient for FakeClear {
    async fn purge(&self) -> Result<(), GameError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gates.pass("purge").await;
        if *self.failing.lock().unwrap() {
            return Err(GameError::PurgeFailed("read-only filesystem".into()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeTranslate;

#[async_trait]
impl TranslateClient for FakeTranslate {
    async fn translate(&self, text: &str, model: ModelChoice) -> Result<String, GameError> {
        if text.is_empty() {
            return Err(GameError::DerivationFailed("nothing to translate".into()));
        }
        Ok(format!("[{model}] {text}"))
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub ctrl: GameController,
    pub rx: mpsc::Receiver<GameMessage>,
    pub source: Arc<FakeSource>,
    pub prompt: Arc<FakePrompt>,
    pub image_gen: Arc<FakeImageGen>,
    pub clear: Arc<FakeClear>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_round_limit(5)
    }

    pub fn with_round_limit(round_limit: usize) -> Self {
        let source = Arc::new(FakeSource::default());
        let prompt = Arc::new(FakePrompt::default());
        let image_gen = Arc::new(FakeImageGen::default());
        let clear = Arc::new(FakeClear::default());
        let clients = GameClients::new(
            source.clone(),
            prompt.clone(),
            image_gen.clone(),
            clear.clone(),
            Arc::new(FakeTranslate),
        );
        let config = ControllerConfig {
            round_limit,
            default_model: ModelChoice::Ollama,
            catalog: Catalog::preset(),
        };

        let (tx, rx) = mpsc::channel(1024);
        let ctrl = GameController::new(clients, config, tx).with_shuffler(Shuffler::seeded(11));

        Self {
            ctrl,
            rx,
            source,
            prompt,
            image_gen,
            clear,
        }
    }

    /// Apply the next `n` settlements, failing the test if one doesn't arrive
    pub async fn pump(&mut self, n: usize) {
        for i in 0..n {
            let completion = tokio::time::timeout(Duration::from_secs(2), self.ctrl.next_completion())
                .await
                .unwrap_or_else(|_| panic!("settlement {} of {n} never arrived", i + 1))
                .expect("completion channel closed");
            self.ctrl.handle_completion(completion).await;
        }
    }

    /// Everything the controller has sent so far
    pub fn drain(&mut self) -> Vec<GameMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            out.push(msg);
        }
        out
    }

    pub fn snapshots(&mut self) -> Vec<GameSnapshot> {
        self.drain()
            .into_iter()
            .filter_map(|msg| match msg {
                GameMessage::Snapshot { snapshot } => Some(snapshot),
                _ => None,
            })
            .collect()
    }

    pub async fn select(&mut self, subject_id: &str) {
        self.ctrl
            .handle_intent(hunter_core::GameIntent::SelectSubject {
                subject_id: subject_id.to_string(),
            })
            .await
            .expect("select subject");
    }

    /// Select, derive and synthesize, leaving the controller in `GuessPending`
    pub async fn play_to_guess(&mut self, subject_id: &str) {
        self.select(subject_id).await;
        self.pump(2).await;
        self.ctrl
            .handle_intent(hunter_core::GameIntent::GenerateImage)
            .await
            .expect("generate image");
        self.pump(1).await;
    }
}
