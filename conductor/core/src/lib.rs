//! Hunter Core - Round Orchestration for AI Image Hunter
//!
//! A "spot the AI image" game: the player picks a subject, the controller
//! fetches a real photo of it, has a language model describe the photo as a
//! prompt, synthesizes an image from that prompt and shows both images side
//! by side. The player guesses which one is synthetic; five rounds make a
//! session.
//!
//! This crate is the headless core. It can drive a socket client, the
//! line-oriented `play` surface of the daemon, or a test harness.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Surfaces                             │
//! │      socket client  ·  stdin `play`  ·  test harness          │
//! │                             │                                 │
//! │              GameIntent (up)  GameMessage (down)              │
//! └─────────────────────────────┼─────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────┼─────────────────────────────────┐
//! │                      GameController                           │
//! │   phase · RequestToken · RoundState · GameSession · Shuffler  │
//! │                             │                                 │
//! │                  Completion channel (spawned calls)           │
//! └─────────────────────────────┼─────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────┼─────────────────────────────────┐
//! │   ImageSourceClient   PromptClient   ImageGenClient           │
//! │   ClearClient         TranslateClient                         │
//! │   (UnsplashImageSource, HttpGameBackend)                      │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use hunter_core::{load_config, ControllerConfig, GameClients, GameController};
//! use tokio::sync::mpsc;
//!
//! let config = load_config()?;
//! let (msg_tx, mut msg_rx) = mpsc::channel(256);
//! let (intent_tx, intent_rx) = mpsc::channel(64);
//!
//! let controller = GameController::new(
//!     GameClients::from_config(&config),
//!     ControllerConfig::from_config(&config),
//!     msg_tx,
//! );
//! tokio::spawn(controller.run(intent_rx));
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: service capability traits and their HTTP implementations
//! - [`catalog`]: selectable subjects
//! - [`config`]: TOML/env/CLI configuration
//! - [`controller`]: the round/session state machine
//! - [`error`]: error taxonomy
//! - [`events`]: intents from surfaces
//! - [`messages`]: messages and snapshots to surfaces
//! - [`round`]: per-round data
//! - [`session`]: scoring across rounds
//! - [`shuffle`]: display-order permutation
//! - [`transport`]: framed JSON over byte streams

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod messages;
pub mod round;
pub mod session;
pub mod shuffle;
pub mod transport;

// Re-exports for convenience
pub use backend::{
    ClearClient, GameClients, HttpGameBackend, ImageGenClient, ImageSourceClient, ModelChoice,
    PromptClient, TranslateClient, UnsplashImageSource,
};
pub use catalog::{Catalog, Category, SubjectEntry};
pub use controller::{Completion, ControllerConfig, GameController, PurgeReason, RequestToken};
pub use error::{ErrorKind, GameError};
pub use events::GameIntent;
pub use messages::{GameMessage, GameSnapshot, NotifyLevel, Phase, SessionId};
pub use round::{Attribution, ImageReference, Label, RoundState, Slot};
pub use session::{GameSession, SessionFull};
pub use shuffle::Shuffler;

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, HunterConfig, HunterToml,
};
