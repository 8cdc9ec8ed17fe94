//! Service Clients
//!
//! The controller talks to external services only through capability traits.
//! Reference photos come from an image source; prompt derivation, image
//! synthesis, storage purge and translation all live on the game backend.
//!
//! # Available Implementations
//!
//! - [`UnsplashImageSource`]: Unsplash search API
//! - [`HttpGameBackend`]: the game backend's form/JSON endpoints
//!
//! # Usage
//!
//! ```ignore
//! use hunter_core::backend::GameClients;
//! use hunter_core::config::load_config;
//!
//! let config = load_config()?;
//! let clients = GameClients::from_config(&config);
//! ```

mod http;
mod traits;
mod unsplash;

use std::sync::Arc;

pub use http::{HttpGameBackend, DEFAULT_TIMEOUT};
pub use traits::{
    ClearClient, GameClients, ImageGenClient, ImageSourceClient, ModelChoice, PromptClient,
    TranslateClient,
};
pub use unsplash::{UnsplashImageSource, DEFAULT_API_BASE, DEFAULT_APP_NAME, DEFAULT_TOP_N};

use crate::config::HunterConfig;

impl GameClients {
    /// Real HTTP clients built from configuration
    #[must_use]
    pub fn from_config(config: &HunterConfig) -> Self {
        let backend = Arc::new(HttpGameBackend::new(&config.backend_url, config.http_timeout));
        let source = UnsplashImageSource::new(
            &config.unsplash_api_base,
            config.unsplash_access_key.clone(),
            config.http_timeout,
        )
        .with_top_n(config.top_n)
        .with_app_name(config.app_name.clone());

        Self::new(
            Arc::new(source),
            backend.clone(),
            backend.clone(),
            backend.clone(),
            backend,
        )
    }
}
