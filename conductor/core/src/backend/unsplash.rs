//! Unsplash Image Source
//!
//! Searches Unsplash for the subject and picks one of the top-N results
//! uniformly at random. Unsplash's API terms require two things of every
//! photo we show: credit to the photographer (with referral parameters on the
//! profile link) and a hit on the photo's `download_location`.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;

use super::http::client_or_fallback;
use super::traits::ImageSourceClient;
use crate::catalog::SubjectEntry;
use crate::error::GameError;
use crate::round::ImageReference;

/// Public Unsplash API
pub const DEFAULT_API_BASE: &str = "https://api.unsplash.com";

/// Number of relevance-ranked results to pick from
pub const DEFAULT_TOP_N: usize = 10;

/// `utm_source` value for attribution links
pub const DEFAULT_APP_NAME: &str = "ai_image_hunter";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    urls: PhotoUrls,
    user: PhotoUser,
    links: PhotoLinks,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: String,
}

#[derive(Debug, Deserialize)]
struct PhotoUser {
    name: String,
    links: UserLinks,
}

#[derive(Debug, Deserialize)]
struct UserLinks {
    html: String,
}

#[derive(Debug, Deserialize)]
struct PhotoLinks {
    download_location: String,
}

/// Unsplash-backed [`ImageSourceClient`]
#[derive(Clone, Debug)]
pub struct UnsplashImageSource {
    client: Client,
    api_base: String,
    access_key: Option<String>,
    top_n: usize,
    app_name: String,
}

impl UnsplashImageSource {
    /// Create a source. Without an access key every fetch fails.
    pub fn new(api_base: &str, access_key: Option<String>, timeout: Duration) -> Self {
        let client = client_or_fallback(Client::builder().timeout(timeout).build(), "unsplash");

        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            access_key: access_key.filter(|k| !k.trim().is_empty()),
            top_n: DEFAULT_TOP_N,
            app_name: DEFAULT_APP_NAME.to_string(),
        }
    }

    /// Pick among the first `top_n` results (at least one)
    #[must_use]
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n.max(1);
        self
    }

    /// Application name used in referral links
    #[must_use]
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    fn referral_link(&self, profile: &str) -> String {
        let sep = if profile.contains('?') { '&' } else { '?' };
        format!(
            "{profile}{sep}utm_source={}&utm_medium=referral",
            self.app_name
        )
    }

    fn to_reference(&self, photo: &Photo) -> ImageReference {
        ImageReference::with_attribution(
            photo.urls.regular.clone(),
            photo.user.name.clone(),
            self.referral_link(&photo.user.links.html),
        )
    }

    /// Report the download so the photographer gets credited
    fn track_download(&self, download_location: String, access_key: String) {
        let client = self.client.clone();
        tokio::spawn(async move {
            let result = client
                .get(&download_location)
                .header("Authorization", format!("Client-ID {access_key}"))
                .header("Accept-Version", "v1")
                .send()
                .await
                .and_then(reqwest::Response::error_for_status);
            if let Err(e) = result {
                tracing::warn!(error = %e, "Failed to report Unsplash download");
            }
        });
    }
}

#[async_trait]
impl ImageSourceClient for UnsplashImageSource {
    async fn fetch(&self, subject: &SubjectEntry) -> Result<ImageReference, GameError> {
        let Some(access_key) = self.access_key.clone() else {
            return Err(GameError::SourceUnavailable(
                "no Unsplash access key configured".into(),
            ));
        };

        let per_page = self.top_n.to_string();
        let query = subject.search_query();
        let response = self
            .client
            .get(format!("{}/search/photos", self.api_base))
            .query(&[("query", query.as_str()), ("per_page", per_page.as_str())])
            .header("Authorization", format!("Client-ID {access_key}"))
            .header("Accept-Version", "v1")
            .send()
            .await
            .map_err(|e| GameError::SourceUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GameError::SourceUnavailable(format!(
                "Unsplash returned {}",
                response.status()
            )));
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| GameError::SourceUnavailable(e.to_string()))?;

        let candidates = &search.results[..search.results.len().min(self.top_n)];
        if candidates.is_empty() {
            return Err(GameError::SourceUnavailable(format!(
                "no photos found for '{query}'"
            )));
        }

        let index = rand::thread_rng().gen_range(0..candidates.len());
        let photo = &candidates[index];
        tracing::debug!(
            subject = %subject.id,
            index,
            candidates = candidates.len(),
            "Picked reference photo"
        );

        self.track_download(photo.links.download_location.clone(), access_key);
        Ok(self.to_reference(photo))
    }
}
