//! External news collaborator.
//!
//! Fetches top agriculture headlines from TheNewsAPI, caching the article
//! list in-process for an hour under a single static key. The client never
//! fails its caller: a missing API key or upstream error degrades to an
//! empty list with a logged warning.
//!
//! Note the curated farming-news flow does not consult this client; it
//! exists for surfaces that want live headlines.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::NewsConfig;
use crate::error::AdvisoryError;

const SEARCH_TERMS: &str = "agriculture,farming,crops,mandi,rural";
const CACHE_KEY: &str = "farming-news";

/// One headline from the upstream feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub published_at: String,
}

#[derive(Deserialize)]
struct FeedReply {
    #[serde(default)]
    data: Vec<Headline>,
}

struct CachedFeed {
    fetched_at: Instant,
    headlines: Vec<Headline>,
}

pub struct NewsClient {
    config: NewsConfig,
    client: reqwest::Client,
    cache: Mutex<Option<CachedFeed>>,
}

impl NewsClient {
    pub fn new(config: NewsConfig) -> Result<Self, AdvisoryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AdvisoryError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            client,
            cache: Mutex::new(None),
        })
    }

    /// The latest agriculture headlines, from cache when fresh.
    pub async fn latest(&self) -> Vec<Headline> {
        if let Some(cached) = self.cached() {
            debug!(key = CACHE_KEY, "serving cached headlines");
            return cached;
        }

        let Ok(token) = std::env::var(&self.config.api_key_env) else {
            warn!(
                var = %self.config.api_key_env,
                "news API key is not set; returning no headlines"
            );
            return Vec::new();
        };

        match self.fetch(&token).await {
            Ok(headlines) => {
                let mut cache = self.cache.lock().unwrap();
                *cache = Some(CachedFeed {
                    fetched_at: Instant::now(),
                    headlines: headlines.clone(),
                });
                headlines
            }
            Err(e) => {
                warn!("news fetch failed: {e}");
                Vec::new()
            }
        }
    }

    fn cached(&self) -> Option<Vec<Headline>> {
        let cache = self.cache.lock().unwrap();
        cache.as_ref().and_then(|entry| {
            let fresh = entry.fetched_at.elapsed() < Duration::from_secs(self.config.cache_secs);
            fresh.then(|| entry.headlines.clone())
        })
    }

    async fn fetch(&self, token: &str) -> Result<Vec<Headline>, AdvisoryError> {
        let url = format!(
            "https://api.thenewsapi.com/v1/news/top?api_token={token}&search={SEARCH_TERMS}&language=en&locale=in&limit=5"
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AdvisoryError::Backend(format!("news request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdvisoryError::Backend(format!(
                "HTTP {status} from news feed"
            )));
        }

        let reply: FeedReply = response
            .json()
            .await
            .map_err(|e| AdvisoryError::Backend(format!("unreadable news reply: {e}")))?;
        Ok(reply.data)
    }
}
