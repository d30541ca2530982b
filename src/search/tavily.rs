//! Tavily search adapter
//!
//! Calls the Tavily REST API for ranked snippets with source URLs.
//! Unconfigured or failing requests degrade to an empty result set; the
//! pipeline proceeds on model-internal knowledge.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::search::{SearchHit, SearchProvider};

const MAX_RESULTS: u32 = 5;

pub struct TavilySearch {
    client: Client,
    api_key: String,
    base_url: String,
}

impl TavilySearch {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url: "https://api.tavily.com/search".to_string(),
        }
    }

    /// Build from environment; None when no credential is set.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("TAVILY_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        Some(Self::new(api_key))
    }

    #[cfg(test)]
    fn with_base_url(api_key: String, base_url: String) -> Self {
        let mut this = Self::new(api_key);
        this.base_url = base_url;
        this
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    async fn search(&self, query: &str) -> Vec<SearchHit> {
        if self.api_key.is_empty() {
            return Vec::new();
        }

        let request = TavilyRequest {
            api_key: self.api_key.clone(),
            query: query.to_string(),
            max_results: MAX_RESULTS,
            search_depth: "basic".to_string(),
        };

        debug!(query = %query, "Calling Tavily search");

        let response = match self.client.post(&self.base_url).json(&request).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Tavily request failed, continuing without live data: {}", e);
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            warn!(
                status = %response.status(),
                "Tavily returned an error status, continuing without live data"
            );
            return Vec::new();
        }

        let body: TavilyResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to parse Tavily response, continuing without live data: {}", e);
                return Vec::new();
            }
        };

        body.results
            .into_iter()
            .map(|r| SearchHit {
                snippet: r.content,
                source_url: r.url,
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest {
    api_key: String,
    query: String,
    max_results: u32,
    search_depth: String,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    url: String,
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_provider_degrades_to_empty() {
        let search = TavilySearch::with_base_url(
            "test-key".into(),
            "http://127.0.0.1:9".into(),
        );
        let hits = search.search("saas competitors").await;
        assert!(hits.is_empty());
    }

    #[test]
    fn test_response_parsing_tolerates_missing_results() {
        let body: TavilyResponse = serde_json::from_str("{}").unwrap();
        assert!(body.results.is_empty());
    }
}
