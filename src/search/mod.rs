//! Search capability seam
//!
//! Optional dependency: specialists use live snippets when a provider is
//! configured and fall back to model-internal knowledge otherwise. The
//! no-op fallback is a first-class contract - callers never see a search
//! error, only an empty result set.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod tavily;
pub use tavily::TavilySearch;

/// One ranked search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub snippet: String,
    pub source_url: String,
}

/// Trait for web search providers. Infallible by contract: any failure
/// degrades to an empty result set.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Vec<SearchHit>;
}

/// Always-empty provider, used when no search credential is configured
/// and as a deterministic stub in tests.
pub struct NoopSearch;

#[async_trait]
impl SearchProvider for NoopSearch {
    async fn search(&self, _query: &str) -> Vec<SearchHit> {
        Vec::new()
    }
}

/// Format hits as a research-context block for specialist prompts.
/// Empty input yields an empty string so prompts stay clean without
/// live data.
pub fn format_research_context(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return String::new();
    }

    let mut block = String::from("Live research results:\n");
    for hit in hits {
        block.push_str(&format!("- {} (source: {})\n", hit.snippet, hit.source_url));
    }
    block
}
