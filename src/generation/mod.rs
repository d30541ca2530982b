//! Text-generation capability seam
//!
//! The orchestrator and specialists only see this trait; the concrete
//! provider lives behind it. Failures are retryable infrastructure
//! errors, absorbed at the orchestrator boundary.

use crate::Result;
use async_trait::async_trait;

pub mod gemini;
pub use gemini::GeminiClient;

/// Trait for text generation (LLM controlled)
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for `prompt` under the given persona/system
    /// instruction. Must be safe for concurrent use by multiple sessions.
    async fn complete(&self, prompt: &str, persona: &str) -> Result<String>;
}
