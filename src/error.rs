//! Error types for the business plan orchestrator

use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

#[derive(Error, Debug)]
pub enum OrchestrationError {

    // =============================
    // Core Pipeline Errors
    // =============================

    #[error("Text generation unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("Malformed specialist output: {0}")]
    MalformedOutput(String),

    #[error("Field extraction error: {0}")]
    ExtractionError(String),

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Incomplete document: {0}")]
    IncompleteDocument(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("UUID parse error: {0}")]
    UuidError(#[from] uuid::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
