//! Business Plan Orchestrator
//!
//! A conversational agent that:
//! - Gathers four required startup facts through natural conversation
//! - Switches modes exactly when the profile is complete
//! - Fans out five specialist section generators concurrently
//! - Joins their output into an executive summary generated last
//! - Assembles an investor-facing business plan document
//!
//! CONVERSATION LOOP:
//! MESSAGE → EXTRACT → COMPLETE? → (ASK ONE QUESTION | GENERATE 6 SECTIONS) → REPLY

pub mod agent;
pub mod api;
pub mod error;
pub mod extractor;
pub mod generation;
pub mod models;
pub mod search;
pub mod session;
pub mod specialist;

pub use error::Result;

// Re-export common types
pub use agent::Orchestrator;
pub use models::*;
