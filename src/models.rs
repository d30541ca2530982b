//! Core data models for the business plan agent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//
// ================= Profile =================
//

/// The four facts required before generation may begin.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Name,
    Problem,
    TargetMarket,
    KeyFeatures,
}

impl ProfileField {
    /// Gathering order. Clarifying questions always target the first
    /// missing field in this order.
    pub const ALL: [ProfileField; 4] = [
        ProfileField::Name,
        ProfileField::Problem,
        ProfileField::TargetMarket,
        ProfileField::KeyFeatures,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ProfileField::Name => "startup name",
            ProfileField::Problem => "problem it solves",
            ProfileField::TargetMarket => "target market",
            ProfileField::KeyFeatures => "key features",
        }
    }

    /// The single clarifying question emitted for this field.
    pub fn question(&self) -> &'static str {
        match self {
            ProfileField::Name => "What is your startup called?",
            ProfileField::Problem => {
                "What does your startup do - what problem does it solve?"
            }
            ProfileField::TargetMarket => {
                "Who is your target market - who will use this?"
            }
            ProfileField::KeyFeatures => {
                "What are the key features or core capabilities of the product?"
            }
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Incrementally gathered startup facts. A field stays unset until the
/// user supplies it; a later non-empty value overwrites (explicit
/// correction wins).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartupProfile {
    pub name: Option<String>,
    pub problem: Option<String>,
    pub target_market: Option<String>,
    pub key_features: Option<String>,
}

impl StartupProfile {
    pub fn get(&self, field: ProfileField) -> Option<&str> {
        let value = match field {
            ProfileField::Name => &self.name,
            ProfileField::Problem => &self.problem,
            ProfileField::TargetMarket => &self.target_market,
            ProfileField::KeyFeatures => &self.key_features,
        };
        value.as_deref().filter(|v| !v.trim().is_empty())
    }

    fn slot_mut(&mut self, field: ProfileField) -> &mut Option<String> {
        match field {
            ProfileField::Name => &mut self.name,
            ProfileField::Problem => &mut self.problem,
            ProfileField::TargetMarket => &mut self.target_market,
            ProfileField::KeyFeatures => &mut self.key_features,
        }
    }

    /// Fields still unset, in gathering order.
    pub fn missing_fields(&self) -> Vec<ProfileField> {
        ProfileField::ALL
            .iter()
            .copied()
            .filter(|f| self.get(*f).is_none())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Merge non-empty values from `update`, returning the fields that
    /// were filled or changed by this merge.
    pub fn merge(&mut self, update: &StartupProfile) -> Vec<ProfileField> {
        let mut changed = Vec::new();
        for field in ProfileField::ALL {
            if let Some(value) = update.get(field) {
                let slot = self.slot_mut(field);
                if slot.as_deref() != Some(value) {
                    *slot = Some(value.to_string());
                    changed.push(field);
                }
            }
        }
        changed
    }
}

//
// ================= Specialist Request =================
//

/// The single pipe-joined string every specialist receives. Field values
/// are sanitized on construction so the separator never appears inside a
/// value and the four fields stay reconstructible.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpecialistRequest(String);

fn sanitize_field(value: &str) -> String {
    value.replace('|', "/").trim().to_string()
}

impl SpecialistRequest {
    /// Build from a complete profile. Callers must only invoke this once
    /// all four fields are present; unset fields render as "Not provided"
    /// so the request is still well-formed in degraded paths.
    pub fn from_profile(profile: &StartupProfile) -> Self {
        let field = |f: ProfileField| {
            profile
                .get(f)
                .map(sanitize_field)
                .unwrap_or_else(|| "Not provided".to_string())
        };

        SpecialistRequest(format!(
            "Startup Name: {} | Idea: {} | Target Market: {} | Key Features: {}",
            field(ProfileField::Name),
            field(ProfileField::Problem),
            field(ProfileField::TargetMarket),
            field(ProfileField::KeyFeatures),
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpecialistRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ================= Sections =================
//

/// The six fixed business plan sections.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    ExecutiveSummary,
    MarketAnalysis,
    Product,
    BusinessModel,
    GoToMarket,
    Financials,
}

impl Section {
    /// Presentation order. Executive Summary leads the rendered document
    /// even though it is generated last.
    pub const PRESENTATION_ORDER: [Section; 6] = [
        Section::ExecutiveSummary,
        Section::MarketAnalysis,
        Section::Product,
        Section::BusinessModel,
        Section::GoToMarket,
        Section::Financials,
    ];

    /// The five order-independent sections, generated concurrently before
    /// the summary.
    pub const INDEPENDENT: [Section; 5] = [
        Section::MarketAnalysis,
        Section::Product,
        Section::BusinessModel,
        Section::GoToMarket,
        Section::Financials,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            Section::ExecutiveSummary => "Executive Summary",
            Section::MarketAnalysis => "Market Analysis & Opportunity",
            Section::Product => "Product & Solution",
            Section::BusinessModel => "Business Model & Revenue Strategy",
            Section::GoToMarket => "Go-To-Market Strategy",
            Section::Financials => "Financial Projections & Unit Economics",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header())
    }
}

//
// ================= Specialist Output =================
//

/// One generated section. Immutable once produced; `degraded` marks a
/// placeholder substituted after repeated capability failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialistOutput {
    pub section: Section,
    pub content: String,
    pub degraded: bool,
    pub generated_at: DateTime<Utc>,
}

impl SpecialistOutput {
    pub fn new(section: Section, content: String) -> Self {
        Self {
            section,
            content,
            degraded: false,
            generated_at: Utc::now(),
        }
    }

    pub fn placeholder(section: Section) -> Self {
        Self {
            section,
            content: format!(
                "_This section could not be generated because the content \
                 service was unavailable. Please regenerate the plan to fill \
                 in the {} section._",
                section.header()
            ),
            degraded: true,
            generated_at: Utc::now(),
        }
    }
}

//
// ================= Document =================
//

/// Completed business plan: exactly six sections in presentation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessPlanDocument {
    pub startup_name: String,
    pub sections: Vec<SpecialistOutput>,
    pub created_at: DateTime<Utc>,
}

impl BusinessPlanDocument {
    /// Assemble from the six outputs, reordering into presentation order.
    /// Fails if any section is absent; partial documents are never
    /// delivered.
    pub fn assemble(
        startup_name: String,
        mut outputs: Vec<SpecialistOutput>,
    ) -> crate::Result<Self> {
        let mut ordered = Vec::with_capacity(Section::PRESENTATION_ORDER.len());
        for section in Section::PRESENTATION_ORDER {
            let position = outputs
                .iter()
                .position(|o| o.section == section)
                .ok_or_else(|| {
                    crate::error::OrchestrationError::IncompleteDocument(format!(
                        "missing section: {}",
                        section.header()
                    ))
                })?;
            ordered.push(outputs.swap_remove(position));
        }

        Ok(Self {
            startup_name,
            sections: ordered,
            created_at: Utc::now(),
        })
    }

    pub fn is_degraded(&self) -> bool {
        self.sections.iter().any(|s| s.degraded)
    }

    /// Render as structured markdown with the six fixed headers.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# Business Plan: {}\n\n", self.startup_name));

        for output in &self.sections {
            out.push_str(&format!("## {}\n\n", output.section.header()));
            out.push_str(output.content.trim());
            out.push_str("\n\n");
        }

        if self.is_degraded() {
            out.push_str(
                "---\n_One or more sections could not be generated and were \
                 replaced with placeholders._\n",
            );
        }

        out
    }
}

//
// ================= Conversation =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Agent,
    Tool,
}

/// A single message in the session transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub message_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub role: MessageRole,
    pub content: String,
}

impl ConversationMessage {
    pub fn new(role: MessageRole, content: String) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            role,
            content,
        }
    }
}

/// Orchestrator phase for one session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Gathering,
    Generating,
    Done,
}

/// Per-session conversation state: append-only transcript plus the
/// current profile and phase. Owned exclusively by the orchestrator for
/// the lifetime of the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub session_id: Uuid,
    pub phase: Phase,
    pub profile: StartupProfile,
    messages: Vec<ConversationMessage>,
    pub created_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            phase: Phase::Gathering,
            profile: StartupProfile::default(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn push(&mut self, role: MessageRole, content: String) {
        self.messages.push(ConversationMessage::new(role, content));
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    /// Recent transcript formatted for LLM prompts.
    pub fn formatted_context(&self, recent: usize) -> String {
        let start = self.messages.len().saturating_sub(recent);
        let mut context = String::new();
        for msg in &self.messages[start..] {
            let role = match msg.role {
                MessageRole::User => "User",
                MessageRole::Agent => "Agent",
                MessageRole::Tool => "Tool",
            };
            context.push_str(&format!("{}: {}\n", role, msg.content));
        }
        context
    }

    /// Reset for a fresh plan after a delivered document.
    pub fn reset_profile(&mut self) {
        self.profile = StartupProfile::default();
        self.phase = Phase::Gathering;
    }
}

//
// ================= Agent Reply =================
//

/// What the orchestrator hands back to the session boundary: either one
/// clarifying question or a complete rendered plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentReply {
    Question { text: String },
    Plan { document: BusinessPlanDocument },
}

impl AgentReply {
    /// Flatten into the text the user sees.
    pub fn render(&self) -> String {
        match self {
            AgentReply::Question { text } => text.clone(),
            AgentReply::Plan { document } => document.render(),
        }
    }
}
