//! Main orchestrator - the conversation state machine
//!
//! GATHERING → GENERATING → DONE
//!
//! Gathers the four required startup facts through conversation, then
//! runs the six specialist generators and assembles the business plan.
//! The five order-independent specialists fan out concurrently; the
//! executive summary joins on their outputs and runs last.

use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::extractor::FieldExtractor;
use crate::models::{
    AgentReply, BusinessPlanDocument, ConversationState, MessageRole, Phase, ProfileField,
    Section, SpecialistOutput, SpecialistRequest, StartupProfile,
};
use crate::session::SessionStore;
use crate::specialist::{spec_for, SpecialistGenerator};
use crate::Result;

const WELCOME: &str = "Welcome to the Business Plan Generator! I'll help you \
create a comprehensive SaaS business plan. Tell me about your startup idea and \
I'll gather the details we need.";

/// Coordinates the conversation flow and the generation pipeline.
/// Safe for concurrent use across sessions; within one session, turns
/// are serialized by the session lock.
pub struct Orchestrator {
    extractor: Arc<dyn FieldExtractor>,
    specialists: Arc<SpecialistGenerator>,
    sessions: Arc<dyn SessionStore>,
}

impl Orchestrator {
    pub fn new(
        extractor: Arc<dyn FieldExtractor>,
        specialists: Arc<SpecialistGenerator>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            extractor,
            specialists,
            sessions,
        }
    }

    /// Handle one user message for one session. Returns either a single
    /// clarifying question or a complete rendered plan - never a raw
    /// failure.
    pub async fn handle_user_message(
        &self,
        session_id: Uuid,
        text: &str,
    ) -> Result<AgentReply> {
        let (handle, created) = self.sessions.get_or_create(session_id).await?;

        // Held for the full turn: no interleaving of two turns of the
        // same session.
        let mut state = handle.lock().await;

        info!(
            session_id = %session_id,
            phase = ?state.phase,
            "Handling user message"
        );

        state.push(MessageRole::User, text.to_string());

        // A message after a delivered plan starts a fresh profile.
        if state.phase == Phase::Done {
            debug!(session_id = %session_id, "Session done - starting fresh profile");
            state.reset_profile();
        }

        // Extraction failure is absorbed: we stay in GATHERING and
        // re-ask rather than surface an error to the user.
        let update = match self.extractor.extract(&state, text).await {
            Ok(update) => update,
            Err(e) => {
                warn!("Field extraction failed, treating message as uninformative: {}", e);
                StartupProfile::default()
            }
        };

        let received = state.profile.merge(&update);

        if !state.profile.is_complete() {
            let reply = gathering_reply(created, &received, &state.profile);
            state.push(MessageRole::Agent, reply.clone());
            return Ok(AgentReply::Question { text: reply });
        }

        // The message that completes the fourth field triggers the one
        // GATHERING → GENERATING transition for this profile.
        info!(session_id = %session_id, "Profile complete - generating business plan");
        state.phase = Phase::Generating;

        let profile = state.profile.clone();
        let document = self.generate_document(&profile, &mut state).await?;

        state.push(MessageRole::Agent, document.render());
        state.phase = Phase::Done;

        Ok(AgentReply::Plan { document })
    }

    /// Run the specialist pipeline: five concurrent section generators,
    /// then the executive summary over their combined output. Individual
    /// failures degrade to placeholder sections; the pipeline never
    /// aborts the whole document.
    async fn generate_document(
        &self,
        profile: &StartupProfile,
        state: &mut ConversationState,
    ) -> Result<BusinessPlanDocument> {
        let request = SpecialistRequest::from_profile(profile);

        let mut join_set = JoinSet::new();

        for section in Section::INDEPENDENT {
            let specialists = Arc::clone(&self.specialists);
            let request = request.clone();

            join_set.spawn(async move {
                let output = generate_with_retry(&specialists, section, &request, None).await;
                (section, output)
            });
        }

        let mut outputs: Vec<SpecialistOutput> = Vec::with_capacity(6);

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((section, output)) => {
                    state.push(
                        MessageRole::Tool,
                        format!(
                            "{} completed ({})",
                            spec_for(section).name,
                            if output.degraded { "placeholder" } else { "ok" }
                        ),
                    );
                    outputs.push(output);
                }
                Err(e) => {
                    // A panicked task loses its section marker; recover it
                    // below by filling any absent section with a placeholder.
                    warn!("Specialist task failed to join: {}", e);
                }
            }
        }

        for section in Section::INDEPENDENT {
            if !outputs.iter().any(|o| o.section == section) {
                outputs.push(SpecialistOutput::placeholder(section));
            }
        }

        // Executive summary is the one order-dependent step: it
        // summarizes the other five, so it must run after the join.
        let summary_context = summary_context(&outputs);
        let summary = generate_with_retry(
            &self.specialists,
            Section::ExecutiveSummary,
            &request,
            Some(&summary_context),
        )
        .await;
        state.push(
            MessageRole::Tool,
            format!(
                "{} completed ({})",
                spec_for(Section::ExecutiveSummary).name,
                if summary.degraded { "placeholder" } else { "ok" }
            ),
        );
        outputs.push(summary);

        let startup_name = profile
            .get(ProfileField::Name)
            .unwrap_or("Untitled Startup")
            .to_string();

        BusinessPlanDocument::assemble(startup_name, outputs)
    }
}

/// One retry per specialist call, then a clearly labeled placeholder.
async fn generate_with_retry(
    specialists: &SpecialistGenerator,
    section: Section,
    request: &SpecialistRequest,
    extra_context: Option<&str>,
) -> SpecialistOutput {
    match specialists.generate(section, request, extra_context).await {
        Ok(output) => output,
        Err(first_error) => {
            warn!(
                section = %section,
                error = %first_error,
                "Specialist call failed - retrying once"
            );

            match specialists.generate(section, request, extra_context).await {
                Ok(output) => output,
                Err(second_error) => {
                    warn!(
                        section = %section,
                        error = %second_error,
                        "Specialist retry failed - substituting placeholder"
                    );
                    SpecialistOutput::placeholder(section)
                }
            }
        }
    }
}

/// Concatenate the five generated sections as context for the summary,
/// in generation order.
fn summary_context(outputs: &[SpecialistOutput]) -> String {
    let mut context = String::new();
    for section in Section::INDEPENDENT {
        if let Some(output) = outputs.iter().find(|o| o.section == section) {
            context.push_str(&format!("## {}\n{}\n\n", section.header(), output.content));
        }
    }
    context
}

/// Compose the gathering-mode reply: acknowledge fields just received,
/// then ask exactly one question for the next missing field.
fn gathering_reply(
    new_session: bool,
    received: &[ProfileField],
    profile: &StartupProfile,
) -> String {
    let mut reply = String::new();

    if new_session {
        reply.push_str(WELCOME);
        reply.push_str("\n\n");
    }

    if !received.is_empty() {
        let labels: Vec<&str> = received.iter().map(|f| f.label()).collect();
        reply.push_str(&format!("Got it - noted the {}. ", labels.join(" and ")));
    }

    // One question per turn, targeting the first missing field.
    if let Some(next) = profile.missing_fields().first() {
        reply.push_str(next.question());
    }

    reply
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::KeywordExtractor;
    use crate::generation::TextGenerator;
    use crate::search::NoopSearch;
    use crate::session::InMemorySessionStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Deterministic generator: replies with a fixed body derived from
    /// the persona, so two runs yield structurally identical documents.
    struct StubGenerator;

    #[async_trait]
    impl TextGenerator for StubGenerator {
        async fn complete(&self, _prompt: &str, persona: &str) -> Result<String> {
            Ok(format!("Section content by: {}", &persona[..20]))
        }
    }

    /// Fails the first `failures` calls whose persona matches `marker`,
    /// succeeds otherwise.
    struct FlakyGenerator {
        marker: &'static str,
        failures: u32,
        seen: AtomicU32,
    }

    impl FlakyGenerator {
        fn new(marker: &'static str, failures: u32) -> Self {
            Self {
                marker,
                failures,
                seen: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for FlakyGenerator {
        async fn complete(&self, _prompt: &str, persona: &str) -> Result<String> {
            if persona.contains(self.marker) {
                let attempt = self.seen.fetch_add(1, Ordering::SeqCst);
                if attempt < self.failures {
                    return Err(crate::error::OrchestrationError::GenerationUnavailable(
                        "stub outage".to_string(),
                    ));
                }
            }
            Ok("Generated section content".to_string())
        }
    }

    fn orchestrator_with(generator: Arc<dyn TextGenerator>) -> Orchestrator {
        let specialists = Arc::new(SpecialistGenerator::new(generator, Arc::new(NoopSearch)));
        Orchestrator::new(
            Arc::new(KeywordExtractor),
            specialists,
            Arc::new(InMemorySessionStore::new()),
        )
    }

    fn question_text(reply: &AgentReply) -> &str {
        match reply {
            AgentReply::Question { text } => text,
            AgentReply::Plan { .. } => panic!("expected a question"),
        }
    }

    fn plan_document(reply: AgentReply) -> BusinessPlanDocument {
        match reply {
            AgentReply::Plan { document } => document,
            AgentReply::Question { text } => panic!("expected a plan, got: {}", text),
        }
    }

    #[tokio::test]
    async fn test_stays_gathering_until_complete() {
        let orchestrator = orchestrator_with(Arc::new(StubGenerator));
        let session = Uuid::new_v4();

        let reply = orchestrator
            .handle_user_message(session, "name: Acme")
            .await
            .unwrap();
        assert!(question_text(&reply).contains("problem"));

        let reply = orchestrator
            .handle_user_message(session, "problem: meeting scheduling chaos")
            .await
            .unwrap();
        assert!(question_text(&reply).contains("target market"));

        let reply = orchestrator
            .handle_user_message(session, "market: SMBs")
            .await
            .unwrap();
        assert!(question_text(&reply).contains("key features"));

        // Fourth field completes the profile and triggers generation.
        let reply = orchestrator
            .handle_user_message(session, "features: calendar api")
            .await
            .unwrap();
        let document = plan_document(reply);
        assert_eq!(document.sections.len(), 6);
        assert_eq!(document.startup_name, "Acme");
    }

    #[tokio::test]
    async fn test_one_question_per_turn_names_next_missing_field() {
        let orchestrator = orchestrator_with(Arc::new(StubGenerator));
        let session = Uuid::new_v4();

        let reply = orchestrator
            .handle_user_message(session, "name: Acme, market: SMBs")
            .await
            .unwrap();

        let text = question_text(&reply);
        // Exactly one question mark: one clarifying question per turn
        assert_eq!(text.matches('?').count(), 1);
        // It targets the next missing field in gathering order (problem),
        // not one already provided.
        assert!(text.contains("problem"));
        assert!(!text.contains(ProfileField::KeyFeatures.question()));
    }

    #[tokio::test]
    async fn test_scenario_partial_then_complete() {
        let orchestrator = orchestrator_with(Arc::new(StubGenerator));
        let session = Uuid::new_v4();

        // name, problem, key_features present; target_market missing
        let reply = orchestrator
            .handle_user_message(
                session,
                "name: Acme, problem: scheduling, key features: api",
            )
            .await
            .unwrap();
        let text = question_text(&reply);
        assert!(text.contains("target market"));

        // Unlabeled follow-up answers the pending question
        let reply = orchestrator
            .handle_user_message(session, "SMBs")
            .await
            .unwrap();
        let document = plan_document(reply);

        let order: Vec<Section> = document.sections.iter().map(|s| s.section).collect();
        assert_eq!(order, Section::PRESENTATION_ORDER.to_vec());
        assert!(!document.is_degraded());
    }

    #[tokio::test]
    async fn test_deterministic_stub_yields_identical_structure() {
        let orchestrator = orchestrator_with(Arc::new(StubGenerator));

        let mut documents = Vec::new();
        for _ in 0..2 {
            let session = Uuid::new_v4();
            let reply = orchestrator
                .handle_user_message(
                    session,
                    "name: Acme, problem: scheduling, market: SMBs, features: api",
                )
                .await
                .unwrap();
            documents.push(plan_document(reply));
        }

        let first: Vec<(Section, &str)> = documents[0]
            .sections
            .iter()
            .map(|s| (s.section, s.content.as_str()))
            .collect();
        let second: Vec<(Section, &str)> = documents[1]
            .sections
            .iter()
            .map(|s| (s.section, s.content.as_str()))
            .collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_empty_search_still_produces_all_sections() {
        // NoopSearch is the always-empty stub; the pipeline must not
        // depend on live data.
        let orchestrator = orchestrator_with(Arc::new(StubGenerator));
        let reply = orchestrator
            .handle_user_message(
                Uuid::new_v4(),
                "name: Acme, problem: scheduling, market: SMBs, features: api",
            )
            .await
            .unwrap();

        let document = plan_document(reply);
        assert_eq!(document.sections.len(), 6);
        assert!(!document.is_degraded());
    }

    #[tokio::test]
    async fn test_single_failure_recovers_on_retry() {
        let generator = Arc::new(FlakyGenerator::new("financial analyst", 1));
        let orchestrator = orchestrator_with(generator);

        let reply = orchestrator
            .handle_user_message(
                Uuid::new_v4(),
                "name: Acme, problem: scheduling, market: SMBs, features: api",
            )
            .await
            .unwrap();

        let document = plan_document(reply);
        let financials = document
            .sections
            .iter()
            .find(|s| s.section == Section::Financials)
            .unwrap();
        assert!(!financials.degraded);
        assert_eq!(financials.content, "Generated section content");
    }

    #[tokio::test]
    async fn test_double_failure_substitutes_placeholder() {
        let generator = Arc::new(FlakyGenerator::new("financial analyst", 2));
        let orchestrator = orchestrator_with(generator);

        let reply = orchestrator
            .handle_user_message(
                Uuid::new_v4(),
                "name: Acme, problem: scheduling, market: SMBs, features: api",
            )
            .await
            .unwrap();

        let document = plan_document(reply);
        assert!(document.is_degraded());

        for output in &document.sections {
            if output.section == Section::Financials {
                assert!(output.degraded);
            } else {
                assert!(!output.degraded, "{} degraded", output.section.header());
            }
        }
    }

    #[tokio::test]
    async fn test_done_resets_to_gathering() {
        let orchestrator = orchestrator_with(Arc::new(StubGenerator));
        let session = Uuid::new_v4();

        let reply = orchestrator
            .handle_user_message(
                session,
                "name: Acme, problem: scheduling, market: SMBs, features: api",
            )
            .await
            .unwrap();
        assert!(matches!(reply, AgentReply::Plan { .. }));

        // A new request after DONE starts a fresh profile.
        let reply = orchestrator
            .handle_user_message(session, "let's plan another startup")
            .await
            .unwrap();
        let text = question_text(&reply);
        assert!(text.contains(ProfileField::Problem.question()) || text.contains("problem"));
    }
}
