//! Specialist generators
//!
//! Six fixed-persona roles, one per business plan section. Each wraps
//! the text-generation capability with its own persona and output
//! structure, and declares whether it may consult live search. Search
//! calls happen inside `generate` and are invisible to the orchestrator.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::OrchestrationError;
use crate::generation::TextGenerator;
use crate::models::{Section, SpecialistOutput, SpecialistRequest};
use crate::search::{format_research_context, SearchProvider};
use crate::Result;

/// Static definition of one specialist role
pub struct SpecialistSpec {
    pub section: Section,
    pub name: &'static str,
    pub persona: &'static str,
    pub instructions: &'static str,
    pub allows_search: bool,
    /// Topic prefix for the live-research query, combined with the
    /// startup facts at call time.
    pub search_topic: &'static str,
    pub max_words: u32,
}

const REQUEST_FORMAT_NOTE: &str = "The startup information is a single string \
in the exact format:\n\"Startup Name: [name] | Idea: [idea] | Target Market: \
[market] | Key Features: [features]\"\nDo not expect JSON objects; only \
process this single string format.";

pub const SPECIALISTS: [SpecialistSpec; 6] = [
    SpecialistSpec {
        section: Section::MarketAnalysis,
        name: "MarketAnalyst",
        persona: "You are a SaaS market analyst with 10+ years of experience \
            in software-as-a-service markets, specializing in market sizing, \
            competitive analysis, and recurring revenue businesses.",
        instructions: "Analyze the SaaS market for this startup:\n\
            1. TAM, SAM, and SOM\n\
            2. Key direct and indirect competitors\n\
            3. Market gaps and SaaS-specific opportunities\n\
            4. Customer segments and persona analysis\n\
            5. Industry trends for recurring revenue models\n\
            Respond in bullet points and structured format. Use tables for \
            market size comparisons. Focus on what matters to SaaS investors.",
        allows_search: true,
        search_topic: "market size and competitors for",
        max_words: 300,
    },
    SpecialistSpec {
        section: Section::Product,
        name: "ProductStrategist",
        persona: "You are a senior SaaS product strategist with extensive \
            experience in product development, user experience, and growth \
            metrics for recurring revenue software.",
        instructions: "Define the SaaS product strategy:\n\
            1. Core value proposition (one sentence, recurring value)\n\
            2. Main problem it solves\n\
            3. MVP features prioritized for onboarding and retention\n\
            4. Key differentiators vs competitors\n\
            5. Product roadmap (Phase 2, Phase 3) focused on retention and expansion\n\
            Respond in bullet points. Focus on customer outcomes and SaaS metrics.",
        allows_search: true,
        search_topic: "competing SaaS products for",
        max_words: 250,
    },
    SpecialistSpec {
        section: Section::BusinessModel,
        name: "BusinessModelAnalyst",
        persona: "You are a SaaS business model expert with deep expertise in \
            recurring revenue models, pricing strategies, and unit economics.",
        instructions: "Design the SaaS business model:\n\
            1. Pricing model (subscription, freemium, tiered, usage-based)\n\
            2. Suggested price tiers with feature differentiation\n\
            3. Unit economics (CAC, LTV, LTV/CAC ratio, payback period, gross margin)\n\
            4. ARR/MRR projections and growth rates\n\
            5. Break-even timeline\n\
            Respond in bullet points with tables for pricing tiers and unit \
            economics. Show the math. Be conservative.",
        allows_search: true,
        search_topic: "SaaS pricing benchmarks for",
        max_words: 250,
    },
    SpecialistSpec {
        section: Section::GoToMarket,
        name: "GoToMarketStrategist",
        persona: "You are a SaaS go-to-market strategist with extensive \
            experience in customer acquisition, retention, and expansion.",
        instructions: "Plan the go-to-market strategy:\n\
            1. Ideal Customer Profile and buyer personas\n\
            2. Primary distribution channels (2-3)\n\
            3. Phase 1 acquisition tactics (first 100 customers)\n\
            4. Phase 2 scaling strategy\n\
            5. Milestones and metrics (CAC payback, NPS, retention, expansion revenue)\n\
            Respond in bullet points. Be specific and tactical.",
        allows_search: true,
        search_topic: "go-to-market channels for SaaS like",
        max_words: 250,
    },
    SpecialistSpec {
        section: Section::Financials,
        name: "FinancialAnalyst",
        persona: "You are a SaaS financial analyst with deep expertise in \
            recurring revenue models, SaaS metrics, and financial projections.",
        instructions: "Project SaaS financials:\n\
            1. Customer growth projections (12-month conservative)\n\
            2. Monthly MRR/ARR projections\n\
            3. Operating expense estimates\n\
            4. Burn rate and runway\n\
            5. Path to profitability timeline\n\
            6. Key assumptions (CAC payback, gross margins, churn)\n\
            Respond in bullet points with tables for projections. Show \
            assumptions and math.",
        allows_search: true,
        search_topic: "SaaS financial benchmarks for",
        max_words: 250,
    },
    SpecialistSpec {
        section: Section::ExecutiveSummary,
        name: "ExecutiveSummaryWriter",
        persona: "You are a SaaS business storyteller and strategist with \
            experience presenting to investors. You understand what makes a \
            SaaS business compelling and investible.",
        instructions: "Write a one-page executive summary:\n\
            1. Problem statement (what's broken in the market)\n\
            2. Solution (clear and simple, emphasizing recurring value)\n\
            3. Market opportunity (TAM, SAM, SOM with growth)\n\
            4. Why now (timing, industry trends)\n\
            5. Why this startup will win (competitive advantage)\n\
            6. Business model and path to profitability\n\
            Use headers for each point and concise bullets. Write like a \
            journalist - clear, compelling, no jargon.",
        allows_search: false,
        search_topic: "",
        max_words: 400,
    },
];

pub fn spec_for(section: Section) -> &'static SpecialistSpec {
    SPECIALISTS
        .iter()
        .find(|s| s.section == section)
        .expect("every section has a specialist definition")
}

/// Invokes one specialist role against the shared capabilities.
/// Stateless; safe for concurrent use across sections and sessions.
pub struct SpecialistGenerator {
    generator: Arc<dyn TextGenerator>,
    search: Arc<dyn SearchProvider>,
}

impl SpecialistGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>, search: Arc<dyn SearchProvider>) -> Self {
        Self { generator, search }
    }

    /// Generate one section. `extra_context` carries the five prior
    /// section outputs when generating the executive summary.
    pub async fn generate(
        &self,
        section: Section,
        request: &SpecialistRequest,
        extra_context: Option<&str>,
    ) -> Result<SpecialistOutput> {
        let spec = spec_for(section);

        let research = if spec.allows_search {
            let query = format!("{} {}", spec.search_topic, request.as_str());
            let hits = self.search.search(&query).await;
            debug!(
                specialist = spec.name,
                hit_count = hits.len(),
                "Search completed"
            );
            format_research_context(&hits)
        } else {
            String::new()
        };

        let prompt = build_prompt(spec, request, &research, extra_context);

        let content = self.generator.complete(&prompt, spec.persona).await?;

        if content.trim().is_empty() {
            warn!(specialist = spec.name, "Specialist produced empty output");
            return Err(OrchestrationError::MalformedOutput(format!(
                "{} returned an empty section",
                spec.name
            )));
        }

        Ok(SpecialistOutput::new(section, content))
    }
}

fn build_prompt(
    spec: &SpecialistSpec,
    request: &SpecialistRequest,
    research: &str,
    extra_context: Option<&str>,
) -> String {
    let mut prompt = format!(
        "{}\n\n{}\n\nStartup information:\n{}\n",
        spec.instructions,
        REQUEST_FORMAT_NOTE,
        request.as_str()
    );

    if !research.is_empty() {
        prompt.push_str(&format!("\n{}\n", research));
    }

    if let Some(context) = extra_context {
        prompt.push_str(&format!(
            "\nPreviously generated plan sections to summarize:\n{}\n",
            context
        ));
    }

    prompt.push_str(&format!(
        "\nKeep it CONCISE (max {} words).",
        spec.max_words
    ));

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StartupProfile;
    use crate::search::NoopSearch;
    use async_trait::async_trait;

    struct EchoGenerator;

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn complete(&self, prompt: &str, _persona: &str) -> Result<String> {
            Ok(format!("generated from: {}", &prompt[..40.min(prompt.len())]))
        }
    }

    struct BlankGenerator;

    #[async_trait]
    impl TextGenerator for BlankGenerator {
        async fn complete(&self, _prompt: &str, _persona: &str) -> Result<String> {
            Ok("   ".to_string())
        }
    }

    fn request() -> SpecialistRequest {
        SpecialistRequest::from_profile(&StartupProfile {
            name: Some("Acme".into()),
            problem: Some("scheduling".into()),
            target_market: Some("SMBs".into()),
            key_features: Some("api".into()),
        })
    }

    #[test]
    fn test_every_section_has_a_specialist() {
        for section in Section::PRESENTATION_ORDER {
            let spec = spec_for(section);
            assert_eq!(spec.section, section);
            assert!(!spec.persona.is_empty());
        }
    }

    #[test]
    fn test_only_summary_is_search_free() {
        for spec in &SPECIALISTS {
            if spec.section == Section::ExecutiveSummary {
                assert!(!spec.allows_search);
            } else {
                assert!(spec.allows_search);
            }
        }
    }

    #[test]
    fn test_prompt_carries_request_and_context() {
        let spec = spec_for(Section::ExecutiveSummary);
        let prompt = build_prompt(spec, &request(), "", Some("## Market\nbig market"));
        assert!(prompt.contains("Startup Name: Acme"));
        assert!(prompt.contains("big market"));
        assert!(prompt.contains("max 400 words"));
    }

    #[tokio::test]
    async fn test_generate_produces_tagged_output() {
        let generator =
            SpecialistGenerator::new(Arc::new(EchoGenerator), Arc::new(NoopSearch));
        let output = generator
            .generate(Section::MarketAnalysis, &request(), None)
            .await
            .unwrap();

        assert_eq!(output.section, Section::MarketAnalysis);
        assert!(!output.degraded);
        assert!(output.content.starts_with("generated from:"));
    }

    #[tokio::test]
    async fn test_blank_output_is_malformed() {
        let generator =
            SpecialistGenerator::new(Arc::new(BlankGenerator), Arc::new(NoopSearch));
        let result = generator
            .generate(Section::Financials, &request(), None)
            .await;

        assert!(matches!(
            result,
            Err(OrchestrationError::MalformedOutput(_))
        ));
    }
}
