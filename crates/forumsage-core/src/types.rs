//! Domain types shared by the corpus, responder and pipeline crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;

/// One harvested discussion thread.
///
/// - `thread_id`: forum-assigned identifier
/// - `body`: the scraped post text (`content` in the scraper output)
/// - `category`: label assigned by the scraper, if any
/// - `success`: whether the scrape of this thread completed
///
/// Records are loaded once and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadRecord {
    pub thread_id: String,
    pub title: String,
    #[serde(alias = "content")]
    pub body: String,
    pub author: String,
    pub url: String,
    pub category: String,
    pub post_count: u64,
    pub view_count: u64,
    pub last_activity: String,
    pub success: bool,
}

/// A corpus record matched by a query. `score` is non-negative and higher
/// is better; `category` is derived from the body at query time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceHit {
    pub thread: Arc<ThreadRecord>,
    pub score: f64,
    pub category: String,
}

/// The closed set of specialist roles consulted per question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponderType {
    Researcher,
    Analyst,
    TechnicalExpert,
    BusinessConsultant,
    SafetySpecialist,
    Synthesizer,
}

impl ResponderType {
    /// Roles consulted by default. Their weights sum to 1.0.
    pub const SPECIALISTS: [ResponderType; 5] = [
        ResponderType::Researcher,
        ResponderType::Analyst,
        ResponderType::TechnicalExpert,
        ResponderType::BusinessConsultant,
        ResponderType::SafetySpecialist,
    ];

    pub const ALL: [ResponderType; 6] = [
        ResponderType::Researcher,
        ResponderType::Analyst,
        ResponderType::TechnicalExpert,
        ResponderType::BusinessConsultant,
        ResponderType::SafetySpecialist,
        ResponderType::Synthesizer,
    ];

    /// Wire name, as sent to the responder endpoint.
    pub fn as_str(self) -> &'static str {
        match self {
            ResponderType::Researcher => "researcher",
            ResponderType::Analyst => "analyst",
            ResponderType::TechnicalExpert => "technical_expert",
            ResponderType::BusinessConsultant => "business_consultant",
            ResponderType::SafetySpecialist => "safety_specialist",
            ResponderType::Synthesizer => "synthesizer",
        }
    }

    /// Human-readable title, used in section headings.
    pub fn label(self) -> &'static str {
        match self {
            ResponderType::Researcher => "Researcher",
            ResponderType::Analyst => "Analyst",
            ResponderType::TechnicalExpert => "Technical Expert",
            ResponderType::BusinessConsultant => "Business Consultant",
            ResponderType::SafetySpecialist => "Safety Specialist",
            ResponderType::Synthesizer => "Synthesizer",
        }
    }

    /// Static aggregation weight.
    pub fn weight(self) -> f64 {
        match self {
            ResponderType::Researcher => 0.25,
            ResponderType::Analyst => 0.20,
            ResponderType::TechnicalExpert => 0.25,
            ResponderType::BusinessConsultant => 0.15,
            ResponderType::SafetySpecialist => 0.15,
            ResponderType::Synthesizer => 0.10,
        }
    }

    pub fn system_prompt(self) -> &'static str {
        match self {
            ResponderType::Researcher => {
                "You are a cannabis research specialist. Analyze the provided forum \
                 discussions and give comprehensive, research-based insights."
            }
            ResponderType::Analyst => {
                "You are a cannabis industry analyst. Identify trends, patterns and \
                 insights in the community discussions."
            }
            ResponderType::TechnicalExpert => {
                "You are a cannabis technical expert. Give detailed technical guidance \
                 grounded in the forum discussions and industry practice."
            }
            ResponderType::BusinessConsultant => {
                "You are a cannabis business consultant. Give business insight, market \
                 analysis and regulatory guidance based on the community discussions."
            }
            ResponderType::SafetySpecialist => {
                "You are a cannabis safety specialist. Focus on safety protocols, risk \
                 assessment and safe practice drawn from the community discussions."
            }
            ResponderType::Synthesizer => {
                "You are a synthesis specialist. Combine the perspectives found in the \
                 community discussions into one balanced answer."
            }
        }
    }
}

impl fmt::Display for ResponderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['-', ' '], "_");
        ResponderType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown responder type '{}'", s)))
    }
}

/// A single specialist's answer to one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponderOutput {
    pub responder: ResponderType,
    pub response: String,
    pub confidence: f64,
    pub sources: Vec<String>,
    #[serde(with = "secs")]
    pub elapsed: Duration,
    pub reasoning: Option<String>,
}

/// Pipeline position. `Failed` is terminal and reachable from any stage
/// before `Synthesizing` completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Init,
    Searching,
    Dispatching,
    Synthesizing,
    Done,
    Failed,
}

/// Everything produced for one question. `steps` is never empty and
/// `overall_confidence` is 0.0 whenever `outputs` is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub question: String,
    pub hits: Vec<RelevanceHit>,
    pub outputs: Vec<ResponderOutput>,
    pub synthesized: String,
    pub overall_confidence: f64,
    #[serde(with = "secs")]
    pub elapsed: Duration,
    pub steps: Vec<String>,
    pub stage: PipelineStage,
}

/// Generation limits forwarded to every responder call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationLimits {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationLimits {
    fn default() -> Self {
        Self { max_tokens: 800, temperature: 0.7 }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponderRequest {
    #[serde(rename = "agent_type")]
    pub responder: ResponderType,
    pub question: String,
    pub context: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// What a responder endpoint returns on success.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResponderReply {
    pub response: String,
    pub confidence: f64,
    pub sources: Vec<String>,
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SynthesisInput {
    #[serde(rename = "agent_type")]
    pub responder: ResponderType,
    pub response: String,
    pub confidence: f64,
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SynthesisRequest {
    pub question: String,
    #[serde(rename = "agent_responses")]
    pub responses: Vec<SynthesisInput>,
    #[serde(rename = "synthesis_instructions")]
    pub instructions: String,
}

/// Serde adapter storing a `Duration` as fractional seconds.
pub mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let v = f64::deserialize(d)?;
        Duration::try_from_secs_f64(v).map_err(serde::de::Error::custom)
    }
}
