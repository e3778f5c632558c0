use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use forumsage_core::config::SynthesisSettings;
use forumsage_core::error::CallError;
use forumsage_core::traits::Synthesizer;
use forumsage_core::types::{ResponderOutput, SynthesisInput, SynthesisRequest};

pub const NO_RESPONSES_MESSAGE: &str = "No specialist responses available for synthesis.";
const FALLBACK_HEADING: &str = "# Multi-Agent Analysis";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisSource {
    /// No responder answered; the fixed message was used.
    Empty,
    Remote,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Synthesis {
    pub overall_confidence: f64,
    pub text: String,
    pub source: SynthesisSource,
}

/// Turns responder outputs into one confidence and one answer text.
pub struct Aggregator {
    synthesizer: Option<Arc<dyn Synthesizer>>,
    timeout: Duration,
    instructions: String,
}

impl Default for Aggregator {
    fn default() -> Self {
        let settings = SynthesisSettings::default();
        Self { synthesizer: None, timeout: settings.timeout(), instructions: settings.instructions }
    }
}

impl Aggregator {
    /// Aggregator that always uses the local synthesis.
    pub fn local() -> Self {
        Self::default()
    }

    pub fn from_settings(
        settings: &SynthesisSettings,
        synthesizer: Option<Arc<dyn Synthesizer>>,
    ) -> Self {
        Self {
            synthesizer: synthesizer.filter(|_| settings.enabled),
            timeout: settings.timeout(),
            instructions: settings.instructions.clone(),
        }
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn combine(&self, question: &str, outputs: &[ResponderOutput]) -> Synthesis {
        if outputs.is_empty() {
            return Synthesis {
                overall_confidence: 0.0,
                text: NO_RESPONSES_MESSAGE.to_string(),
                source: SynthesisSource::Empty,
            };
        }
        let overall_confidence = weighted_confidence(outputs);

        if let Some(synthesizer) = &self.synthesizer {
            match self.remote(synthesizer.as_ref(), question, outputs).await {
                Ok(text) => {
                    return Synthesis { overall_confidence, text, source: SynthesisSource::Remote };
                }
                Err(e) => warn!(error = %e, "remote synthesis failed; using local synthesis"),
            }
        }
        Synthesis {
            overall_confidence,
            text: fallback_synthesis(outputs),
            source: SynthesisSource::Fallback,
        }
    }

    async fn remote(
        &self,
        synthesizer: &dyn Synthesizer,
        question: &str,
        outputs: &[ResponderOutput],
    ) -> Result<String, CallError> {
        let request = SynthesisRequest {
            question: question.to_string(),
            responses: outputs
                .iter()
                .map(|o| SynthesisInput {
                    responder: o.responder,
                    response: o.response.clone(),
                    confidence: o.confidence,
                    reasoning: o.reasoning.clone(),
                })
                .collect(),
            instructions: self.instructions.clone(),
        };
        debug!(responses = request.responses.len(), "requesting remote synthesis");
        let text = tokio::time::timeout(self.timeout, synthesizer.synthesize(&request))
            .await
            .map_err(|_| CallError::Timeout(self.timeout))??;
        if text.trim().is_empty() {
            return Err(CallError::Malformed("empty synthesis".to_string()));
        }
        Ok(text)
    }
}

/// Weighted mean of the confidences present, renormalized over the
/// responders that actually answered. 0.0 for no outputs.
pub fn weighted_confidence(outputs: &[ResponderOutput]) -> f64 {
    let (weighted, total) = outputs.iter().fold((0.0, 0.0), |(sum, weights), o| {
        let w = o.responder.weight();
        (sum + o.confidence * w, weights + w)
    });
    if total > 0.0 { weighted / total } else { 0.0 }
}

/// Deterministic markdown synthesis: one section per output, in input order.
pub fn fallback_synthesis(outputs: &[ResponderOutput]) -> String {
    if outputs.is_empty() {
        return NO_RESPONSES_MESSAGE.to_string();
    }
    let mut lines = vec![format!("{}\n", FALLBACK_HEADING)];
    for output in outputs {
        lines.push(format!("## {} Perspective", output.responder.label()));
        lines.push(format!("**Confidence:** {:.2}", output.confidence));
        lines.push(format!("**Response:** {}", output.response));
        if let Some(reasoning) = output.reasoning.as_deref().filter(|r| !r.is_empty()) {
            lines.push(format!("**Reasoning:** {}", reasoning));
        }
        lines.push(String::new());
    }
    lines.join("\n")
}
