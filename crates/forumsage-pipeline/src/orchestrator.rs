use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use forumsage_agents::{ResponderPool, SpecialistClient};
use forumsage_core::config::Settings;
use forumsage_core::error::Result;
use forumsage_core::traits::Synthesizer;
use forumsage_core::types::{PipelineResult, PipelineStage, RelevanceHit, ResponderOutput};
use forumsage_corpus::CorpusIndex;

use crate::aggregate::{Aggregator, Synthesis, SynthesisSource};

pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Runs one question through search, specialist dispatch and aggregation.
///
/// `process` never fails: internal errors and panics come back as a
/// `PipelineResult` in the `Failed` stage. The orchestrator holds no
/// per-question state and can serve concurrent questions through `&self`.
pub struct Orchestrator {
    corpus: Arc<CorpusIndex>,
    pool: ResponderPool,
    aggregator: Aggregator,
    max_results: usize,
}

struct Trace {
    stage: PipelineStage,
    steps: Vec<String>,
}

impl Trace {
    fn new() -> Self {
        Self { stage: PipelineStage::Init, steps: Vec::new() }
    }

    fn enter(&mut self, stage: PipelineStage, step: impl Into<String>) {
        self.stage = stage;
        self.note(step);
    }

    fn note(&mut self, step: impl Into<String>) {
        let step = step.into();
        info!(stage = ?self.stage, "{}", step);
        self.steps.push(step);
    }
}

struct Completed {
    hits: Vec<RelevanceHit>,
    outputs: Vec<ResponderOutput>,
    synthesis: Synthesis,
}

impl Orchestrator {
    pub fn new(corpus: Arc<CorpusIndex>, pool: ResponderPool, aggregator: Aggregator) -> Self {
        Self { corpus, pool, aggregator, max_results: DEFAULT_MAX_RESULTS }
    }

    /// Wire the remote specialist service from settings. The corpus is
    /// loaded by the caller so that it can be shared between orchestrators.
    pub fn from_settings(settings: &Settings, corpus: Arc<CorpusIndex>) -> Self {
        let responders = &settings.responders;
        let client = Arc::new(SpecialistClient::new(&responders.base_url, &responders.api_key));
        let pool = ResponderPool::remote(responders, Arc::clone(&client));
        let synthesizer: Arc<dyn Synthesizer> = client;
        let aggregator = Aggregator::from_settings(&settings.synthesis, Some(synthesizer));
        Self::new(corpus, pool, aggregator).with_max_results(settings.corpus.max_results)
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn corpus(&self) -> &CorpusIndex {
        &self.corpus
    }

    pub fn pool(&self) -> &ResponderPool {
        &self.pool
    }

    pub async fn process(&self, question: &str) -> PipelineResult {
        let started = Instant::now();
        let mut trace = Trace::new();

        let outcome = AssertUnwindSafe(self.run(question, &mut trace)).catch_unwind().await;
        let failure = match outcome {
            Ok(Ok(done)) => {
                return PipelineResult {
                    question: question.to_string(),
                    hits: done.hits,
                    outputs: done.outputs,
                    synthesized: done.synthesis.text,
                    overall_confidence: done.synthesis.overall_confidence,
                    elapsed: started.elapsed(),
                    steps: trace.steps,
                    stage: PipelineStage::Done,
                };
            }
            Ok(Err(e)) => e.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };

        error!(failed_at = ?trace.stage, error = %failure, "question processing failed");
        trace.steps.push(format!("Error: {}", failure));
        PipelineResult {
            question: question.to_string(),
            hits: Vec::new(),
            outputs: Vec::new(),
            synthesized: format!("Error processing question: {}", failure),
            overall_confidence: 0.0,
            elapsed: started.elapsed(),
            steps: trace.steps,
            stage: PipelineStage::Failed,
        }
    }

    async fn run(&self, question: &str, trace: &mut Trace) -> Result<Completed> {
        trace.enter(PipelineStage::Searching, "Searching corpus for relevant threads...");
        let hits = self.corpus.search(question, self.max_results)?;
        trace.note(format!("Found {} relevant threads", hits.len()));

        let dispatched = self.pool.len();
        trace.enter(
            PipelineStage::Dispatching,
            format!("Dispatching to {} specialist responders...", dispatched),
        );
        let outputs = self.pool.dispatch(question, &hits).await;
        trace.note(format!("Received {} of {} specialist responses", outputs.len(), dispatched));

        trace.enter(PipelineStage::Synthesizing, "Synthesizing specialist responses...");
        let synthesis = self.aggregator.combine(question, &outputs).await;
        let closing = match synthesis.source {
            SynthesisSource::Remote => "Synthesis completed (remote)".to_string(),
            SynthesisSource::Fallback => "Synthesis completed (fallback)".to_string(),
            SynthesisSource::Empty => {
                format!("No specialist responses: all {} responders failed", dispatched)
            }
        };
        trace.enter(PipelineStage::Done, closing);

        Ok(Completed { hits, outputs, synthesis })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("internal panic: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("internal panic: {}", s)
    } else {
        "internal panic".to_string()
    }
}
