use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use forumsage_agents::ResponderPool;
use forumsage_core::error::CallError;
use forumsage_core::traits::{Responder, Synthesizer};
use forumsage_core::types::{
    PipelineStage, ResponderReply, ResponderRequest, ResponderType, SynthesisRequest, ThreadRecord,
};
use forumsage_corpus::CorpusIndex;
use forumsage_pipeline::{Aggregator, BatchReport, Orchestrator, NO_RESPONSES_MESSAGE};

struct Scripted {
    kind: ResponderType,
    confidence: f64,
    delay: Duration,
}

#[async_trait]
impl Responder for Scripted {
    fn kind(&self) -> ResponderType {
        self.kind
    }

    async fn respond(&self, request: &ResponderRequest) -> Result<ResponderReply, CallError> {
        tokio::time::sleep(self.delay).await;
        Ok(ResponderReply {
            response: format!("{} on: {}", self.kind.label(), request.question),
            confidence: self.confidence,
            sources: vec![],
            reasoning: None,
        })
    }
}

enum SynthMode {
    Echo,
    Blank,
    Fail,
    Panic,
}

struct FakeSynthesizer(SynthMode);

#[async_trait]
impl Synthesizer for FakeSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<String, CallError> {
        match self.0 {
            SynthMode::Echo => Ok(format!("merged {} answers", request.responses.len())),
            SynthMode::Blank => Ok("  ".to_string()),
            SynthMode::Fail => Err(CallError::Transport("connection refused".to_string())),
            SynthMode::Panic => panic!("synthesizer bug"),
        }
    }
}

fn corpus() -> Arc<CorpusIndex> {
    let record = |id: &str, title: &str, body: &str| ThreadRecord {
        thread_id: id.to_string(),
        title: title.to_string(),
        body: body.to_string(),
        success: true,
        ..Default::default()
    };
    Arc::new(CorpusIndex::from_records(vec![
        record("1", "How do I winterize crude extract?", "Winterize the extract in ethanol."),
        record("2", "Greenhouse light schedule", "Flip to 12/12 in the greenhouse."),
    ]))
}

fn pool(confidences: &[(ResponderType, f64)], delay: Duration) -> ResponderPool {
    ResponderPool::new(
        confidences
            .iter()
            .map(|(kind, confidence)| {
                let responder = Scripted { kind: *kind, confidence: *confidence, delay };
                Arc::new(responder) as Arc<dyn Responder>
            })
            .collect(),
    )
}

fn all_specialists(delay: Duration) -> ResponderPool {
    let confidences: Vec<(ResponderType, f64)> =
        ResponderType::SPECIALISTS.iter().map(|k| (*k, 0.8)).collect();
    pool(&confidences, delay)
}

#[tokio::test]
async fn end_to_end_with_local_synthesis() {
    let orchestrator = Orchestrator::new(
        corpus(),
        pool(
            &[(ResponderType::Researcher, 0.8), (ResponderType::SafetySpecialist, 0.9)],
            Duration::ZERO,
        ),
        Aggregator::local(),
    );
    let result = orchestrator.process("winterize extract").await;

    assert_eq!(result.stage, PipelineStage::Done);
    assert_eq!(result.hits.len(), 1);
    assert_eq!(result.hits[0].thread.thread_id, "1");
    assert_eq!(result.outputs.len(), 2);
    assert!((result.overall_confidence - 0.8375).abs() < 1e-9);
    assert!(result.synthesized.starts_with("# Multi-Agent Analysis\n"));
    assert!(result.synthesized.contains("## Safety Specialist Perspective"));
    assert_eq!(
        result.steps,
        vec![
            "Searching corpus for relevant threads...",
            "Found 1 relevant threads",
            "Dispatching to 2 specialist responders...",
            "Received 2 of 2 specialist responses",
            "Synthesizing specialist responses...",
            "Synthesis completed (fallback)",
        ]
    );
}

#[tokio::test]
async fn remote_synthesis_is_used_verbatim() {
    let aggregator =
        Aggregator::local().with_synthesizer(Arc::new(FakeSynthesizer(SynthMode::Echo)));
    let orchestrator = Orchestrator::new(corpus(), all_specialists(Duration::ZERO), aggregator);
    let result = orchestrator.process("greenhouse light").await;

    assert_eq!(result.synthesized, "merged 5 answers");
    assert!((result.overall_confidence - 0.8).abs() < 1e-9);
    assert_eq!(result.steps.last().map(String::as_str), Some("Synthesis completed (remote)"));
}

#[tokio::test]
async fn failing_or_blank_synthesis_falls_back() {
    for mode in [SynthMode::Fail, SynthMode::Blank] {
        let aggregator = Aggregator::local().with_synthesizer(Arc::new(FakeSynthesizer(mode)));
        let orchestrator = Orchestrator::new(corpus(), all_specialists(Duration::ZERO), aggregator);
        let result = orchestrator.process("greenhouse").await;
        assert_eq!(result.stage, PipelineStage::Done);
        assert!(result.synthesized.starts_with("# Multi-Agent Analysis"));
    }
}

#[tokio::test]
async fn every_responder_timing_out_still_completes() {
    let orchestrator = Orchestrator::new(
        corpus(),
        all_specialists(Duration::from_secs(10)).with_timeout(Duration::from_millis(30)),
        Aggregator::local().with_synthesizer(Arc::new(FakeSynthesizer(SynthMode::Echo))),
    );
    let result = orchestrator.process("winterize").await;

    assert_eq!(result.stage, PipelineStage::Done);
    assert!(result.outputs.is_empty());
    assert_eq!(result.overall_confidence, 0.0);
    assert_eq!(result.synthesized, NO_RESPONSES_MESSAGE);
    assert!(result.steps.contains(&"Received 0 of 5 specialist responses".to_string()));
    assert_eq!(
        result.steps.last().map(String::as_str),
        Some("No specialist responses: all 5 responders failed")
    );
    assert!(result.elapsed < Duration::from_secs(5));
}

#[tokio::test]
async fn empty_question_is_processed_normally() {
    let orchestrator =
        Orchestrator::new(corpus(), all_specialists(Duration::ZERO), Aggregator::local());
    let result = orchestrator.process("").await;
    assert_eq!(result.stage, PipelineStage::Done);
    assert!(result.hits.is_empty());
    assert_eq!(result.outputs.len(), 5);
    assert_eq!(result.steps[1], "Found 0 relevant threads");
}

#[tokio::test]
async fn unavailable_corpus_does_not_fail() {
    let orchestrator = Orchestrator::new(
        Arc::new(CorpusIndex::unavailable()),
        all_specialists(Duration::ZERO),
        Aggregator::local(),
    );
    let result = orchestrator.process("winterize").await;
    assert_eq!(result.stage, PipelineStage::Done);
    assert!(result.hits.is_empty());
    assert!(!result.outputs.is_empty());
}

#[tokio::test]
async fn search_error_becomes_failed_result() {
    let orchestrator =
        Orchestrator::new(corpus(), all_specialists(Duration::ZERO), Aggregator::local())
            .with_max_results(0);
    let result = orchestrator.process("winterize").await;

    assert_eq!(result.stage, PipelineStage::Failed);
    assert!(result.hits.is_empty());
    assert!(result.outputs.is_empty());
    assert_eq!(result.overall_confidence, 0.0);
    assert!(result.synthesized.starts_with("Error processing question: "));
    assert_eq!(
        result.steps.first().map(String::as_str),
        Some("Searching corpus for relevant threads...")
    );
    assert!(result.steps.last().is_some_and(|s| s.starts_with("Error: ")));
}

#[tokio::test]
async fn panic_during_synthesis_becomes_failed_result() {
    let aggregator =
        Aggregator::local().with_synthesizer(Arc::new(FakeSynthesizer(SynthMode::Panic)));
    let orchestrator = Orchestrator::new(corpus(), all_specialists(Duration::ZERO), aggregator);
    let result = orchestrator.process("winterize").await;

    assert_eq!(result.stage, PipelineStage::Failed);
    assert!(result.synthesized.contains("synthesizer bug"));
    assert!(result.steps.contains(&"Synthesizing specialist responses...".to_string()));
    assert!(result.outputs.is_empty());
}

#[tokio::test]
async fn concurrent_questions_share_one_orchestrator() {
    let orchestrator = Arc::new(Orchestrator::new(
        corpus(),
        all_specialists(Duration::from_millis(5)),
        Aggregator::local(),
    ));
    let handles: Vec<_> = ["winterize", "greenhouse", "extract"]
        .into_iter()
        .map(|q| {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.process(q).await })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    assert!(results.iter().all(|r| r.stage == PipelineStage::Done && r.outputs.len() == 5));

    let report = BatchReport::from_results(&results);
    assert_eq!(report.total_questions, 3);
    assert_eq!(report.total_responses, 15);
    assert_eq!(report.responders.len(), 5);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["responders"][0]["responder"], "researcher");
}
