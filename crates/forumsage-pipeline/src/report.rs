use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use forumsage_core::types::{secs, PipelineResult, PipelineStage, ResponderType};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponderStats {
    pub responder: ResponderType,
    pub responses: usize,
    pub avg_confidence: f64,
    #[serde(with = "secs")]
    pub avg_elapsed: Duration,
}

/// Summary over a batch of processed questions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub total_questions: usize,
    pub failed_questions: usize,
    #[serde(with = "secs")]
    pub avg_processing_time: Duration,
    pub total_hits: usize,
    pub avg_hits_per_question: f64,
    pub total_responses: usize,
    pub avg_responses_per_question: f64,
    pub avg_confidence: f64,
    pub responders: Vec<ResponderStats>,
}

#[derive(Default)]
struct Tally {
    responses: usize,
    confidence: f64,
    elapsed: Duration,
}

impl BatchReport {
    pub fn from_results(results: &[PipelineResult]) -> Self {
        let total_questions = results.len();
        let total_hits: usize = results.iter().map(|r| r.hits.len()).sum();
        let total_responses: usize = results.iter().map(|r| r.outputs.len()).sum();
        let total_time: Duration = results.iter().map(|r| r.elapsed).sum();
        let confidence_sum: f64 = results.iter().map(|r| r.overall_confidence).sum();

        let mut tallies: BTreeMap<ResponderType, Tally> = BTreeMap::new();
        for output in results.iter().flat_map(|r| &r.outputs) {
            let tally = tallies.entry(output.responder).or_default();
            tally.responses += 1;
            tally.confidence += output.confidence;
            tally.elapsed += output.elapsed;
        }
        let responders = tallies
            .into_iter()
            .map(|(responder, t)| ResponderStats {
                responder,
                responses: t.responses,
                avg_confidence: mean(t.confidence, t.responses),
                avg_elapsed: mean_duration(t.elapsed, t.responses),
            })
            .collect();

        Self {
            total_questions,
            failed_questions: results.iter().filter(|r| r.stage == PipelineStage::Failed).count(),
            avg_processing_time: mean_duration(total_time, total_questions),
            total_hits,
            avg_hits_per_question: mean(total_hits as f64, total_questions),
            total_responses,
            avg_responses_per_question: mean(total_responses as f64, total_questions),
            avg_confidence: mean(confidence_sum, total_questions),
            responders,
        }
    }
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 { 0.0 } else { sum / count as f64 }
}

fn mean_duration(total: Duration, count: usize) -> Duration {
    u32::try_from(count).ok().and_then(|n| total.checked_div(n)).unwrap_or_default()
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Questions:        {} ({} failed)",
            self.total_questions, self.failed_questions
        )?;
        writeln!(f, "Avg time:         {:.2}s", self.avg_processing_time.as_secs_f64())?;
        writeln!(
            f,
            "Threads found:    {} ({:.1} per question)",
            self.total_hits, self.avg_hits_per_question
        )?;
        writeln!(
            f,
            "Responses:        {} ({:.1} per question)",
            self.total_responses, self.avg_responses_per_question
        )?;
        writeln!(f, "Avg confidence:   {:.2}", self.avg_confidence)?;
        if !self.responders.is_empty() {
            writeln!(f, "Per responder:")?;
        }
        for stats in &self.responders {
            writeln!(
                f,
                "  {:<20} {:>4} responses  conf {:.2}  {:.2}s",
                stats.responder.label(),
                stats.responses,
                stats.avg_confidence,
                stats.avg_elapsed.as_secs_f64()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forumsage_core::types::ResponderOutput;

    fn output(responder: ResponderType, confidence: f64, millis: u64) -> ResponderOutput {
        ResponderOutput {
            responder,
            response: "ok".to_string(),
            confidence,
            sources: vec![],
            elapsed: Duration::from_millis(millis),
            reasoning: None,
        }
    }

    fn result(
        outputs: Vec<ResponderOutput>,
        confidence: f64,
        stage: PipelineStage,
    ) -> PipelineResult {
        PipelineResult {
            question: "q".to_string(),
            hits: vec![],
            outputs,
            synthesized: String::new(),
            overall_confidence: confidence,
            elapsed: Duration::from_secs(2),
            steps: vec!["Searching corpus for relevant threads...".to_string()],
            stage,
        }
    }

    #[test]
    fn empty_batch_is_all_zeros() {
        let report = BatchReport::from_results(&[]);
        assert_eq!(report.total_questions, 0);
        assert_eq!(report.avg_confidence, 0.0);
        assert_eq!(report.avg_processing_time, Duration::ZERO);
        assert!(report.responders.is_empty());
    }

    #[test]
    fn breakdown_follows_role_order() {
        let results = vec![
            result(
                vec![
                    output(ResponderType::SafetySpecialist, 0.9, 100),
                    output(ResponderType::Researcher, 0.6, 300),
                ],
                0.7,
                PipelineStage::Done,
            ),
            result(vec![output(ResponderType::Researcher, 0.8, 100)], 0.8, PipelineStage::Done),
            result(vec![], 0.0, PipelineStage::Failed),
        ];
        let report = BatchReport::from_results(&results);

        assert_eq!(report.total_questions, 3);
        assert_eq!(report.failed_questions, 1);
        assert_eq!(report.total_responses, 3);
        assert!((report.avg_confidence - 0.5).abs() < 1e-9);
        let roles: Vec<ResponderType> = report.responders.iter().map(|s| s.responder).collect();
        assert_eq!(roles, vec![ResponderType::Researcher, ResponderType::SafetySpecialist]);
        assert_eq!(report.responders[0].responses, 2);
        assert!((report.responders[0].avg_confidence - 0.7).abs() < 1e-9);
        assert_eq!(report.responders[0].avg_elapsed, Duration::from_millis(200));

        let text = report.to_string();
        assert!(text.contains("Questions:        3 (1 failed)"));
        assert!(text.contains("Safety Specialist"));
    }
}
