//! QA scoring.
//!
//! The deterministic fixture scores improve slightly on later iterations
//! because fixes are applied. A real QA model can replace `evaluate` as
//! long as `should_pass` and the review gate keep their contracts.

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// The fixed scoring dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionScores {
    pub instruction_adherence: f64,
    pub temporal_consistency: f64,
    pub visual_artifacts: f64,
    pub edit_region_accuracy: f64,
    pub safety_compliance: f64,
}

impl DimensionScores {
    pub fn mean(&self) -> f64 {
        (self.instruction_adherence
            + self.temporal_consistency
            + self.visual_artifacts
            + self.edit_region_accuracy
            + self.safety_compliance)
            / 5.0
    }
}

/// One detected problem, anchored to a timeline range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaIssue {
    pub code: String,
    pub severity: String,
    pub description: String,
    pub timeline: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaReport {
    pub overall_score: f64,
    pub dimension_scores: DimensionScores,
    pub issues: Vec<QaIssue>,
    pub hard_fail_flags: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Inputs to one evaluation.
#[derive(Debug, Clone)]
pub struct QaContext<'a> {
    pub instruction: &'a str,
    pub iteration: u32,
    pub capability: &'a str,
    pub output_uri: &'a str,
}

#[derive(Debug, Clone)]
pub struct QaEvaluator {
    pub threshold: f64,
    pub random_review_ratio: f64,
}

impl QaEvaluator {
    pub fn from_config(config: &Config) -> Self {
        Self {
            threshold: config.qa_threshold,
            random_review_ratio: config.qa_random_review_ratio,
        }
    }

    pub fn evaluate(&self, context: &QaContext<'_>) -> QaReport {
        let scores = base_scores(context.iteration);

        let mut issues = Vec::new();
        let mut recommendations = Vec::new();

        if scores.temporal_consistency < 0.8 {
            issues.push(QaIssue {
                code: "temporal_flicker".to_string(),
                severity: "medium".to_string(),
                description: "Noticeable frame-to-frame flicker in edited region".to_string(),
                timeline: "00:00:02-00:00:06".to_string(),
            });
            recommendations
                .push("Increase temporal smoothing and tracking confidence".to_string());
        }

        if scores.instruction_adherence < 0.82 {
            issues.push(QaIssue {
                code: "instruction_partial_match".to_string(),
                severity: "medium".to_string(),
                description: "Edit result only partially matches the instruction".to_string(),
                timeline: "00:00:01-00:00:10".to_string(),
            });
            recommendations
                .push("Tighten edit mask scope and object consistency constraints".to_string());
        }

        let mut hard_fail_flags = Vec::new();
        if scores.safety_compliance < 0.9 {
            hard_fail_flags.push("safety".to_string());
        }
        if scores.visual_artifacts < 0.65 {
            hard_fail_flags.push("severe_artifacts".to_string());
        }

        QaReport {
            overall_score: round4(scores.mean()),
            dimension_scores: scores,
            issues,
            hard_fail_flags,
            recommendations,
        }
    }

    /// A report passes when it clears the threshold with no hard fails.
    pub fn should_pass(&self, report: &QaReport) -> bool {
        report.overall_score >= self.threshold && report.hard_fail_flags.is_empty()
    }
}

fn base_scores(iteration: u32) -> DimensionScores {
    let improvement = (0.03 * iteration.saturating_sub(1) as f64).min(0.1);
    DimensionScores {
        instruction_adherence: 0.74 + improvement,
        temporal_consistency: 0.75 + improvement,
        visual_artifacts: 0.78 + improvement,
        edit_region_accuracy: 0.76 + improvement,
        safety_compliance: 0.99,
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator() -> QaEvaluator {
        QaEvaluator {
            threshold: 0.82,
            random_review_ratio: 0.2,
        }
    }

    fn context(iteration: u32) -> QaContext<'static> {
        QaContext {
            instruction: "remove object",
            iteration,
            capability: "remove_object",
            output_uri: "minio://output/x/iter_1/edited.mp4",
        }
    }

    #[test]
    fn scores_improve_across_iterations_until_threshold() {
        let evaluator = evaluator();
        let first = evaluator.evaluate(&context(1));
        let third = evaluator.evaluate(&context(3));

        assert!(first.overall_score < third.overall_score);
        assert!(!evaluator.should_pass(&first));
        assert!(evaluator.should_pass(&third));
    }

    #[test]
    fn improvement_is_capped() {
        let evaluator = evaluator();
        let late = evaluator.evaluate(&context(10));
        assert!((late.dimension_scores.instruction_adherence - 0.84).abs() < 1e-9);
    }

    #[test]
    fn overall_score_is_the_rounded_mean() {
        let report = evaluator().evaluate(&context(2));
        let expected = round4(report.dimension_scores.mean());
        assert_eq!(report.overall_score, expected);
    }

    #[test]
    fn early_iterations_report_known_issues() {
        let report = evaluator().evaluate(&context(1));
        let codes: Vec<&str> = report.issues.iter().map(|issue| issue.code.as_str()).collect();
        assert!(codes.contains(&"temporal_flicker"));
        assert!(codes.contains(&"instruction_partial_match"));
        assert_eq!(report.issues.len(), report.recommendations.len());
    }

    #[test]
    fn late_iterations_clear_the_issue_list() {
        let report = evaluator().evaluate(&context(4));
        assert!(report.issues.is_empty());
        assert!(report.hard_fail_flags.is_empty());
    }

    #[test]
    fn hard_fail_flags_reject_regardless_of_score() {
        let evaluator = evaluator();
        let mut report = evaluator.evaluate(&context(3));
        assert!(evaluator.should_pass(&report));

        report.hard_fail_flags.push("safety".to_string());
        assert!(!evaluator.should_pass(&report));
    }
}
