//! Manual-review routing for QA-passing jobs.

use uuid::Uuid;

use crate::domains::jobs::RiskLevel;
use crate::domains::qa::evaluator::{QaEvaluator, QaReport};
use crate::domains::qa::sampling::stable_sample;

pub const REVIEW_REASON_HIGH_RISK: &str = "high_risk_task_requires_manual_review";
pub const REVIEW_REASON_SPOT_CHECK: &str = "random_spot_check";

impl QaEvaluator {
    /// Decide whether a passing job still goes to a human.
    ///
    /// Only meaningful for passing reports; a failing report never routes.
    /// Routing happens iff at least one reason applies: high-risk policy or
    /// the stable per-job spot check.
    pub fn should_route_manual_review(
        &self,
        job_id: Uuid,
        report: &QaReport,
        risk_level: Option<RiskLevel>,
    ) -> (bool, Vec<String>) {
        if !self.should_pass(report) {
            return (false, vec![]);
        }

        let mut reasons = Vec::new();
        if risk_level == Some(RiskLevel::High) {
            reasons.push(REVIEW_REASON_HIGH_RISK.to_string());
        }
        if stable_sample(&job_id.to_string(), self.random_review_ratio) {
            reasons.push(REVIEW_REASON_SPOT_CHECK.to_string());
        }

        (!reasons.is_empty(), reasons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::qa::evaluator::QaContext;

    fn evaluator(ratio: f64) -> QaEvaluator {
        QaEvaluator {
            threshold: 0.82,
            random_review_ratio: ratio,
        }
    }

    fn passing_report(evaluator: &QaEvaluator) -> QaReport {
        evaluator.evaluate(&QaContext {
            instruction: "color grade",
            iteration: 3,
            capability: "color_grade",
            output_uri: "minio://output/x/iter_3/edited.mp4",
        })
    }

    #[test]
    fn high_risk_tasks_route_to_manual_review() {
        let evaluator = evaluator(0.0);
        let report = passing_report(&evaluator);
        let (route, reasons) =
            evaluator.should_route_manual_review(Uuid::new_v4(), &report, Some(RiskLevel::High));
        assert!(route);
        assert!(reasons.contains(&REVIEW_REASON_HIGH_RISK.to_string()));
    }

    #[test]
    fn low_risk_with_zero_ratio_never_routes() {
        let evaluator = evaluator(0.0);
        let report = passing_report(&evaluator);
        let (route, reasons) =
            evaluator.should_route_manual_review(Uuid::new_v4(), &report, Some(RiskLevel::Low));
        assert!(!route);
        assert!(reasons.is_empty());
    }

    #[test]
    fn full_ratio_always_spot_checks() {
        let evaluator = evaluator(1.0);
        let report = passing_report(&evaluator);
        let (route, reasons) =
            evaluator.should_route_manual_review(Uuid::new_v4(), &report, None);
        assert!(route);
        assert!(reasons.contains(&REVIEW_REASON_SPOT_CHECK.to_string()));
    }

    #[test]
    fn failing_reports_never_route() {
        let evaluator = evaluator(1.0);
        let failing = evaluator.evaluate(&QaContext {
            instruction: "remove object",
            iteration: 1,
            capability: "remove_object",
            output_uri: "minio://output/x/iter_1/edited.mp4",
        });
        let (route, reasons) =
            evaluator.should_route_manual_review(Uuid::new_v4(), &failing, Some(RiskLevel::High));
        assert!(!route);
        assert!(reasons.is_empty());
    }

    #[test]
    fn routing_decision_is_stable_for_a_job() {
        let evaluator = evaluator(0.5);
        let report = passing_report(&evaluator);
        let job_id = Uuid::new_v4();
        let first = evaluator.should_route_manual_review(job_id, &report, None);
        for _ in 0..10 {
            assert_eq!(
                evaluator.should_route_manual_review(job_id, &report, None),
                first
            );
        }
    }
}
