//! Cross-module invariants of the orchestration pipeline: the status
//! transition table, QA score laws, and planner purity.

use server_core::domains::jobs::JobStatus;
use server_core::domains::planning::{generate_plan, Capability};
use server_core::domains::qa::{QaContext, QaEvaluator, QaIssue};

const ALL_STATUSES: [JobStatus; 8] = [
    JobStatus::Queued,
    JobStatus::Planning,
    JobStatus::Editing,
    JobStatus::Qa,
    JobStatus::HumanReview,
    JobStatus::Succeeded,
    JobStatus::Failed,
    JobStatus::Blocked,
];

fn allowed_targets(from: JobStatus) -> Vec<JobStatus> {
    use JobStatus::*;
    match from {
        Queued => vec![Planning, Blocked, Failed],
        Planning => vec![Editing, Failed],
        Editing => vec![Qa, Failed],
        Qa => vec![Planning, Succeeded, HumanReview, Failed],
        HumanReview => vec![Succeeded, Failed, Queued],
        Failed => vec![Queued],
        Succeeded | Blocked => vec![],
    }
}

#[test]
fn transition_table_matches_exactly() {
    for from in ALL_STATUSES {
        let allowed = allowed_targets(from);
        for to in ALL_STATUSES {
            assert_eq!(
                from.can_transition_to(to),
                allowed.contains(&to),
                "transition {from} -> {to}"
            );
        }
    }
}

#[test]
fn overall_score_is_the_rounded_dimension_mean_for_every_iteration() {
    let evaluator = QaEvaluator {
        threshold: 0.82,
        random_review_ratio: 0.2,
    };
    for iteration in 1..=10 {
        let report = evaluator.evaluate(&QaContext {
            instruction: "remove the closed book",
            iteration,
            capability: "remove_object",
            output_uri: "minio://output/x/iter_1/edited.mp4",
        });
        let mean = report.dimension_scores.mean();
        let rounded = (mean * 10_000.0).round() / 10_000.0;
        assert_eq!(report.overall_score, rounded, "iteration {iteration}");
        assert!((0.0..=1.0).contains(&report.overall_score));
    }
}

#[test]
fn plan_generation_is_byte_stable() {
    let issues = vec![QaIssue {
        code: "temporal_flicker".to_string(),
        severity: "medium".to_string(),
        description: "Noticeable frame-to-frame flicker in edited region".to_string(),
        timeline: "00:00:02-00:00:06".to_string(),
    }];

    let first = generate_plan(
        "Remove the closed book",
        "balanced_12g_bundle",
        &issues,
        None,
        3,
    );
    for _ in 0..10 {
        let again = generate_plan(
            "Remove the closed book",
            "balanced_12g_bundle",
            &issues,
            None,
            3,
        );
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&again).unwrap()
        );
    }
}

#[test]
fn logo_shortcut_beats_every_other_hint() {
    let plan = generate_plan(
        "remove the logo from the shirt",
        "balanced_12g_bundle",
        &[],
        None,
        3,
    );
    assert_eq!(plan.capability, Capability::RemoveLogo);
    assert_eq!(plan.tool_chain.first().map(String::as_str), Some("logo_text_detect"));
}

#[test]
fn zero_prior_issues_means_zero_fix_entries() {
    let plan = generate_plan("Remove the closed book", "balanced_12g_bundle", &[], None, 3);
    assert!(plan.fix_map.is_empty());
}
