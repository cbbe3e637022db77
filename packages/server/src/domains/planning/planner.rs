//! Plan generation. Pure: the same inputs always produce the same plan.

use serde::{Deserialize, Serialize};

use crate::domains::planning::Capability;
use crate::domains::qa::QaIssue;

/// Fixed execution constraints applied to every plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanConstraints {
    pub max_resolution: String,
    pub max_duration_seconds: u32,
    pub quality_priority: bool,
    pub strict_safety: bool,
}

impl Default for PlanConstraints {
    fn default() -> Self {
        Self {
            max_resolution: "1920x1080".to_string(),
            max_duration_seconds: 30,
            quality_priority: true,
            strict_safety: true,
        }
    }
}

/// One targeted fix derived from a prior iteration's QA issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixMapEntry {
    pub fix_point: String,
    pub tool_action: String,
    pub expected_improvement: String,
}

/// The executable plan for one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditPlan {
    pub capability: Capability,
    pub tool_chain: Vec<String>,
    pub model_bundle: String,
    pub iteration_budget: u32,
    pub constraints: PlanConstraints,
    pub fix_map: Vec<FixMapEntry>,
}

/// Detect the capability for an instruction.
///
/// Logo/watermark intent short-circuits before generic scoring; otherwise
/// each capability is scored by keyword hits (+2 for tokens of 6+ chars,
/// +1 for shorter ones) with the longest matched token as tie-breaker.
/// No hits at all fall back to `replace_object`.
pub fn detect_capability(instruction: &str, forced: Option<Capability>) -> Capability {
    if let Some(capability) = forced {
        return capability;
    }

    let normalized = instruction.to_lowercase();

    for token in ["logo", "watermark", "去logo", "水印"] {
        if normalized.contains(token) {
            return Capability::RemoveLogo;
        }
    }

    let mut best: Option<(u32, usize, Capability)> = None;
    for capability in Capability::ALL {
        let matched: Vec<&str> = capability
            .hints()
            .iter()
            .copied()
            .filter(|token| normalized.contains(token))
            .collect();
        if matched.is_empty() {
            continue;
        }

        let score: u32 = matched
            .iter()
            .map(|token| if token.chars().count() >= 6 { 2 } else { 1 })
            .sum();
        let specificity = matched
            .iter()
            .map(|token| token.chars().count())
            .max()
            .unwrap_or(0);

        let better = match best {
            None => true,
            Some((best_score, best_specificity, _)) => {
                (score, specificity) > (best_score, best_specificity)
            }
        };
        if better {
            best = Some((score, specificity, capability));
        }
    }

    best.map(|(_, _, capability)| capability)
        .unwrap_or(Capability::ReplaceObject)
}

/// Turn the previous iteration's issues into targeted pipeline adjustments.
pub fn build_fix_map(prior_issues: &[QaIssue]) -> Vec<FixMapEntry> {
    prior_issues
        .iter()
        .map(|issue| FixMapEntry {
            fix_point: issue.code.clone(),
            tool_action: format!("adjust_pipeline_for_{}", issue.code),
            expected_improvement: issue.description.clone(),
        })
        .collect()
}

pub fn generate_plan(
    instruction: &str,
    model_bundle: &str,
    prior_issues: &[QaIssue],
    forced: Option<Capability>,
    iteration_budget: u32,
) -> EditPlan {
    let capability = detect_capability(instruction, forced);

    EditPlan {
        capability,
        tool_chain: capability
            .tool_chain()
            .iter()
            .map(|tool| tool.to_string())
            .collect(),
        model_bundle: model_bundle.to_string(),
        iteration_budget,
        constraints: PlanConstraints::default(),
        fix_map: build_fix_map(prior_issues),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(code: &str, description: &str) -> QaIssue {
        QaIssue {
            code: code.to_string(),
            severity: "medium".to_string(),
            description: description.to_string(),
            timeline: "00:00:01-00:00:05".to_string(),
        }
    }

    #[test]
    fn logo_intent_wins_over_other_keywords() {
        // "remove" also scores for remove_object; logo must still win.
        assert_eq!(
            detect_capability("remove the logo from the shirt", None),
            Capability::RemoveLogo
        );
        assert_eq!(
            detect_capability("帮我去掉视频里的水印", None),
            Capability::RemoveLogo
        );
    }

    #[test]
    fn forced_capability_bypasses_detection() {
        assert_eq!(
            detect_capability("remove the logo", Some(Capability::ColorGrade)),
            Capability::ColorGrade
        );
    }

    #[test]
    fn keyword_scoring_picks_the_best_match() {
        assert_eq!(
            detect_capability("erase the parked car", None),
            Capability::RemoveObject
        );
        assert_eq!(
            detect_capability("change color grading to cinematic look", None),
            Capability::ColorGrade
        );
        assert_eq!(
            detect_capability("swap the green screen background", None),
            Capability::ReplaceBackground
        );
    }

    #[test]
    fn no_keyword_match_defaults_to_replace_object() {
        assert_eq!(
            detect_capability("make it look nicer please", None),
            Capability::ReplaceObject
        );
    }

    #[test]
    fn empty_prior_issues_produce_empty_fix_map() {
        assert!(build_fix_map(&[]).is_empty());
    }

    #[test]
    fn fix_map_entries_mirror_issue_codes() {
        let fix_map = build_fix_map(&[issue("temporal_flicker", "flicker issue")]);
        assert_eq!(fix_map.len(), 1);
        assert_eq!(fix_map[0].fix_point, "temporal_flicker");
        assert_eq!(fix_map[0].tool_action, "adjust_pipeline_for_temporal_flicker");
        assert_eq!(fix_map[0].expected_improvement, "flicker issue");
    }

    #[test]
    fn generated_plan_has_expected_fields() {
        let plan = generate_plan(
            "Replace the cup with a flower vase",
            "balanced_12g_bundle",
            &[issue("temporal_flicker", "flicker issue")],
            None,
            3,
        );
        assert_eq!(plan.capability, Capability::ReplaceObject);
        assert_eq!(plan.iteration_budget, 3);
        assert_eq!(plan.model_bundle, "balanced_12g_bundle");
        assert!(plan.tool_chain.len() >= 3);
        assert_eq!(plan.fix_map.len(), 1);
        assert_eq!(plan.constraints.max_resolution, "1920x1080");
        assert!(plan.constraints.strict_safety);
    }

    #[test]
    fn plan_generation_is_pure() {
        let a = generate_plan("Remove the closed book", "balanced_12g_bundle", &[], None, 3);
        let b = generate_plan("Remove the closed book", "balanced_12g_bundle", &[], None, 3);
        assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap()
        );
    }
}
