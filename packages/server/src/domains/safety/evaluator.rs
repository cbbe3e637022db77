//! Safety evaluation: a pure function of the instruction and configuration.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::domains::jobs::RiskLevel;
use crate::domains::safety::rules::{BLOCK_RULES, BRAND_KEYWORDS, HIGH_RISK_KEYWORDS};

/// Result of one precheck. `override_applied` is only ever true when the
/// instruction matched rules and the admin override satisfied every
/// condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyOutcome {
    pub allowed: bool,
    pub blocked_rules: Vec<String>,
    pub reason: String,
    pub risk_level: RiskLevel,
    pub override_applied: bool,
}

/// Deterministic rule matcher, configured once at startup.
#[derive(Debug, Clone)]
pub struct SafetyEvaluator {
    override_allow_rules: HashSet<String>,
    extra_high_risk_keywords: Vec<String>,
}

impl SafetyEvaluator {
    pub fn from_config(config: &Config) -> Self {
        Self {
            override_allow_rules: config.safety_override_allow_rules(),
            extra_high_risk_keywords: config.high_risk_review_keywords(),
        }
    }

    #[cfg(test)]
    pub fn new(override_allow_rules: HashSet<String>, extra_high_risk_keywords: Vec<String>) -> Self {
        Self {
            override_allow_rules,
            extra_high_risk_keywords,
        }
    }

    /// Classify the standalone risk of an instruction, independent of
    /// whether it is blocked.
    pub fn classify_risk(&self, instruction: &str) -> RiskLevel {
        let text = instruction.to_lowercase();

        let high_risk_hit = HIGH_RISK_KEYWORDS
            .iter()
            .any(|keyword| text.contains(keyword))
            || self
                .extra_high_risk_keywords
                .iter()
                .any(|keyword| text.contains(keyword.as_str()));
        if high_risk_hit {
            return RiskLevel::High;
        }

        if BRAND_KEYWORDS.iter().any(|keyword| text.contains(keyword)) {
            return RiskLevel::Medium;
        }

        RiskLevel::Low
    }

    /// Evaluate an instruction against the block rules.
    ///
    /// A blocked instruction is only let through when the caller requested
    /// an admin override with a non-empty reason AND every matched rule is
    /// in the configured allow-list.
    pub fn evaluate(
        &self,
        instruction: &str,
        admin_override: bool,
        override_reason: Option<&str>,
    ) -> SafetyOutcome {
        let text = instruction.to_lowercase();
        let risk_level = self.classify_risk(instruction);

        let matched: Vec<String> = BLOCK_RULES
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|keyword| text.contains(keyword)))
            .map(|(rule_id, _)| rule_id.to_string())
            .collect();

        if matched.is_empty() {
            return SafetyOutcome {
                allowed: true,
                blocked_rules: vec![],
                reason: "Allowed".to_string(),
                risk_level,
                override_applied: false,
            };
        }

        let reason_present = override_reason
            .map(|reason| !reason.trim().is_empty())
            .unwrap_or(false);
        let all_rules_allowed = !self.override_allow_rules.is_empty()
            && matched
                .iter()
                .all(|rule| self.override_allow_rules.contains(rule));

        if admin_override && reason_present && all_rules_allowed {
            return SafetyOutcome {
                allowed: true,
                blocked_rules: matched,
                reason: "Blocked rules overridden by admin whitelist".to_string(),
                risk_level,
                override_applied: true,
            };
        }

        SafetyOutcome {
            allowed: false,
            blocked_rules: matched,
            reason: "Instruction hit strict safety policy rules".to_string(),
            risk_level,
            override_applied: false,
        }
    }
}
