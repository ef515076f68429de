use crate::blocker::BlockerReport;
use crate::error::Result;
use crate::gate::PhaseValidation;
use crate::hooks::ValidationReport;
use crate::record::FeatureRecord;
use crate::store::FeatureStore;
use crate::types::{DecisionVerdict, GateStatus, Phase, Recommendation, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecommendation {
    pub verdict: Recommendation,
    pub summary: String,
    pub evidence: Vec<String>,
}

/// Everything the recommendation looks at. Callers assemble this from the
/// hook runner, the decision gate evaluation, and the blocker sweep.
pub struct DecisionInputs<'a> {
    pub hooks: &'a ValidationReport,
    pub gate: &'a PhaseValidation,
    pub blockers: &'a BlockerReport,
}

// ---------------------------------------------------------------------------
// NO-GO rules
// ---------------------------------------------------------------------------

struct DecisionRule {
    applies: fn(&DecisionInputs) -> bool,
    summary: fn(&DecisionInputs) -> String,
    evidence: fn(&DecisionInputs) -> Vec<String>,
}

fn critical_hooks_apply(i: &DecisionInputs) -> bool {
    i.hooks.has_critical_failures
}

fn critical_hooks_summary(i: &DecisionInputs) -> String {
    format!(
        "{} critical validation failures",
        i.hooks.critical_failures().len()
    )
}

fn critical_hooks_evidence(i: &DecisionInputs) -> Vec<String> {
    i.hooks
        .critical_failures()
        .iter()
        .map(|r| format!("{}: {}", r.name, r.message))
        .collect()
}

fn critical_blockers_apply(i: &DecisionInputs) -> bool {
    i.blockers.critical_count > 0
}

fn critical_blockers_summary(i: &DecisionInputs) -> String {
    format!("{} critical blockers", i.blockers.critical_count)
}

fn critical_blockers_evidence(i: &DecisionInputs) -> Vec<String> {
    i.blockers
        .at(Severity::Critical)
        .iter()
        .map(|b| b.description.clone())
        .collect()
}

fn gate_unmet_apply(i: &DecisionInputs) -> bool {
    i.gate.status != GateStatus::Pass
}

fn gate_unmet_summary(i: &DecisionInputs) -> String {
    format!("decision gate is {}", i.gate.status)
}

fn gate_unmet_evidence(i: &DecisionInputs) -> Vec<String> {
    if i.gate.blockers.is_empty() {
        vec![format!("decision gate status is {}", i.gate.status)]
    } else {
        i.gate.blockers.clone()
    }
}

fn high_blockers_apply(i: &DecisionInputs) -> bool {
    i.blockers.high_count > 0
}

fn high_blockers_summary(i: &DecisionInputs) -> String {
    format!("{} high-severity blockers", i.blockers.high_count)
}

fn high_blockers_evidence(i: &DecisionInputs) -> Vec<String> {
    i.blockers
        .at(Severity::High)
        .iter()
        .map(|b| b.description.clone())
        .collect()
}

/// Ordered NO-GO rules; the first that applies decides. Anything not caught
/// here is a GO.
fn no_go_rules() -> Vec<DecisionRule> {
    vec![
        DecisionRule {
            applies: critical_hooks_apply,
            summary: critical_hooks_summary,
            evidence: critical_hooks_evidence,
        },
        DecisionRule {
            applies: critical_blockers_apply,
            summary: critical_blockers_summary,
            evidence: critical_blockers_evidence,
        },
        DecisionRule {
            applies: gate_unmet_apply,
            summary: gate_unmet_summary,
            evidence: gate_unmet_evidence,
        },
        DecisionRule {
            applies: high_blockers_apply,
            summary: high_blockers_summary,
            evidence: high_blockers_evidence,
        },
    ]
}

/// Deterministic go/no-go recommendation. A NO-GO always carries at least
/// one piece of evidence; a GO carries the outstanding advisories.
pub fn recommend(inputs: &DecisionInputs) -> DecisionRecommendation {
    for rule in no_go_rules() {
        if (rule.applies)(inputs) {
            return DecisionRecommendation {
                verdict: Recommendation::NoGo,
                summary: (rule.summary)(inputs),
                evidence: (rule.evidence)(inputs),
            };
        }
    }
    let evidence = inputs
        .blockers
        .at(Severity::Medium)
        .iter()
        .map(|b| format!("advisory: {}", b.description))
        .collect();
    DecisionRecommendation {
        verdict: Recommendation::Go,
        summary: "all decision gate requirements met".to_string(),
        evidence,
    }
}

/// Record a human verdict and move the record along the matching edge:
/// approval exits forward, rejection loops back to the parallel tracks.
/// The recommendation the human saw is kept in the decision metadata.
pub fn confirm_decision(
    store: &FeatureStore,
    record: &mut FeatureRecord,
    verdict: DecisionVerdict,
    rationale: &str,
    decided_by: &str,
    recommendation: &DecisionRecommendation,
) -> Result<Phase> {
    let mut metadata = BTreeMap::new();
    metadata.insert(
        "recommendation".to_string(),
        recommendation.verdict.as_str().to_string(),
    );
    metadata.insert(
        "evidence_count".to_string(),
        recommendation.evidence.len().to_string(),
    );
    store.record_decision(
        record,
        Phase::DecisionGate,
        verdict,
        rationale,
        decided_by,
        metadata,
    )?;

    let to = match verdict {
        DecisionVerdict::Approve => Phase::OutputGeneration,
        DecisionVerdict::Reject => Phase::ParallelTracks,
    };
    store.record_phase_transition(record, Phase::DecisionGate, to, BTreeMap::new())?;
    Ok(to)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
