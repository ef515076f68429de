use crate::error::{PdlcError, Result};
use crate::record::TrackState;
use crate::types::{TrackName, TrackStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// Statuses reachable from `from` in a single step.
///
/// COMPLETE has no outgoing edges here; the only legal regression is the
/// explicit business-case rejection on the record itself.
pub fn allowed_from(from: TrackStatus) -> &'static [TrackStatus] {
    match from {
        TrackStatus::NotStarted => &[TrackStatus::InProgress],
        TrackStatus::InProgress => &[
            TrackStatus::PendingInput,
            TrackStatus::PendingApproval,
            TrackStatus::Blocked,
            TrackStatus::Complete,
        ],
        TrackStatus::PendingInput | TrackStatus::PendingApproval => &[
            TrackStatus::InProgress,
            TrackStatus::Blocked,
            TrackStatus::Complete,
        ],
        TrackStatus::Blocked => &[TrackStatus::InProgress],
        TrackStatus::Complete => &[],
    }
}

pub fn can_transition(from: TrackStatus, to: TrackStatus) -> bool {
    allowed_from(from).contains(&to)
}

/// Validate and report, without mutating anything.
pub fn check_transition(track: TrackName, from: TrackStatus, to: TrackStatus) -> Result<()> {
    if !can_transition(from, to) {
        let allowed: Vec<&str> = allowed_from(from).iter().map(|s| s.as_str()).collect();
        let reason = if allowed.is_empty() {
            format!("{track} track is complete")
        } else {
            format!("{} track allows only {}", track, allowed.join(", "))
        };
        return Err(PdlcError::IllegalTransition {
            from: from.to_string(),
            to: to.to_string(),
            reason,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// TrackWeights
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackWeights {
    #[serde(default = "default_context_weight")]
    pub context: u32,
    #[serde(default = "default_design_weight")]
    pub design: u32,
    #[serde(default = "default_business_case_weight")]
    pub business_case: u32,
    #[serde(default = "default_engineering_weight")]
    pub engineering: u32,
}

fn default_context_weight() -> u32 {
    30
}

fn default_design_weight() -> u32 {
    20
}

fn default_business_case_weight() -> u32 {
    25
}

fn default_engineering_weight() -> u32 {
    25
}

impl Default for TrackWeights {
    fn default() -> Self {
        Self {
            context: default_context_weight(),
            design: default_design_weight(),
            business_case: default_business_case_weight(),
            engineering: default_engineering_weight(),
        }
    }
}

impl TrackWeights {
    pub fn weight_for(&self, track: TrackName) -> u32 {
        match track {
            TrackName::Context => self.context,
            TrackName::Design => self.design,
            TrackName::BusinessCase => self.business_case,
            TrackName::Engineering => self.engineering,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let sum = self.context + self.design + self.business_case + self.engineering;
        if sum != 100 {
            return Err(PdlcError::Configuration(format!(
                "track weights must sum to 100, got {sum}"
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Weight credit for a track status: full for COMPLETE, half for active
/// states, zero otherwise. Integer math; reporting only.
fn credit(status: TrackStatus, weight: u32) -> u32 {
    match status {
        TrackStatus::Complete => weight,
        TrackStatus::InProgress | TrackStatus::PendingInput | TrackStatus::PendingApproval => {
            weight / 2
        }
        TrackStatus::NotStarted | TrackStatus::Blocked => 0,
    }
}

/// Weighted overall progress in 0..=100.
pub fn overall_progress(tracks: &BTreeMap<TrackName, TrackState>, weights: &TrackWeights) -> u32 {
    TrackName::all()
        .iter()
        .map(|&name| {
            let status = tracks
                .get(&name)
                .map(|t| t.status)
                .unwrap_or(TrackStatus::NotStarted);
            credit(status, weights.weight_for(name))
        })
        .sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
