use crate::error::{PdlcError, Result};
use crate::record::FeatureRecord;
use crate::types::{
    validate_artifact_url, ApprovalStatus, ArtifactType, GateStatus, Phase, ReviewOutcome,
    RiskImpact, TrackName, TrackStatus,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Gate phases
// ---------------------------------------------------------------------------

/// Validation scope a gate belongs to. The four track scopes line up with
/// the delivery tracks; DECISION_GATE holds the cross-cutting checks that
/// only matter at the go/no-go review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatePhase {
    Context,
    Design,
    BusinessCase,
    Engineering,
    DecisionGate,
}

impl GatePhase {
    pub fn all() -> &'static [GatePhase] {
        &[
            GatePhase::Context,
            GatePhase::Design,
            GatePhase::BusinessCase,
            GatePhase::Engineering,
            GatePhase::DecisionGate,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GatePhase::Context => "context",
            GatePhase::Design => "design",
            GatePhase::BusinessCase => "business_case",
            GatePhase::Engineering => "engineering",
            GatePhase::DecisionGate => "decision_gate",
        }
    }

    /// The delivery track this scope validates. None for DECISION_GATE.
    pub fn track(&self) -> Option<TrackName> {
        match self {
            GatePhase::Context => Some(TrackName::Context),
            GatePhase::Design => Some(TrackName::Design),
            GatePhase::BusinessCase => Some(TrackName::BusinessCase),
            GatePhase::Engineering => Some(TrackName::Engineering),
            GatePhase::DecisionGate => None,
        }
    }

    pub fn for_track(track: TrackName) -> GatePhase {
        match track {
            TrackName::Context => GatePhase::Context,
            TrackName::Design => GatePhase::Design,
            TrackName::BusinessCase => GatePhase::BusinessCase,
            TrackName::Engineering => GatePhase::Engineering,
        }
    }
}

impl fmt::Display for GatePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GatePhase {
    type Err = PdlcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "context" => Ok(GatePhase::Context),
            "design" => Ok(GatePhase::Design),
            "business_case" | "business-case" => Ok(GatePhase::BusinessCase),
            "engineering" => Ok(GatePhase::Engineering),
            "decision_gate" | "decision-gate" => Ok(GatePhase::DecisionGate),
            other => Err(PdlcError::InvalidValue(format!(
                "unknown gate phase: {other}"
            ))),
        }
    }
}

/// Gate scopes that apply while the record sits in a given lifecycle phase.
pub fn scopes_for(phase: Phase) -> &'static [GatePhase] {
    match phase {
        Phase::Initialization | Phase::OutputGeneration => &[],
        Phase::SignalAnalysis | Phase::ContextDoc => &[GatePhase::Context],
        Phase::ParallelTracks => &[
            GatePhase::Context,
            GatePhase::Design,
            GatePhase::BusinessCase,
            GatePhase::Engineering,
        ],
        Phase::DecisionGate => GatePhase::all(),
    }
}

// ---------------------------------------------------------------------------
// Check vocabulary
// ---------------------------------------------------------------------------

/// One configurable predicate over a feature record. The tag names form the
/// vocabulary available to `.pdlc/config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GateCheck {
    TrackComplete { track: TrackName },
    TrackNotBlocked { track: TrackName },
    ArtifactLinked { artifact: ArtifactType },
    MinTrackVersion { track: TrackName, min: u32 },
    ApprovalsSatisfied,
    BusinessCaseAccepted,
    EstimateRecorded,
    DesignQuestionsResolved,
    DependenciesClear,
    RisksMitigated { min_impact: RiskImpact },
}

fn default_blocking() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateSpec {
    pub name: String,
    pub phase: GatePhase,
    /// Blocking gates hold the phase; advisory gates only warn.
    #[serde(default = "default_blocking")]
    pub blocking: bool,
    pub check: GateCheck,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfiguration {
    #[serde(default)]
    pub gates: Vec<GateSpec>,
}

impl Default for GateConfiguration {
    fn default() -> Self {
        Self {
            gates: default_gates(),
        }
    }
}

impl GateConfiguration {
    /// Gates for one scope, in configured order.
    pub fn gates_for(&self, phase: GatePhase) -> Vec<&GateSpec> {
        self.gates.iter().filter(|g| g.phase == phase).collect()
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateResult {
    pub name: String,
    pub status: GateStatus,
    pub blocking: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    /// Supporting detail beyond the one-line message. Populated by the
    /// decision meta-gate with the underlying scope's blockers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseValidation {
    pub phase: GatePhase,
    pub status: GateStatus,
    pub gates: Vec<GateResult>,
    pub blockers: Vec<String>,
    pub warnings: Vec<String>,
}

fn evaluate_check(check: &GateCheck, record: &FeatureRecord) -> Result<(GateStatus, String)> {
    let result = match check {
        GateCheck::TrackComplete { track } => {
            let state = record
                .track(*track)
                .ok_or_else(|| PdlcError::InvalidState(format!("missing {track} track")))?;
            match state.status {
                TrackStatus::Complete => (GateStatus::Pass, "track complete".to_string()),
                TrackStatus::Blocked => (GateStatus::Fail, "track is blocked".to_string()),
                other => (GateStatus::Incomplete, format!("track is {other}")),
            }
        }
        GateCheck::TrackNotBlocked { track } => {
            let status = record.track_status(*track);
            if status == TrackStatus::Blocked {
                (GateStatus::Fail, "track is blocked".to_string())
            } else {
                (GateStatus::Pass, format!("track is {status}"))
            }
        }
        GateCheck::ArtifactLinked { artifact } => match record.artifacts.get(artifact) {
            Some(Some(url)) => match validate_artifact_url(*artifact, url) {
                Ok(()) => (GateStatus::Pass, format!("linked: {url}")),
                Err(_) => (GateStatus::Fail, format!("malformed url: {url}")),
            },
            _ => (GateStatus::Incomplete, "artifact not linked".to_string()),
        },
        GateCheck::MinTrackVersion { track, min } => {
            let state = record
                .track(*track)
                .ok_or_else(|| PdlcError::InvalidState(format!("missing {track} track")))?;
            if state.version >= *min {
                (GateStatus::Pass, format!("version {}", state.version))
            } else {
                (
                    GateStatus::Incomplete,
                    format!("version {} below required {min}", state.version),
                )
            }
        }
        GateCheck::ApprovalsSatisfied => {
            if record.approvals.is_empty() {
                (GateStatus::Incomplete, "no approvals recorded".to_string())
            } else if let Some(rejected) = record
                .approvals
                .iter()
                .find(|a| a.status == ApprovalStatus::Rejected)
            {
                (
                    GateStatus::Fail,
                    format!("rejected by {}", rejected.approver),
                )
            } else if let Some(pending) = record
                .approvals
                .iter()
                .find(|a| a.status == ApprovalStatus::Pending)
            {
                (
                    GateStatus::Incomplete,
                    format!("awaiting {}", pending.approver),
                )
            } else {
                (
                    GateStatus::Pass,
                    format!("{} approvals in", record.approvals.len()),
                )
            }
        }
        GateCheck::BusinessCaseAccepted => match record.business_case_outcome() {
            Some(ReviewOutcome::Accepted) => {
                (GateStatus::Pass, "business case accepted".to_string())
            }
            Some(ReviewOutcome::Rejected) => {
                (GateStatus::Fail, "business case rejected".to_string())
            }
            None => (
                GateStatus::Incomplete,
                "business case review outstanding".to_string(),
            ),
        },
        GateCheck::EstimateRecorded => match record.estimate.as_deref() {
            Some(estimate) if !estimate.trim().is_empty() => {
                (GateStatus::Pass, format!("estimate: {estimate}"))
            }
            _ => (GateStatus::Incomplete, "no estimate recorded".to_string()),
        },
        GateCheck::DesignQuestionsResolved => match record.open_design_questions {
            0 => (GateStatus::Pass, "no open design questions".to_string()),
            n => (GateStatus::Incomplete, format!("{n} open design questions")),
        },
        GateCheck::DependenciesClear => {
            let unresolved = record
                .dependencies
                .iter()
                .filter(|d| d.blocking && !d.resolved)
                .count();
            if unresolved == 0 {
                (GateStatus::Pass, "no blocking dependencies".to_string())
            } else {
                (
                    GateStatus::Fail,
                    format!("{unresolved} blocking dependencies unresolved"),
                )
            }
        }
        GateCheck::RisksMitigated { min_impact } => {
            let unmitigated = record
                .risks
                .iter()
                .filter(|r| r.impact.rank() >= min_impact.rank() && !r.is_mitigated())
                .count();
            if unmitigated == 0 {
                (
                    GateStatus::Pass,
                    format!("no unmitigated risks at or above {min_impact} impact"),
                )
            } else {
                (
                    GateStatus::Fail,
                    format!("{unmitigated} unmitigated risks at or above {min_impact} impact"),
                )
            }
        }
    };
    Ok(result)
}

fn aggregate(phase: GatePhase, gates: Vec<GateResult>) -> PhaseValidation {
    let blocking_fail = gates
        .iter()
        .any(|g| g.blocking && g.status == GateStatus::Fail);
    let blocking_open = gates
        .iter()
        .any(|g| g.blocking && g.status == GateStatus::Incomplete);
    let status = if blocking_fail {
        GateStatus::Fail
    } else if blocking_open {
        GateStatus::Incomplete
    } else {
        GateStatus::Pass
    };
    let blockers = gates
        .iter()
        .filter(|g| g.blocking && g.status != GateStatus::Pass)
        .map(|g| format!("{}: {}", g.name, g.message))
        .collect();
    let warnings = gates
        .iter()
        .filter(|g| !g.blocking && g.status != GateStatus::Pass)
        .map(|g| format!("{}: {}", g.name, g.message))
        .collect();
    PhaseValidation {
        phase,
        status,
        gates,
        blockers,
        warnings,
    }
}

/// Evaluate all gates in one scope. A track scope whose track has not
/// started reports NOT_STARTED without running any checks.
pub fn evaluate_phase(
    record: &FeatureRecord,
    phase: GatePhase,
    config: &GateConfiguration,
) -> PhaseValidation {
    if let Some(track) = phase.track() {
        if record.track_status(track) == TrackStatus::NotStarted {
            return PhaseValidation {
                phase,
                status: GateStatus::NotStarted,
                gates: Vec::new(),
                blockers: Vec::new(),
                warnings: Vec::new(),
            };
        }
    }

    let gates = config
        .gates_for(phase)
        .into_iter()
        .map(|spec| {
            let (status, message) = evaluate_check(&spec.check, record)
                .unwrap_or_else(|e| (GateStatus::Incomplete, e.to_string()));
            GateResult {
                name: spec.name.clone(),
                status,
                blocking: spec.blocking,
                message,
                evidence: Vec::new(),
                remediation: spec.remediation.clone(),
            }
        })
        .collect();

    aggregate(phase, gates)
}

/// The go/no-go meta evaluation: every track must be complete with its own
/// scope passing, plus whatever is configured for the DECISION_GATE scope.
pub fn evaluate_decision_gate(
    record: &FeatureRecord,
    config: &GateConfiguration,
) -> PhaseValidation {
    let mut gates = Vec::new();

    for &track in TrackName::all() {
        let (status, message, evidence) = match record.track_status(track) {
            TrackStatus::Blocked => (GateStatus::Fail, "track is blocked".to_string(), Vec::new()),
            TrackStatus::NotStarted => (
                GateStatus::Incomplete,
                "track has not started".to_string(),
                Vec::new(),
            ),
            TrackStatus::Complete => {
                let validation = evaluate_phase(record, GatePhase::for_track(track), config);
                match validation.status {
                    GateStatus::Pass => {
                        (GateStatus::Pass, "track complete".to_string(), Vec::new())
                    }
                    status => {
                        let message = validation
                            .blockers
                            .first()
                            .cloned()
                            .unwrap_or_else(|| "phase gates unmet".to_string());
                        (status, message, validation.blockers)
                    }
                }
            }
            other => (
                GateStatus::Incomplete,
                format!("track is {other}"),
                Vec::new(),
            ),
        };
        gates.push(GateResult {
            name: format!("track_{track}"),
            status,
            blocking: true,
            message,
            evidence,
            remediation: None,
        });
    }

    for spec in config.gates_for(GatePhase::DecisionGate) {
        let (status, message) = evaluate_check(&spec.check, record)
            .unwrap_or_else(|e| (GateStatus::Incomplete, e.to_string()));
        gates.push(GateResult {
            name: spec.name.clone(),
            status,
            blocking: spec.blocking,
            message,
            evidence: Vec::new(),
            remediation: spec.remediation.clone(),
        });
    }

    aggregate(GatePhase::DecisionGate, gates)
}

// ---------------------------------------------------------------------------
// Default gate set
// ---------------------------------------------------------------------------

pub fn default_gates() -> Vec<GateSpec> {
    vec![
        GateSpec {
            name: "context_doc_linked".to_string(),
            phase: GatePhase::Context,
            blocking: true,
            check: GateCheck::ArtifactLinked {
                artifact: ArtifactType::ContextDoc,
            },
            remediation: Some("link the context document with 'pdlc artifact link'".to_string()),
        },
        GateSpec {
            name: "context_iterated".to_string(),
            phase: GatePhase::Context,
            blocking: true,
            check: GateCheck::MinTrackVersion {
                track: TrackName::Context,
                min: 1,
            },
            remediation: None,
        },
        GateSpec {
            name: "design_spec_linked".to_string(),
            phase: GatePhase::Design,
            blocking: true,
            check: GateCheck::ArtifactLinked {
                artifact: ArtifactType::DesignSpec,
            },
            remediation: None,
        },
        GateSpec {
            name: "design_questions_resolved".to_string(),
            phase: GatePhase::Design,
            blocking: true,
            check: GateCheck::DesignQuestionsResolved,
            remediation: Some("resolve or explicitly defer each open design question".to_string()),
        },
        GateSpec {
            name: "design_review_current".to_string(),
            phase: GatePhase::Design,
            blocking: false,
            check: GateCheck::MinTrackVersion {
                track: TrackName::Design,
                min: 1,
            },
            remediation: None,
        },
        GateSpec {
            name: "business_case_linked".to_string(),
            phase: GatePhase::BusinessCase,
            blocking: true,
            check: GateCheck::ArtifactLinked {
                artifact: ArtifactType::BusinessCase,
            },
            remediation: None,
        },
        GateSpec {
            name: "business_case_accepted".to_string(),
            phase: GatePhase::BusinessCase,
            blocking: true,
            check: GateCheck::BusinessCaseAccepted,
            remediation: None,
        },
        GateSpec {
            name: "approvals_satisfied".to_string(),
            phase: GatePhase::BusinessCase,
            blocking: true,
            check: GateCheck::ApprovalsSatisfied,
            remediation: None,
        },
        GateSpec {
            name: "estimate_recorded".to_string(),
            phase: GatePhase::Engineering,
            blocking: true,
            check: GateCheck::EstimateRecorded,
            remediation: None,
        },
        GateSpec {
            name: "dependencies_clear".to_string(),
            phase: GatePhase::Engineering,
            blocking: true,
            check: GateCheck::DependenciesClear,
            remediation: Some("resolve blocking dependencies or mark them non-blocking".to_string()),
        },
        GateSpec {
            name: "engineering_plan_linked".to_string(),
            phase: GatePhase::Engineering,
            blocking: false,
            check: GateCheck::ArtifactLinked {
                artifact: ArtifactType::EngineeringPlan,
            },
            remediation: None,
        },
        GateSpec {
            name: "no_unmitigated_high_risk".to_string(),
            phase: GatePhase::DecisionGate,
            blocking: true,
            check: GateCheck::RisksMitigated {
                min_impact: RiskImpact::High,
            },
            remediation: None,
        },
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
