use crate::error::{PdlcError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Initialization,
    SignalAnalysis,
    ContextDoc,
    ParallelTracks,
    DecisionGate,
    OutputGeneration,
}

impl Phase {
    pub fn all() -> &'static [Phase] {
        &[
            Phase::Initialization,
            Phase::SignalAnalysis,
            Phase::ContextDoc,
            Phase::ParallelTracks,
            Phase::DecisionGate,
            Phase::OutputGeneration,
        ]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Phase> {
        let all = Phase::all();
        let i = self.index();
        all.get(i + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Initialization => "initialization",
            Phase::SignalAnalysis => "signal_analysis",
            Phase::ContextDoc => "context_doc",
            Phase::ParallelTracks => "parallel_tracks",
            Phase::DecisionGate => "decision_gate",
            Phase::OutputGeneration => "output_generation",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = PdlcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "initialization" => Ok(Phase::Initialization),
            "signal_analysis" => Ok(Phase::SignalAnalysis),
            "context_doc" => Ok(Phase::ContextDoc),
            "parallel_tracks" => Ok(Phase::ParallelTracks),
            "decision_gate" => Ok(Phase::DecisionGate),
            "output_generation" => Ok(Phase::OutputGeneration),
            _ => Err(PdlcError::InvalidPhase(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// TrackName
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackName {
    Context,
    Design,
    BusinessCase,
    Engineering,
}

impl TrackName {
    pub fn all() -> &'static [TrackName] {
        &[
            TrackName::Context,
            TrackName::Design,
            TrackName::BusinessCase,
            TrackName::Engineering,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TrackName::Context => "context",
            TrackName::Design => "design",
            TrackName::BusinessCase => "business_case",
            TrackName::Engineering => "engineering",
        }
    }
}

impl fmt::Display for TrackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TrackName {
    type Err = PdlcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "context" => Ok(TrackName::Context),
            "design" => Ok(TrackName::Design),
            "business_case" | "business-case" => Ok(TrackName::BusinessCase),
            "engineering" => Ok(TrackName::Engineering),
            _ => Err(PdlcError::InvalidTrack(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// TrackStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    NotStarted,
    InProgress,
    PendingInput,
    PendingApproval,
    Blocked,
    Complete,
}

impl TrackStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackStatus::NotStarted => "not_started",
            TrackStatus::InProgress => "in_progress",
            TrackStatus::PendingInput => "pending_input",
            TrackStatus::PendingApproval => "pending_approval",
            TrackStatus::Blocked => "blocked",
            TrackStatus::Complete => "complete",
        }
    }
}

impl fmt::Display for TrackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TrackStatus {
    type Err = PdlcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "not_started" => Ok(TrackStatus::NotStarted),
            "in_progress" => Ok(TrackStatus::InProgress),
            "pending_input" => Ok(TrackStatus::PendingInput),
            "pending_approval" => Ok(TrackStatus::PendingApproval),
            "blocked" => Ok(TrackStatus::Blocked),
            "complete" => Ok(TrackStatus::Complete),
            _ => Err(PdlcError::InvalidValue(format!("unknown track status: {s}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// GateStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    Pass,
    Fail,
    Incomplete,
    NotStarted,
}

impl GateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GateStatus::Pass => "pass",
            GateStatus::Fail => "fail",
            GateStatus::Incomplete => "incomplete",
            GateStatus::NotStarted => "not_started",
        }
    }
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Severity (blockers)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// HookSeverity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookSeverity {
    Critical,
    High,
    Medium,
    Warn,
}

impl HookSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            HookSeverity::Critical => "critical",
            HookSeverity::High => "high",
            HookSeverity::Medium => "medium",
            HookSeverity::Warn => "warn",
        }
    }
}

impl fmt::Display for HookSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::P0 => "p0",
            Priority::P1 => "p1",
            Priority::P2 => "p2",
            Priority::P3 => "p3",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = PdlcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "p0" | "P0" => Ok(Priority::P0),
            "p1" | "P1" => Ok(Priority::P1),
            "p2" | "P2" => Ok(Priority::P2),
            "p3" | "P3" => Ok(Priority::P3),
            _ => Err(PdlcError::InvalidValue(format!("unknown priority: {s}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Recommendation / DecisionVerdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Go,
    NoGo,
}

impl Recommendation {
    pub fn as_str(self) -> &'static str {
        match self {
            Recommendation::Go => "go",
            Recommendation::NoGo => "no_go",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionVerdict {
    Approve,
    Reject,
}

impl DecisionVerdict {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionVerdict::Approve => "approve",
            DecisionVerdict::Reject => "reject",
        }
    }
}

impl fmt::Display for DecisionVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DecisionVerdict {
    type Err = PdlcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "approve" => Ok(DecisionVerdict::Approve),
            "reject" => Ok(DecisionVerdict::Reject),
            _ => Err(PdlcError::InvalidValue(format!("unknown verdict: {s}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// ReviewOutcome (business case)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcome {
    Accepted,
    Rejected,
}

impl fmt::Display for ReviewOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReviewOutcome::Accepted => "accepted",
            ReviewOutcome::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// RiskImpact
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskImpact {
    High,
    Medium,
    Low,
}

impl RiskImpact {
    /// Comparison rank, independent of declaration order.
    pub fn rank(self) -> u8 {
        match self {
            RiskImpact::High => 2,
            RiskImpact::Medium => 1,
            RiskImpact::Low => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskImpact::High => "high",
            RiskImpact::Medium => "medium",
            RiskImpact::Low => "low",
        }
    }
}

impl fmt::Display for RiskImpact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RiskImpact {
    type Err = PdlcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "high" => Ok(RiskImpact::High),
            "medium" => Ok(RiskImpact::Medium),
            "low" => Ok(RiskImpact::Low),
            _ => Err(PdlcError::InvalidValue(format!("unknown impact: {s}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// ApprovalStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ApprovalStatus {
    type Err = PdlcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            "rejected" => Ok(ApprovalStatus::Rejected),
            _ => Err(PdlcError::InvalidValue(format!(
                "unknown approval status: {s}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// ArtifactType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    ContextDoc,
    Prd,
    BusinessCase,
    DesignSpec,
    EngineeringPlan,
}

impl ArtifactType {
    pub fn all() -> &'static [ArtifactType] {
        &[
            ArtifactType::ContextDoc,
            ArtifactType::Prd,
            ArtifactType::BusinessCase,
            ArtifactType::DesignSpec,
            ArtifactType::EngineeringPlan,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactType::ContextDoc => "context_doc",
            ArtifactType::Prd => "prd",
            ArtifactType::BusinessCase => "business_case",
            ArtifactType::DesignSpec => "design_spec",
            ArtifactType::EngineeringPlan => "engineering_plan",
        }
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ArtifactType {
    type Err = PdlcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "context_doc" | "context-doc" => Ok(ArtifactType::ContextDoc),
            "prd" => Ok(ArtifactType::Prd),
            "business_case" | "business-case" => Ok(ArtifactType::BusinessCase),
            "design_spec" | "design-spec" => Ok(ArtifactType::DesignSpec),
            "engineering_plan" | "engineering-plan" => Ok(ArtifactType::EngineeringPlan),
            _ => Err(PdlcError::InvalidArtifact(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Artifact URL validation
// ---------------------------------------------------------------------------

static URL_RE: OnceLock<Regex> = OnceLock::new();

fn url_re() -> &'static Regex {
    URL_RE.get_or_init(|| Regex::new(r"^https?://\S+$").unwrap())
}

/// Artifact links are opaque references to external documents. The engine
/// only checks shape, never content.
pub fn validate_artifact_url(artifact: ArtifactType, url: &str) -> Result<()> {
    if url.is_empty() || url.len() > 2048 || !url_re().is_match(url) {
        return Err(PdlcError::InvalidArtifactUrl {
            artifact: artifact.to_string(),
            url: url.to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn phase_ordering() {
        assert!(Phase::Initialization < Phase::SignalAnalysis);
        assert!(Phase::ParallelTracks < Phase::DecisionGate);
        assert!(Phase::OutputGeneration > Phase::ContextDoc);
    }

    #[test]
    fn phase_next() {
        assert_eq!(Phase::Initialization.next(), Some(Phase::SignalAnalysis));
        assert_eq!(Phase::DecisionGate.next(), Some(Phase::OutputGeneration));
        assert_eq!(Phase::OutputGeneration.next(), None);
    }

    #[test]
    fn phase_roundtrip() {
        for phase in Phase::all() {
            let parsed = Phase::from_str(phase.as_str()).unwrap();
            assert_eq!(*phase, parsed);
        }
    }

    #[test]
    fn track_name_roundtrip() {
        for track in TrackName::all() {
            let parsed = TrackName::from_str(track.as_str()).unwrap();
            assert_eq!(*track, parsed);
        }
        assert_eq!(
            TrackName::from_str("business-case").unwrap(),
            TrackName::BusinessCase
        );
    }

    #[test]
    fn unknown_phase_fails() {
        assert!(Phase::from_str("qa").is_err());
        assert!(Phase::from_str("").is_err());
    }

    #[test]
    fn unknown_track_status_fails() {
        assert!(TrackStatus::from_str("done").is_err());
    }

    #[test]
    fn risk_impact_rank() {
        assert!(RiskImpact::High.rank() > RiskImpact::Medium.rank());
        assert!(RiskImpact::Medium.rank() > RiskImpact::Low.rank());
    }

    #[test]
    fn artifact_type_roundtrip() {
        for artifact in ArtifactType::all() {
            let parsed = ArtifactType::from_str(artifact.as_str()).unwrap();
            assert_eq!(*artifact, parsed);
        }
        assert_eq!(
            ArtifactType::from_str("design-spec").unwrap(),
            ArtifactType::DesignSpec
        );
    }

    #[test]
    fn valid_artifact_urls() {
        for url in [
            "https://docs.example.com/prd/auth-login",
            "http://wiki.internal/pages/1234",
            "https://drive.example.com/d/abc?usp=sharing",
        ] {
            validate_artifact_url(ArtifactType::Prd, url)
                .unwrap_or_else(|_| panic!("expected valid: {url}"));
        }
    }

    #[test]
    fn invalid_artifact_urls() {
        for url in ["", "ftp://files/plan", "not a url", "https://has space.com/x"] {
            assert!(
                validate_artifact_url(ArtifactType::Prd, url).is_err(),
                "expected invalid: {url}"
            );
        }
    }

    #[test]
    fn enum_serde_snake_case() {
        let yaml = serde_yaml::to_string(&Phase::SignalAnalysis).unwrap();
        assert_eq!(yaml.trim(), "signal_analysis");
        let yaml = serde_yaml::to_string(&TrackStatus::PendingApproval).unwrap();
        assert_eq!(yaml.trim(), "pending_approval");
        let yaml = serde_yaml::to_string(&Recommendation::NoGo).unwrap();
        assert_eq!(yaml.trim(), "no_go");
    }

    #[test]
    fn unknown_enum_value_fails_closed() {
        let result: std::result::Result<TrackStatus, _> = serde_yaml::from_str("paused");
        assert!(result.is_err());
        let result: std::result::Result<Phase, _> = serde_yaml::from_str("released");
        assert!(result.is_err());
    }
}
