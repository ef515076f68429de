use crate::error::{PdlcError, Result};
use crate::track::{self, TrackWeights};
use crate::types::{
    validate_artifact_url, ApprovalStatus, ArtifactType, DecisionVerdict, Phase, Priority,
    ReviewOutcome, RiskImpact, TrackName, TrackStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// PhaseLog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTransitionEntry {
    pub seq: u64,
    /// None only for the entry written at record creation.
    pub from_phase: Option<Phase>,
    pub to_phase: Phase,
    pub entered_at: DateTime<Utc>,
    /// None while the phase is active. Set once, when the phase is exited.
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// Append-only phase audit log. Entries are never edited or removed; the
/// only mutation besides append is closing the open entry, and
/// `record_entry` does both in one step so exactly one entry stays open.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhaseLog(Vec<PhaseTransitionEntry>);

impl PhaseLog {
    /// Close the currently open entry (if any) and append a new open one.
    /// Returns the new entry's seq.
    pub fn record_entry(
        &mut self,
        from_phase: Option<Phase>,
        to_phase: Phase,
        at: DateTime<Utc>,
        metadata: BTreeMap<String, String>,
    ) -> u64 {
        if let Some(open) = self.0.iter_mut().find(|e| e.completed_at.is_none()) {
            open.completed_at = Some(at);
        }
        let seq = self.0.len() as u64;
        self.0.push(PhaseTransitionEntry {
            seq,
            from_phase,
            to_phase,
            entered_at: at,
            completed_at: None,
            metadata,
        });
        seq
    }

    pub fn entries(&self) -> &[PhaseTransitionEntry] {
        &self.0
    }

    pub fn last(&self) -> Option<&PhaseTransitionEntry> {
        self.0.last()
    }

    /// The single entry without a completed_at, if the log is well formed.
    pub fn open_entry(&self) -> Option<&PhaseTransitionEntry> {
        self.0.iter().rev().find(|e| e.completed_at.is_none())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// DecisionLog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub seq: u64,
    pub phase: Phase,
    pub verdict: DecisionVerdict,
    pub rationale: String,
    pub decided_by: String,
    pub decided_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// Append-only decision audit log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionLog(Vec<DecisionRecord>);

impl DecisionLog {
    #[allow(clippy::too_many_arguments)]
    pub fn append(
        &mut self,
        phase: Phase,
        verdict: DecisionVerdict,
        rationale: impl Into<String>,
        decided_by: impl Into<String>,
        at: DateTime<Utc>,
        metadata: BTreeMap<String, String>,
    ) -> u64 {
        let seq = self.0.len() as u64;
        self.0.push(DecisionRecord {
            seq,
            phase,
            verdict,
            rationale: rationale.into(),
            decided_by: decided_by.into(),
            decided_at: at,
            metadata,
        });
        seq
    }

    pub fn entries(&self) -> &[DecisionRecord] {
        &self.0
    }

    pub fn last(&self) -> Option<&DecisionRecord> {
        self.0.last()
    }

    pub fn last_for_phase(&self, phase: Phase) -> Option<&DecisionRecord> {
        self.0.iter().rev().find(|d| d.phase == phase)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Signal carriers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub approver: String,
    pub status: ApprovalStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Risk {
    pub description: String,
    pub impact: RiskImpact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mitigation: Option<String>,
}

impl Risk {
    pub fn is_mitigated(&self) -> bool {
        self.mitigation.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    pub description: String,
    pub blocking: bool,
    pub resolved: bool,
}

// ---------------------------------------------------------------------------
// TrackState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackState {
    pub name: TrackName,
    pub status: TrackStatus,
    /// Iteration counter; bumped each time the track circulates a new
    /// revision of its work.
    pub version: u32,
    /// Review outcome; only the business case track uses this today.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ReviewOutcome>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl TrackState {
    pub fn new(name: TrackName) -> Self {
        Self {
            name,
            status: TrackStatus::NotStarted,
            version: 0,
            outcome: None,
            metadata: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// FeatureRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub slug: String,
    pub title: String,
    /// Owning product reference, free-form.
    pub product: String,
    pub priority: Priority,
    /// Optimistic concurrency stamp; bumped on every save.
    pub revision: u64,
    pub current_phase: Phase,
    pub tracks: BTreeMap<TrackName, TrackState>,
    pub artifacts: BTreeMap<ArtifactType, Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate: Option<String>,
    #[serde(default)]
    pub open_design_questions: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub approvals: Vec<Approval>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub risks: Vec<Risk>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
    pub phase_history: PhaseLog,
    #[serde(default)]
    pub decisions: DecisionLog,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FeatureRecord {
    pub fn new(
        slug: impl Into<String>,
        title: impl Into<String>,
        product: impl Into<String>,
        priority: Priority,
    ) -> Self {
        let now = Utc::now();

        let tracks = TrackName::all()
            .iter()
            .map(|&name| (name, TrackState::new(name)))
            .collect();
        let artifacts = ArtifactType::all().iter().map(|&t| (t, None)).collect();

        let mut phase_history = PhaseLog::default();
        phase_history.record_entry(None, Phase::Initialization, now, BTreeMap::new());

        Self {
            slug: slug.into(),
            title: title.into(),
            product: product.into(),
            priority,
            revision: 0,
            current_phase: Phase::Initialization,
            tracks,
            artifacts,
            estimate: None,
            open_design_questions: 0,
            approvals: Vec::new(),
            risks: Vec::new(),
            dependencies: Vec::new(),
            phase_history,
            decisions: DecisionLog::default(),
            created_at: now,
            updated_at: now,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn track(&self, name: TrackName) -> Option<&TrackState> {
        self.tracks.get(&name)
    }

    pub fn track_status(&self, name: TrackName) -> TrackStatus {
        self.track(name)
            .map(|t| t.status)
            .unwrap_or(TrackStatus::NotStarted)
    }

    pub fn business_case_outcome(&self) -> Option<ReviewOutcome> {
        self.track(TrackName::BusinessCase).and_then(|t| t.outcome)
    }

    pub fn artifact_url(&self, artifact: ArtifactType) -> Option<&str> {
        self.artifacts
            .get(&artifact)
            .and_then(|url| url.as_deref())
    }

    pub fn progress(&self, weights: &TrackWeights) -> u32 {
        track::overall_progress(&self.tracks, weights)
    }

    // -----------------------------------------------------------------------
    // Track mutations
    // -----------------------------------------------------------------------

    fn track_mut(&mut self, name: TrackName) -> Result<&mut TrackState> {
        self.tracks
            .get_mut(&name)
            .ok_or_else(|| PdlcError::InvalidState(format!("missing {name} track")))
    }

    pub fn set_track_status(&mut self, name: TrackName, to: TrackStatus) -> Result<()> {
        let track = self.track_mut(name)?;
        track::check_transition(name, track.status, to)?;
        track.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn bump_track_version(&mut self, name: TrackName) -> Result<u32> {
        let track = self.track_mut(name)?;
        if track.status == TrackStatus::NotStarted {
            return Err(PdlcError::InvalidState(format!(
                "{name} track has not started; nothing to iterate"
            )));
        }
        track.version += 1;
        let version = track.version;
        self.updated_at = Utc::now();
        Ok(version)
    }

    pub fn set_track_note(&mut self, name: TrackName, key: &str, value: &str) -> Result<()> {
        let track = self.track_mut(name)?;
        track.metadata.insert(key.to_string(), value.to_string());
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn accept_business_case(&mut self) -> Result<()> {
        let track = self.track_mut(TrackName::BusinessCase)?;
        track.outcome = Some(ReviewOutcome::Accepted);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Records a business case rejection. A COMPLETE business case track
    /// regresses to IN_PROGRESS for rework; this is the only legal way a
    /// track leaves COMPLETE.
    pub fn reject_business_case(&mut self) -> Result<()> {
        let track = self.track_mut(TrackName::BusinessCase)?;
        track.outcome = Some(ReviewOutcome::Rejected);
        if track.status == TrackStatus::Complete {
            track.status = TrackStatus::InProgress;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Signal mutations
    // -----------------------------------------------------------------------

    pub fn link_artifact(&mut self, artifact: ArtifactType, url: &str) -> Result<()> {
        validate_artifact_url(artifact, url)?;
        self.artifacts.insert(artifact, Some(url.to_string()));
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn clear_artifact(&mut self, artifact: ArtifactType) {
        self.artifacts.insert(artifact, None);
        self.updated_at = Utc::now();
    }

    pub fn set_estimate(&mut self, estimate: impl Into<String>) {
        self.estimate = Some(estimate.into());
        self.updated_at = Utc::now();
    }

    pub fn clear_estimate(&mut self) {
        self.estimate = None;
        self.updated_at = Utc::now();
    }

    pub fn set_open_design_questions(&mut self, count: u32) {
        self.open_design_questions = count;
        self.updated_at = Utc::now();
    }

    /// Add or replace an approval by approver name.
    pub fn upsert_approval(&mut self, approver: &str, status: ApprovalStatus) {
        if let Some(existing) = self.approvals.iter_mut().find(|a| a.approver == approver) {
            existing.status = status;
        } else {
            self.approvals.push(Approval {
                approver: approver.to_string(),
                status,
            });
        }
        self.updated_at = Utc::now();
    }

    pub fn add_risk(
        &mut self,
        description: impl Into<String>,
        impact: RiskImpact,
        mitigation: Option<String>,
    ) {
        self.risks.push(Risk {
            description: description.into(),
            impact,
            mitigation,
        });
        self.updated_at = Utc::now();
    }

    pub fn mitigate_risk(&mut self, index: usize, mitigation: impl Into<String>) -> Result<()> {
        let risk = self
            .risks
            .get_mut(index)
            .ok_or_else(|| PdlcError::RiskNotFound(index.to_string()))?;
        risk.mitigation = Some(mitigation.into());
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn add_dependency(&mut self, description: impl Into<String>, blocking: bool) {
        self.dependencies.push(Dependency {
            description: description.into(),
            blocking,
            resolved: false,
        });
        self.updated_at = Utc::now();
    }

    pub fn resolve_dependency(&mut self, index: usize) -> Result<()> {
        let dep = self
            .dependencies
            .get_mut(index)
            .ok_or_else(|| PdlcError::DependencyNotFound(index.to_string()))?;
        dep.resolved = true;
        self.updated_at = Utc::now();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Structural validation
    // -----------------------------------------------------------------------

    /// Full structural check, run on every load. A record that fails here is
    /// never returned to callers.
    pub fn validate(&self) -> Result<()> {
        for &name in TrackName::all() {
            match self.tracks.get(&name) {
                None => {
                    return Err(PdlcError::InvalidState(format!("missing {name} track")));
                }
                Some(track) if track.name != name => {
                    return Err(PdlcError::InvalidState(format!(
                        "track keyed {name} names itself {}",
                        track.name
                    )));
                }
                Some(_) => {}
            }
        }

        let entries = self.phase_history.entries();
        if entries.is_empty() {
            return Err(PdlcError::InvalidState("phase history is empty".into()));
        }
        let mut open = 0usize;
        for (i, entry) in entries.iter().enumerate() {
            if entry.seq != i as u64 {
                return Err(PdlcError::InvalidState(format!(
                    "phase history seq {} at index {i}",
                    entry.seq
                )));
            }
            let expected_from = if i == 0 {
                None
            } else {
                Some(entries[i - 1].to_phase)
            };
            if entry.from_phase != expected_from {
                return Err(PdlcError::InvalidState(format!(
                    "phase history linkage broken at seq {}",
                    entry.seq
                )));
            }
            if entry.completed_at.is_none() {
                open += 1;
                if i != entries.len() - 1 {
                    return Err(PdlcError::InvalidState(format!(
                        "phase history entry {} is open but not last",
                        entry.seq
                    )));
                }
            }
        }
        if open != 1 {
            return Err(PdlcError::InvalidState(format!(
                "phase history has {open} open entries, expected 1"
            )));
        }
        // entries is non-empty here
        if let Some(last) = entries.last() {
            if last.to_phase != self.current_phase {
                return Err(PdlcError::InvalidState(format!(
                    "current phase {} disagrees with phase history ({})",
                    self.current_phase, last.to_phase
                )));
            }
        }

        for (i, decision) in self.decisions.entries().iter().enumerate() {
            if decision.seq != i as u64 {
                return Err(PdlcError::InvalidState(format!(
                    "decision seq {} at index {i}",
                    decision.seq
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> FeatureRecord {
        FeatureRecord::new("checkout-v2", "Checkout v2", "storefront", Priority::P1)
    }

    #[test]
    fn new_record_shape() {
        let rec = record();
        assert_eq!(rec.current_phase, Phase::Initialization);
        assert_eq!(rec.revision, 0);
        assert_eq!(rec.tracks.len(), 4);
        for &name in TrackName::all() {
            let track = rec.track(name).unwrap();
            assert_eq!(track.status, TrackStatus::NotStarted);
            assert_eq!(track.version, 0);
            assert!(track.outcome.is_none());
        }
        assert_eq!(rec.artifacts.len(), 5);
        assert!(rec.artifacts.values().all(|url| url.is_none()));
        assert_eq!(rec.phase_history.len(), 1);
        let first = &rec.phase_history.entries()[0];
        assert_eq!(first.seq, 0);
        assert!(first.from_phase.is_none());
        assert_eq!(first.to_phase, Phase::Initialization);
        assert!(first.completed_at.is_none());
        assert!(rec.validate().is_ok());
    }

    #[test]
    fn track_edges_enforced() {
        let mut rec = record();
        let err = rec
            .set_track_status(TrackName::Design, TrackStatus::Complete)
            .unwrap_err();
        assert!(matches!(err, PdlcError::IllegalTransition { .. }));

        rec.set_track_status(TrackName::Design, TrackStatus::InProgress)
            .unwrap();
        rec.set_track_status(TrackName::Design, TrackStatus::PendingApproval)
            .unwrap();
        rec.set_track_status(TrackName::Design, TrackStatus::Complete)
            .unwrap();
        assert_eq!(rec.track_status(TrackName::Design), TrackStatus::Complete);
    }

    #[test]
    fn bump_requires_started_track() {
        let mut rec = record();
        assert!(rec.bump_track_version(TrackName::Context).is_err());

        rec.set_track_status(TrackName::Context, TrackStatus::InProgress)
            .unwrap();
        assert_eq!(rec.bump_track_version(TrackName::Context).unwrap(), 1);
        assert_eq!(rec.bump_track_version(TrackName::Context).unwrap(), 2);
    }

    #[test]
    fn business_case_rejection_regresses_complete() {
        let mut rec = record();
        rec.set_track_status(TrackName::BusinessCase, TrackStatus::InProgress)
            .unwrap();
        rec.set_track_status(TrackName::BusinessCase, TrackStatus::Complete)
            .unwrap();

        rec.reject_business_case().unwrap();
        let track = rec.track(TrackName::BusinessCase).unwrap();
        assert_eq!(track.status, TrackStatus::InProgress);
        assert_eq!(track.outcome, Some(ReviewOutcome::Rejected));
    }

    #[test]
    fn business_case_rejection_in_flight_keeps_status() {
        let mut rec = record();
        rec.set_track_status(TrackName::BusinessCase, TrackStatus::InProgress)
            .unwrap();
        rec.reject_business_case().unwrap();
        let track = rec.track(TrackName::BusinessCase).unwrap();
        assert_eq!(track.status, TrackStatus::InProgress);
        assert_eq!(track.outcome, Some(ReviewOutcome::Rejected));
    }

    #[test]
    fn acceptance_overwrites_rejection() {
        let mut rec = record();
        rec.reject_business_case().unwrap();
        rec.accept_business_case().unwrap();
        assert_eq!(rec.business_case_outcome(), Some(ReviewOutcome::Accepted));
    }

    #[test]
    fn artifact_link_validates_url() {
        let mut rec = record();
        assert!(rec.link_artifact(ArtifactType::Prd, "not a url").is_err());

        rec.link_artifact(ArtifactType::Prd, "https://docs.example.com/prd/checkout")
            .unwrap();
        assert_eq!(
            rec.artifact_url(ArtifactType::Prd),
            Some("https://docs.example.com/prd/checkout")
        );

        rec.clear_artifact(ArtifactType::Prd);
        assert!(rec.artifact_url(ArtifactType::Prd).is_none());
    }

    #[test]
    fn approvals_upsert_by_name() {
        let mut rec = record();
        rec.upsert_approval("dana", ApprovalStatus::Pending);
        rec.upsert_approval("kim", ApprovalStatus::Pending);
        rec.upsert_approval("dana", ApprovalStatus::Approved);

        assert_eq!(rec.approvals.len(), 2);
        assert_eq!(rec.approvals[0].approver, "dana");
        assert_eq!(rec.approvals[0].status, ApprovalStatus::Approved);
    }

    #[test]
    fn risk_mitigation_by_index() {
        let mut rec = record();
        rec.add_risk("vendor API deprecation", RiskImpact::High, None);
        assert!(rec.mitigate_risk(3, "n/a").is_err());

        rec.mitigate_risk(0, "pin to v2 until migration lands")
            .unwrap();
        assert!(rec.risks[0].is_mitigated());
    }

    #[test]
    fn dependency_resolution_by_index() {
        let mut rec = record();
        rec.add_dependency("payments team schema change", true);
        assert!(rec.resolve_dependency(1).is_err());
        rec.resolve_dependency(0).unwrap();
        assert!(rec.dependencies[0].resolved);
    }

    #[test]
    fn phase_log_seq_and_single_open_entry() {
        let mut rec = record();
        let seq = rec.phase_history.record_entry(
            Some(Phase::Initialization),
            Phase::SignalAnalysis,
            Utc::now(),
            BTreeMap::new(),
        );
        assert_eq!(seq, 1);

        let entries = rec.phase_history.entries();
        assert!(entries[0].completed_at.is_some());
        assert!(entries[1].completed_at.is_none());
        assert_eq!(rec.phase_history.open_entry().unwrap().seq, 1);
    }

    #[test]
    fn decision_log_seq_monotonic() {
        let mut log = DecisionLog::default();
        let s0 = log.append(
            Phase::DecisionGate,
            DecisionVerdict::Reject,
            "engineering blocked",
            "pm",
            Utc::now(),
            BTreeMap::new(),
        );
        let s1 = log.append(
            Phase::DecisionGate,
            DecisionVerdict::Approve,
            "reworked; all clear",
            "pm",
            Utc::now(),
            BTreeMap::new(),
        );
        assert_eq!((s0, s1), (0, 1));
        assert_eq!(
            log.last_for_phase(Phase::DecisionGate).unwrap().verdict,
            DecisionVerdict::Approve
        );
    }

    #[test]
    fn validate_rejects_tampered_seq() {
        let rec = record();
        let yaml = serde_yaml::to_string(&rec).unwrap();
        let tampered = yaml.replace("seq: 0", "seq: 7");
        let parsed: FeatureRecord = serde_yaml::from_str(&tampered).unwrap();
        assert!(matches!(
            parsed.validate(),
            Err(PdlcError::InvalidState(_))
        ));
    }

    #[test]
    fn validate_rejects_phase_mismatch() {
        let rec = record();
        let yaml = serde_yaml::to_string(&rec).unwrap();
        let tampered = yaml.replace("current_phase: initialization", "current_phase: decision_gate");
        let parsed: FeatureRecord = serde_yaml::from_str(&tampered).unwrap();
        assert!(parsed.validate().is_err());
    }

    #[test]
    fn validate_rejects_track_key_mismatch() {
        let rec = record();
        let yaml = serde_yaml::to_string(&rec).unwrap();
        // The design track entry claims to be the context track.
        let tampered = yaml.replace("name: design", "name: context");
        let parsed: FeatureRecord = serde_yaml::from_str(&tampered).unwrap();
        assert!(parsed.validate().is_err());
    }

    #[test]
    fn manifest_roundtrip() {
        let mut rec = record();
        rec.set_track_status(TrackName::Context, TrackStatus::InProgress)
            .unwrap();
        rec.link_artifact(ArtifactType::ContextDoc, "https://docs.example.com/ctx")
            .unwrap();
        rec.add_risk("scope creep", RiskImpact::Medium, None);
        rec.set_estimate("6 weeks");

        let yaml = serde_yaml::to_string(&rec).unwrap();
        let parsed: FeatureRecord = serde_yaml::from_str(&yaml).unwrap();
        parsed.validate().unwrap();
        assert_eq!(parsed.slug, "checkout-v2");
        assert_eq!(
            parsed.track_status(TrackName::Context),
            TrackStatus::InProgress
        );
        assert_eq!(parsed.estimate.as_deref(), Some("6 weeks"));
        assert_eq!(parsed.risks.len(), 1);
    }
}
