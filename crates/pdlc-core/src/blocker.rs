use crate::config::EngineConfig;
use crate::gate;
use crate::hooks::ValidationReport;
use crate::record::FeatureRecord;
use crate::types::{ApprovalStatus, ReviewOutcome, RiskImpact, Severity, TrackName, TrackStatus};
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blocker {
    pub description: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockerReport {
    pub blockers: Vec<Blocker>,
    pub critical_count: usize,
    pub high_count: usize,
    pub medium_count: usize,
    pub low_count: usize,
}

impl BlockerReport {
    fn new(blockers: Vec<Blocker>) -> Self {
        let count = |severity| {
            blockers
                .iter()
                .filter(|b| b.severity == severity)
                .count()
        };
        Self {
            critical_count: count(Severity::Critical),
            high_count: count(Severity::High),
            medium_count: count(Severity::Medium),
            low_count: count(Severity::Low),
            blockers,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blockers.is_empty()
    }

    pub fn at(&self, severity: Severity) -> Vec<&Blocker> {
        self.blockers
            .iter()
            .filter(|b| b.severity == severity)
            .collect()
    }
}

/// Sweep a record for everything currently standing in its way. Sources are
/// scanned in severity order so the report reads worst first.
pub fn detect_blockers(
    record: &FeatureRecord,
    hooks: &ValidationReport,
    config: &EngineConfig,
) -> BlockerReport {
    let mut blockers = Vec::new();
    let mut push = |severity, description: String| {
        blockers.push(Blocker {
            description,
            severity,
        });
    };

    // Critical: rejected business case, failed structural validation.
    if record.business_case_outcome() == Some(ReviewOutcome::Rejected) {
        push(
            Severity::Critical,
            "business case rejected; rework required".to_string(),
        );
    }
    for failure in hooks.critical_failures() {
        push(
            Severity::Critical,
            format!("validation failed: {}", failure.message),
        );
    }

    // High: blocked tracks, unmet gates, blocking dependencies, live risks.
    for &name in TrackName::all() {
        if record.track_status(name) == TrackStatus::Blocked {
            push(Severity::High, format!("{name} track is blocked"));
        }
    }
    for &scope in gate::scopes_for(record.current_phase) {
        let validation = gate::evaluate_phase(record, scope, &config.gates);
        for blocker in validation.blockers {
            push(Severity::High, blocker);
        }
        for warning in validation.warnings {
            push(Severity::Low, format!("advisory: {warning}"));
        }
    }
    for dep in &record.dependencies {
        if dep.blocking && !dep.resolved {
            push(
                Severity::High,
                format!("blocking dependency unresolved: {}", dep.description),
            );
        }
    }
    for risk in &record.risks {
        if risk.impact == RiskImpact::High && !risk.is_mitigated() {
            push(
                Severity::High,
                format!("unmitigated high risk: {}", risk.description),
            );
        }
    }

    // Medium: waiting states and stalled records.
    for &name in TrackName::all() {
        if record.track_status(name) == TrackStatus::PendingApproval {
            push(Severity::Medium, format!("{name} track awaiting approval"));
        }
    }
    for approval in &record.approvals {
        if approval.status == ApprovalStatus::Pending {
            push(
                Severity::Medium,
                format!("approval pending from {}", approval.approver),
            );
        }
    }
    if config.stale_after_days > 0 {
        let age_days = (Utc::now() - record.updated_at).num_days();
        if age_days > i64::from(config.stale_after_days) {
            push(Severity::Medium, format!("no activity for {age_days} days"));
        }
    }

    // Low: risks below the high-impact line.
    for risk in &record.risks {
        if risk.impact == RiskImpact::Medium && !risk.is_mitigated() {
            push(
                Severity::Low,
                format!("unmitigated medium risk: {}", risk.description),
            );
        }
    }

    BlockerReport::new(blockers)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
